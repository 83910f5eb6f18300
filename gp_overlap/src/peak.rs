use std::collections::HashSet;

use crate::{config::Contig, interval::IntervalSet};

/// Minimum number of tab-separated columns for a usable gappedPeak line
/// (we need everything up to the pValue in column 13)
const MIN_FIELDS: usize = 14;

/// One parsed gappedPeak record with its block sub-intervals resolved to
/// absolute genomic coordinates and merged into a canonical set.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakRecord {
    contig: Contig,
    start: u64,
    stop: u64,
    blocks: IntervalSet,
    signal: f64,
    p_value: f64,
}

impl PeakRecord {
    pub fn contig(&self) -> &Contig {
        &self.contig
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn stop(&self) -> u64 {
        self.stop
    }

    pub fn blocks(&self) -> &IntervalSet {
        &self.blocks
    }

    /// Base pairs covered by the record's blocks (gaps between blocks
    /// excluded)
    pub fn coverage(&self) -> u64 {
        self.blocks.coverage()
    }

    pub fn signal(&self) -> f64 {
        self.signal
    }

    pub fn p_value(&self) -> f64 {
        self.p_value
    }
}

/// Why a line was skipped rather than parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Chromosome not in the allow-list (expected - unplaced contigs etc.)
    Contig,
    /// Fewer columns than the gappedPeak layout requires
    ShortLine,
    /// Unparsable numeric field
    BadNumber,
    /// chromStart > chromEnd
    InvertedCoords,
    /// Block lists unusable: length mismatch or no non-empty block
    BadBlocks,
}

pub enum LineOutcome {
    Peak(PeakRecord),
    Skip(SkipReason),
}

/// Parse one tab-split gappedPeak line.
///
/// Columns (0-indexed): 0 chrom, 1 chromStart, 2 chromEnd, 10 blockSizes,
/// 11 blockStarts (relative to chromStart), 12 signalValue, 13 pValue.
/// Matching is case-insensitive and a leading "chr" prefix on the chromosome
/// token is ignored.  A malformed line becomes a counted skip, never an
/// error - one bad line must not kill the run.
pub fn parse_peak_line(fields: &[&str], allowed: &HashSet<Contig>) -> LineOutcome {
    if fields.len() < MIN_FIELDS {
        return LineOutcome::Skip(SkipReason::ShortLine);
    }

    let name = fields[0].to_lowercase();
    let name = name.strip_prefix("chr").unwrap_or(&name);
    let contig = match allowed.get(name) {
        Some(c) => c.clone(),
        None => return LineOutcome::Skip(SkipReason::Contig),
    };

    let (start, stop) = match (fields[1].parse::<u64>(), fields[2].parse::<u64>()) {
        (Ok(a), Ok(b)) => (a, b),
        _ => return LineOutcome::Skip(SkipReason::BadNumber),
    };
    if start > stop {
        return LineOutcome::Skip(SkipReason::InvertedCoords);
    }

    let sizes = match parse_block_list(fields[10]) {
        Some(v) => v,
        None => return LineOutcome::Skip(SkipReason::BadNumber),
    };
    let starts = match parse_block_list(fields[11]) {
        Some(v) => v,
        None => return LineOutcome::Skip(SkipReason::BadNumber),
    };
    if sizes.len() != starts.len() {
        return LineOutcome::Skip(SkipReason::BadBlocks);
    }

    let signal = match fields[12].parse::<f64>() {
        Ok(x) => x,
        Err(_) => return LineOutcome::Skip(SkipReason::BadNumber),
    };
    // f64 parsing accepts "inf" (any case), covering infinite significance
    let p_value = match fields[13].parse::<f64>() {
        Ok(x) => x,
        Err(_) => return LineOutcome::Skip(SkipReason::BadNumber),
    };

    let blocks = IntervalSet::from_ranges(
        starts
            .iter()
            .zip(sizes.iter())
            .map(|(&bs, &sz)| (start + bs, start + bs + sz)),
    );
    if blocks.is_empty() {
        return LineOutcome::Skip(SkipReason::BadBlocks);
    }

    LineOutcome::Peak(PeakRecord {
        contig,
        start,
        stop,
        blocks,
        signal,
        p_value,
    })
}

/// Parse a comma delimited list of integers.  Empty fragments (from the
/// trailing comma BED-style block lists usually carry) are ignored.
fn parse_block_list(s: &str) -> Option<Vec<u64>> {
    let mut v = Vec::new();
    for tok in s.split(',') {
        let tok = tok.trim();
        if tok.is_empty() {
            continue;
        }
        match tok.parse::<u64>() {
            Ok(x) => v.push(x),
            Err(_) => return None,
        }
    }
    Some(v)
}
