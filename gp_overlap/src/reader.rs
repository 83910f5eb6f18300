use std::{
    collections::{HashMap, HashSet},
    fmt,
    io::{BufRead, Write},
    path::Path,
};

use anyhow::Context;
use compress_io::compress::CompressIo;
use utils::get_next_line;

use crate::{
    config::{Contig, PeakFilter},
    interval::IntervalSet,
    peak::{self, LineOutcome, PeakRecord, SkipReason},
};

/// Coverage accumulated for one chromosome: the running total of per-record
/// coverages plus the canonical union of all record block sets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChromCoverage {
    total_coverage: u64,
    peaks: IntervalSet,
}

impl ChromCoverage {
    pub fn total_coverage(&self) -> u64 {
        self.total_coverage
    }

    pub fn peaks(&self) -> &IntervalSet {
        &self.peaks
    }
}

/// Immutable per-chromosome coverage map for one (file, filter) view.
/// Every chromosome of the allow-list is present; chromosomes absent from
/// the file hold zero coverage and an empty set.
#[derive(Debug, Clone, PartialEq)]
pub struct GenomeSnapshot {
    cov: HashMap<Contig, ChromCoverage>,
}

impl GenomeSnapshot {
    pub fn chrom(&self, ctg: &str) -> Option<&ChromCoverage> {
        self.cov.get(ctg)
    }
}

/// Accumulates one view (universe or significant) of a file.  Each record's
/// canonical block set is unioned into its chromosome's running set, so the
/// set stays canonical throughout and its size is bounded by the number of
/// disjoint covered regions, not the number of records.
struct SnapshotBuilder {
    cov: HashMap<Contig, ChromCoverage>,
}

impl SnapshotBuilder {
    fn new(contigs: &[Contig]) -> Self {
        // Each chromosome gets its own freshly allocated accumulator
        let cov = contigs
            .iter()
            .map(|c| (c.clone(), ChromCoverage::default()))
            .collect();
        Self { cov }
    }

    fn add(&mut self, rec: &PeakRecord) {
        let e = self.cov.entry(rec.contig().clone()).or_default();
        e.total_coverage += rec.coverage();
        e.peaks = e.peaks.union(rec.blocks());
    }

    fn finish(self) -> GenomeSnapshot {
        GenomeSnapshot { cov: self.cov }
    }
}

/// Per-reason counts of skipped lines
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SkipCounts {
    contig: u64,
    short_line: u64,
    bad_number: u64,
    inverted_coords: u64,
    bad_blocks: u64,
}

impl SkipCounts {
    fn count(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Contig => self.contig += 1,
            SkipReason::ShortLine => self.short_line += 1,
            SkipReason::BadNumber => self.bad_number += 1,
            SkipReason::InvertedCoords => self.inverted_coords += 1,
            SkipReason::BadBlocks => self.bad_blocks += 1,
        }
    }

    /// Skips indicating broken input rather than out-of-scope chromosomes
    pub fn malformed(&self) -> u64 {
        self.short_line + self.bad_number + self.inverted_coords + self.bad_blocks
    }

    pub fn unlisted(&self) -> u64 {
        self.contig
    }
}

impl fmt::Display for SkipCounts {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "short {}, bad number {}, inverted coords {}, bad blocks {}",
            self.short_line, self.bad_number, self.inverted_coords, self.bad_blocks
        )
    }
}

/// Counters describing one pass over a peak file
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadStats {
    lines: u64,
    records: u64,
    significant: u64,
    skips: SkipCounts,
}

impl ReadStats {
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn significant(&self) -> u64 {
        self.significant
    }

    pub fn skips(&self) -> &SkipCounts {
        &self.skips
    }
}

/// Read a gappedPeak file into universe and significant snapshots.
///
/// The file is streamed line by line; malformed lines and unlisted
/// chromosomes are counted and skipped, never fatal.  Failure to open the
/// file fails fast before any computation.
pub fn read_gapped_peaks<P: AsRef<Path>>(
    fname: P,
    contigs: &[Contig],
    filter: &PeakFilter,
) -> anyhow::Result<(GenomeSnapshot, GenomeSnapshot)> {
    let fname = fname.as_ref();
    debug!("Reading gappedPeak records from {}", fname.display());

    let mut rdr = CompressIo::new()
        .path(fname)
        .bufreader()
        .with_context(|| format!("Could not open peak file {}", fname.display()))?;

    let (universe, significant, stats) = scan(&mut rdr, contigs, filter)
        .with_context(|| format!("Error reading from {}", fname.display()))?;

    info!(
        "{}: {} records ({} significant), {} lines on unlisted chromosomes",
        fname.display(),
        stats.records(),
        stats.significant(),
        stats.skips().unlisted()
    );
    if stats.skips().malformed() > 0 {
        warn!(
            "{}: skipped {} malformed lines ({})",
            fname.display(),
            stats.skips().malformed(),
            stats.skips()
        );
    }

    Ok((universe, significant))
}

/// Core of the reader, independent of the file layer so tests can drive it
/// from memory
pub(crate) fn scan<R: BufRead>(
    rdr: &mut R,
    contigs: &[Contig],
    filter: &PeakFilter,
) -> anyhow::Result<(GenomeSnapshot, GenomeSnapshot, ReadStats)> {
    let allowed: HashSet<Contig> = contigs.iter().cloned().collect();
    let mut universe = SnapshotBuilder::new(contigs);
    let mut significant = SnapshotBuilder::new(contigs);
    let mut stats = ReadStats::default();
    let mut buf = String::new();

    while let Some(fields) = get_next_line(rdr, &mut buf)
        .with_context(|| format!("Error after reading {} lines", stats.lines))?
    {
        stats.lines += 1;
        if fields.len() == 1 && fields[0].is_empty() {
            continue;
        }
        match peak::parse_peak_line(&fields, &allowed) {
            LineOutcome::Peak(rec) => {
                trace!(
                    "{}:{}-{} signal {} p {} covers {} bp",
                    rec.contig(),
                    rec.start(),
                    rec.stop(),
                    rec.signal(),
                    rec.p_value(),
                    rec.coverage()
                );
                universe.add(&rec);
                if filter.passes(rec.p_value(), rec.signal()) {
                    significant.add(&rec);
                    stats.significant += 1;
                }
                stats.records += 1;
            }
            LineOutcome::Skip(reason) => {
                if reason != SkipReason::Contig {
                    debug!("line {}: skipped ({:?})", stats.lines, reason);
                }
                stats.skips.count(reason);
            }
        }
    }

    Ok((universe.finish(), significant.finish(), stats))
}

/// Write the per-chromosome coverage and interval listing for one snapshot
/// (the .uni/.sig dump files)
pub fn dump_snapshot<P: AsRef<Path>>(
    path: P,
    snap: &GenomeSnapshot,
    contigs: &[Contig],
) -> anyhow::Result<()> {
    let path = path.as_ref();
    debug!("Dumping snapshot to {}", path.display());
    let mut wrt = CompressIo::new()
        .path(path)
        .bufwriter()
        .with_context(|| format!("Could not open dump file {}", path.display()))?;
    for ctg in contigs {
        let cc = snap
            .chrom(ctg)
            .ok_or_else(|| anyhow!("Chromosome {} missing from snapshot", ctg))?;
        writeln!(wrt, "Chr:\t{}", ctg)?;
        writeln!(wrt, "Total coverage:\t{}", cc.total_coverage())?;
        for (start, stop) in cc.peaks().ranges() {
            writeln!(wrt, "{}\t{}", start, stop)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn contigs(names: &[&str]) -> Vec<Contig> {
        names.iter().map(|s| Contig::from(*s)).collect()
    }

    fn run_scan(
        input: &str,
        ctgs: &[Contig],
        filter: &PeakFilter,
    ) -> (GenomeSnapshot, GenomeSnapshot, ReadStats) {
        scan(&mut Cursor::new(input), ctgs, filter).unwrap()
    }

    fn gp_line(chrom: &str, start: u64, sizes: &str, starts: &str, signal: f64, p: &str) -> String {
        let stop = start + 1000;
        format!(
            "{}\t{}\t{}\tpeak\t0\t.\t{}\t{}\t0\t2\t{}\t{}\t{}\t{}\t-1\n",
            chrom, start, stop, start, stop, sizes, starts, signal, p
        )
    }

    #[test]
    fn accumulates_universe_and_significant() {
        let input = [
            gp_line("chr1", 100, "100,", "0,", 5.0, "0.01"),
            gp_line("chr1", 500, "100,", "0,", 0.5, "0.01"),
            gp_line("chr2", 0, "50,50", "0,100", 5.0, "0.5"),
        ]
        .concat();
        let ctgs = contigs(&["1", "2"]);
        let (uni, sig, stats) = run_scan(&input, &ctgs, &PeakFilter::new(0.05, 1.0));

        assert_eq!(stats.records(), 3);
        assert_eq!(stats.significant(), 1);

        let u1 = uni.chrom("1").unwrap();
        assert_eq!(u1.total_coverage(), 200);
        assert_eq!(u1.peaks().ranges(), &[(100, 200), (500, 600)]);

        let u2 = uni.chrom("2").unwrap();
        assert_eq!(u2.peaks().ranges(), &[(0, 50), (100, 150)]);

        // Only the first record passes p < 0.05 && signal > 1
        let s1 = sig.chrom("1").unwrap();
        assert_eq!(s1.total_coverage(), 100);
        assert_eq!(s1.peaks().ranges(), &[(100, 200)]);
        assert!(sig.chrom("2").unwrap().peaks().is_empty());
    }

    #[test]
    fn absent_chromosome_is_empty_not_missing() {
        let input = gp_line("chr1", 100, "100,", "0,", 5.0, "0.01");
        let ctgs = contigs(&["1", "2"]);
        let (uni, _, _) = run_scan(&input, &ctgs, &PeakFilter::new(0.05, 1.0));

        let u2 = uni.chrom("2").unwrap();
        assert_eq!(u2.total_coverage(), 0);
        assert!(u2.peaks().is_empty());
        assert!(uni.chrom("3").is_none());
    }

    #[test]
    fn chromosome_accumulators_are_independent() {
        // Regression: all per-chromosome entries must be fresh allocations -
        // records on one chromosome must never leak into another's set
        let input = [
            gp_line("chr1", 100, "100,", "0,", 5.0, "0.01"),
            gp_line("chr1", 100, "100,", "0,", 5.0, "0.01"),
            gp_line("chr1", 400, "100,", "0,", 5.0, "0.01"),
        ]
        .concat();
        let ctgs = contigs(&["1", "2", "x"]);
        let (uni, sig, _) = run_scan(&input, &ctgs, &PeakFilter::new(0.05, 1.0));

        assert_eq!(uni.chrom("1").unwrap().peaks().ranges(), &[(100, 200), (400, 500)]);
        for other in ["2", "x"] {
            assert!(uni.chrom(other).unwrap().peaks().is_empty(), "{}", other);
            assert_eq!(uni.chrom(other).unwrap().total_coverage(), 0);
            assert!(sig.chrom(other).unwrap().peaks().is_empty(), "{}", other);
        }
    }

    #[test]
    fn skips_are_counted_not_fatal() {
        let input = [
            gp_line("chr1", 100, "100,", "0,", 5.0, "0.01"),
            "chrUn_gl000220\t0\t10\tpeak\t0\t.\t0\t10\t0\t1\t10,\t0,\t1.0\t0.5\t-1\n".to_string(),
            "chr1\tnot_a_number\t10\tpeak\t0\t.\t0\t10\t0\t1\t10,\t0,\t1.0\t0.5\t-1\n".to_string(),
            "chr1\t200\t100\tpeak\t0\t.\t200\t100\t0\t1\t10,\t0,\t1.0\t0.5\t-1\n".to_string(),
            "\n".to_string(),
        ]
        .concat();
        let ctgs = contigs(&["1"]);
        let (uni, _, stats) = run_scan(&input, &ctgs, &PeakFilter::new(0.05, 1.0));

        assert_eq!(stats.records(), 1);
        assert_eq!(stats.skips().unlisted(), 1);
        assert_eq!(stats.skips().malformed(), 2);
        assert_eq!(uni.chrom("1").unwrap().total_coverage(), 100);
    }

    #[test]
    fn rereading_is_idempotent() {
        let input = [
            gp_line("chr1", 100, "20,20", "0,50", 5.0, "0.01"),
            gp_line("chr2", 900, "100,", "0,", 2.0, "inf"),
        ]
        .concat();
        let ctgs = contigs(&["1", "2"]);
        let filter = PeakFilter::new(0.05, 1.0);
        let (uni_1, sig_1, _) = run_scan(&input, &ctgs, &filter);
        let (uni_2, sig_2, _) = run_scan(&input, &ctgs, &filter);
        assert_eq!(uni_1, uni_2);
        assert_eq!(sig_1, sig_2);
    }

    #[test]
    fn tightening_p_threshold_shrinks_significant_coverage() {
        let input = [
            gp_line("chr1", 100, "100,", "0,", 5.0, "0.04"),
            gp_line("chr1", 500, "100,", "0,", 5.0, "0.009"),
            gp_line("chr2", 0, "100,", "0,", 5.0, "0.2"),
        ]
        .concat();
        let ctgs = contigs(&["1", "2"]);
        let mut prev = u64::MAX;
        for p_cut in [0.05, 0.01, 0.001] {
            let (_, sig, _) = run_scan(&input, &ctgs, &PeakFilter::new(p_cut, 1.0));
            let cov: u64 = ctgs
                .iter()
                .map(|c| sig.chrom(c).unwrap().peaks().coverage())
                .sum();
            assert!(cov <= prev, "p < {} grew significant coverage", p_cut);
            prev = cov;
        }
        assert_eq!(prev, 0);
    }
}
