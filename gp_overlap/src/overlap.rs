use crate::{config::Contig, interval::IntervalSet, reader::GenomeSnapshot};

/// The 2x2 contingency table for a two-way overlap, summed over the analyzed
/// chromosomes.  The four cells partition the universe overlap - the bases
/// where both experiments called some peak - so they are mutually exclusive
/// and exhaustive by construction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContingencyTable {
    both_significant: u64,
    a_only: u64,
    b_only: u64,
    neither: u64,
}

impl ContingencyTable {
    pub fn both_significant(&self) -> u64 {
        self.both_significant
    }

    pub fn a_only(&self) -> u64 {
        self.a_only
    }

    pub fn b_only(&self) -> u64 {
        self.b_only
    }

    pub fn neither(&self) -> u64 {
        self.neither
    }

    pub fn total(&self) -> u64 {
        self.both_significant + self.a_only + self.b_only + self.neither
    }
}

/// Compute the contingency table for two experiments.
///
/// Per chromosome the universe of comparison is uniA n uniB: bases with no
/// peak in either experiment are uninformative and excluded from the table.
/// Within that universe, bases are both-significant, significant in A only,
/// significant in B only, or in neither significant set.
///
/// A subtraction that would go negative means the snapshots violate the
/// significant-within-universe containment and fails the whole computation
/// with the chromosome and quantity named.
pub fn two_way(
    uni_a: &GenomeSnapshot,
    uni_b: &GenomeSnapshot,
    sig_a: &GenomeSnapshot,
    sig_b: &GenomeSnapshot,
    contigs: &[Contig],
) -> anyhow::Result<ContingencyTable> {
    let mut table = ContingencyTable::default();
    for ctg in contigs {
        let ua = peaks_for(uni_a, ctg)?;
        let ub = peaks_for(uni_b, ctg)?;
        let sa = peaks_for(sig_a, ctg)?;
        let sb = peaks_for(sig_b, ctg)?;

        let uni_overlap = ua.intersect(ub);
        let both = sa.intersect(sb).coverage();
        let a_only = excess(
            sa.intersect(&uni_overlap).coverage(),
            both,
            ctg,
            "significant A only",
        )?;
        let b_only = excess(
            sb.intersect(&uni_overlap).coverage(),
            both,
            ctg,
            "significant B only",
        )?;
        let neither = excess(
            uni_overlap.coverage(),
            both + a_only + b_only,
            ctg,
            "universe remainder",
        )?;

        trace!(
            "{}: both {} / A only {} / B only {} / neither {}",
            ctg,
            both,
            a_only,
            b_only,
            neither
        );
        table.both_significant += both;
        table.a_only += a_only;
        table.b_only += b_only;
        table.neither += neither;
    }
    Ok(table)
}

fn peaks_for<'a>(snap: &'a GenomeSnapshot, ctg: &Contig) -> anyhow::Result<&'a IntervalSet> {
    snap.chrom(ctg)
        .map(|c| c.peaks())
        .ok_or_else(|| anyhow!("Chromosome {} missing from snapshot", ctg))
}

fn excess(cover: u64, sub: u64, ctg: &Contig, what: &str) -> anyhow::Result<u64> {
    cover.checked_sub(sub).ok_or_else(|| {
        anyhow!(
            "Negative {} coverage on chromosome {} ({} - {})",
            what,
            ctg,
            cover,
            sub
        )
    })
}
