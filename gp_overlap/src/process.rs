use std::{io::Write, path::Path, thread};

use anyhow::Context;
use compress_io::compress::CompressIo;
use utils::{fisher_exact, FisherTest};

use crate::{
    config::Config,
    overlap::{self, ContingencyTable},
    reader::{self, GenomeSnapshot},
};

/// Strategy
///
/// Read both input files into universe/significant snapshots - the reads are
/// independent, so they run on separate threads and the snapshots are
/// immutable once built.  Intersect the snapshots per chromosome into the
/// 2x2 contingency table, run the Fisher's exact test and write the report.
pub fn run(cfg: &Config) -> anyhow::Result<()> {
    debug!("Starting processing");

    let (res_a, res_b) = thread::scope(|sc| {
        let jh = sc.spawn(|| reader::read_gapped_peaks(cfg.file_b(), cfg.contigs(), cfg.filter_b()));
        let a = reader::read_gapped_peaks(cfg.file_a(), cfg.contigs(), cfg.filter_a());
        let b = match jh.join() {
            Ok(res) => res,
            Err(_) => Err(anyhow!("Reader thread panicked")),
        };
        (a, b)
    });
    let (uni_a, sig_a) = res_a?;
    let (uni_b, sig_b) = res_b?;

    if let Some(prefix) = cfg.dump_prefix() {
        dump_pair(&format!("{}_A", prefix), &uni_a, &sig_a, cfg)?;
        dump_pair(&format!("{}_B", prefix), &uni_b, &sig_b, cfg)?;
    }

    let table = overlap::two_way(&uni_a, &uni_b, &sig_a, &sig_b, cfg.contigs())?;
    info!(
        "Contingency table: both {} / A only {} / B only {} / neither {} (universe overlap {})",
        table.both_significant(),
        table.a_only(),
        table.b_only(),
        table.neither(),
        table.total()
    );

    let test = fisher_exact(
        table.both_significant(),
        table.a_only(),
        table.b_only(),
        table.neither(),
    );
    info!(
        "Fisher's exact: p-value {:.6e}, odds ratio {:.6}",
        test.p_value, test.odds_ratio
    );

    write_report(cfg, &table, &test).with_context(|| "Failed writing report")
}

fn dump_pair(
    prefix: &str,
    uni: &GenomeSnapshot,
    sig: &GenomeSnapshot,
    cfg: &Config,
) -> anyhow::Result<()> {
    reader::dump_snapshot(format!("{}.uni", prefix), uni, cfg.contigs())?;
    reader::dump_snapshot(format!("{}.sig", prefix), sig, cfg.contigs())
}

/// Label for an input in the report: the file stem, which also strips the
/// .segGappedPeak style naming suffixes upstream pipelines attach
fn file_label(p: &Path) -> String {
    p.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| p.display().to_string())
}

fn write_report(cfg: &Config, table: &ContingencyTable, test: &FisherTest) -> anyhow::Result<()> {
    let mut wrt = CompressIo::new()
        .opt_path(cfg.output_file())
        .bufwriter()
        .with_context(|| "Failed to open output file")?;

    let label_a = file_label(cfg.file_a());
    let label_b = file_label(cfg.file_b());
    let chroms: Vec<&str> = cfg.contigs().iter().map(|c| c.as_ref()).collect();

    writeln!(wrt, "{}\tvs\t{}", label_a, label_b)?;
    writeln!(wrt, "Chromosome set:\t{}", cfg.selection())?;
    writeln!(wrt, "Chromosomes analyzed:\t{}", chroms.join("\t"))?;
    writeln!(wrt, "Significant overlap:\t{}", table.both_significant())?;
    writeln!(wrt, "Significant {} only:\t{}", label_a, table.a_only())?;
    writeln!(wrt, "Significant {} only:\t{}", label_b, table.b_only())?;
    writeln!(wrt, "Universe:\t{}", table.neither())?;
    writeln!(wrt, "p-value:\t{:.6e}", test.p_value)?;
    writeln!(wrt, "Odds ratio:\t{:.6}", test.odds_ratio)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn labels_strip_directory_and_extension() {
        assert_eq!(
            file_label(&PathBuf::from("/data/k562_h3k27me3.segGappedPeak")),
            "k562_h3k27me3"
        );
        assert_eq!(file_label(&PathBuf::from("sample.gappedPeak.gz")), "sample.gappedPeak");
        assert_eq!(file_label(&PathBuf::from("plain")), "plain");
    }
}
