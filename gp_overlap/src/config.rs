use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

pub type Contig = Arc<str>;

/// Chromosome preset: autosomes, optionally plus the sex chromosomes and the
/// mitochondrial chromosome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromSelection {
    Autosomes,
    AutosomesSex,
    AutosomesSexMito,
}

impl FromStr for ChromSelection {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "a" => Ok(Self::Autosomes),
            "as" => Ok(Self::AutosomesSex),
            "asm" => Ok(Self::AutosomesSexMito),
            _ => Err("expected one of A, AS, ASM"),
        }
    }
}

impl fmt::Display for ChromSelection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Autosomes => "A",
            Self::AutosomesSex => "AS",
            Self::AutosomesSexMito => "ASM",
        })
    }
}

impl ChromSelection {
    /// Chromosome allow-list in normalized form (lowercase, no "chr" prefix)
    pub fn contigs(&self) -> Vec<Contig> {
        let mut v: Vec<Contig> = (1..=22).map(|i| Contig::from(i.to_string())).collect();
        if matches!(self, Self::AutosomesSex | Self::AutosomesSexMito) {
            v.push(Contig::from("x"));
            v.push(Contig::from("y"));
        }
        if matches!(self, Self::AutosomesSexMito) {
            v.push(Contig::from("m"));
        }
        v
    }
}

/// Significance filter for one input file.  A record is significant if its
/// p-value is below the p cutoff and its signal is above the signal cutoff
/// (both strict, matching the upstream peak caller's conventions).
#[derive(Debug, Clone, Copy)]
pub struct PeakFilter {
    max_p_value: f64,
    min_signal: f64,
}

impl PeakFilter {
    pub fn new(max_p_value: f64, min_signal: f64) -> Self {
        Self {
            max_p_value,
            min_signal,
        }
    }

    pub fn passes(&self, p_value: f64, signal: f64) -> bool {
        p_value < self.max_p_value && signal > self.min_signal
    }
}

pub struct Config {
    file_a: PathBuf,
    file_b: PathBuf,
    filter_a: PeakFilter,
    filter_b: PeakFilter,
    selection: ChromSelection,
    contigs: Vec<Contig>,
    output_file: Option<PathBuf>,
    dump_prefix: Option<String>,
}

impl Config {
    pub fn new(
        file_a: PathBuf,
        file_b: PathBuf,
        filter_a: PeakFilter,
        filter_b: PeakFilter,
        selection: ChromSelection,
        output_file: Option<PathBuf>,
        dump_prefix: Option<String>,
    ) -> Self {
        let contigs = selection.contigs();
        Self {
            file_a,
            file_b,
            filter_a,
            filter_b,
            selection,
            contigs,
            output_file,
            dump_prefix,
        }
    }

    pub fn file_a(&self) -> &Path {
        &self.file_a
    }

    pub fn file_b(&self) -> &Path {
        &self.file_b
    }

    pub fn filter_a(&self) -> &PeakFilter {
        &self.filter_a
    }

    pub fn filter_b(&self) -> &PeakFilter {
        &self.filter_b
    }

    pub fn selection(&self) -> ChromSelection {
        self.selection
    }

    pub fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    pub fn dump_prefix(&self) -> Option<&str> {
        self.dump_prefix.as_deref()
    }
}
