use std::path::PathBuf;

use clap::{
    crate_description, crate_name, crate_version, value_parser, Arg, ArgAction, Command,
};

use utils::{init_log, LogLevel};

use crate::config::{ChromSelection, Config, PeakFilter};

/// Set up definition of command options for clap
fn cli_model() -> Command {
    Command::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .arg(
            Arg::new("timestamp")
                .short('X')
                .long("timestamp")
                .value_parser(value_parser!(stderrlog::Timestamp))
                .value_name("GRANULARITY")
                .default_value("none")
                .help("Prepend log entries with a timestamp"),
        )
        .arg(
            Arg::new("loglevel")
                .short('l')
                .long("loglevel")
                .value_name("LOGLEVEL")
                .value_parser(value_parser!(LogLevel))
                .ignore_case(true)
                .default_value("warn")
                .help("Set log level"),
        )
        .arg(
            Arg::new("quiet")
                .action(ArgAction::SetTrue)
                .long("quiet")
                .conflicts_with("loglevel")
                .help("Silence all output"),
        )
        .arg(
            Arg::new("file_a")
                .short('A')
                .long("file-a")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .required(true)
                .help("First gappedPeak file"),
        )
        .arg(
            Arg::new("file_b")
                .short('B')
                .long("file-b")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .required(true)
                .help("Second gappedPeak file"),
        )
        .arg(
            Arg::new("pval_a")
                .long("pval-a")
                .value_parser(value_parser!(f64))
                .value_name("FLOAT")
                .default_value("0.05")
                .help("p-value cutoff for file A (significant if p < cutoff)"),
        )
        .arg(
            Arg::new("pval_b")
                .long("pval-b")
                .value_parser(value_parser!(f64))
                .value_name("FLOAT")
                .default_value("0.05")
                .help("p-value cutoff for file B (significant if p < cutoff)"),
        )
        .arg(
            Arg::new("signal_a")
                .long("signal-a")
                .value_parser(value_parser!(f64))
                .value_name("FLOAT")
                .default_value("1")
                .help("Signal cutoff for file A (significant if signal > cutoff; 0 gives the signal-only legacy filter)"),
        )
        .arg(
            Arg::new("signal_b")
                .long("signal-b")
                .value_parser(value_parser!(f64))
                .value_name("FLOAT")
                .default_value("1")
                .help("Signal cutoff for file B (significant if signal > cutoff; 0 gives the signal-only legacy filter)"),
        )
        .arg(
            Arg::new("chromosomes")
                .short('c')
                .long("chromosomes")
                .value_parser(value_parser!(ChromSelection))
                .value_name("SET")
                .default_value("A")
                .help("Chromosomes to analyze: A (autosomes), AS (+ sex), ASM (+ sex and mito)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output-file")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .help("Set output file [default: <stdout>]"),
        )
        .arg(
            Arg::new("dump_prefix")
                .long("dump-prefix")
                .value_parser(value_parser!(String))
                .value_name("STRING")
                .help("Write per-file universe (.uni) and significant (.sig) interval dumps with this prefix"),
        )
}

/// Handle command line options.  Set up Config structure
pub fn handle_cli() -> anyhow::Result<Config> {
    // Get matches from command line
    let m = cli_model().get_matches();

    // Setup logging
    init_log(&m);

    debug!("Processing command line options");

    let file_a = m
        .get_one::<PathBuf>("file_a")
        .expect("Missing input file A")
        .clone();
    let file_b = m
        .get_one::<PathBuf>("file_b")
        .expect("Missing input file B")
        .clone();

    let filter_a = PeakFilter::new(
        *m.get_one::<f64>("pval_a").expect("Missing p-value cutoff A"),
        *m.get_one::<f64>("signal_a").expect("Missing signal cutoff A"),
    );
    let filter_b = PeakFilter::new(
        *m.get_one::<f64>("pval_b").expect("Missing p-value cutoff B"),
        *m.get_one::<f64>("signal_b").expect("Missing signal cutoff B"),
    );

    let selection = *m
        .get_one::<ChromSelection>("chromosomes")
        .expect("Missing chromosome selection");

    let output = m.get_one::<PathBuf>("output").map(|p| p.to_owned());
    let dump_prefix = m.get_one::<String>("dump_prefix").map(|s| s.to_owned());

    debug!(
        "Comparing {} and {} over chromosome set {}",
        file_a.display(),
        file_b.display(),
        selection
    );

    Ok(Config::new(
        file_a,
        file_b,
        filter_a,
        filter_b,
        selection,
        output,
        dump_prefix,
    ))
}
