use std::{fmt, io::BufRead, str::FromStr};

use clap::ArgMatches;
use special::Gamma;

const LEVEL_NAMES: [&str; 6] = ["error", "warn", "info", "debug", "trace", "none"];

/// LogLevel
///
/// Represents minimum level of messages that will be logged
///
#[derive(Debug, Clone, Copy)]
pub struct LogLevel {
    level: usize,
}

impl FromStr for LogLevel {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        LEVEL_NAMES
            .iter()
            .position(|x| *x == s)
            .map(|level| LogLevel { level })
            .ok_or("no match")
    }
}

impl LogLevel {
    pub fn is_none(&self) -> bool {
        self.level > 4
    }
    pub fn get_level(&self) -> usize {
        if self.level > 4 {
            0
        } else {
            self.level
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(LEVEL_NAMES.get(self.level).copied().unwrap_or("unknown"))
    }
}

/// Initialize logging from command line arguments
pub fn init_log(m: &ArgMatches) {
    let verbose = m
        .get_one::<LogLevel>("loglevel")
        .copied()
        .unwrap_or_else(|| LogLevel::from_str("info").expect("Could not set loglevel info"));
    let quiet = verbose.is_none() || m.get_flag("quiet");
    let ts = m
        .get_one::<stderrlog::Timestamp>("timestamp")
        .copied()
        .unwrap_or(stderrlog::Timestamp::Off);

    stderrlog::new()
        .quiet(quiet)
        .verbosity(verbose.get_level())
        .timestamp(ts)
        .init()
        .unwrap();
}

/// Read in next line and split on tabs after trimming white space
pub fn get_next_line<'a, R: BufRead>(
    rdr: &mut R,
    buf: &'a mut String,
) -> anyhow::Result<Option<Vec<&'a str>>> {
    buf.clear();
    if rdr.read_line(buf)? == 0 {
        Ok(None)
    } else {
        Ok(Some(buf.trim().split('\t').collect()))
    }
}

/// Result of a two-sided Fisher's exact test on a 2x2 contingency table
#[derive(Debug, Clone, Copy)]
pub struct FisherTest {
    pub p_value: f64,
    pub odds_ratio: f64,
}

fn ln_fact(n: u64) -> f64 {
    ((n + 1) as f64).ln_gamma().0
}

/// Natural log of the binomial coefficient C(n, k).  Requires k <= n.
pub fn ln_choose(n: u64, k: u64) -> f64 {
    ln_fact(n) - ln_fact(k) - ln_fact(n - k)
}

/// Two-sided Fisher's exact test for the table [[a, b], [c, d]].
///
/// The p-value sums the hypergeometric point probabilities, over all tables
/// with the observed margins, that do not exceed the probability of the
/// observed table (with the 1 + 1e-7 relative tolerance used by R and scipy).
/// Probabilities are evaluated in log space via ln-gamma for stability.
///
/// The odds ratio is the sample cross-product ratio a*d / (b*c).  Degenerate
/// tables: if only b*c is zero the ratio is +inf; if both cross products are
/// zero it is undefined and reported as NaN.  A table whose margins admit a
/// single configuration has p = 1.
pub fn fisher_exact(a: u64, b: u64, c: u64, d: u64) -> FisherTest {
    let odds_ratio = {
        let ad = (a as f64) * (d as f64);
        let bc = (b as f64) * (c as f64);
        if bc > 0.0 {
            ad / bc
        } else if ad > 0.0 {
            f64::INFINITY
        } else {
            f64::NAN
        }
    };

    let n = a + b + c + d;
    let row1 = a + b;
    let col1 = a + c;
    // Support of the upper-left cell given the margins
    let lo = col1.saturating_sub(n - row1);
    let hi = row1.min(col1);
    if n == 0 || lo == hi {
        return FisherTest {
            p_value: 1.0,
            odds_ratio,
        };
    }

    let ln_denom = ln_choose(n, col1);
    let ln_pmf = |k: u64| ln_choose(row1, k) + ln_choose(n - row1, col1 - k) - ln_denom;
    let cutoff = ln_pmf(a) + 1e-7;
    let mut p = 0.0;
    for k in lo..=hi {
        let lp = ln_pmf(k);
        if lp <= cutoff {
            p += lp.exp();
        }
    }

    FisherTest {
        p_value: p.min(1.0),
        odds_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn ln_choose_small() {
        assert!(close(ln_choose(52, 5), 2598960.0_f64.ln(), 1e-9));
        assert!(close(ln_choose(10, 0), 0.0, 1e-12));
        assert!(close(ln_choose(10, 10), 0.0, 1e-12));
    }

    #[test]
    fn fisher_reference_table() {
        // scipy.stats.fisher_exact([[8, 2], [1, 5]]) -> (20.0, 0.0349650...)
        let t = fisher_exact(8, 2, 1, 5);
        assert!(close(t.p_value, 400.0 / 11440.0, 1e-12));
        assert!(close(t.odds_ratio, 20.0, 1e-12));
    }

    #[test]
    fn fisher_symmetric_table() {
        // scipy.stats.fisher_exact([[3, 1], [1, 3]]) -> (9.0, 0.4857142...)
        let t = fisher_exact(3, 1, 1, 3);
        assert!(close(t.p_value, 34.0 / 70.0, 1e-12));
        assert!(close(t.odds_ratio, 9.0, 1e-12));
    }

    #[test]
    fn fisher_diagonal_table() {
        // scipy.stats.fisher_exact([[10, 0], [0, 10]]) -> (inf, 1.0825088e-05)
        let t = fisher_exact(10, 0, 0, 10);
        assert!(close(t.p_value, 2.0 / 184756.0, 1e-15));
        assert!(t.odds_ratio.is_infinite());
    }

    #[test]
    fn fisher_single_configuration() {
        // One margin empty: the remaining margins admit exactly one table
        let t = fisher_exact(50, 0, 0, 0);
        assert_eq!(t.p_value, 1.0);
        assert!(t.odds_ratio.is_nan());

        let t = fisher_exact(0, 0, 12, 0);
        assert_eq!(t.p_value, 1.0);
        assert!(t.odds_ratio.is_nan());
    }

    #[test]
    fn fisher_empty_table() {
        let t = fisher_exact(0, 0, 0, 0);
        assert_eq!(t.p_value, 1.0);
        assert!(t.odds_ratio.is_nan());
    }

    #[test]
    fn fisher_infinite_odds() {
        let t = fisher_exact(5, 0, 2, 3);
        assert!(t.odds_ratio.is_infinite());
        assert!(t.p_value > 0.0 && t.p_value <= 1.0);
    }
}
