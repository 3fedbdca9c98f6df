//! Environment-variable defaults for the CLI. Flags given on the command
//! line take precedence over these.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Where schedules and infeasibility artifacts land.
    pub results_dir: PathBuf,
    /// LP-format dump of the built model, if requested.
    pub dump_lp: Option<PathBuf>,
    /// Solve budget in seconds.
    pub time_limit: Option<f64>,
}

impl Config {
    pub fn from_env() -> Config {
        Config {
            results_dir: std::env::var_os("YARDSCHED_RESULTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("results")),
            dump_lp: std::env::var_os("YARDSCHED_DUMP_LP").map(PathBuf::from),
            time_limit: std::env::var("YARDSCHED_TIME_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }
}
