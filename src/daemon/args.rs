use std::path::PathBuf;

use chrono::TimeDelta;
use clap::Parser;
use tracing::level_filters::LevelFilter;

use super::config::{
    TrackerConfig, DEFAULT_ACCRUAL_PERIOD_SECS, DEFAULT_API_URL, DEFAULT_IDLE_THRESHOLD_SECS,
    DEFAULT_SITE, DUPLICATE_SUBMISSION_WINDOW_MS,
};

/// Tracks time on the practice site. Messages from the browser arrive on stdin, replies are
/// written to stdout.
#[derive(Parser, Debug, Clone)]
pub struct DaemonArgs {
    /// Data directory. Holds the local record mirror and logs.
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Root of the stats api.
    #[arg(long, env = "LEETTRACK_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
    #[arg(long, default_value_t = DEFAULT_IDLE_THRESHOLD_SECS,
        value_parser = clap::value_parser!(u32).range(1..))]
    pub idle_threshold_secs: u32,
    #[arg(long, default_value_t = DEFAULT_ACCRUAL_PERIOD_SECS,
        value_parser = clap::value_parser!(u32).range(1..))]
    pub accrual_period_secs: u32,
    /// Monitored host, subdomains included.
    #[arg(long, default_value = DEFAULT_SITE)]
    pub site: String,
    /// Keep records on this machine only.
    #[arg(long)]
    pub offline: bool,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}

impl DaemonArgs {
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            idle_threshold_secs: self.idle_threshold_secs,
            accrual_period: TimeDelta::seconds(self.accrual_period_secs.into()),
            duplicate_window: TimeDelta::milliseconds(DUPLICATE_SUBMISSION_WINDOW_MS),
            site: self.site.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use clap::Parser;

    use crate::daemon::config::TrackerConfig;

    use super::DaemonArgs;

    #[test]
    fn test_defaults_match_tracker_config() {
        let args = DaemonArgs::parse_from(["leettrack-daemon"]);
        assert_eq!(args.tracker_config(), TrackerConfig::default());
        assert!(!args.offline);
    }

    #[test]
    fn test_overrides() {
        let args = DaemonArgs::parse_from([
            "leettrack-daemon",
            "--idle-threshold-secs",
            "60",
            "--accrual-period-secs",
            "5",
            "--site",
            "leetcode.cn",
            "--offline",
        ]);
        let config = args.tracker_config();
        assert_eq!(config.idle_threshold_secs, 60);
        assert_eq!(config.accrual_period, TimeDelta::seconds(5));
        assert_eq!(config.site, "leetcode.cn");
        assert!(args.offline);

        assert!(DaemonArgs::try_parse_from(["leettrack-daemon", "--accrual-period-secs", "0"])
            .is_err());
    }
}
