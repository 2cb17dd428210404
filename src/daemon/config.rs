use chrono::TimeDelta;

pub const DEFAULT_IDLE_THRESHOLD_SECS: u32 = 5 * 60;
pub const DEFAULT_ACCRUAL_PERIOD_SECS: u32 = 30;
pub const DEFAULT_SITE: &str = "leetcode.com";
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Two accepted submissions of the same problem closer than this are the same submission.
pub const DUPLICATE_SUBMISSION_WINDOW_MS: i64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub idle_threshold_secs: u32,
    pub accrual_period: TimeDelta,
    pub duplicate_window: TimeDelta,
    /// Host of the monitored site. Subdomains count too.
    pub site: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            idle_threshold_secs: DEFAULT_IDLE_THRESHOLD_SECS,
            accrual_period: TimeDelta::seconds(DEFAULT_ACCRUAL_PERIOD_SECS.into()),
            duplicate_window: TimeDelta::milliseconds(DUPLICATE_SUBMISSION_WINDOW_MS),
            site: DEFAULT_SITE.into(),
        }
    }
}

impl TrackerConfig {
    pub fn is_monitored_url(&self, url: &str) -> bool {
        let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
        let authority = without_scheme
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();
        let host = authority
            .rsplit_once('@')
            .map_or(authority, |(_, host)| host)
            .split(':')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let site = self.site.to_ascii_lowercase();

        host == site || host.ends_with(&format!(".{site}"))
    }
}

#[cfg(test)]
mod tests {
    use super::TrackerConfig;

    #[test]
    fn test_monitored_urls() {
        let config = TrackerConfig::default();
        assert!(config.is_monitored_url("https://leetcode.com/problems/two-sum/"));
        assert!(config.is_monitored_url("https://www.LeetCode.com"));
        assert!(config.is_monitored_url("leetcode.com:443/problemset"));
        assert!(!config.is_monitored_url("https://example.com/?next=leetcode.com"));
        assert!(!config.is_monitored_url("https://notleetcode.com/"));
        assert!(!config.is_monitored_url("chrome://newtab/"));
    }
}
