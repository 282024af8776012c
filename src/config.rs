// src/config.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

const ENV_PATH: &str = "PARLIAMENT_CONFIG_PATH";

/// Base URLs of the upstream services. Overridable so tests and mirrors can
/// point the whole client elsewhere.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub members_api: String,
    pub bills_api: String,
    pub commons_votes_api: String,
    pub lords_votes_api: String,
    pub bills_rss: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            members_api: "https://members-api.parliament.uk/api".into(),
            bills_api: "https://bills-api.parliament.uk/api/v1".into(),
            commons_votes_api: "https://commonsvotes-api.parliament.uk/data".into(),
            lords_votes_api: "https://lordsvotes-api.parliament.uk/data".into(),
            bills_rss: "https://bills-api.parliament.uk/Rss".into(),
        }
    }
}

impl Endpoints {
    pub fn aggregate_bills_feed(&self) -> String {
        format!("{}/allbills.rss", self.bills_rss)
    }

    pub fn bill_feed(&self, bill_id: u32) -> String {
        format!("{}/Bills/{}.rss", self.bills_rss, bill_id)
    }
}

/// TTL and capacity per entity cache. Volatile data (search results) expires
/// faster than slow-moving data (voting history).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub member_ttl_secs: u64,
    pub member_capacity: usize,
    pub bill_ttl_secs: u64,
    pub bill_capacity: usize,
    pub bill_search_ttl_secs: u64,
    pub bill_search_capacity: usize,
    pub division_ttl_secs: u64,
    pub division_capacity: usize,
    pub division_search_ttl_secs: u64,
    pub division_search_capacity: usize,
    pub voting_history_ttl_secs: u64,
    pub voting_history_capacity: usize,
    pub election_result_ttl_secs: u64,
    pub election_result_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            member_ttl_secs: 600,
            member_capacity: 90,
            bill_ttl_secs: 300,
            bill_capacity: 30,
            bill_search_ttl_secs: 180,
            bill_search_capacity: 90,
            division_ttl_secs: 600,
            division_capacity: 90,
            division_search_ttl_secs: 300,
            division_search_capacity: 90,
            voting_history_ttl_secs: 3600,
            voting_history_capacity: 90,
            election_result_ttl_secs: 600,
            election_result_capacity: 90,
        }
    }
}

/// Tuning for the polling subsystem.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Seconds between poll cycles.
    pub poll_interval_secs: u64,
    /// Items fetched per page on paginated REST endpoints.
    pub page_size: usize,
    /// Historical publications fetched per bill on the first cycle.
    pub publication_fetch_limit: usize,
    /// Most-recent divisions inspected per house per cycle.
    pub division_search_limit: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            page_size: 20,
            publication_fetch_limit: 10,
            division_search_limit: 10,
        }
    }
}

impl TrackerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoints: Endpoints,
    pub caches: CacheConfig,
    pub tracker: TrackerConfig,
}

impl Config {
    /// Load configuration with the usual precedence:
    /// 1) $PARLIAMENT_CONFIG_PATH
    /// 2) config/parliament.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        dotenvy::dotenv().ok();
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("PARLIAMENT_CONFIG_PATH points to non-existent path"));
        }
        let default_p = PathBuf::from("config/parliament.toml");
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config from {}", path.display()))?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_public_hosts() {
        let cfg = Config::default();
        assert!(cfg.endpoints.members_api.starts_with("https://members-api"));
        assert_eq!(cfg.tracker.poll_interval_secs, 30);
        assert_eq!(cfg.tracker.page_size, 20);
    }

    #[test]
    fn feed_urls_are_derived_from_rss_root() {
        let eps = Endpoints::default();
        assert_eq!(
            eps.aggregate_bills_feed(),
            "https://bills-api.parliament.uk/Rss/allbills.rss"
        );
        assert_eq!(
            eps.bill_feed(3141),
            "https://bills-api.parliament.uk/Rss/Bills/3141.rss"
        );
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let toml = r#"
            [tracker]
            poll_interval_secs = 5

            [caches]
            bill_search_ttl_secs = 60
        "#;
        let cfg: Config = toml::from_str(toml).unwrap();
        assert_eq!(cfg.tracker.poll_interval_secs, 5);
        assert_eq!(cfg.tracker.page_size, 20);
        assert_eq!(cfg.caches.bill_search_ttl_secs, 60);
        assert_eq!(cfg.caches.member_ttl_secs, 600);
    }

    #[serial_test::serial]
    #[test]
    fn env_path_wins_over_defaults() {
        std::env::remove_var(ENV_PATH);
        let cfg = Config::load_default().unwrap();
        assert_eq!(cfg.tracker.poll_interval_secs, 30);

        let path = std::env::temp_dir().join("parliament_tracker_config_test.toml");
        std::fs::write(&path, "[tracker]\npoll_interval_secs = 7\n").unwrap();
        std::env::set_var(ENV_PATH, &path);
        let cfg = Config::load_default().unwrap();
        assert_eq!(cfg.tracker.poll_interval_secs, 7);

        std::env::set_var(ENV_PATH, "/nonexistent/parliament.toml");
        assert!(Config::load_default().is_err());

        std::env::remove_var(ENV_PATH);
        std::fs::remove_file(&path).ok();
    }
}
