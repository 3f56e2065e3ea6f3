// src/config.rs
//! Explicit configuration, built once in `main` from the environment and
//! passed by reference; no other module reads ambient env state.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

// --- env names & defaults ---
pub const ENV_TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const ENV_FEED_URLS: &str = "EEW_FEED_URLS";
pub const ENV_POLL_INTERVAL_SECS: &str = "EEW_POLL_INTERVAL_SECS";
pub const ENV_STATE_FILE: &str = "EEW_STATE_FILE";
pub const ENV_KEYWORDS_PATH: &str = "EEW_KEYWORDS_PATH";
pub const ENV_RUN_ONCE: &str = "EEW_RUN_ONCE";
pub const ENV_GIT_MIRROR: &str = "EEW_GIT_MIRROR";

/// High-frequency earthquake/volcano feed.
pub const DEFAULT_FEED_URL: &str = "https://www.data.jma.go.jp/developer/xml/feed/eqvol.xml";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_STATE_FILE: &str = "./seen_ids.json";

/// Titles of EEW-class reports contain one of these.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "緊急地震速報（予報",
    "緊急地震速報（警報",
    "緊急地震速報（地震動予報",
];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub feed_urls: Vec<String>,
    pub poll_interval: Duration,
    pub state_path: PathBuf,
    pub keywords: Vec<String>,
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub run_once: bool,
    pub git_mirror: bool,
}

impl AppConfig {
    /// Missing credentials are fatal here, at startup; everything else has
    /// a default.
    pub fn from_env() -> Result<Self> {
        let telegram_token = require_env(ENV_TELEGRAM_TOKEN)?;
        let telegram_chat_id = require_env(ENV_TELEGRAM_CHAT_ID)?;

        let feed_urls = std::env::var(ENV_FEED_URLS)
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|urls| !urls.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_FEED_URL.to_string()]);

        let poll_secs = std::env::var(ENV_POLL_INTERVAL_SECS)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
            .max(1);

        let state_path = std::env::var(ENV_STATE_FILE)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATE_FILE));

        Ok(Self {
            feed_urls,
            poll_interval: Duration::from_secs(poll_secs),
            state_path,
            keywords: load_keywords_default()?,
            telegram_token,
            telegram_chat_id,
            run_once: env_flag(ENV_RUN_ONCE),
            git_mirror: env_flag(ENV_GIT_MIRROR),
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    let value = std::env::var(name)
        .map_err(|_| anyhow!("{name} must be set"))?
        .trim()
        .to_string();
    if value.is_empty() {
        return Err(anyhow!("{name} must not be empty"));
    }
    Ok(value)
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name)
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "1" | "true" | "yes"
    )
}

/// Load the keyword set from an explicit path. Supports TOML or JSON formats.
pub fn load_keywords_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading keywords from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let keywords = parse_keywords(&content, ext.as_str())?;
    if keywords.is_empty() {
        return Err(anyhow!("keyword set in {} is empty", path.display()));
    }
    Ok(keywords)
}

/// Load keywords using env var + fallbacks:
/// 1) $EEW_KEYWORDS_PATH
/// 2) config/keywords.toml
/// 3) config/keywords.json
/// 4) built-in EEW keyword set
pub fn load_keywords_default() -> Result<Vec<String>> {
    if let Ok(p) = std::env::var(ENV_KEYWORDS_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_keywords_from(&pb);
        } else {
            return Err(anyhow!("EEW_KEYWORDS_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/keywords.toml");
    if toml_p.exists() {
        return load_keywords_from(&toml_p);
    }
    let json_p = PathBuf::from("config/keywords.json");
    if json_p.exists() {
        return load_keywords_from(&json_p);
    }
    Ok(DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect())
}

fn parse_keywords(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    // Try TOML first if hinted or content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains("keywords");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    // Try JSON array
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    // Fallback: also try TOML if not attempted
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported keywords format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlKw {
        keywords: Vec<String>,
    }
    let v: TomlKw = toml::from_str(s)?;
    Ok(clean_list(v.keywords))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() {
            set.insert(t.to_string());
        }
    }
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_trim_and_formats_work() {
        let toml = r#"keywords = [" 緊急地震速報（警報 ", "", "緊急地震速報（予報", "緊急地震速報（予報"]"#;
        let json = r#"["緊急地震速報", "  津波警報  ", ""]"#;
        let toml_out = parse_toml(toml).unwrap();
        assert_eq!(
            toml_out,
            vec!["緊急地震速報（予報".to_string(), "緊急地震速報（警報".to_string()]
        );
        let json_out = parse_json(json).unwrap();
        assert_eq!(json_out, vec!["津波警報".to_string(), "緊急地震速報".to_string()]);
    }

    #[test]
    fn flag_parsing_accepts_common_truthy_values() {
        std::env::remove_var("EEW_TEST_FLAG");
        assert!(!env_flag("EEW_TEST_FLAG"));
        std::env::set_var("EEW_TEST_FLAG", "1");
        assert!(env_flag("EEW_TEST_FLAG"));
        std::env::set_var("EEW_TEST_FLAG", "True");
        assert!(env_flag("EEW_TEST_FLAG"));
        std::env::set_var("EEW_TEST_FLAG", "off");
        assert!(!env_flag("EEW_TEST_FLAG"));
        std::env::remove_var("EEW_TEST_FLAG");
    }
}
