use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::animator::AnimationConfig;
use crate::fetcher::{FetchOptions, DEFAULT_MAX_CONCURRENCY};
use crate::poller::{PollOptions, DEFAULT_POLL_INTERVAL, MAX_RETRIES};
use crate::ranking::TieBreak;
use crate::soop::DEFAULT_API_BASE;
use crate::target::DEFAULT_POST_HOST;

const DEFAULT_ENV_PREFIX: &str = "SOOPUP";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_post_host")]
    pub post_host: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            post_host: default_post_host(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_user_agent() -> String {
    format!("soopup/{} (+https://github.com/soopup/soopup)", crate::VERSION)
}

fn default_post_host() -> String {
    DEFAULT_POST_HOST.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollConfig {
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            retries: default_retries(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_retries() -> u32 {
    1
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RankingConfig {
    #[serde(default)]
    pub tie_break: TieBreak,
}

impl Config {
    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: self.poll.interval,
            retries: self.poll.retries,
            fetch: FetchOptions {
                max_concurrency: self.poll.max_concurrency,
                tie_break: self.ranking.tie_break,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        let from_file = read_config_file(path)?;
        cfg = merge_config(cfg, from_file);
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.api.base_url.is_empty() {
        base.api.base_url = other.api.base_url;
    }
    if !other.api.user_agent.is_empty() {
        base.api.user_agent = other.api.user_agent;
    }
    if !other.api.post_host.is_empty() {
        base.api.post_host = other.api.post_host;
    }
    if !other.api.timeout.is_zero() {
        base.api.timeout = other.api.timeout;
    }

    if !other.poll.interval.is_zero() {
        base.poll.interval = other.poll.interval;
    }
    base.poll.retries = other.poll.retries.min(MAX_RETRIES);
    if other.poll.max_concurrency != 0 {
        base.poll.max_concurrency = other.poll.max_concurrency;
    }

    base.ranking.tie_break = other.ranking.tie_break;
    base.animation = other.animation;

    base
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "api.base_url" => cfg.api.base_url = value,
        "api.user_agent" => cfg.api.user_agent = value,
        "api.post_host" => cfg.api.post_host = value,
        "api.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.api.timeout = duration;
            }
        }
        "poll.interval" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                if !duration.is_zero() {
                    cfg.poll.interval = duration;
                }
            }
        }
        "poll.retries" => {
            if let Ok(parsed) = value.parse::<u32>() {
                cfg.poll.retries = parsed.min(MAX_RETRIES);
            }
        }
        "poll.max_concurrency" => {
            if let Ok(parsed) = value.parse::<usize>() {
                if parsed != 0 {
                    cfg.poll.max_concurrency = parsed;
                }
            }
        }
        "ranking.tie_break" => {
            if let Some(tie_break) = TieBreak::from_key(&value) {
                cfg.ranking.tie_break = tie_break;
            }
        }
        "animation.value_duration" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.animation.value_duration = duration;
            }
        }
        "animation.move_duration" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.animation.move_duration = duration;
            }
        }
        "animation.follow_window" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.animation.follow_window = duration;
            }
        }
        "animation.follow_damping" => {
            if let Ok(parsed) = value.parse::<f64>() {
                cfg.animation.follow_damping = parsed;
            }
        }
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("soopup").join("config.yaml"))
}
