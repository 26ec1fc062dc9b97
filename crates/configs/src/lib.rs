use std::path::PathBuf;

use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "namerator.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Location of the shared document in the hosted repository.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default = "default_document_path")]
    pub path: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            owner: String::new(),
            repo: String::new(),
            path: default_document_path(),
            branch: None,
            commit_message: default_commit_message(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CredentialMode {
    /// Token comes from the config file or `NAMERATOR_TOKEN`.
    #[default]
    Static,
    /// Token saved in the local cache by `sign-in`.
    Oauth,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: CredentialMode,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self { Self { path: default_cache_path() } }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self { Self { interval_secs: default_sync_interval() } }
}

fn default_api_base() -> String { "https://api.github.com".into() }
fn default_document_path() -> String { "names.json".into() }
fn default_commit_message() -> String { "Update business data".into() }
fn default_user_agent() -> String { format!("namerator/{}", env!("CARGO_PKG_VERSION")) }
fn default_timeout() -> u64 { 30 }
fn default_cache_path() -> PathBuf { PathBuf::from("data/namerator-cache.json") }
fn default_sync_interval() -> u64 { 60 }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load the config file if present, otherwise start from defaults,
    /// then apply environment overrides and validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_missing_file(&e) => AppConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        // 先用环境变量补齐，再做校验
        self.remote.normalize_from_env();
        self.auth.normalize_from_env();
        self.remote.validate()?;
        if self.sync.interval_secs == 0 {
            return Err(anyhow!("sync.interval_secs must be >= 1"));
        }
        if self.cache.path.as_os_str().is_empty() {
            self.cache.path = default_cache_path();
        }
        Ok(())
    }
}

fn is_missing_file(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

impl RemoteConfig {
    pub fn normalize_from_env(&mut self) {
        if self.owner.trim().is_empty() {
            if let Ok(owner) = std::env::var("NAMERATOR_OWNER") {
                self.owner = owner;
            }
        }
        if self.repo.trim().is_empty() {
            if let Ok(repo) = std::env::var("NAMERATOR_REPO") {
                self.repo = repo;
            }
        }
        self.api_base = self.api_base.trim_end_matches('/').to_string();
        self.path = self.path.trim_start_matches('/').to_string();
        if self.branch.as_deref().is_some_and(|b| b.trim().is_empty()) {
            self.branch = None;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.owner.trim().is_empty() || self.repo.trim().is_empty() {
            return Err(anyhow!(
                "remote.owner/remote.repo are empty; set them in the config file or NAMERATOR_OWNER/NAMERATOR_REPO"
            ));
        }
        if self.path.is_empty() {
            return Err(anyhow!("remote.path must name a file"));
        }
        let lower = self.api_base.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("remote.api_base must start with http:// or https://"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("remote.timeout_secs must be a positive number of seconds"));
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn normalize_from_env(&mut self) {
        // 配置文件中未提供 token 时，尝试从环境变量读取
        if self.token.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            self.token = std::env::var("NAMERATOR_TOKEN").ok().filter(|t| !t.trim().is_empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_file_with_defaults() -> Result<()> {
        let mut cfg = parse(
            r#"
            [remote]
            owner = "dumbross"
            repo = "namerator-data"
            api_base = "https://api.github.com/"
            path = "/names.json"
            "#,
        )?;
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.remote.api_base, "https://api.github.com");
        assert_eq!(cfg.remote.path, "names.json");
        assert_eq!(cfg.remote.commit_message, "Update business data");
        assert_eq!(cfg.auth.mode, CredentialMode::Static);
        assert_eq!(cfg.sync.interval_secs, 60);
        assert_eq!(cfg.cache.path, PathBuf::from("data/namerator-cache.json"));
        Ok(())
    }

    #[test]
    fn oauth_mode_and_branch() -> Result<()> {
        let cfg = parse(
            r#"
            [remote]
            owner = "o"
            repo = "r"
            branch = "data"
            [auth]
            mode = "oauth"
            [sync]
            interval_secs = 5
            "#,
        )?;
        assert_eq!(cfg.auth.mode, CredentialMode::Oauth);
        assert_eq!(cfg.remote.branch.as_deref(), Some("data"));
        assert_eq!(cfg.sync.interval_secs, 5);
        Ok(())
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = parse("[remote]\nowner = \"o\"\nrepo = \"r\"\napi_base = \"ftp://x\"").unwrap();
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = parse("[remote]\nowner = \"o\"\nrepo = \"r\"\n[sync]\ninterval_secs = 0").unwrap();
        assert!(cfg.normalize_and_validate().is_err());
    }
}
