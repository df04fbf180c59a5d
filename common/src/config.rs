use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which data-access provider backs generation and persistence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process canned responses and in-memory storage.
    Stub,
    #[default]
    FastApi,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stub" | "dummy" | "dev" => Ok(BackendKind::Stub),
            "fastapi" | "http" => Ok(BackendKind::FastApi),
            other => Err(anyhow!("unknown backend '{other}' (expected 'stub' or 'fastapi')")),
        }
    }
}

/// Deck configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    pub backend: BackendKind,
    pub api_base_url: String,
    pub user_email: String,
    pub language: String,
    pub tone: String,
    pub num_slides: usize,
    /// Minimum spacing between published UI updates.
    pub frame_interval_ms: u64,
    /// Delay between pieces emitted by the stub backend.
    pub stub_delay_ms: u64,
    pub log_path: Option<PathBuf>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::FastApi,
            api_base_url: "http://localhost:8000/api".to_string(),
            user_email: "test@example.com".to_string(),
            language: "English".to_string(),
            tone: "professional".to_string(),
            num_slides: 6,
            frame_interval_ms: 16,
            stub_delay_ms: 15,
            log_path: None,
        }
    }
}

impl DeckConfig {
    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Cannot find config directory"))?
            .join("deck");
        Ok(config_dir.join("config.json"))
    }

    /// Load configuration from the default location, falling back to defaults.
    pub async fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path).await
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: DeckConfig = serde_json::from_str(&content)
                .map_err(|e| anyhow!("invalid config {}: {e}", path.display()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Apply `DECK_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(backend) = get("DECK_BACKEND") {
            self.backend = backend.parse()?;
        }
        if let Some(url) = get("DECK_API_URL") {
            self.api_base_url = url;
        }
        if let Some(email) = get("DECK_USER_EMAIL") {
            self.user_email = email;
        }
        if let Some(path) = get("DECK_LOG_PATH") {
            self.log_path = Some(PathBuf::from(path));
        }
        if let Some(delay) = get("DECK_STUB_DELAY_MS") {
            self.stub_delay_ms = delay
                .trim()
                .parse()
                .map_err(|e| anyhow!("DECK_STUB_DELAY_MS: {e}"))?;
        }
        Ok(())
    }
}
