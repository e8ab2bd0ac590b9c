use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::cli::ProviderKind;
use crate::errors::{Result, WebmindError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderKind,
    pub model: String,
    /// Overrides the provider's default endpoint.
    pub api_base: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub bind: String,
    pub out_dir: String,
    pub limits: TokenLimits,
    pub progress: ProgressConfig,
}

/// Fixed ceilings for calls that carry no user instruction to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenLimits {
    pub markup: u32,
    pub stylesheet: u32,
    pub script: u32,
    pub improve_text: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub sections: Vec<String>,
    pub fast_interval_ms: u64,
    pub warmup_ms: u64,
    pub steady_interval_ms: u64,
    pub grace_ms: u64,
    pub hard_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Together,
            model: "deepseek-ai/DeepSeek-R1-Distill-Llama-70B-free".into(),
            api_base: None,
            timeout_secs: 300,
            temperature: 0.7,
            bind: "0.0.0.0:3001".into(),
            out_dir: ".webmind".into(),
            limits: TokenLimits::default(),
            progress: ProgressConfig::default(),
        }
    }
}

impl Default for TokenLimits {
    fn default() -> Self {
        Self { markup: 6500, stylesheet: 3000, script: 2000, improve_text: 1000 }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            sections: ["Header", "Hero", "Features", "Pricing", "Banner", "FAQ", "Footer"]
                .into_iter()
                .map(String::from)
                .collect(),
            fast_interval_ms: 500,
            warmup_ms: 3_000,
            steady_interval_ms: 1_000,
            grace_ms: 1_000,
            hard_timeout_ms: 15_000,
        }
    }
}

impl ProgressConfig {
    pub fn fast_interval(&self) -> Duration {
        Duration::from_millis(self.fast_interval_ms.max(1))
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn steady_interval(&self) -> Duration {
        Duration::from_millis(self.steady_interval_ms.max(1))
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn hard_timeout(&self) -> Duration {
        Duration::from_millis(self.hard_timeout_ms)
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| WebmindError::Config(e.to_string()))
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(p) = lookup("WEBMIND_PROVIDER") {
            self.provider = ProviderKind::parse(&p)
                .ok_or_else(|| WebmindError::Config(format!("unknown provider '{p}'")))?;
        }
        if let Some(m) = lookup("WEBMIND_MODEL") {
            self.model = m;
        }
        if let Some(base) = lookup("WEBMIND_API_BASE") {
            self.api_base = Some(base);
        }
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| WebmindError::Config(format!("PORT is not a port number: '{port}'")))?;
            let host = self.bind.rsplit_once(':').map(|(h, _)| h).unwrap_or("0.0.0.0");
            self.bind = format!("{host}:{port}");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let l = &self.limits;
        if l.markup == 0 || l.stylesheet == 0 || l.script == 0 || l.improve_text == 0 {
            return Err(WebmindError::Config("token limits must be greater than zero".into()));
        }
        if self.progress.sections.is_empty() {
            return Err(WebmindError::Config("progress.sections must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(WebmindError::Config(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        Ok(())
    }
}
