use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::GameError;
use crate::oracle::ollama::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub coach: CoachConfig,
    #[serde(default)]
    pub chaos: ChaosConfig,
    #[serde(default)]
    pub eval: EvalConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 8,
        }
    }
}

impl OracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Minimum gap between two orchestration passes for one room
    pub cooldown_secs: f64,
    /// No agent acts before the round is this old
    pub min_round_age_secs: f64,
    /// Chaos is never selected before the round is this old
    pub chaos_min_round_age_secs: f64,
    /// A design unchanged this long counts as stuck
    pub stuck_after_secs: f64,
    /// Minimum gap between two hints to the same player
    pub coach_cooldown_secs: f64,
    /// Fraction of required components a player must cover before chaos
    pub chaos_min_coverage: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 3.0,
            min_round_age_secs: 10.0,
            chaos_min_round_age_secs: 25.0,
            stuck_after_secs: 15.0,
            coach_cooldown_secs: 20.0,
            chaos_min_coverage: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    /// Missing fraction above which a gap counts as critical
    pub critical_missing_ratio: f64,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            critical_missing_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosConfig {
    pub max_retries: u8,
    pub min_description_len: usize,
    /// Minimum gap between two chaos events in a room
    pub cooldown_secs: f64,
    /// The chaos agent's own warm-up, checked alongside the orchestrator's
    pub warmup_secs: f64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            min_description_len: 20,
            cooldown_secs: 60.0,
            warmup_secs: 25.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub max_revisions: u8,
    /// Allowed analysis-length ratio between the two players
    pub imbalance_ratio: f64,
    /// `versus` texts shorter than this without concrete names are abstract
    pub min_versus_len: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_revisions: 2,
            imbalance_ratio: 2.0,
            min_versus_len: 40,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = EngineConfig::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::from_file(&config_path)
    }

    /// Load configuration from an explicit file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: EngineConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml_string).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;

        Ok(home.join(".archduel").join("config.toml"))
    }

    /// Reject values that would disable a guard or loop forever
    pub fn validate(&self) -> std::result::Result<(), GameError> {
        let o = &self.orchestrator;
        let timings = [
            ("orchestrator.cooldown_secs", o.cooldown_secs),
            ("orchestrator.min_round_age_secs", o.min_round_age_secs),
            ("orchestrator.chaos_min_round_age_secs", o.chaos_min_round_age_secs),
            ("orchestrator.stuck_after_secs", o.stuck_after_secs),
            ("orchestrator.coach_cooldown_secs", o.coach_cooldown_secs),
            ("chaos.cooldown_secs", self.chaos.cooldown_secs),
            ("chaos.warmup_secs", self.chaos.warmup_secs),
        ];
        if let Some((name, value)) = timings.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(GameError::ConfigError(format!("{name} must be a non-negative number, got {value}")));
        }

        if !(0.0..=1.0).contains(&o.chaos_min_coverage) {
            return Err(GameError::ConfigError(format!(
                "orchestrator.chaos_min_coverage must be within 0..=1, got {}",
                o.chaos_min_coverage
            )));
        }
        if !(0.0..1.0).contains(&self.coach.critical_missing_ratio) {
            return Err(GameError::ConfigError(format!(
                "coach.critical_missing_ratio must be within 0..1, got {}",
                self.coach.critical_missing_ratio
            )));
        }
        if self.eval.imbalance_ratio < 1.0 {
            return Err(GameError::ConfigError(format!(
                "eval.imbalance_ratio must be at least 1, got {}",
                self.eval.imbalance_ratio
            )));
        }

        Ok(())
    }
}
