use mdp_env::{Continous, DEFAULT_ABSORBING_STATE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Mode {
    /// Monte-Carlo control on observed rollout lengths.
    ModelFree,
    /// Online transition estimates plus value iteration.
    #[default]
    ModelBased,
}

/// Run configuration. Every field has a default so a partial TOML file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub mode: Mode,
    pub total_episodes: usize,
    pub exploit_ratio: Continous,
    pub epsilon: Continous,
    pub exploration: Continous,
    pub gamma: Continous,
    pub max_iterations: usize,
    /// Estimate assigned to an edge whose match ratio is 0. Larger values
    /// keep unlikely edges in play longer and slow convergence towards the
    /// true probabilities, smaller ones settle faster but can starve
    /// exploration of rarely matched edges.
    pub probability_floor: Continous,
    pub absorbing_state_name: String,
    pub seed: Option<u64>,
    /// Caps a single episode. `None` relies on every state reaching the
    /// absorbing state with positive probability.
    pub max_episode_steps: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            total_episodes: 2000,
            exploit_ratio: 0.5,
            epsilon: 0.002,
            exploration: 0.2,
            gamma: 0.5,
            max_iterations: 3000,
            probability_floor: 0.33,
            absorbing_state_name: DEFAULT_ABSORBING_STATE.to_string(),
            seed: None,
            max_episode_steps: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelFreeParams {
    pub total_episodes: usize,
    pub exploit_ratio: Continous,
    pub max_episode_steps: Option<usize>,
}

impl Default for ModelFreeParams {
    fn default() -> Self {
        Config::default().model_free()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelBasedParams {
    pub max_iterations: usize,
    pub exploration: Continous,
    pub gamma: Continous,
    pub epsilon: Continous,
    pub probability_floor: Continous,
    pub max_episode_steps: Option<usize>,
}

impl Default for ModelBasedParams {
    fn default() -> Self {
        Config::default().model_based()
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg = toml::from_str::<Self>(text)?;
        cfg.validate()?;

        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid {
                field,
                reason: reason.into(),
            })
        }

        if self.total_episodes == 0 {
            return invalid("total_episodes", "must be positive");
        }
        if !(0. ..=1.).contains(&self.exploit_ratio) {
            return invalid("exploit_ratio", "must be in [0, 1]");
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.) {
            return invalid("epsilon", "must be a positive number");
        }
        if !(0. ..=1.).contains(&self.exploration) {
            return invalid("exploration", "must be in [0, 1]");
        }
        if !(self.gamma > 0. && self.gamma <= 1.) {
            return invalid("gamma", "must be in (0, 1]");
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations", "must be positive");
        }
        if !(self.probability_floor > 0. && self.probability_floor < 1.) {
            return invalid("probability_floor", "must be in (0, 1)");
        }
        if self.absorbing_state_name.trim().is_empty() {
            return invalid("absorbing_state_name", "must not be empty");
        }
        if self.max_episode_steps == Some(0) {
            return invalid("max_episode_steps", "must be positive when set");
        }

        Ok(())
    }

    pub fn model_free(&self) -> ModelFreeParams {
        ModelFreeParams {
            total_episodes: self.total_episodes,
            exploit_ratio: self.exploit_ratio,
            max_episode_steps: self.max_episode_steps,
        }
    }

    pub fn model_based(&self) -> ModelBasedParams {
        ModelBasedParams {
            max_iterations: self.max_iterations,
            exploration: self.exploration,
            gamma: self.gamma,
            epsilon: self.epsilon,
            probability_floor: self.probability_floor,
            max_episode_steps: self.max_episode_steps,
        }
    }
}
