use crate::card::Card;
use crate::game::HAND_SIZE;
use crate::simulation::planner::PlannerConfig;
use crate::simulation::strategy::Evaluation;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_MAX_TURNS: u32 = 500;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid config JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Settings for a batch of games
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub players: usize,
    /// Evaluation per seat. Seats past the end use `planner.evaluation`.
    pub strategies: Vec<Evaluation>,
    pub planner: PlannerConfig,
    /// Rounds stop here even if nobody went out and the draw pile lasts
    pub max_turns: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            players: 2,
            strategies: Vec::new(),
            planner: PlannerConfig::default(),
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

impl MatchConfig {
    /// Load a JSON config file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: MatchConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.players < 2 {
            return Err(ConfigError::Invalid(format!(
                "at least two players are required, got {}",
                self.players
            )));
        }
        if self.players * HAND_SIZE + 1 > Card::COUNT {
            return Err(ConfigError::Invalid(format!(
                "{} players cannot be dealt from one deck",
                self.players
            )));
        }
        if self.strategies.len() > self.players {
            return Err(ConfigError::Invalid(format!(
                "{} strategies for {} players",
                self.strategies.len(),
                self.players
            )));
        }
        if self.max_turns == 0 {
            return Err(ConfigError::Invalid("max_turns must be positive".to_string()));
        }
        Ok(())
    }

    /// Planner settings for one seat
    pub fn seat_planner(&self, seat: usize) -> PlannerConfig {
        PlannerConfig {
            evaluation: self.strategies.get(seat).copied().unwrap_or(self.planner.evaluation),
            ..self.planner
        }
    }
}
