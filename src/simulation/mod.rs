pub mod arena;
pub mod config;
pub mod engine;
pub mod planner;
pub mod play;
pub mod protocol;
pub mod strategy;

pub use arena::MatchTally;
pub use config::{ConfigError, MatchConfig};
pub use engine::{run_game, GameResult};
pub use planner::{Decision, Planner, PlannerConfig, SearchStats, TurnPlan};
pub use play::{Play, TurnStart};
pub use protocol::{BotSession, ProtocolError};
pub use strategy::Evaluation;
