use crate::game::Game;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the planner scores a finished turn for the acting player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Evaluation {
    /// Banked points minus the points still in hand
    #[default]
    Baseline,
    /// Baseline, plus the average hand points of the other players when
    /// the hand is empty
    GoingOutBonus,
}

impl Evaluation {
    pub fn evaluate(&self, game: &Game, player: usize) -> f64 {
        let me = &game.players[player];
        let baseline = (me.points - me.hand.points()) as f64;
        match self {
            Evaluation::Baseline => baseline,
            Evaluation::GoingOutBonus if me.hand.is_empty() => baseline + going_out_bonus(game, player),
            Evaluation::GoingOutBonus => baseline,
        }
    }
}

fn going_out_bonus(game: &Game, player: usize) -> f64 {
    let others: Vec<i32> = game
        .players
        .iter()
        .filter(|p| p.index != player)
        .map(|p| p.hand.points())
        .collect();
    if others.is_empty() {
        return 0.0;
    }
    others.iter().sum::<i32>() as f64 / others.len() as f64
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Baseline => write!(f, "baseline"),
            Evaluation::GoingOutBonus => write!(f, "going-out-bonus"),
        }
    }
}
