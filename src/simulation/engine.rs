use crate::game::{advance, deal, final_scores, is_round_over, GameError};
use crate::rng::GameRng;
use crate::simulation::config::MatchConfig;
use crate::simulation::planner::{Planner, SearchStats};
use log::{debug, trace};
use serde::Serialize;

/// Result of a single round between planner bots
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameResult {
    pub seed: u64,
    /// Final score per seat: banked points minus points left in hand
    pub scores: Vec<i32>,
    /// Highest score; ties go to the lower seat
    pub winner: usize,
    /// Seat that emptied its hand, if any
    pub went_out: Option<usize>,
    pub turns: u32,
    #[serde(skip)]
    pub stats: SearchStats,
}

/// Play one round to the end with a planner in every seat
pub fn run_game(config: &MatchConfig, seed: u64) -> Result<GameResult, GameError> {
    let mut rng = GameRng::new(Some(seed));
    let mut game = deal(config.players, &mut rng)?;
    let mut planners: Vec<Planner> = (0..config.players)
        .map(|seat| Planner::new(config.seat_planner(seat)))
        .collect();

    let mut turns = 0u32;
    while turns < config.max_turns && !is_round_over(&game) {
        let seat = game.current;
        let play = planners[seat].play_turn(&mut game, &mut rng)?;
        game.check_conservation()?;
        turns += 1;
        trace!("turn {} seat {}: {}", turns, seat, play);

        if !is_round_over(&game) {
            advance(&mut game);
        }
    }

    let scores = final_scores(&game);
    let winner = winner(&scores);
    let went_out = game.players.iter().position(|p| p.hand.is_empty());
    let mut stats = SearchStats::default();
    for planner in &planners {
        stats.merge(planner.stats());
    }

    debug!(
        "seed {}: {} turns, scores {:?}, winner {}{}",
        seed,
        turns,
        scores,
        winner,
        if went_out.is_some() { " (went out)" } else { "" }
    );

    Ok(GameResult {
        seed,
        scores,
        winner,
        went_out,
        turns,
        stats,
    })
}

fn winner(scores: &[i32]) -> usize {
    let mut best = 0;
    for (seat, score) in scores.iter().enumerate() {
        if *score > scores[best] {
            best = seat;
        }
    }
    best
}
