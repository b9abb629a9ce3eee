use crate::simulation::engine::GameResult;
use serde::Serialize;
use std::fmt;

/// Running totals per seat over many rounds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchTally {
    pub games: usize,
    pub totals: Vec<i64>,
    pub wins: Vec<usize>,
    pub went_out: Vec<usize>,
    pub turns: u64,
}

impl MatchTally {
    pub fn new(players: usize) -> Self {
        MatchTally {
            games: 0,
            totals: vec![0; players],
            wins: vec![0; players],
            went_out: vec![0; players],
            turns: 0,
        }
    }

    pub fn players(&self) -> usize {
        self.totals.len()
    }

    pub fn record(&mut self, result: &GameResult) {
        self.games += 1;
        self.turns += result.turns as u64;
        for (total, score) in self.totals.iter_mut().zip(&result.scores) {
            *total += *score as i64;
        }
        if let Some(wins) = self.wins.get_mut(result.winner) {
            *wins += 1;
        }
        if let Some(seat) = result.went_out.and_then(|seat| self.went_out.get_mut(seat)) {
            *seat += 1;
        }
    }

    /// Combine two tallies over the same seats
    pub fn merge(mut self, other: MatchTally) -> MatchTally {
        self.games += other.games;
        self.turns += other.turns;
        for (a, b) in self.totals.iter_mut().zip(other.totals) {
            *a += b;
        }
        for (a, b) in self.wins.iter_mut().zip(other.wins) {
            *a += b;
        }
        for (a, b) in self.went_out.iter_mut().zip(other.went_out) {
            *a += b;
        }
        self
    }

    pub fn average_score(&self, seat: usize) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.totals.get(seat).copied().unwrap_or(0) as f64 / self.games as f64
    }

    pub fn win_rate(&self, seat: usize) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.wins.get(seat).copied().unwrap_or(0) as f64 / self.games as f64
    }

    pub fn average_turns(&self) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.turns as f64 / self.games as f64
    }
}

impl fmt::Display for MatchTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Games: {}  (avg {:.1} turns)", self.games, self.average_turns())?;
        for seat in 0..self.players() {
            writeln!(
                f,
                "  Seat {}: avg score {:>7.2}  wins {:>5} ({:>5.1}%)  went out {}",
                seat,
                self.average_score(seat),
                self.wins[seat],
                self.win_rate(seat) * 100.0,
                self.went_out[seat]
            )?;
        }
        Ok(())
    }
}
