use crate::card::{Card, Meld};
use crate::game::{Game, GameError};
use std::fmt;

/// How a turn begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStart {
    /// Take this many cards off the top of the discard pile
    Take(usize),
    /// Draw blind; the card is the identity the plan was made for
    Draw(Card),
}

/// A complete turn: how it starts, the melds laid and the final discard.
/// `discard` is None only when the melds empty the hand.
#[derive(Debug, Clone, PartialEq)]
pub struct Play {
    pub start: TurnStart,
    pub melds: Vec<&'static Meld>,
    pub discard: Option<Card>,
    pub evaluation: f64,
}

impl Play {
    pub fn goes_out(&self) -> bool {
        self.discard.is_none()
    }

    /// Lay the melds and discard on the live game. The turn start must
    /// already have been applied.
    pub fn apply_after_start(&self, game: &mut Game) -> Result<(), GameError> {
        for meld in &self.melds {
            game.put_meld(meld)?;
        }
        if let Some(card) = self.discard {
            game.discard(card)?;
        }
        Ok(())
    }

    /// Protocol lines for the melds and discard, in play order
    pub fn command_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .melds
            .iter()
            .map(|meld| {
                let verb = if meld.kind.is_run() { "run" } else { "set" };
                format!("{} {}", verb, Card::names(&meld.cards))
            })
            .collect();
        if let Some(card) = self.discard {
            lines.push(format!("discard {}", card));
        }
        lines
    }
}

impl fmt::Display for Play {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            TurnStart::Take(n) => write!(f, "take {}", n)?,
            TurnStart::Draw(card) => write!(f, "draw {}", card)?,
        }
        for meld in &self.melds {
            write!(f, ", meld {}", meld)?;
        }
        match self.discard {
            Some(card) => write!(f, ", discard {}", card)?,
            None => write!(f, ", out")?,
        }
        write!(f, " ({:.1})", self.evaluation)
    }
}
