use crate::card::{Meld, MeldSet};
use crate::game::GameError;
use std::fmt;

/// Melds currently laid down
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    melds: MeldSet,
}

impl Table {
    pub fn new() -> Self {
        Table { melds: MeldSet::new() }
    }

    /// Three-card melds are always playable; a single-card extension
    /// needs one of its parent melds on the table.
    pub fn can_play(&self, meld: &Meld) -> bool {
        !meld.kind.is_single() || meld.parents.iter().any(|id| self.melds.contains(*id))
    }

    pub fn contains(&self, meld: &Meld) -> bool {
        self.melds.contains(meld.id)
    }

    pub fn play(&mut self, meld: &Meld) -> Result<(), GameError> {
        if !self.can_play(meld) {
            return Err(GameError::IllegalPlay(meld.to_string()));
        }
        self.melds.insert(meld.id);
        Ok(())
    }

    pub fn unplay(&mut self, meld: &Meld) {
        self.melds.remove(meld.id);
    }

    pub fn melds(&self) -> impl Iterator<Item = &'static Meld> + '_ {
        self.melds.iter()
    }

    pub fn len(&self) -> usize {
        self.melds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.melds.is_empty()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let melds: Vec<String> = self.melds().map(|m| m.to_string()).collect();
        write!(f, "{}", melds.join(" "))
    }
}
