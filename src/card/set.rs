use crate::card::types::Card;
use std::fmt;

/// Unordered set of cards as a 52-bit mask (no allocations)
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CardSet(u64);

impl CardSet {
    const FULL: u64 = (1 << Card::COUNT) - 1;

    pub fn new() -> Self {
        CardSet(0)
    }

    pub fn full_deck() -> Self {
        CardSet(Self::FULL)
    }

    pub fn contains(&self, card: Card) -> bool {
        self.0 & Self::bit(card) != 0
    }

    pub fn contains_all(&self, cards: &[Card]) -> bool {
        cards.iter().all(|c| self.contains(*c))
    }

    /// Returns false if the card was already present
    pub fn insert(&mut self, card: Card) -> bool {
        let present = self.contains(card);
        self.0 |= Self::bit(card);
        !present
    }

    /// Returns false if the card was absent
    pub fn remove(&mut self, card: Card) -> bool {
        let present = self.contains(card);
        self.0 &= !Self::bit(card);
        present
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn union(&self, other: CardSet) -> CardSet {
        CardSet(self.0 | other.0)
    }

    pub fn intersection(&self, other: CardSet) -> CardSet {
        CardSet(self.0 & other.0)
    }

    pub fn difference(&self, other: CardSet) -> CardSet {
        CardSet(self.0 & !other.0)
    }

    /// Sum of card points
    pub fn points(&self) -> i32 {
        self.iter().map(|c| c.points()).sum()
    }

    /// Cards in index order
    pub fn iter(&self) -> CardSetIter {
        CardSetIter(self.0)
    }
}

pub struct CardSetIter(u64);

impl Iterator for CardSetIter {
    type Item = Card;

    fn next(&mut self) -> Option<Card> {
        if self.0 == 0 {
            return None;
        }
        let index = self.0.trailing_zeros() as u8;
        self.0 &= self.0 - 1;
        Card::from_index(index).ok()
    }
}

impl IntoIterator for CardSet {
    type Item = Card;
    type IntoIter = CardSetIter;

    fn into_iter(self) -> CardSetIter {
        self.iter()
    }
}

impl FromIterator<Card> for CardSet {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        let mut set = CardSet::new();
        for card in iter {
            set.insert(card);
        }
        set
    }
}

impl CardSet {
    #[inline]
    fn bit(card: Card) -> u64 {
        1 << card.index()
    }
}

impl fmt::Debug for CardSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for CardSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cards: Vec<Card> = self.iter().collect();
        write!(f, "{}", Card::names(&cards))
    }
}
