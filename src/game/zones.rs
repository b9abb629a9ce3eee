use crate::card::{Card, CardSet};
use std::fmt;

/// Ordered stack of cards. The top is the end of the vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pile {
    cards: Vec<Card>,
}

impl Pile {
    pub fn new() -> Self {
        Pile { cards: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Pile { cards: Vec::with_capacity(cap) }
    }

    /// Build from bottom to top
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Pile { cards }
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn pop(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn top(&self) -> Option<Card> {
        self.cards.last().copied()
    }

    /// Remove the top `n` cards as one run, returned bottom to top
    /// (element 0 is the deepest card taken)
    pub fn take_top(&mut self, n: usize) -> Option<Vec<Card>> {
        if n > self.cards.len() {
            return None;
        }
        Some(self.cards.split_off(self.cards.len() - n))
    }

    pub fn extend(&mut self, cards: &[Card]) {
        self.cards.extend_from_slice(cards);
    }

    pub fn position(&self, card: Card) -> Option<usize> {
        self.cards.iter().position(|c| *c == card)
    }

    pub fn swap(&mut self, i: usize, j: usize) {
        self.cards.swap(i, j);
    }

    pub fn replace(&mut self, index: usize, card: Card) -> Card {
        std::mem::replace(&mut self.cards[index], card)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card_set(&self) -> CardSet {
        self.cards.iter().copied().collect()
    }
}

impl fmt::Display for Pile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Card::names(&self.cards))
    }
}

/// A seat at the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub index: usize,
    pub hand: CardSet,
    /// Banked from melds played
    pub points: i32,
}

impl Player {
    pub fn new(index: usize) -> Self {
        Player {
            index,
            hand: CardSet::new(),
            points: 0,
        }
    }

    /// Banked points minus the penalty for cards still held
    pub fn score(&self) -> i32 {
        self.points - self.hand.points()
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player {}: {} ({} pts)", self.index, self.hand, self.points)
    }
}
