use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CardError {
    #[error("Card not found: {0}")]
    UnknownCard(String),
    #[error("Card index out of range: {0}")]
    InvalidIndex(u8),
}

/// Suits in deck order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    pub fn to_char(&self) -> char {
        match self {
            Suit::Clubs => 'C',
            Suit::Diamonds => 'D',
            Suit::Hearts => 'H',
            Suit::Spades => 'S',
        }
    }

    pub fn from_char(c: char) -> Option<Suit> {
        Suit::ALL.into_iter().find(|s| s.to_char() == c)
    }
}

/// Ranks from two up to the ace. Aces rank high except as the bottom of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    pub fn to_char(&self) -> char {
        b"23456789TJQKA"[*self as usize] as char
    }

    pub fn from_char(c: char) -> Option<Rank> {
        Rank::ALL.into_iter().find(|r| r.to_char() == c)
    }

    /// Penalty in hand, credit on the table
    pub fn points(&self) -> i32 {
        match self {
            Rank::Ace => 15,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
            _ => 5,
        }
    }
}

/// One of the 52 cards. Index = suit * 13 + rank.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Card(u8);

impl Card {
    pub const COUNT: usize = 52;

    pub fn new(rank: Rank, suit: Suit) -> Self {
        Card(suit as u8 * 13 + rank as u8)
    }

    pub fn from_index(index: u8) -> Result<Self, CardError> {
        if (index as usize) < Card::COUNT {
            Ok(Card(index))
        } else {
            Err(CardError::InvalidIndex(index))
        }
    }

    /// All 52 cards in index order
    pub fn deck() -> impl Iterator<Item = Card> {
        (0..Card::COUNT as u8).map(Card)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn suit(&self) -> Suit {
        Suit::ALL[self.index() / 13]
    }

    pub fn rank(&self) -> Rank {
        Rank::ALL[self.index() % 13]
    }

    pub fn points(&self) -> i32 {
        self.rank().points()
    }

    pub fn is_ace(&self) -> bool {
        self.rank() == Rank::Ace
    }

    /// Same suit, one rank down; the two wraps to the ace
    pub fn prev_in_suit(&self) -> Card {
        let base = self.0 - self.0 % 13;
        Card(base + (self.0 % 13 + 12) % 13)
    }

    /// Same suit, one rank up; the ace wraps to the two
    pub fn next_in_suit(&self) -> Card {
        let base = self.0 - self.0 % 13;
        Card(base + (self.0 % 13 + 1) % 13)
    }

    /// Same rank, previous suit (cyclic)
    pub fn prev_of_rank(&self) -> Card {
        Card((self.0 + 39) % 52)
    }

    /// Same rank, next suit (cyclic)
    pub fn next_of_rank(&self) -> Card {
        Card((self.0 + 13) % 52)
    }

    /// Same rank, the suit two steps away
    pub fn opposite_of_rank(&self) -> Card {
        Card((self.0 + 26) % 52)
    }

    pub fn name(&self) -> String {
        format!("{}{}", self.rank().to_char(), self.suit().to_char())
    }

    pub fn names(cards: &[Card]) -> String {
        cards.iter().map(Card::name).collect::<Vec<_>>().join(" ")
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank().to_char(), self.suit().to_char())
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Card {
    type Err = CardError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let mut chars = name.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(r), Some(s), None) => match (Rank::from_char(r), Suit::from_char(s)) {
                (Some(rank), Some(suit)) => Ok(Card::new(rank, suit)),
                _ => Err(CardError::UnknownCard(name.to_string())),
            },
            _ => Err(CardError::UnknownCard(name.to_string())),
        }
    }
}

impl From<Card> for String {
    fn from(card: Card) -> String {
        card.name()
    }
}

impl TryFrom<String> for Card {
    type Error = CardError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}
