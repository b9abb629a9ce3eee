use crate::card::{Card, CardSet, Meld};
use crate::game::table::Table;
use crate::game::zones::{Pile, Player};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Illegal play: {0}")]
    IllegalPlay(String),
    #[error("Card {card} is not in player {player}'s hand")]
    NotInHand { card: Card, player: usize },
    #[error("The {0} pile is empty")]
    EmptyPile(&'static str),
    #[error("Cannot take {requested} cards from a discard pile of {available}")]
    TakeTooMany { requested: usize, available: usize },
    #[error("At least two players are required, got {0}")]
    NotEnoughPlayers(usize),
    #[error("Too many players for one deck: {0}")]
    TooManyPlayers(usize),
    #[error("No player {0}")]
    NoSuchPlayer(usize),
    #[error("Card {0} is not hidden and cannot be moved")]
    NotHidden(Card),
    #[error("Card conservation violated: {0}")]
    Conservation(String),
}

/// Where a hidden card came from before it was moved to the top of the
/// draw pile, so the move can be undone exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    /// Already on top
    InPlace,
    /// Swapped with the top card of the draw pile
    DrawPile(usize),
    /// Swapped with the top card of the draw pile, which went to this hand
    Hand { player: usize, replacement: Card },
}

/// One round of rummy, either the real one or a hypothetical variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub draw_pile: Pile,
    pub discard_pile: Pile,
    /// Every card that has ever been discarded. Cards taken back out of the
    /// discard pile stay publicly known.
    pub discarded: CardSet,
    pub table: Table,
    pub players: Vec<Player>,
    pub current: usize,
}

impl Game {
    /// Empty game with no cards placed anywhere
    pub fn new(num_players: usize) -> Result<Self, GameError> {
        if num_players < 2 {
            return Err(GameError::NotEnoughPlayers(num_players));
        }
        Ok(Game {
            draw_pile: Pile::with_capacity(Card::COUNT),
            discard_pile: Pile::with_capacity(Card::COUNT),
            discarded: CardSet::new(),
            table: Table::new(),
            players: (0..num_players).map(Player::new).collect(),
            current: 0,
        })
    }

    /// Game with fixed hands and discard pile (bottom to top). Every other
    /// card goes to the draw pile in deck order.
    pub fn with_hands(hands: Vec<CardSet>, discard: &[Card]) -> Result<Self, GameError> {
        let mut game = Game::new(hands.len())?;
        let mut placed = CardSet::new();
        for (player, hand) in game.players.iter_mut().zip(hands) {
            if !placed.intersection(hand).is_empty() {
                return Err(GameError::Conservation(format!("{} dealt twice", hand)));
            }
            placed = placed.union(hand);
            player.hand = hand;
        }
        for card in discard {
            if !placed.insert(*card) {
                return Err(GameError::Conservation(format!("{} dealt twice", card)));
            }
            game.discard_pile.push(*card);
            game.discarded.insert(*card);
        }
        for card in CardSet::full_deck().difference(placed) {
            game.draw_pile.push(card);
        }
        Ok(game)
    }

    pub fn current_player(&self) -> &Player {
        &self.players[self.current]
    }

    pub fn current_player_mut(&mut self) -> &mut Player {
        &mut self.players[self.current]
    }

    pub fn player(&self, index: usize) -> Result<&Player, GameError> {
        self.players.get(index).ok_or(GameError::NoSuchPlayer(index))
    }

    /// Move the top `n` discards into the current hand. Returned bottom to
    /// top, so element 0 is the deepest card taken.
    pub fn take_cards(&mut self, n: usize) -> Result<Vec<Card>, GameError> {
        let available = self.discard_pile.len();
        let taken = self
            .discard_pile
            .take_top(n)
            .ok_or(GameError::TakeTooMany { requested: n, available })?;
        let hand = &mut self.current_player_mut().hand;
        for card in &taken {
            hand.insert(*card);
        }
        Ok(taken)
    }

    pub fn untake_cards(&mut self, cards: &[Card]) -> Result<(), GameError> {
        self.require_in_hand(cards)?;
        let hand = &mut self.current_player_mut().hand;
        for card in cards {
            hand.remove(*card);
        }
        self.discard_pile.extend(cards);
        Ok(())
    }

    pub fn draw_card(&mut self) -> Result<Card, GameError> {
        let card = self.draw_pile.pop().ok_or(GameError::EmptyPile("draw"))?;
        self.current_player_mut().hand.insert(card);
        Ok(card)
    }

    pub fn undraw_card(&mut self, card: Card) -> Result<(), GameError> {
        self.require_in_hand(&[card])?;
        self.current_player_mut().hand.remove(card);
        self.draw_pile.push(card);
        Ok(())
    }

    /// Lay a meld from the current hand onto the table and bank its points
    pub fn put_meld(&mut self, meld: &Meld) -> Result<(), GameError> {
        if self.table.contains(meld) {
            return Err(GameError::IllegalPlay(format!("{} is already on the table", meld)));
        }
        self.require_in_hand(&meld.cards)?;
        self.table.play(meld)?;
        let player = self.current_player_mut();
        for card in &meld.cards {
            player.hand.remove(*card);
        }
        player.points += meld.points;
        Ok(())
    }

    pub fn unput_meld(&mut self, meld: &Meld) -> Result<(), GameError> {
        if !self.table.contains(meld) {
            return Err(GameError::IllegalPlay(format!("{} is not on the table", meld)));
        }
        self.table.unplay(meld);
        let player = self.current_player_mut();
        for card in &meld.cards {
            player.hand.insert(*card);
        }
        player.points -= meld.points;
        Ok(())
    }

    /// Returns whether the card had already been discarded at some point,
    /// which `undiscard` needs to restore the history.
    pub fn discard(&mut self, card: Card) -> Result<bool, GameError> {
        self.require_in_hand(&[card])?;
        self.current_player_mut().hand.remove(card);
        self.discard_pile.push(card);
        Ok(!self.discarded.insert(card))
    }

    pub fn undiscard(&mut self, previously_discarded: bool) -> Result<Card, GameError> {
        let card = self.discard_pile.pop().ok_or(GameError::EmptyPile("discard"))?;
        if !previously_discarded {
            self.discarded.remove(card);
        }
        self.current_player_mut().hand.insert(card);
        Ok(card)
    }

    /// Take `n` discards, run `f`, then put them back whatever `f` returned
    pub fn with_taken<T, F>(&mut self, n: usize, f: F) -> Result<T, GameError>
    where
        F: FnOnce(&mut Game, &[Card]) -> Result<T, GameError>,
    {
        let taken = self.take_cards(n)?;
        let result = f(self, &taken);
        self.untake_cards(&taken)?;
        result
    }

    pub fn with_drawn<T, F>(&mut self, f: F) -> Result<T, GameError>
    where
        F: FnOnce(&mut Game, Card) -> Result<T, GameError>,
    {
        let card = self.draw_card()?;
        let result = f(self, card);
        self.undraw_card(card)?;
        result
    }

    pub fn with_meld<T, F>(&mut self, meld: &Meld, f: F) -> Result<T, GameError>
    where
        F: FnOnce(&mut Game) -> Result<T, GameError>,
    {
        self.put_meld(meld)?;
        let result = f(self);
        self.unput_meld(meld)?;
        result
    }

    pub fn with_discard<T, F>(&mut self, card: Card, f: F) -> Result<T, GameError>
    where
        F: FnOnce(&mut Game) -> Result<T, GameError>,
    {
        let previously_discarded = self.discard(card)?;
        let result = f(self);
        self.undiscard(previously_discarded)?;
        result
    }

    /// Put a hidden card on top of the draw pile, run `f`, then move it back
    pub fn with_on_draw_top<T, F>(&mut self, card: Card, observer: usize, f: F) -> Result<T, GameError>
    where
        F: FnOnce(&mut Game) -> Result<T, GameError>,
    {
        let relocation = self.relocate_to_draw_top(card, observer)?;
        let result = f(self);
        self.restore_relocation(card, relocation)?;
        result
    }

    /// Cards `observer` cannot see: the draw pile plus cards in other hands
    /// that were never discarded.
    pub fn hidden_from(&self, observer: usize) -> CardSet {
        let mut hidden = self.draw_pile.card_set();
        for player in self.players.iter().filter(|p| p.index != observer) {
            hidden = hidden.union(player.hand.difference(self.discarded));
        }
        hidden
    }

    /// Swap a card hidden from `observer` onto the top of the draw pile.
    pub fn relocate_to_draw_top(&mut self, card: Card, observer: usize) -> Result<Relocation, GameError> {
        if !self.hidden_from(observer).contains(card) {
            return Err(GameError::NotHidden(card));
        }
        let top = self.draw_pile.len().checked_sub(1).ok_or(GameError::EmptyPile("draw"))?;
        if let Some(index) = self.draw_pile.position(card) {
            if index == top {
                return Ok(Relocation::InPlace);
            }
            self.draw_pile.swap(index, top);
            return Ok(Relocation::DrawPile(index));
        }

        let player = self
            .players
            .iter()
            .position(|p| p.hand.contains(card))
            .ok_or(GameError::NotHidden(card))?;
        let replacement = self.draw_pile.replace(top, card);
        let hand = &mut self.players[player].hand;
        hand.remove(card);
        hand.insert(replacement);
        Ok(Relocation::Hand { player, replacement })
    }

    pub fn restore_relocation(&mut self, card: Card, relocation: Relocation) -> Result<(), GameError> {
        let top = self.draw_pile.len().checked_sub(1).ok_or(GameError::EmptyPile("draw"))?;
        match relocation {
            Relocation::InPlace => {}
            Relocation::DrawPile(index) => self.draw_pile.swap(index, top),
            Relocation::Hand { player, replacement } => {
                self.draw_pile.replace(top, replacement);
                let hand = &mut self.players[player].hand;
                hand.remove(replacement);
                hand.insert(card);
            }
        }
        Ok(())
    }

    /// Make sure `player` holds `card`, swapping it with one of their hidden
    /// cards if the card is currently hidden elsewhere. Used to reconcile a
    /// belief state when another player shows a card. Cards in `shown` are
    /// being shown together with `card` and are never swapped out.
    pub fn reveal(&mut self, player: usize, card: Card, observer: usize, shown: CardSet) -> Result<(), GameError> {
        self.player(player)?;
        if self.players[player].hand.contains(card) {
            return Ok(());
        }
        if player == observer || !self.hidden_from(observer).contains(card) {
            return Err(GameError::NotInHand { card, player });
        }
        let swap = self.players[player]
            .hand
            .difference(self.discarded)
            .difference(shown)
            .iter()
            .next()
            .ok_or(GameError::NotInHand { card, player })?;

        if let Some(index) = self.draw_pile.position(card) {
            self.draw_pile.replace(index, swap);
        } else {
            let holder = self
                .players
                .iter()
                .position(|p| p.hand.contains(card))
                .ok_or(GameError::NotHidden(card))?;
            self.players[holder].hand.remove(card);
            self.players[holder].hand.insert(swap);
        }
        let hand = &mut self.players[player].hand;
        hand.remove(swap);
        hand.insert(card);
        Ok(())
    }

    /// Union of every zone
    pub fn all_cards(&self) -> CardSet {
        let mut all = self.draw_pile.card_set().union(self.discard_pile.card_set());
        for player in &self.players {
            all = all.union(player.hand);
        }
        for meld in self.table.melds() {
            all = all.union(meld.card_set());
        }
        all
    }

    /// Every card exactly once across draw pile, discard pile, hands and table
    pub fn check_conservation(&self) -> Result<(), GameError> {
        let count = self.draw_pile.len()
            + self.discard_pile.len()
            + self.players.iter().map(|p| p.hand.len()).sum::<usize>()
            + self.table.melds().map(|m| m.cards.len()).sum::<usize>();
        let all = self.all_cards();
        if count != Card::COUNT || all != CardSet::full_deck() {
            return Err(GameError::Conservation(format!(
                "{} cards placed, missing {}",
                count,
                CardSet::full_deck().difference(all)
            )));
        }
        Ok(())
    }

    fn require_in_hand(&self, cards: &[Card]) -> Result<(), GameError> {
        let player = self.current_player();
        match cards.iter().find(|c| !player.hand.contains(**c)) {
            Some(card) => Err(GameError::NotInHand { card: *card, player: player.index }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Player {}/{}", self.current, self.players.len())?;
        for player in &self.players {
            writeln!(f, "{}", player)?;
        }
        writeln!(f, "Draw pile: {}", self.draw_pile)?;
        writeln!(f, "Discard pile: {}", self.discard_pile)?;
        write!(f, "Table: {}", self.table)
    }
}
