//! Meld catalog.
//!
//! Every meld that can ever reach the table is built once, up front: the
//! three-card sets and runs centred on each card, plus the single-card
//! extensions that may be laid off onto them. Each meld records the
//! extensions it admits (edges) and the melds it extends (parents), so the
//! planner only ever looks melds up by card instead of generating shapes.
//!
//! Run extensions are directional. A card laid off above a run can only be
//! extended further up, a card laid off below only further down, which keeps
//! the extension graph acyclic.

use crate::card::set::CardSet;
use crate::card::types::{Card, Rank};
use crate::game::GameError;
use std::fmt;
use std::sync::LazyLock;

/// Adjustment for an ace played low (A-2-3)
pub const LOW_ACE_ADJUSTMENT: i32 = -10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeldKind {
    /// Three cards of one rank
    TripleSet,
    /// Three consecutive cards of one suit
    TripleRun,
    /// The fourth card of a rank, added to a triple set
    SetExtension,
    /// One card added to the top of a run
    RunAbove,
    /// One card added to the bottom of a run
    RunBelow,
}

impl MeldKind {
    pub fn is_run(&self) -> bool {
        matches!(self, MeldKind::TripleRun | MeldKind::RunAbove | MeldKind::RunBelow)
    }

    pub fn is_single(&self) -> bool {
        matches!(self, MeldKind::SetExtension | MeldKind::RunAbove | MeldKind::RunBelow)
    }
}

/// Dense identifier of a catalog meld
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeldId(pub u16);

#[derive(Debug)]
pub struct Meld {
    pub id: MeldId,
    pub kind: MeldKind,
    /// Low to high for runs
    pub cards: Vec<Card>,
    pub points: i32,
    pub extensions: Vec<MeldId>,
    pub parents: Vec<MeldId>,
}

impl Meld {
    /// Look up a meld by id in the global catalog
    pub fn get(id: MeldId) -> &'static Meld {
        &CATALOG.melds[id.0 as usize]
    }

    pub fn card_set(&self) -> CardSet {
        self.cards.iter().copied().collect()
    }

    pub fn extensions(&self) -> impl Iterator<Item = &'static Meld> + '_ {
        self.extensions.iter().map(|id| Meld::get(*id))
    }

    /// Decompose a group of three or more cards laid down at once (as
    /// announced by another player) into catalog melds: one triple followed
    /// by single extensions. A lone set card is its set extension. Shorter
    /// runs are lay-offs whose direction depends on the table; see
    /// [`MeldCatalog::run_singles`].
    ///
    /// Runs are ordered by rank. An ace below a two counts as low.
    pub fn find(is_run: bool, cards: &[Card]) -> Result<Vec<&'static Meld>, GameError> {
        let illegal = || GameError::IllegalPlay(Card::names(cards));

        let mut sorted = cards.to_vec();
        sorted.sort_by_key(|c| (c.rank(), c.suit()));
        sorted.dedup();
        if sorted.len() != cards.len() || sorted.is_empty() {
            return Err(illegal());
        }

        if !is_run {
            let rank = sorted[0].rank();
            if sorted.iter().any(|c| c.rank() != rank) {
                return Err(illegal());
            }
            return match sorted.len() {
                1 => Ok(vec![catalog().set_extension(sorted[0])]),
                3 => Ok(vec![catalog().triple_set_of(&sorted).ok_or_else(illegal)?]),
                4 => {
                    // The first card's triple leaves out its opposite suit.
                    let triple = catalog().triple_set(sorted[0]);
                    let extension = catalog().set_extension(sorted[0].opposite_of_rank());
                    Ok(vec![triple, extension])
                }
                _ => Err(illegal()),
            };
        }

        if sorted.len() < 3 {
            return Err(illegal());
        }
        // Aces sort high; move the ace to the bottom if the run starts at two.
        if sorted[sorted.len() - 1].is_ace() && sorted[0].rank() == Rank::Two {
            sorted.rotate_right(1);
        }
        let suit = sorted[0].suit();
        let consecutive = sorted
            .windows(2)
            .all(|w| w[1].suit() == suit && w[0].next_in_suit() == w[1]);
        if !consecutive {
            return Err(illegal());
        }

        let mut melds = vec![catalog().triple_run(sorted[1]).ok_or_else(illegal)?];
        for card in &sorted[3..] {
            melds.push(catalog().run_above(*card).ok_or_else(illegal)?);
        }
        Ok(melds)
    }
}

impl PartialEq for Meld {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Meld {}

impl fmt::Display for Meld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}: {} pts]", Card::names(&self.cards), self.points)
    }
}

/// The precomputed meld graph
pub struct MeldCatalog {
    melds: Vec<Meld>,
    triple_set: [MeldId; Card::COUNT],
    triple_run: [Option<MeldId>; Card::COUNT],
    set_extension: [MeldId; Card::COUNT],
    run_above: [Option<MeldId>; Card::COUNT],
    run_below: [Option<MeldId>; Card::COUNT],
}

static CATALOG: LazyLock<MeldCatalog> = LazyLock::new(MeldCatalog::build);

/// The process-wide catalog
pub fn catalog() -> &'static MeldCatalog {
    &CATALOG
}

impl MeldCatalog {
    fn build() -> Self {
        let mut melds: Vec<Meld> = Vec::new();
        let mut push = |kind: MeldKind, cards: Vec<Card>, adjustment: i32| {
            let id = MeldId(melds.len() as u16);
            let points = cards.iter().map(|c| c.points()).sum::<i32>() + adjustment;
            melds.push(Meld {
                id,
                kind,
                cards,
                points,
                extensions: Vec::new(),
                parents: Vec::new(),
            });
            id
        };

        let mut triple_set = [MeldId(0); Card::COUNT];
        let mut set_extension = [MeldId(0); Card::COUNT];
        let mut triple_run = [None; Card::COUNT];
        let mut run_above = [None; Card::COUNT];
        let mut run_below = [None; Card::COUNT];

        for card in Card::deck() {
            triple_set[card.index()] = push(
                MeldKind::TripleSet,
                vec![card.prev_of_rank(), card, card.next_of_rank()],
                0,
            );
            set_extension[card.index()] = push(MeldKind::SetExtension, vec![card], 0);
        }

        for card in Card::deck() {
            if !card.is_ace() {
                let low = card.prev_in_suit();
                let adjustment = if low.is_ace() { LOW_ACE_ADJUSTMENT } else { 0 };
                triple_run[card.index()] = Some(push(
                    MeldKind::TripleRun,
                    vec![low, card, card.next_in_suit()],
                    adjustment,
                ));
            }
            // Lowest run top is a three, so a card above one is at least a four.
            if card.rank() >= Rank::Four {
                run_above[card.index()] = Some(push(MeldKind::RunAbove, vec![card], 0));
            }
            // Highest run bottom is a queen; a low ace sits below a two.
            if card.rank() <= Rank::Jack {
                run_below[card.index()] = Some(push(MeldKind::RunBelow, vec![card], 0));
            } else if card.is_ace() {
                run_below[card.index()] =
                    Some(push(MeldKind::RunBelow, vec![card], LOW_ACE_ADJUSTMENT));
            }
        }

        let mut edges: Vec<(MeldId, MeldId)> = Vec::new();
        for card in Card::deck() {
            edges.push((
                triple_set[card.index()],
                set_extension[card.opposite_of_rank().index()],
            ));

            if let Some(run) = triple_run[card.index()] {
                let low = card.prev_in_suit();
                let high = card.next_in_suit();
                if !low.is_ace() {
                    if let Some(below) = run_below[low.prev_in_suit().index()] {
                        edges.push((run, below));
                    }
                }
                if !high.is_ace() {
                    if let Some(above) = run_above[high.next_in_suit().index()] {
                        edges.push((run, above));
                    }
                }
            }

            if !card.is_ace() {
                if let (Some(from), Some(to)) =
                    (run_above[card.index()], run_above[card.next_in_suit().index()])
                {
                    edges.push((from, to));
                }
                if let (Some(from), Some(to)) =
                    (run_below[card.index()], run_below[card.prev_in_suit().index()])
                {
                    edges.push((from, to));
                }
            }
        }

        for (from, to) in edges {
            melds[from.0 as usize].extensions.push(to);
            melds[to.0 as usize].parents.push(from);
        }

        MeldCatalog {
            melds,
            triple_set,
            triple_run,
            set_extension,
            run_above,
            run_below,
        }
    }

    pub fn len(&self) -> usize {
        self.melds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.melds.is_empty()
    }

    pub fn melds(&self) -> impl Iterator<Item = &Meld> {
        self.melds.iter()
    }

    /// The set of this card and its two neighbouring suits
    pub fn triple_set(&self, card: Card) -> &Meld {
        &self.melds[self.triple_set[card.index()].0 as usize]
    }

    /// The run centred on this card; None for aces
    pub fn triple_run(&self, card: Card) -> Option<&Meld> {
        self.triple_run[card.index()].map(|id| &self.melds[id.0 as usize])
    }

    pub fn set_extension(&self, card: Card) -> &Meld {
        &self.melds[self.set_extension[card.index()].0 as usize]
    }

    pub fn run_above(&self, card: Card) -> Option<&Meld> {
        self.run_above[card.index()].map(|id| &self.melds[id.0 as usize])
    }

    pub fn run_below(&self, card: Card) -> Option<&Meld> {
        self.run_below[card.index()].map(|id| &self.melds[id.0 as usize])
    }

    /// Every catalog meld keyed on this card, in a fixed order:
    /// triple set, triple run, set extension, run above, run below.
    /// Each meld is keyed on exactly one card.
    pub fn melds_keyed_on(&self, card: Card) -> impl Iterator<Item = &Meld> {
        [
            Some(self.triple_set(card)),
            self.triple_run(card),
            Some(self.set_extension(card)),
            self.run_above(card),
            self.run_below(card),
        ]
        .into_iter()
        .flatten()
    }

    /// The single-card run lay-offs a card could be, above first
    pub fn run_singles(&self, card: Card) -> impl Iterator<Item = &Meld> {
        [self.run_above(card), self.run_below(card)].into_iter().flatten()
    }

    fn triple_set_of(&self, cards: &[Card]) -> Option<&Meld> {
        let wanted: CardSet = cards.iter().copied().collect();
        cards
            .iter()
            .map(|c| self.triple_set(*c))
            .find(|m| m.card_set() == wanted)
    }
}

/// Bitset of catalog melds
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MeldSet([u64; 4]);

impl MeldSet {
    pub fn new() -> Self {
        MeldSet([0; 4])
    }

    pub fn contains(&self, id: MeldId) -> bool {
        let (word, bit) = Self::slot(id);
        self.0[word] & bit != 0
    }

    pub fn insert(&mut self, id: MeldId) -> bool {
        let present = self.contains(id);
        let (word, bit) = Self::slot(id);
        self.0[word] |= bit;
        !present
    }

    pub fn remove(&mut self, id: MeldId) -> bool {
        let present = self.contains(id);
        let (word, bit) = Self::slot(id);
        self.0[word] &= !bit;
        present
    }

    pub fn len(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static Meld> + '_ {
        (0..256u16)
            .map(MeldId)
            .filter(|id| self.contains(*id))
            .map(Meld::get)
    }

    #[inline]
    fn slot(id: MeldId) -> (usize, u64) {
        ((id.0 / 64) as usize, 1 << (id.0 % 64))
    }
}

impl fmt::Debug for MeldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(|m| m.to_string())).finish()
    }
}
