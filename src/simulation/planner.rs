//! Single-turn search for the current player.
//!
//! The planner works on a determinized copy of the live game and explores it
//! by applying and undoing primitives through the scoped helpers on
//! [`Game`], so the copy is never cloned again during the search. A turn is
//! either a take of `k` discards or a blind draw. Blind draws are scored by
//! searching every card the player cannot see as if it were on top of the
//! draw pile and averaging the best result per card.

use crate::card::{catalog, Card, Meld, MeldSet};
use crate::game::{variant, Game, GameError};
use crate::rng::GameRng;
use crate::simulation::play::{Play, TurnStart};
use crate::simulation::strategy::Evaluation;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub evaluation: Evaluation,
    /// Meld-search nodes allowed per search root (one take count or one
    /// draw identity). Past the budget every node is treated as a leaf.
    pub max_nodes: Option<u64>,
}

/// Work done by one or more searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchStats {
    pub nodes: u64,
    pub leaves: u64,
    pub variants: u64,
}

impl SearchStats {
    pub fn merge(&mut self, other: SearchStats) {
        self.nodes += other.nodes;
        self.leaves += other.leaves;
        self.variants += other.variants;
    }
}

impl fmt::Display for SearchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} nodes, {} leaves, {} variants", self.nodes, self.leaves, self.variants)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Take(Play),
    /// Best play per possible drawn card, and their mean evaluation
    Draw { expected: f64, plays: BTreeMap<Card, Play> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnPlan {
    pub decision: Decision,
    /// Best take evaluation, for logging and comparison
    pub best_take: Option<f64>,
    pub stats: SearchStats,
}

pub struct Planner {
    config: PlannerConfig,
    stats: SearchStats,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Planner {
            config,
            stats: SearchStats::default(),
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Totals over every plan made so far
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Decide the current player's turn on a fresh variant of what that
    /// player can see. `game` itself is not touched.
    pub fn plan(&mut self, game: &Game, rng: &mut GameRng) -> Result<TurnPlan, GameError> {
        let player = game.current;
        let mut world = variant(game, player, rng)?;
        let mut stats = SearchStats {
            variants: 1,
            ..SearchStats::default()
        };

        let take = self.best_take(&mut world, &mut stats)?;
        let plays = self.best_draws(&mut world, &mut stats)?;
        let expected = mean_evaluation(&plays);
        let best_take = take.as_ref().map(|play| play.evaluation);

        // Ties go to the draw
        let decision = match (take, expected) {
            (Some(play), Some(expected)) if play.evaluation > expected => Decision::Take(play),
            (Some(play), None) => Decision::Take(play),
            (_, Some(expected)) => Decision::Draw { expected, plays },
            (None, None) => return Err(GameError::EmptyPile("draw")),
        };

        debug!(
            "player {}: take {:?} vs draw {:?} -> {} ({})",
            player,
            best_take,
            expected,
            match &decision {
                Decision::Take(play) => play.to_string(),
                Decision::Draw { .. } => "draw".to_string(),
            },
            stats
        );
        self.stats.merge(stats);
        Ok(TurnPlan {
            decision,
            best_take,
            stats,
        })
    }

    /// Plan and apply the current player's turn to the live game
    pub fn play_turn(&mut self, game: &mut Game, rng: &mut GameRng) -> Result<Play, GameError> {
        let plan = self.plan(game, rng)?;
        let play = match plan.decision {
            Decision::Take(play) => {
                if let TurnStart::Take(n) = play.start {
                    game.take_cards(n)?;
                }
                play
            }
            Decision::Draw { mut plays, .. } => {
                let card = game.draw_card()?;
                self.play_for_drawn(game, card, &mut plays)?
            }
        };
        play.apply_after_start(game)?;
        trace!("player {} plays {}", game.current, play);
        Ok(play)
    }

    /// The planned play for a card that has just been drawn into the hand.
    /// Falls back to searching the live hand, which the player fully knows.
    pub fn play_for_drawn(
        &mut self,
        game: &mut Game,
        card: Card,
        plays: &mut BTreeMap<Card, Play>,
    ) -> Result<Play, GameError> {
        if let Some(play) = plays.remove(&card) {
            return Ok(play);
        }
        debug!("no plan for drawn {}, searching live hand", card);
        let mut stats = SearchStats::default();
        let play = self.best_melds(game, TurnStart::Draw(card), None, &mut stats)?;
        self.stats.merge(stats);
        play.ok_or_else(|| GameError::IllegalPlay(format!("no play after drawing {}", card)))
    }

    /// Best play over every take count. Ties go to the smaller count.
    pub fn best_take(&self, game: &mut Game, stats: &mut SearchStats) -> Result<Option<Play>, GameError> {
        let mut best: Option<Play> = None;
        for k in 1..=game.discard_pile.len() {
            let candidate = game.with_taken(k, |g, taken| {
                let deepest = if k > 1 { Some(taken[0]) } else { None };
                self.best_melds(g, TurnStart::Take(k), deepest, stats)
            })?;
            if let Some(play) = candidate {
                if best.as_ref().map_or(true, |b| play.evaluation > b.evaluation) {
                    best = Some(play);
                }
            }
        }
        Ok(best)
    }

    /// Best play for each card the current player might draw
    pub fn best_draws(
        &self,
        game: &mut Game,
        stats: &mut SearchStats,
    ) -> Result<BTreeMap<Card, Play>, GameError> {
        let player = game.current;
        let mut plays = BTreeMap::new();
        if game.draw_pile.is_empty() {
            return Ok(plays);
        }
        for card in game.hidden_from(player) {
            let best = game.with_on_draw_top(card, player, |g| {
                g.with_drawn(|g, drawn| self.best_melds(g, TurnStart::Draw(drawn), None, stats))
            })?;
            if let Some(play) = best {
                plays.insert(card, play);
            }
        }
        Ok(plays)
    }

    /// Best meld and discard sequence from the current position. When
    /// `deepest` is set, plays that leave that card in hand are dropped.
    pub fn best_melds(
        &self,
        game: &mut Game,
        start: TurnStart,
        deepest: Option<Card>,
        stats: &mut SearchStats,
    ) -> Result<Option<Play>, GameError> {
        let mut search = Search::new(self.config, game.current, start, deepest);
        let result = search.search(game);
        stats.nodes += search.nodes;
        stats.leaves += search.leaves;
        result?;
        Ok(search.best)
    }
}

fn mean_evaluation(plays: &BTreeMap<Card, Play>) -> Option<f64> {
    if plays.is_empty() {
        return None;
    }
    Some(plays.values().map(|p| p.evaluation).sum::<f64>() / plays.len() as f64)
}

/// Scratch state for one search root
struct Search {
    evaluation: Evaluation,
    max_nodes: Option<u64>,
    player: usize,
    start: TurnStart,
    deepest: Option<Card>,
    rejected: MeldSet,
    melds: Vec<&'static Meld>,
    best: Option<Play>,
    nodes: u64,
    leaves: u64,
}

impl Search {
    fn new(config: PlannerConfig, player: usize, start: TurnStart, deepest: Option<Card>) -> Self {
        Search {
            evaluation: config.evaluation,
            max_nodes: config.max_nodes,
            player,
            start,
            deepest,
            rejected: MeldSet::new(),
            melds: Vec::new(),
            best: None,
            nodes: 0,
            leaves: 0,
        }
    }

    /// First meld, in hand-card order, that can be laid now and has not
    /// been withheld on this branch
    fn first_available(&self, game: &Game) -> Option<&'static Meld> {
        let hand = game.players[self.player].hand;
        hand.iter()
            .flat_map(|card| catalog().melds_keyed_on(card))
            .find(|meld| {
                !self.rejected.contains(meld.id)
                    && hand.contains_all(&meld.cards)
                    && !game.table.contains(meld)
                    && game.table.can_play(meld)
            })
    }

    /// Branch on the first available meld: lay it, then withhold it
    fn search(&mut self, game: &mut Game) -> Result<(), GameError> {
        self.nodes += 1;
        let exhausted = self.max_nodes.is_some_and(|max| self.nodes > max);
        let next = if exhausted { None } else { self.first_available(game) };

        let Some(meld) = next else {
            if self
                .deepest
                .is_some_and(|card| game.players[self.player].hand.contains(card))
            {
                return Ok(());
            }
            return self.discard_leaf(game);
        };

        self.melds.push(meld);
        let laid = game.with_meld(meld, |g| self.search(g));
        self.melds.pop();
        laid?;

        self.rejected.insert(meld.id);
        let withheld = self.search(game);
        self.rejected.remove(meld.id);
        withheld
    }

    fn discard_leaf(&mut self, game: &mut Game) -> Result<(), GameError> {
        self.leaves += 1;
        let hand = game.players[self.player].hand;
        if hand.is_empty() {
            let value = self.evaluation.evaluate(game, self.player);
            self.consider(None, value);
            return Ok(());
        }
        for card in hand {
            let (evaluation, player) = (self.evaluation, self.player);
            let value = game.with_discard(card, |g| Ok(evaluation.evaluate(g, player)))?;
            self.consider(Some(card), value);
        }
        Ok(())
    }

    fn consider(&mut self, discard: Option<Card>, evaluation: f64) {
        if self.best.as_ref().map_or(true, |b| evaluation > b.evaluation) {
            self.best = Some(Play {
                start: self.start,
                melds: self.melds.clone(),
                discard,
                evaluation,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardSet;

    fn card(name: &str) -> Card {
        name.parse().unwrap()
    }

    fn set(names: &str) -> CardSet {
        names.split_whitespace().map(card).collect()
    }

    fn cards(names: &str) -> Vec<Card> {
        names.split_whitespace().map(card).collect()
    }

    fn game(mine: &str, theirs: &str, discard: &str) -> Game {
        Game::with_hands(vec![set(mine), set(theirs)], &cards(discard)).unwrap()
    }

    fn melded(play: &Play) -> CardSet {
        play.melds.iter().fold(CardSet::new(), |acc, m| acc.union(m.card_set()))
    }

    #[test]
    fn test_take_completes_run_and_goes_out() {
        let mut game = game("2C 3C 4C 5C", "KH KS QH", "6C");
        let before = game.clone();
        let planner = Planner::new(PlannerConfig::default());
        let mut stats = SearchStats::default();

        let play = planner.best_take(&mut game, &mut stats).unwrap().unwrap();
        assert_eq!(game, before);
        assert_eq!(play.start, TurnStart::Take(1));
        assert!(melded(&play).contains_all(&cards("3C 4C 5C")));
        assert!(play.goes_out());
        assert_eq!(play.evaluation, 25.0);
        assert!(stats.nodes > 0);
    }

    #[test]
    fn test_take_finds_the_only_run() {
        let mut game = game("3C 4C KD", "2H 9S", "5C");
        let planner = Planner::new(PlannerConfig::default());
        let play = planner
            .best_take(&mut game, &mut SearchStats::default())
            .unwrap()
            .unwrap();
        assert_eq!(play.melds, vec![catalog().triple_run(card("4C")).unwrap()]);
        assert_eq!(play.discard, Some(card("KD")));
        assert_eq!(play.evaluation, 15.0);
    }

    #[test]
    fn test_deep_take_without_use_is_pruned() {
        // Discard pile bottom to top: 9H 2S 3D
        let mut game = game("KC QD 7S", "AH", "9H 2S 3D");
        let planner = Planner::new(PlannerConfig::default());
        let mut stats = SearchStats::default();

        let pruned = game
            .with_taken(3, |g, taken| {
                assert_eq!(taken[0], card("9H"));
                planner.best_melds(g, TurnStart::Take(3), Some(taken[0]), &mut stats)
            })
            .unwrap();
        assert_eq!(pruned, None);

        let best = planner.best_take(&mut game, &mut stats).unwrap().unwrap();
        assert_ne!(best.start, TurnStart::Take(3));
    }

    #[test]
    fn test_deep_take_used_in_meld_survives() {
        let mut game = game("9C 9D KC", "AH", "9H 2S 3D");
        let planner = Planner::new(PlannerConfig::default());
        let play = game
            .with_taken(3, |g, taken| {
                planner.best_melds(g, TurnStart::Take(3), Some(taken[0]), &mut SearchStats::default())
            })
            .unwrap()
            .unwrap();
        assert!(play.melds.contains(&catalog().triple_set(card("9D"))));
    }

    #[test]
    fn test_empty_hand_goes_out_without_discard() {
        let mut game = game("KD", "2H 9S", "5C");
        game.players[0].hand = CardSet::new();
        game.players[0].points = 12;
        let planner = Planner::new(PlannerConfig::default());

        let play = planner
            .best_melds(&mut game, TurnStart::Take(1), None, &mut SearchStats::default())
            .unwrap()
            .unwrap();
        assert_eq!(play.discard, None);
        assert!(play.melds.is_empty());
        assert_eq!(play.evaluation, 12.0);
    }

    #[test]
    fn test_extensions_follow_their_parent() {
        // Whichever triple of nines goes down first, the fourth lays off
        let mut game = game("9C 9D 9H 9S 2D", "KH", "QS");
        let planner = Planner::new(PlannerConfig::default());
        let play = planner
            .best_melds(&mut game, TurnStart::Take(1), None, &mut SearchStats::default())
            .unwrap()
            .unwrap();
        assert_eq!(melded(&play), set("9C 9D 9H 9S"));
        assert_eq!(play.discard, Some(card("2D")));
        assert_eq!(play.evaluation, 20.0);
    }

    #[test]
    fn test_search_restores_game() {
        let mut game = game("2C 3C 4C 9D 9H 9S KD", "5C 6C 7D 8D 2S 3S 4S", "9C TC JC");
        let before = game.clone();
        let planner = Planner::new(PlannerConfig::default());
        let mut stats = SearchStats::default();

        planner.best_take(&mut game, &mut stats).unwrap();
        assert_eq!(game, before);
        planner.best_draws(&mut game, &mut stats).unwrap();
        assert_eq!(game, before);
        game.check_conservation().unwrap();
    }

    #[test]
    fn test_draws_cover_every_hidden_card() {
        let mut game = game("2C 7D QH 4S 9C JD 5H", "3H 8S", "KS");
        let hidden = game.hidden_from(0);
        let planner = Planner::new(PlannerConfig::default());

        let plays = planner.best_draws(&mut game, &mut SearchStats::default()).unwrap();
        assert_eq!(plays.len(), hidden.len());
        for (card, play) in &plays {
            assert_eq!(play.start, TurnStart::Draw(*card));
        }
    }

    #[test]
    fn test_plan_takes_a_valuable_discard() {
        let game = game("KC KD 2S 3H 7D 8S 4C", "5D 6D", "KH");
        let mut planner = Planner::new(PlannerConfig::default());
        let plan = planner.plan(&game, &mut GameRng::new(Some(1))).unwrap();

        match plan.decision {
            Decision::Take(play) => {
                assert_eq!(play.start, TurnStart::Take(1));
                assert!(play.melds.contains(&catalog().triple_set(card("KD"))));
            }
            other => panic!("expected a take, got {:?}", other),
        }
        assert_eq!(planner.stats().variants, 1);
    }

    #[test]
    fn test_plan_draws_past_a_useless_discard() {
        let game = game("2C 7D QH 4S 9C JD 5H", "3H 8S", "KS");
        let mut planner = Planner::new(PlannerConfig::default());
        let plan = planner.plan(&game, &mut GameRng::new(Some(1))).unwrap();

        match plan.decision {
            Decision::Draw { expected, plays } => {
                let mean = plays.values().map(|p| p.evaluation).sum::<f64>() / plays.len() as f64;
                assert!((expected - mean).abs() < 1e-9);
                assert!(expected > plan.best_take.unwrap());
            }
            other => panic!("expected a draw, got {:?}", other),
        }
    }

    #[test]
    fn test_play_turn_applies_plan() {
        let mut game = game("KC KD 2S 3H 7D 8S 4C", "5D 6D", "KH");
        let mut planner = Planner::new(PlannerConfig::default());
        let play = planner.play_turn(&mut game, &mut GameRng::new(Some(4))).unwrap();

        assert_eq!(play.start, TurnStart::Take(1));
        assert_eq!(game.players[0].points, 30);
        assert_eq!(game.players[0].hand.len(), 4);
        assert_eq!(game.discard_pile.top(), play.discard);
        game.check_conservation().unwrap();
    }

    #[test]
    fn test_play_turn_draw_replays_identity() {
        let mut game = game("2C 7D QH 4S 9C JD 5H", "3H 8S", "KS");
        let top = game.draw_pile.top().unwrap();
        let mut planner = Planner::new(PlannerConfig::default());
        let play = planner.play_turn(&mut game, &mut GameRng::new(Some(4))).unwrap();

        assert_eq!(play.start, TurnStart::Draw(top));
        assert_eq!(game.players[0].hand.len(), 7 - melded(&play).len());
        game.check_conservation().unwrap();
    }

    #[test]
    fn test_play_for_drawn_falls_back_to_live_search() {
        let mut game = game("3C 4C KD", "2H 9S", "AS");
        let drawn = game.draw_card().unwrap();
        let mut planner = Planner::new(PlannerConfig::default());
        let play = planner
            .play_for_drawn(&mut game, drawn, &mut BTreeMap::new())
            .unwrap();
        assert_eq!(play.start, TurnStart::Draw(drawn));
        assert!(planner.stats().nodes > 0);
    }

    #[test]
    fn test_node_budget_limits_search() {
        let mut game = game("3C 4C KD", "2H 9S", "5C");
        // A zero budget makes the root a leaf
        let budgeted = Planner::new(PlannerConfig {
            max_nodes: Some(0),
            ..PlannerConfig::default()
        });
        let mut stats = SearchStats::default();
        let play = budgeted.best_take(&mut game, &mut stats).unwrap().unwrap();
        assert!(play.melds.is_empty());
        assert_eq!(play.evaluation, -15.0);
        assert_eq!(stats.nodes, 1);
    }

    #[test]
    fn test_going_out_bonus_prefers_going_out() {
        let mut game = game("2D 3C 4C 5C 6C", "KH KS QH", "9S");
        let planner = Planner::new(PlannerConfig {
            evaluation: Evaluation::GoingOutBonus,
            ..PlannerConfig::default()
        });
        let play = planner
            .best_melds(&mut game, TurnStart::Take(1), None, &mut SearchStats::default())
            .unwrap()
            .unwrap();
        // Meld every club, discard 2D and go out with the 30 points left opposite
        assert_eq!(play.discard, Some(card("2D")));
        assert_eq!(play.evaluation, 20.0 + 30.0);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: PlannerConfig = serde_json::from_str(r#"{"max_nodes": 500}"#).unwrap();
        assert_eq!(config.max_nodes, Some(500));
        assert_eq!(config.evaluation, Evaluation::Baseline);
    }
}
