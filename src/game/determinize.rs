//! Determinization: rebuild a complete game that is consistent with what
//! one player has seen, so a search over it cannot peek at hidden cards.
//!
//! Fixed: the player's own hand, the discard pile, the discard history, the
//! table and everyone's banked points. Cards in other hands that were once
//! discarded are public and stay where they are. Everything else (the draw
//! pile plus the unseen part of other hands) is pooled, shuffled and dealt
//! back so every hand and the draw pile keep their sizes.

use crate::card::Card;
use crate::game::state::{Game, GameError};
use crate::game::zones::Pile;
use crate::rng::GameRng;

/// A possible world for `for_player`
pub fn variant(game: &Game, for_player: usize, rng: &mut GameRng) -> Result<Game, GameError> {
    game.player(for_player)?;

    let mut pool: Vec<Card> = game.hidden_from(for_player).iter().collect();
    rng.shuffle(&mut pool);
    let mut pool = pool.into_iter();

    let mut world = game.clone();
    for player in world.players.iter_mut().filter(|p| p.index != for_player) {
        let size = player.hand.len();
        player.hand = player.hand.intersection(game.discarded);
        while player.hand.len() < size {
            let card = pool
                .next()
                .ok_or_else(|| GameError::Conservation("hidden pool ran dry".to_string()))?;
            player.hand.insert(card);
        }
    }
    world.draw_pile = Pile::from_cards(pool.collect());

    debug_assert_eq!(world.draw_pile.len(), game.draw_pile.len());
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardSet;
    use crate::game::turns::deal;

    fn card(name: &str) -> Card {
        name.parse().unwrap()
    }

    /// Three players, player 1 has taken two public discards
    fn game_with_public_cards() -> Game {
        let mut game = deal(3, &mut GameRng::new(Some(2024))).unwrap();
        game.current = 0;
        let first = game.current_player().hand.iter().next().unwrap();
        let second = game.current_player().hand.iter().nth(1).unwrap();
        game.discard(first).unwrap();
        game.discard(second).unwrap();
        game.current = 1;
        game.take_cards(2).unwrap();
        game
    }

    #[test]
    fn test_variant_keeps_observer_view() {
        let game = game_with_public_cards();
        let mut rng = GameRng::new(Some(1));

        for observer in 0..3 {
            let world = variant(&game, observer, &mut rng).unwrap();
            world.check_conservation().unwrap();
            assert_eq!(world.players[observer].hand, game.players[observer].hand);
            assert_eq!(world.discard_pile, game.discard_pile);
            assert_eq!(world.discarded, game.discarded);
            assert_eq!(world.table, game.table);
            assert_eq!(world.draw_pile.len(), game.draw_pile.len());
            for (a, b) in world.players.iter().zip(&game.players) {
                assert_eq!(a.hand.len(), b.hand.len());
                assert_eq!(a.points, b.points);
                // Public cards never move
                assert_eq!(a.hand.intersection(game.discarded), b.hand.intersection(game.discarded));
            }
        }
    }

    #[test]
    fn test_variant_is_reproducible_and_varies() {
        let game = game_with_public_cards();
        let a = variant(&game, 0, &mut GameRng::new(Some(3))).unwrap();
        let b = variant(&game, 0, &mut GameRng::new(Some(3))).unwrap();
        assert_eq!(a, b);

        let mut rng = GameRng::new(Some(3));
        let first = variant(&game, 0, &mut rng).unwrap();
        let second = variant(&game, 0, &mut rng).unwrap();
        assert_ne!(first, second, "successive calls should give different worlds");
    }

    #[test]
    fn test_unknown_player_is_an_error() {
        let game = game_with_public_cards();
        assert_eq!(
            variant(&game, 5, &mut GameRng::new(Some(1))),
            Err(GameError::NoSuchPlayer(5))
        );
    }

    #[test]
    fn test_hidden_card_lands_uniformly() {
        // Two players, seven cards each, one discard: the 37 hidden cards
        // from player 0's view are 7 in player 1's hand and 30 in the pile.
        let hands = vec![
            "2C 3C 4C 5C 6C 7C 8C".split_whitespace().map(card).collect::<CardSet>(),
            "2D 3D 4D 5D 6D 7D 8D".split_whitespace().map(card).collect::<CardSet>(),
        ];
        let game = Game::with_hands(hands, &[card("AS")]).unwrap();
        let tracked = card("5D");

        let mut rng = GameRng::new(Some(11));
        let trials = 4000;
        let mut in_hand = 0;
        for _ in 0..trials {
            let world = variant(&game, 0, &mut rng).unwrap();
            if world.players[1].hand.contains(tracked) {
                in_hand += 1;
            }
        }
        let expected = trials as f64 * 7.0 / 37.0;
        let observed = in_hand as f64;
        assert!(
            (observed - expected).abs() < expected * 0.2,
            "expected about {:.0} of {} in hand, got {}",
            expected,
            trials,
            in_hand
        );
    }
}
