use crate::card::Card;
use crate::game::state::{Game, GameError};
use crate::game::zones::Pile;
use crate::rng::GameRng;

pub const HAND_SIZE: usize = 7;

/// Shuffle a full deck, deal seven cards to each player round-robin and
/// turn one card face up to start the discard pile
pub fn deal(num_players: usize, rng: &mut GameRng) -> Result<Game, GameError> {
    let mut game = Game::new(num_players)?;
    if num_players * HAND_SIZE + 1 > Card::COUNT {
        return Err(GameError::TooManyPlayers(num_players));
    }

    let mut deck: Vec<Card> = Card::deck().collect();
    rng.shuffle(&mut deck);
    game.draw_pile = Pile::from_cards(deck);

    for _ in 0..HAND_SIZE {
        for player in 0..num_players {
            game.current = player;
            game.draw_card()?;
        }
    }

    // First player turns up the starting discard
    game.current = 0;
    let card = game.draw_card()?;
    game.discard(card)?;
    Ok(game)
}

/// Pass the turn to the next player
pub fn advance(game: &mut Game) {
    game.current = (game.current + 1) % game.players.len();
}

/// The round ends once someone goes out or nothing is left to draw
pub fn is_round_over(game: &Game) -> bool {
    game.players.iter().any(|p| p.hand.is_empty()) || game.draw_pile.is_empty()
}

/// Banked points minus cards left in hand, per player
pub fn final_scores(game: &Game) -> Vec<i32> {
    game.players.iter().map(|p| p.score()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deal_hands_and_discard() {
        let mut rng = GameRng::new(Some(1));
        let game = deal(3, &mut rng).unwrap();

        for player in &game.players {
            assert_eq!(player.hand.len(), HAND_SIZE);
            assert_eq!(player.points, 0);
        }
        assert_eq!(game.discard_pile.len(), 1);
        assert_eq!(game.discarded.len(), 1);
        assert_eq!(game.draw_pile.len(), 52 - 3 * 7 - 1);
        assert_eq!(game.current, 0);
        game.check_conservation().unwrap();
    }

    #[test]
    fn test_deal_is_reproducible() {
        let a = deal(4, &mut GameRng::new(Some(77))).unwrap();
        let b = deal(4, &mut GameRng::new(Some(77))).unwrap();
        assert_eq!(a, b);
        let c = deal(4, &mut GameRng::new(Some(78))).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_deal_rejects_bad_player_counts() {
        let mut rng = GameRng::new(Some(1));
        assert_eq!(deal(1, &mut rng), Err(GameError::NotEnoughPlayers(1)));
        assert_eq!(deal(8, &mut rng), Err(GameError::TooManyPlayers(8)));
    }

    #[test]
    fn test_advance_wraps() {
        let mut game = deal(3, &mut GameRng::new(Some(5))).unwrap();
        advance(&mut game);
        advance(&mut game);
        assert_eq!(game.current, 2);
        advance(&mut game);
        assert_eq!(game.current, 0);
    }

    #[test]
    fn test_round_over_and_scores() {
        let mut game = deal(2, &mut GameRng::new(Some(9))).unwrap();
        assert!(!is_round_over(&game));

        let hand = game.players[1].hand;
        game.players[1].hand = Default::default();
        game.players[1].points = 40;
        assert!(is_round_over(&game));
        let scores = final_scores(&game);
        assert_eq!(scores[1], 40);
        assert_eq!(scores[0], -game.players[0].hand.points());

        game.players[1].hand = hand;
        while game.draw_pile.pop().is_some() {}
        assert!(is_round_over(&game));
    }
}
