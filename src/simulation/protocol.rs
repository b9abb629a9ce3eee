//! Line protocol for driving a planner bot from another process.
//!
//! The session keeps a belief game: the bot's own hand, the discard pile,
//! the table and the hand sizes are exact, while cards the bot has never
//! seen sit in arbitrary hidden slots. Planning determinizes the belief, so
//! where those cards sit does not matter. When another player shows a card
//! the belief placed elsewhere, it is swapped into that player's hand.
//!
//! Commands for the bot's own seat other than `player` and `drawn` are
//! ignored: the session applies the bot's moves when it announces them.

use crate::card::{catalog, Card, CardError, CardSet, Meld};
use crate::game::{Game, GameError, Table};
use crate::rng::GameRng;
use crate::simulation::play::{Play, TurnStart};
use crate::simulation::planner::{Decision, Planner, PlannerConfig};
use log::debug;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error(transparent)]
    Card(#[from] CardError),
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("Malformed command: {0}")]
    Malformed(String),
    #[error("No game started: {0}")]
    NotStarted(String),
    #[error("Unexpected command: {0}")]
    Unexpected(String),
}

struct Round {
    game: Game,
    bot: usize,
    /// Plans per identity while waiting for `drawn`
    pending_draw: Option<BTreeMap<Card, Play>>,
}

pub struct BotSession {
    planner: Planner,
    rng: GameRng,
    round: Option<Round>,
    finished: bool,
}

impl BotSession {
    pub fn new(config: PlannerConfig, seed: Option<u64>) -> Self {
        BotSession {
            planner: Planner::new(config),
            rng: GameRng::new(seed),
            round: None,
            finished: false,
        }
    }

    /// True after `goodbye`
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The belief game, once started
    pub fn game(&self) -> Option<&Game> {
        self.round.as_ref().map(|r| &r.game)
    }

    /// Handle one input line and return the lines to send back
    pub fn handle_line(&mut self, line: &str) -> Result<Vec<String>, ProtocolError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = fields.split_first() else {
            return Ok(Vec::new());
        };
        debug!("<- {}", line.trim());

        let replies = match command {
            "start" => self.start(args, line)?,
            "goodbye" => {
                self.finished = true;
                Vec::new()
            }
            "player" => self.player(args, line)?,
            "take" => self.take(args, line)?,
            "drawn" => self.drawn(args, line)?,
            "run" | "set" => self.meld(command == "run", args, line)?,
            "discard" => self.discard(args, line)?,
            _ => return Err(ProtocolError::Malformed(line.to_string())),
        };
        for reply in &replies {
            debug!("-> {}", reply);
        }
        Ok(replies)
    }

    fn start(&mut self, args: &[&str], line: &str) -> Result<Vec<String>, ProtocolError> {
        if args.len() < 3 {
            return Err(ProtocolError::Malformed(line.to_string()));
        }
        let num_players = number(args[0], line)?;
        let bot = number(args[1], line)?;
        let top: Card = args[2].parse()?;
        let known = parse_cards(&args[3..])?;
        if bot >= num_players {
            return Err(GameError::NoSuchPlayer(bot).into());
        }

        let game = belief(num_players, bot, top, &known)?;
        self.round = Some(Round {
            game,
            bot,
            pending_draw: None,
        });
        Ok(Vec::new())
    }

    fn player(&mut self, args: &[&str], line: &str) -> Result<Vec<String>, ProtocolError> {
        let index = number(single(args, line)?, line)?;
        let round = started(&mut self.round, line)?;
        round.game.player(index)?;
        round.game.current = index;
        round.pending_draw = None;
        if index != round.bot {
            return Ok(Vec::new());
        }

        let plan = self.planner.plan(&round.game, &mut self.rng)?;
        match plan.decision {
            Decision::Take(play) => {
                let mut replies = Vec::new();
                if let TurnStart::Take(n) = play.start {
                    round.game.take_cards(n)?;
                    replies.push(format!("take {}", n));
                }
                play.apply_after_start(&mut round.game)?;
                replies.extend(play.command_lines());
                Ok(replies)
            }
            Decision::Draw { plays, .. } => {
                round.pending_draw = Some(plays);
                Ok(vec!["draw".to_string()])
            }
        }
    }

    fn drawn(&mut self, args: &[&str], line: &str) -> Result<Vec<String>, ProtocolError> {
        let card: Card = single(args, line)?.parse()?;
        let round = started(&mut self.round, line)?;
        let Some(mut plays) = round.pending_draw.take() else {
            return Err(ProtocolError::Unexpected(line.to_string()));
        };

        round.game.relocate_to_draw_top(card, round.bot)?;
        round.game.draw_card()?;
        let play = self.planner.play_for_drawn(&mut round.game, card, &mut plays)?;
        play.apply_after_start(&mut round.game)?;
        Ok(play.command_lines())
    }

    fn take(&mut self, args: &[&str], line: &str) -> Result<Vec<String>, ProtocolError> {
        let n = number(single(args, line)?, line)?;
        let round = started(&mut self.round, line)?;
        if round.game.current == round.bot {
            return Ok(Vec::new());
        }
        if n == 0 {
            round.game.draw_card()?;
        } else {
            round.game.take_cards(n)?;
        }
        Ok(Vec::new())
    }

    fn meld(&mut self, is_run: bool, args: &[&str], line: &str) -> Result<Vec<String>, ProtocolError> {
        let cards = parse_cards(args)?;
        let round = started(&mut self.round, line)?;
        if round.game.current == round.bot {
            return Ok(Vec::new());
        }
        if cards.is_empty() {
            return Err(ProtocolError::Malformed(line.to_string()));
        }

        let player = round.game.current;
        let shown: CardSet = cards.iter().copied().collect();
        for card in &cards {
            round.game.reveal(player, *card, round.bot, shown)?;
        }
        for meld in resolve_melds(is_run, &cards, &round.game.table)? {
            round.game.put_meld(meld)?;
        }
        Ok(Vec::new())
    }

    fn discard(&mut self, args: &[&str], line: &str) -> Result<Vec<String>, ProtocolError> {
        let card: Card = single(args, line)?.parse()?;
        let round = started(&mut self.round, line)?;
        if round.game.current == round.bot {
            return Ok(Vec::new());
        }
        let player = round.game.current;
        round.game.reveal(player, card, round.bot, CardSet::new())?;
        round.game.discard(card)?;
        Ok(Vec::new())
    }
}

fn started<'a>(round: &'a mut Option<Round>, line: &str) -> Result<&'a mut Round, ProtocolError> {
    round
        .as_mut()
        .ok_or_else(|| ProtocolError::NotStarted(line.to_string()))
}

fn single<'a>(args: &[&'a str], line: &str) -> Result<&'a str, ProtocolError> {
    match args {
        [arg] => Ok(*arg),
        _ => Err(ProtocolError::Malformed(line.to_string())),
    }
}

fn number(field: &str, line: &str) -> Result<usize, ProtocolError> {
    field
        .parse()
        .map_err(|_| ProtocolError::Malformed(line.to_string()))
}

fn parse_cards(fields: &[&str]) -> Result<Vec<Card>, CardError> {
    fields.iter().map(|f| f.parse()).collect()
}

/// Exact bot hand and discard; every other hand gets the same number of
/// placeholder cards from the unseen rest of the deck
fn belief(num_players: usize, bot: usize, top: Card, known: &[Card]) -> Result<Game, ProtocolError> {
    let mine: CardSet = known.iter().copied().collect();
    if mine.len() != known.len() || mine.contains(top) {
        return Err(GameError::Conservation(format!("{} dealt twice", Card::names(known))).into());
    }
    if num_players * known.len() + 1 > Card::COUNT {
        return Err(GameError::TooManyPlayers(num_players).into());
    }

    let mut unseen = CardSet::full_deck().difference(mine);
    unseen.remove(top);
    let mut unseen = unseen.iter();
    let hands: Vec<CardSet> = (0..num_players)
        .map(|player| {
            if player == bot {
                mine
            } else {
                unseen.by_ref().take(known.len()).collect()
            }
        })
        .collect();
    Ok(Game::with_hands(hands, &[top])?)
}

/// Catalog melds for cards another player laid down. Short runs are
/// lay-offs onto runs already on the table, placed in whatever order
/// lets each card extend the table. A card that could extend a run at
/// either end goes above.
fn resolve_melds(is_run: bool, cards: &[Card], table: &Table) -> Result<Vec<&'static Meld>, GameError> {
    if !is_run || cards.len() >= 3 {
        return Meld::find(is_run, cards);
    }

    let mut table = table.clone();
    let mut pending = cards.to_vec();
    let mut melds = Vec::new();
    while !pending.is_empty() {
        let next = pending.iter().enumerate().find_map(|(i, card)| {
            catalog()
                .run_singles(*card)
                .find(|m| !table.contains(m) && table.can_play(m))
                .map(|m| (i, m))
        });
        let Some((i, meld)) = next else {
            return Err(GameError::IllegalPlay(Card::names(cards)));
        };
        table.play(meld)?;
        melds.push(meld);
        pending.remove(i);
    }
    Ok(melds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(name: &str) -> Card {
        name.parse().unwrap()
    }

    fn session() -> BotSession {
        BotSession::new(PlannerConfig::default(), Some(7))
    }

    fn send(session: &mut BotSession, line: &str) -> Vec<String> {
        session.handle_line(line).unwrap()
    }

    #[test]
    fn test_bot_takes_and_melds() {
        let mut s = session();
        assert!(send(&mut s, "start 2 0 KH KC KD 2S 3H 7D 8S 4C").is_empty());
        let replies = send(&mut s, "player 0");
        assert_eq!(replies, vec!["take 1", "set KC KD KH", "discard 4C"]);

        let game = s.game().unwrap();
        assert_eq!(game.players[0].points, 30);
        assert_eq!(game.players[0].hand.len(), 4);
        assert_eq!(game.discard_pile.top(), Some(card("4C")));
        game.check_conservation().unwrap();
    }

    #[test]
    fn test_bot_draws_then_plays_drawn_card() {
        let mut s = session();
        send(&mut s, "start 2 0 KS 2C 7D QH 4S 9C JD 5H");
        assert_eq!(send(&mut s, "player 0"), vec!["draw"]);
        assert_eq!(send(&mut s, "drawn 3C"), vec!["discard JD"]);

        let game = s.game().unwrap();
        assert!(game.players[0].hand.contains(card("3C")));
        assert!(!game.players[0].hand.contains(card("JD")));
        assert_eq!(game.players[0].hand.len(), 7);
        game.check_conservation().unwrap();
    }

    #[test]
    fn test_opponent_moves_update_belief() {
        let mut s = session();
        send(&mut s, "start 2 0 KS 2C 7D QH 4S 9C JD 5H");
        send(&mut s, "player 1");
        send(&mut s, "take 0");
        assert_eq!(s.game().unwrap().players[1].hand.len(), 8);

        send(&mut s, "run 9H TH JH");
        send(&mut s, "discard 3D");
        let game = s.game().unwrap();
        assert_eq!(game.players[1].hand.len(), 4);
        assert_eq!(game.players[1].points, 25);
        assert!(game.table.contains(catalog().triple_run(card("TH")).unwrap()));
        assert_eq!(game.discard_pile.top(), Some(card("3D")));
        game.check_conservation().unwrap();

        // Two lay-offs below the run, announced top first
        send(&mut s, "player 1");
        send(&mut s, "take 1");
        send(&mut s, "run 7H 8H");
        let game = s.game().unwrap();
        assert_eq!(game.table.len(), 3);
        assert_eq!(game.players[1].points, 35);
        game.check_conservation().unwrap();
    }

    #[test]
    fn test_opponent_melds_cards_believed_elsewhere() {
        let mut s = session();
        send(&mut s, "start 3 0 7S 8S 9S TS JS QS KS AS");
        send(&mut s, "player 1");
        send(&mut s, "take 0");
        send(&mut s, "discard 2D");
        send(&mut s, "player 2");
        send(&mut s, "take 0");
        // The belief dealt 3C 4C 5C to player 1
        assert!(s.game().unwrap().players[1].hand.contains(card("3C")));

        assert!(send(&mut s, "run 3C 4C 5C").is_empty());
        let game = s.game().unwrap();
        assert!(game.table.contains(catalog().triple_run(card("4C")).unwrap()));
        assert_eq!(game.players[2].points, 15);
        assert_eq!(game.players[2].hand.len(), 5);
        assert_eq!(game.players[1].hand.len(), 7);
        game.check_conservation().unwrap();
    }

    #[test]
    fn test_opponent_set_extension() {
        let mut s = session();
        send(&mut s, "start 3 0 2D 2C 7D QH 4S 9C JD 5H");
        send(&mut s, "player 1");
        send(&mut s, "take 0");
        send(&mut s, "set 8C 8D 8H");
        send(&mut s, "discard 3S");
        send(&mut s, "player 2");
        send(&mut s, "take 0");
        send(&mut s, "set 8S");
        let game = s.game().unwrap();
        assert_eq!(game.table.len(), 2);
        assert_eq!(game.players[2].points, 5);
        game.check_conservation().unwrap();
    }

    #[test]
    fn test_errors() {
        let mut s = session();
        assert!(matches!(s.handle_line("player 0"), Err(ProtocolError::NotStarted(_))));
        assert!(matches!(
            s.handle_line("start 2 0 ZZ 2C"),
            Err(ProtocolError::Card(CardError::UnknownCard(_)))
        ));
        assert!(matches!(
            s.handle_line("start 1 0 KS 2C"),
            Err(ProtocolError::Game(GameError::NotEnoughPlayers(1)))
        ));
        send(&mut s, "start 2 0 KS 2C 7D QH 4S 9C JD 5H");
        assert!(matches!(s.handle_line("take x"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(s.handle_line("shuffle"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(s.handle_line("drawn 3C"), Err(ProtocolError::Unexpected(_))));
        send(&mut s, "player 1");
        // The bot holds 2C, so player 1 cannot show it
        assert!(matches!(
            s.handle_line("discard 2C"),
            Err(ProtocolError::Game(GameError::NotInHand { .. }))
        ));
        // No run on the table to lay off onto
        assert!(matches!(
            s.handle_line("run 8S"),
            Err(ProtocolError::Game(GameError::IllegalPlay(_)))
        ));
    }

    #[test]
    fn test_blank_lines_and_goodbye() {
        let mut s = session();
        assert!(send(&mut s, "   ").is_empty());
        assert!(!s.is_finished());
        send(&mut s, "goodbye");
        assert!(s.is_finished());
    }

    #[test]
    fn test_resolve_layoffs_in_table_order() {
        let mut table = Table::new();
        table.play(catalog().triple_run(card("5S")).unwrap()).unwrap();
        // 8S can only follow 7S
        let melds = resolve_melds(true, &[card("8S"), card("7S")], &table).unwrap();
        assert_eq!(melds[0], catalog().run_above(card("7S")).unwrap());
        assert_eq!(melds[1], catalog().run_above(card("8S")).unwrap());
    }

    #[test]
    fn test_layoff_fitting_both_runs_goes_above() {
        let mut table = Table::new();
        table.play(catalog().triple_run(card("3H")).unwrap()).unwrap();
        table.play(catalog().triple_run(card("7H")).unwrap()).unwrap();
        let melds = resolve_melds(true, &[card("5H")], &table).unwrap();
        assert_eq!(melds, vec![catalog().run_above(card("5H")).unwrap()]);
        assert!(table.can_play(catalog().run_below(card("5H")).unwrap()));
    }
}
