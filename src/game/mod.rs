pub mod determinize;
pub mod state;
pub mod table;
pub mod turns;
pub mod zones;

pub use determinize::variant;
pub use state::{Game, GameError, Relocation};
pub use table::Table;
pub use turns::{advance, deal, final_scores, is_round_over, HAND_SIZE};
pub use zones::{Pile, Player};
