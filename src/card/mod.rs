pub mod meld;
pub mod set;
pub mod types;

pub use meld::{catalog, Meld, MeldCatalog, MeldId, MeldKind, MeldSet, LOW_ACE_ADJUSTMENT};
pub use set::CardSet;
pub use types::{Card, CardError, Rank, Suit};
