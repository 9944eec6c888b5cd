pub mod config;
pub mod error;
pub mod goban;
pub mod ko;
pub mod scoring;
pub mod search;
pub mod session;
pub mod sgf;
pub mod stone;
pub mod turn;

/// Board coordinate as (col, row), zero-indexed from the top-left.
pub type Point = (u8, u8);

pub use config::{GameConfig, Ruleset, TimeSettings};
pub use error::{ConfigError, GoError, SgfError};
pub use goban::{Captures, Goban};
pub use ko::Ko;
pub use scoring::{GameScore, PlayerPoints};
pub use search::{AiMove, SearchEngine, SearchMode, SearchRequest};
pub use session::{GameOutcome, GameSession, SessionState, Status};
pub use stone::Stone;
pub use turn::{Move, Turn};
