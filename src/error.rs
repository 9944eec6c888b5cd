use thiserror::Error;

/// Rejection reasons for a move. The board is guaranteed unchanged when one
/// of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GoError {
    #[error("out of turn")]
    OutOfTurn,
    #[error("point is occupied")]
    Overwrite,
    #[error("point is not on the board")]
    NotOnBoard,
    #[error("suicide")]
    Suicide,
    #[error("ko violation")]
    KoViolation,
    #[error("superko violation: position already occurred")]
    SuperkoViolation,
    #[error("game is over")]
    GameOver,
}

/// Fatal construction errors. A session with an invalid configuration is
/// never partially built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unsupported board size {0} (supported sizes: 9, 13, 19)")]
    BoardSize(u8),
    #[error("handicap {handicap} is invalid for a {size}x{size} board")]
    Handicap { size: u8, handicap: u8 },
    #[error("komi must be a finite number, got {0}")]
    Komi(f64),
    #[error("byoyomi period must be non-zero when periods are configured")]
    Byoyomi,
}

/// Transcript parse failures. Import fails fast: no moves are applied when
/// any of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SgfError {
    #[error("expected {expected}, found '{found}' at byte {pos}")]
    UnexpectedChar {
        expected: &'static str,
        found: char,
        pos: usize,
    },
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("invalid value '{value}' for property {property}")]
    InvalidPropertyValue { property: String, value: String },
    #[error("invalid coordinate '{0}'")]
    InvalidCoordinate(String),
    #[error("invalid game configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("move {index} ({turn}) is illegal in replay: {source}")]
    IllegalMove {
        index: usize,
        turn: String,
        source: GoError,
    },
}
