use std::fmt;

/// Errors raised by the rules engine (`Board`). Never reach the wire directly —
/// the connection handler folds them into a `GameError::Rules` or, for
/// placement, a construction-time panic path that never runs over the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    InvalidPlacement { x: i32, y: i32 },
    InvalidMove { sx: i32, sy: i32, dx: i32, dy: i32 },
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::InvalidPlacement { x, y } => {
                write!(f, "can not place piece at ({x}, {y})")
            }
            BoardError::InvalidMove { sx, sy, dx, dy } => {
                write!(f, "invalid move from ({sx},{sy}) to ({dx},{dy})")
            }
        }
    }
}

impl std::error::Error for BoardError {}

/// Errors surfaced to a client over the wire as `ERROR <message>`.
///
/// Variants correspond to the taxonomy kinds (protocol vs. rules) rather than
/// to distinct Rust types, matching how the wire protocol only ever exposes a
/// single message string — the kind only matters for how we classify and log
/// the failure server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Unknown command, malformed arguments, wrong connection state.
    Protocol(String),
    /// Illegal move attempt, including "waiting for player".
    Rules(String),
}

impl GameError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        GameError::Protocol(msg.into())
    }

    pub fn rules(msg: impl Into<String>) -> Self {
        GameError::Rules(msg.into())
    }

    /// The exact text that follows `ERROR ` on the wire.
    pub fn message(&self) -> &str {
        match self {
            GameError::Protocol(m) | GameError::Rules(m) => m,
        }
    }
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for GameError {}

impl From<BoardError> for GameError {
    fn from(e: BoardError) -> Self {
        GameError::rules(e.to_string())
    }
}
