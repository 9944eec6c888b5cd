use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt;
use std::ops::Neg;

/// Stone color. The integer representation matches the board encoding:
/// Black stones are stored as `1`, White as `-1`, empty cells as `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(i8)]
pub enum Stone {
    Black = 1,
    White = -1,
}

impl Stone {
    pub fn from_int(v: i8) -> Option<Self> {
        match v.signum() {
            1 => Some(Stone::Black),
            -1 => Some(Stone::White),
            _ => None,
        }
    }

    pub fn to_int(self) -> i8 {
        self as i8
    }

    pub fn opp(self) -> Self {
        match self {
            Stone::Black => Stone::White,
            Stone::White => Stone::Black,
        }
    }

    /// One-letter SGF color tag.
    pub fn letter(self) -> &'static str {
        match self {
            Stone::Black => "B",
            Stone::White => "W",
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'B' | 'b' => Some(Stone::Black),
            'W' | 'w' => Some(Stone::White),
            _ => None,
        }
    }
}

impl Neg for Stone {
    type Output = Self;

    fn neg(self) -> Self {
        self.opp()
    }
}

impl fmt::Display for Stone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stone::Black => write!(f, "Black"),
            Stone::White => write!(f, "White"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_round_trip() {
        assert_eq!(Stone::from_int(1), Some(Stone::Black));
        assert_eq!(Stone::from_int(-1), Some(Stone::White));
        assert_eq!(Stone::from_int(0), None);
        assert_eq!(Stone::from_int(Stone::Black.to_int()), Some(Stone::Black));
        assert_eq!(Stone::from_int(Stone::White.to_int()), Some(Stone::White));
    }

    #[test]
    fn from_int_normalizes_magnitude() {
        assert_eq!(Stone::from_int(7), Some(Stone::Black));
        assert_eq!(Stone::from_int(-3), Some(Stone::White));
    }

    #[test]
    fn opponent_and_negation() {
        assert_eq!(Stone::Black.opp(), Stone::White);
        assert_eq!(-Stone::White, Stone::Black);
    }

    #[test]
    fn letters() {
        assert_eq!(Stone::Black.letter(), "B");
        assert_eq!(Stone::White.letter(), "W");
        assert_eq!(Stone::from_letter('w'), Some(Stone::White));
        assert_eq!(Stone::from_letter('x'), None);
    }
}
