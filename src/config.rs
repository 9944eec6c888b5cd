use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Point;
use crate::error::ConfigError;

/// Scoring ruleset. Also determines the repetition rule: Japanese rules use
/// simple ko only, Chinese and AGA rules enforce positional superko.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ruleset {
    Japanese,
    Chinese,
    Aga,
}

impl Ruleset {
    pub fn enforces_superko(self) -> bool {
        !matches!(self, Ruleset::Japanese)
    }

    /// Conventional komi for the ruleset.
    pub fn default_komi(self) -> f64 {
        match self {
            Ruleset::Japanese => 6.5,
            Ruleset::Chinese => 7.5,
            Ruleset::Aga => 7.5,
        }
    }
}

impl fmt::Display for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ruleset::Japanese => write!(f, "japanese"),
            Ruleset::Chinese => write!(f, "chinese"),
            Ruleset::Aga => write!(f, "aga"),
        }
    }
}

impl std::str::FromStr for Ruleset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "japanese" => Ok(Ruleset::Japanese),
            "chinese" => Ok(Ruleset::Chinese),
            "aga" => Ok(Ruleset::Aga),
            _ => Err(format!("unknown ruleset: {s}")),
        }
    }
}

/// Byoyomi time control parameters. The session only does bookkeeping with
/// these; actual scheduling is the caller's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSettings {
    pub main: Duration,
    pub byoyomi_period: Duration,
    pub byoyomi_periods: u32,
}

impl TimeSettings {
    pub fn new(main: Duration, byoyomi_period: Duration, byoyomi_periods: u32) -> Self {
        Self {
            main,
            byoyomi_period,
            byoyomi_periods,
        }
    }
}

/// Validated game configuration. Constructing a session with an unsupported
/// board size, handicap, or komi fails here, before any state exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub size: u8,
    pub komi: f64,
    pub handicap: u8,
    pub ruleset: Ruleset,
    pub time: Option<TimeSettings>,
}

impl GameConfig {
    pub fn new(size: u8, ruleset: Ruleset) -> Result<Self, ConfigError> {
        Self {
            size,
            komi: ruleset.default_komi(),
            handicap: 0,
            ruleset,
            time: None,
        }
        .validated()
    }

    pub fn with_komi(mut self, komi: f64) -> Result<Self, ConfigError> {
        self.komi = komi;
        self.validated()
    }

    pub fn with_handicap(mut self, handicap: u8) -> Result<Self, ConfigError> {
        self.handicap = handicap;
        self.validated()
    }

    pub fn with_time(mut self, time: TimeSettings) -> Result<Self, ConfigError> {
        self.time = Some(time);
        self.validated()
    }

    pub fn validated(self) -> Result<Self, ConfigError> {
        if !matches!(self.size, 9 | 13 | 19) {
            return Err(ConfigError::BoardSize(self.size));
        }
        if self.handicap == 1 || self.handicap > max_handicap(self.size) {
            return Err(ConfigError::Handicap {
                size: self.size,
                handicap: self.handicap,
            });
        }
        if !self.komi.is_finite() {
            return Err(ConfigError::Komi(self.komi));
        }
        if let Some(t) = &self.time
            && t.byoyomi_periods > 0
            && t.byoyomi_period.is_zero()
        {
            return Err(ConfigError::Byoyomi);
        }
        Ok(self)
    }
}

/// Maximum handicap stones for a supported board size.
pub fn max_handicap(size: u8) -> u8 {
    if size >= 13 { 9 } else { 5 }
}

/// Hoshi-based handicap placement. `None` for counts outside 2..=max.
pub fn handicap_points(size: u8, count: u8) -> Option<Vec<Point>> {
    if count < 2 || count > max_handicap(size) {
        return None;
    }

    // Hoshi offset from the edge: 3 for boards >= 13, 2 for 9x9
    let off = if size >= 13 { 3 } else { 2 };
    let far = size - 1 - off;
    let mid = size / 2;

    let tl = (off, off);
    let tr = (far, off);
    let bl = (off, far);
    let br = (far, far);
    let cc = (mid, mid);
    let ml = (off, mid);
    let mr = (far, mid);
    let tc = (mid, off);
    let bc = (mid, far);

    let pts = match count {
        2 => vec![tr, bl],
        3 => vec![tr, bl, br],
        4 => vec![tl, tr, bl, br],
        5 => vec![tl, tr, bl, br, cc],
        6 => vec![tl, tr, ml, mr, bl, br],
        7 => vec![tl, tr, ml, mr, bl, br, cc],
        8 => vec![tl, tr, ml, mr, bl, br, tc, bc],
        9 => vec![tl, tr, ml, mr, bl, br, tc, bc, cc],
        _ => unreachable!(),
    };

    Some(pts)
}
