//! Minimal SGF-style transcripts: enough of the format to round-trip a
//! game played through this crate. Handicap stones follow the hoshi
//! convention from the `HA` property rather than explicit setup stones.

use crate::Point;
use crate::config::{GameConfig, Ruleset};
use crate::error::SgfError;
use crate::session::{GameOutcome, GameSession, Status};
use crate::stone::Stone;
use crate::turn::Move;

/// Encode a point as an SGF letter pair (`aa` = top-left).
fn point_to_sgf(point: Point) -> String {
    let (col, row) = point;
    format!(
        "{}{}",
        (b'a' + col) as char,
        (b'a' + row) as char
    )
}

fn point_from_sgf(value: &str, size: u8) -> Result<Point, SgfError> {
    let invalid = || SgfError::InvalidCoordinate(value.to_string());
    let mut chars = value.chars();
    let (Some(c), Some(r), None) = (chars.next(), chars.next(), chars.next()) else {
        return Err(invalid());
    };
    let col = (c as u32).wrapping_sub('a' as u32);
    let row = (r as u32).wrapping_sub('a' as u32);
    if col >= size as u32 || row >= size as u32 {
        return Err(invalid());
    }
    Ok((col as u8, row as u8))
}

fn result_tag(outcome: &GameOutcome) -> String {
    match outcome {
        GameOutcome::Scored(score) => score.result(),
        GameOutcome::Resigned { winner } => format!("{}+Resign", winner.letter()),
        GameOutcome::Timeout { winner } => format!("{}+Time", winner.letter()),
        GameOutcome::Voided => "Void".to_string(),
    }
}

/// Serialize a session's game record.
pub fn export(session: &GameSession) -> String {
    let config = session.config();
    let mut out = String::from("(;GM[1]FF[4]");
    out.push_str(&format!("SZ[{}]", config.size));
    out.push_str(&format!("RU[{}]", config.ruleset));
    out.push_str(&format!("KM[{}]", config.komi));
    if config.handicap > 0 {
        out.push_str(&format!("HA[{}]", config.handicap));
    }
    if let Status::Ended(outcome) = session.status() {
        out.push_str(&format!("RE[{}]", result_tag(&outcome)));
    }

    for entry in session.history() {
        let turn = &entry.turn;
        match turn.kind {
            Move::Play => {
                if let Some(point) = turn.pos {
                    out.push_str(&format!(";{}[{}]", turn.stone.letter(), point_to_sgf(point)));
                }
            }
            Move::Pass => out.push_str(&format!(";{}[]", turn.stone.letter())),
            // Resignation is carried by the RE property, not a move node
            Move::Resign => {}
        }
    }

    out.push(')');
    out
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser {
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Result<u8, SgfError> {
        let b = self.peek().ok_or(SgfError::UnexpectedEof)?;
        self.pos += 1;
        Ok(b)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: u8) -> Result<(), SgfError> {
        let found = self.bump()?;
        if found != expected {
            self.pos -= 1;
            return Err(self.unexpected(match expected {
                b'(' => "'('",
                b')' => "')'",
                b';' => "';'",
                b'[' => "'['",
                b']' => "']'",
                _ => "punctuation",
            }));
        }
        Ok(())
    }

    fn unexpected(&self, expected: &'static str) -> SgfError {
        match self.peek() {
            Some(b) => SgfError::UnexpectedChar {
                expected,
                found: b as char,
                pos: self.pos,
            },
            None => SgfError::UnexpectedEof,
        }
    }

    /// Property identifier: one or more uppercase letters.
    fn ident(&mut self) -> Result<String, SgfError> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_uppercase()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.unexpected("property identifier"));
        }
        Ok(String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned())
    }

    /// Bracketed property value, with `\` escaping.
    fn value(&mut self) -> Result<String, SgfError> {
        self.expect(b'[')?;
        let mut out = String::new();
        loop {
            match self.bump()? {
                b']' => return Ok(out),
                b'\\' => out.push(self.bump()? as char),
                b => out.push(b as char),
            }
        }
    }
}

#[derive(Debug)]
struct RawNode {
    ident: String,
    values: Vec<String>,
}

/// Parse the single-variation node list. Structural errors surface here;
/// semantic ones (bad values, illegal moves) surface during interpretation.
fn parse_nodes(input: &str) -> Result<Vec<Vec<RawNode>>, SgfError> {
    let mut p = Parser::new(input);
    p.skip_whitespace();
    p.expect(b'(')?;

    let mut nodes = Vec::new();
    loop {
        p.skip_whitespace();
        match p.peek() {
            Some(b';') => {
                p.bump()?;
                let mut props = Vec::new();
                loop {
                    p.skip_whitespace();
                    match p.peek() {
                        Some(b) if b.is_ascii_uppercase() => {
                            let ident = p.ident()?;
                            let mut values = vec![p.value()?];
                            p.skip_whitespace();
                            while p.peek() == Some(b'[') {
                                values.push(p.value()?);
                                p.skip_whitespace();
                            }
                            props.push(RawNode { ident, values });
                        }
                        _ => break,
                    }
                }
                nodes.push(props);
            }
            Some(b')') => {
                p.bump()?;
                return Ok(nodes);
            }
            _ => return Err(p.unexpected("';' or ')'")),
        }
    }
}

fn bad_value(property: &str, value: &str) -> SgfError {
    SgfError::InvalidPropertyValue {
        property: property.to_string(),
        value: value.to_string(),
    }
}

/// Parse a transcript and replay it into a fresh session. Fails fast: any
/// structural error, bad property, or illegal move returns an error and no
/// session.
pub fn import(input: &str) -> Result<GameSession, SgfError> {
    let nodes = parse_nodes(input)?;
    let mut nodes = nodes.into_iter();
    let root = nodes.next().unwrap_or_default();

    let mut size = 19u8;
    let mut komi: Option<f64> = None;
    let mut handicap = 0u8;
    let mut ruleset = Ruleset::Japanese;

    for prop in &root {
        let value = prop.values.first().map(String::as_str).unwrap_or("");
        match prop.ident.as_str() {
            "GM" => {
                if value != "1" {
                    return Err(bad_value("GM", value));
                }
            }
            "SZ" => size = value.parse().map_err(|_| bad_value("SZ", value))?,
            "KM" => komi = Some(value.parse().map_err(|_| bad_value("KM", value))?),
            "HA" => handicap = value.parse().map_err(|_| bad_value("HA", value))?,
            "RU" => {
                ruleset = value
                    .to_ascii_lowercase()
                    .parse()
                    .map_err(|_| bad_value("RU", value))?
            }
            _ => {} // FF, RE, player names and the rest are ignored
        }
    }

    // Decode the move list before touching any game state
    let mut moves: Vec<(Stone, Option<Point>)> = Vec::new();
    for props in nodes {
        for prop in props {
            let stone = match prop.ident.as_str() {
                "B" => Stone::Black,
                "W" => Stone::White,
                _ => continue,
            };
            let value = prop.values.first().map(String::as_str).unwrap_or("");
            // Empty value (or the historical "tt") is a pass
            let point = match value {
                "" | "tt" => None,
                v => Some(point_from_sgf(v, size)?),
            };
            moves.push((stone, point));
        }
    }

    let mut config = GameConfig::new(size, ruleset)?;
    if let Some(km) = komi {
        config = config.with_komi(km)?;
    }
    if handicap > 0 {
        config = config.with_handicap(handicap)?;
    }
    let mut session = GameSession::new(config)?;

    for (index, (stone, point)) in moves.iter().enumerate() {
        let result = match point {
            Some(p) => session.make_move(*stone, *p),
            None => session.pass(*stone),
        };
        if let Err(source) = result {
            let turn = match point {
                Some(p) => format!("{} {}", stone.letter(), point_to_sgf(*p)),
                None => format!("{} pass", stone.letter()),
            };
            return Err(SgfError::IllegalMove {
                index,
                turn,
                source,
            });
        }
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GoError;

    fn simple_game() -> GameSession {
        let config = GameConfig::new(9, Ruleset::Japanese).unwrap();
        let mut game = GameSession::new(config).unwrap();
        game.make_move(Stone::Black, (2, 2)).unwrap();
        game.make_move(Stone::White, (6, 6)).unwrap();
        game.pass(Stone::Black).unwrap();
        game
    }

    #[test]
    fn exports_header_and_moves() {
        let sgf = export(&simple_game());
        assert_eq!(sgf, "(;GM[1]FF[4]SZ[9]RU[japanese]KM[6.5];B[cc];W[gg];B[])");
    }

    #[test]
    fn exports_handicap_and_result() {
        let config = GameConfig::new(9, Ruleset::Chinese)
            .unwrap()
            .with_handicap(2)
            .unwrap();
        let mut game = GameSession::new(config).unwrap();
        game.make_move(Stone::White, (4, 4)).unwrap();
        game.resign(Stone::Black).unwrap();

        let sgf = export(&game);
        assert!(sgf.contains("HA[2]"));
        assert!(sgf.contains("RE[W+Resign]"));
        // The resignation itself is not a move node
        assert!(sgf.ends_with(";W[ee])"));
    }

    #[test]
    fn import_replays_the_game() {
        let game = import("(;GM[1]FF[4]SZ[9]RU[japanese]KM[6.5];B[cc];W[gg];B[])").unwrap();
        assert_eq!(game.goban().stone_at((2, 2)), Some(Stone::Black));
        assert_eq!(game.goban().stone_at((6, 6)), Some(Stone::White));
        assert_eq!(game.turn(), Stone::White);
        assert_eq!(game.history().len(), 3);
        assert_eq!(game.config().komi, 6.5);
    }

    #[test]
    fn round_trip_preserves_the_record() {
        let game = simple_game();
        let reimported = import(&export(&game)).unwrap();
        assert_eq!(reimported.goban(), game.goban());
        assert_eq!(reimported.history(), game.history());
        assert_eq!(reimported.config(), game.config());
        assert_eq!(reimported.turn(), game.turn());
    }

    #[test]
    fn round_trip_with_handicap() {
        let config = GameConfig::new(13, Ruleset::Aga)
            .unwrap()
            .with_handicap(3)
            .unwrap();
        let mut game = GameSession::new(config).unwrap();
        game.make_move(Stone::White, (6, 6)).unwrap();

        let reimported = import(&export(&game)).unwrap();
        assert_eq!(reimported.goban(), game.goban());
        assert_eq!(reimported.config().handicap, 3);
        assert_eq!(reimported.turn(), Stone::Black);
    }

    #[test]
    fn double_pass_import_lands_in_scoring() {
        let game = import("(;GM[1]SZ[9];B[cc];W[];B[])").unwrap();
        assert_eq!(game.status(), Status::Scoring);
    }

    #[test]
    fn tt_is_a_pass() {
        let game = import("(;GM[1]SZ[9];B[tt])").unwrap();
        assert!(game.goban().is_empty());
        assert!(game.history()[0].turn.is_pass());
    }

    #[test]
    fn whitespace_is_tolerated() {
        let game = import("(\n  ;GM[1] SZ[9]\n  ;B[cc]\n  ;W[dd]\n)").unwrap();
        assert_eq!(game.history().len(), 2);
    }

    #[test]
    fn rejects_missing_open_paren() {
        assert!(matches!(
            import(";GM[1]SZ[9]"),
            Err(SgfError::UnexpectedChar { .. })
        ));
    }

    #[test]
    fn rejects_truncated_input() {
        assert_eq!(import("(;GM[1]SZ[9];B[cc"), Err(SgfError::UnexpectedEof));
    }

    #[test]
    fn rejects_bad_property_values() {
        assert!(matches!(
            import("(;GM[2]SZ[9])"),
            Err(SgfError::InvalidPropertyValue { .. })
        ));
        assert!(matches!(
            import("(;GM[1]SZ[nine])"),
            Err(SgfError::InvalidPropertyValue { .. })
        ));
        assert!(matches!(
            import("(;GM[1]SZ[9]KM[abc])"),
            Err(SgfError::InvalidPropertyValue { .. })
        ));
    }

    #[test]
    fn rejects_unsupported_board_size() {
        assert!(matches!(
            import("(;GM[1]SZ[10])"),
            Err(SgfError::Config(_))
        ));
    }

    #[test]
    fn rejects_off_board_coordinates() {
        assert!(matches!(
            import("(;GM[1]SZ[9];B[jj])"),
            Err(SgfError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn illegal_replay_fails_with_the_move_index() {
        // The second move plays on an occupied point
        let err = import("(;GM[1]SZ[9];B[cc];W[cc])").unwrap_err();
        match err {
            SgfError::IllegalMove { index, source, .. } => {
                assert_eq!(index, 1);
                assert_eq!(source, GoError::Overwrite);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn out_of_turn_replay_is_rejected() {
        let err = import("(;GM[1]SZ[9];B[cc];B[dd])").unwrap_err();
        assert!(matches!(
            err,
            SgfError::IllegalMove {
                source: GoError::OutOfTurn,
                ..
            }
        ));
    }

    #[test]
    fn coordinate_codec() {
        assert_eq!(point_to_sgf((0, 0)), "aa");
        assert_eq!(point_to_sgf((2, 2)), "cc");
        assert_eq!(point_to_sgf((8, 0)), "ia");
        assert_eq!(point_from_sgf("aa", 9).unwrap(), (0, 0));
        assert_eq!(point_from_sgf("ia", 9).unwrap(), (8, 0));
        assert!(point_from_sgf("a", 9).is_err());
        assert!(point_from_sgf("aaa", 9).is_err());
        assert!(point_from_sgf("ja", 9).is_err());
    }
}
