use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Point;
use crate::config::{GameConfig, TimeSettings, handicap_points};
use crate::error::{ConfigError, GoError};
use crate::goban::Goban;
use crate::scoring::{self, GameScore};
use crate::stone::Stone;
use crate::turn::Turn;

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GameOutcome {
    Scored(GameScore),
    Resigned { winner: Stone },
    Timeout { winner: Stone },
    /// Long-cycle repetition under rules without positional superko: the
    /// same position occurred three times, so the game has no result.
    Voided,
}

impl GameOutcome {
    pub fn winner(&self) -> Option<Stone> {
        match self {
            GameOutcome::Scored(score) => score.winner(),
            GameOutcome::Resigned { winner } | GameOutcome::Timeout { winner } => Some(*winner),
            GameOutcome::Voided => None,
        }
    }
}

/// Session lifecycle. Two consecutive passes enter `Scoring`, where dead
/// stones are marked and the score is settled; `finalize` then ends the
/// game. Resignation and timeout end it directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Status {
    Active,
    Scoring,
    Ended(GameOutcome),
}

/// One applied turn: what was played, what it captured, the fingerprint of
/// the resulting position, and the full board it replaced (for undo).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub turn: Turn,
    pub captured: Vec<Point>,
    pub fingerprint: String,
    prior: Goban,
}

/// Remaining time for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockState {
    pub main_left: Duration,
    pub periods_left: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Clocks {
    settings: TimeSettings,
    black: ClockState,
    white: ClockState,
}

impl Clocks {
    fn new(settings: TimeSettings) -> Self {
        let initial = ClockState {
            main_left: settings.main,
            periods_left: settings.byoyomi_periods,
        };
        Clocks {
            settings,
            black: initial,
            white: initial,
        }
    }

    fn get(&self, stone: Stone) -> ClockState {
        match stone {
            Stone::Black => self.black,
            Stone::White => self.white,
        }
    }

    fn get_mut(&mut self, stone: Stone) -> &mut ClockState {
        match stone {
            Stone::Black => &mut self.black,
            Stone::White => &mut self.white,
        }
    }
}

/// Deep, serializable snapshot of a session. `GameSession::restore` rebuilds
/// an identical session from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub config: GameConfig,
    pub goban: Goban,
    pub turn: Stone,
    pub status: Status,
    pub history: Vec<HistoryEntry>,
    pub redo_stack: Vec<Turn>,
    pub dead_stones: HashSet<Point>,
    pub position_counts: HashMap<String, u32>,
    clocks: Option<Clocks>,
}

/// A full game: board, turn order, history with undo/redo, repetition
/// tracking, scoring phase and clock bookkeeping.
///
/// The session owns the position history, so it is the layer that enforces
/// positional superko (the board itself only knows simple ko). Wall-clock
/// scheduling stays outside: callers measure elapsed time per move and
/// report it through `record_elapsed`.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSession {
    config: GameConfig,
    goban: Goban,
    turn: Stone,
    status: Status,
    history: Vec<HistoryEntry>,
    redo_stack: Vec<Turn>,
    dead_stones: HashSet<Point>,
    position_counts: HashMap<String, u32>,
    clocks: Option<Clocks>,
    score_memo: Option<(String, GameScore)>,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        let config = config.validated()?;

        let mut goban = Goban::new(config.size);
        if let Some(points) = handicap_points(config.size, config.handicap) {
            for point in points {
                goban.set_stone(point, Stone::Black);
            }
        }
        // With handicap stones placed, White moves first
        let turn = if config.handicap >= 2 {
            Stone::White
        } else {
            Stone::Black
        };

        let mut position_counts = HashMap::new();
        position_counts.insert(goban.fingerprint(), 1);

        let clocks = config.time.map(Clocks::new);

        Ok(GameSession {
            config,
            goban,
            turn,
            status: Status::Active,
            history: Vec::new(),
            redo_stack: Vec::new(),
            dead_stones: HashSet::new(),
            position_counts,
            clocks,
            score_memo: None,
        })
    }

    // -- Accessors --

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn goban(&self) -> &Goban {
        &self.goban
    }

    /// The color to move next.
    pub fn turn(&self) -> Stone {
        self.turn
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn dead_stones(&self) -> &HashSet<Point> {
        &self.dead_stones
    }

    pub fn time_remaining(&self, stone: Stone) -> Option<ClockState> {
        self.clocks.map(|c| c.get(stone))
    }

    /// Fingerprints of every position this game has visited, for layering
    /// repetition constraints onto an external move search.
    pub fn visited_positions(&self) -> HashSet<String> {
        self.position_counts.keys().cloned().collect()
    }

    // -- Moves --

    /// Full legality check for a prospective move, including turn order and
    /// the ruleset's repetition rule. Agrees with `make_move` by sharing its
    /// checks.
    pub fn is_valid_move(&self, stone: Stone, point: Point) -> bool {
        self.status == Status::Active
            && stone == self.turn
            && match self.goban.play(point, stone) {
                Ok(successor) => !self.is_repetition_violation(&successor.fingerprint()),
                Err(_) => false,
            }
    }

    pub fn make_move(&mut self, stone: Stone, point: Point) -> Result<(), GoError> {
        self.apply_play(stone, point, true)
    }

    pub fn pass(&mut self, stone: Stone) -> Result<(), GoError> {
        self.apply_pass(stone, true)
    }

    pub fn resign(&mut self, stone: Stone) -> Result<(), GoError> {
        match self.status {
            Status::Active | Status::Scoring => {}
            Status::Ended(_) => return Err(GoError::GameOver),
        }

        self.history.push(HistoryEntry {
            turn: Turn::resign(stone),
            captured: Vec::new(),
            fingerprint: self.goban.fingerprint(),
            prior: self.goban.clone(),
        });
        self.redo_stack.clear();
        let outcome = GameOutcome::Resigned {
            winner: stone.opp(),
        };
        debug!(%stone, "resignation");
        self.status = Status::Ended(outcome);
        Ok(())
    }

    fn apply_play(&mut self, stone: Stone, point: Point, clear_redo: bool) -> Result<(), GoError> {
        if self.status != Status::Active {
            return Err(GoError::GameOver);
        }
        if stone != self.turn {
            return Err(GoError::OutOfTurn);
        }

        let (successor, captured) = self.goban.play_detailed(point, stone)?;
        let fingerprint = successor.fingerprint();
        let prior_count = self.position_counts.get(&fingerprint).copied().unwrap_or(0);
        if prior_count > 0 && self.config.ruleset.enforces_superko() {
            return Err(GoError::SuperkoViolation);
        }

        let prior = std::mem::replace(&mut self.goban, successor);
        self.history.push(HistoryEntry {
            turn: Turn::play(stone, point),
            captured,
            fingerprint: fingerprint.clone(),
            prior,
        });
        self.position_counts.insert(fingerprint, prior_count + 1);
        if clear_redo {
            self.redo_stack.clear();
        }
        self.turn = stone.opp();

        // Under simple-ko-only rules a long cycle (triple ko and friends)
        // can revisit a position indefinitely; the third occurrence voids
        // the game rather than looping forever.
        if prior_count + 1 >= 3 {
            debug!("position repeated three times, voiding the game");
            self.status = Status::Ended(GameOutcome::Voided);
        }
        Ok(())
    }

    fn apply_pass(&mut self, stone: Stone, clear_redo: bool) -> Result<(), GoError> {
        if self.status != Status::Active {
            return Err(GoError::GameOver);
        }
        if stone != self.turn {
            return Err(GoError::OutOfTurn);
        }

        let prior = self.goban.clone();
        self.goban.pass();
        self.history.push(HistoryEntry {
            turn: Turn::pass(stone),
            captured: Vec::new(),
            fingerprint: self.goban.fingerprint(),
            prior,
        });
        if clear_redo {
            self.redo_stack.clear();
        }
        self.turn = stone.opp();

        let double_pass = self
            .history
            .iter()
            .rev()
            .nth(1)
            .is_some_and(|entry| entry.turn.is_pass());
        if double_pass {
            debug!("two consecutive passes, entering scoring");
            self.status = Status::Scoring;
        }
        Ok(())
    }

    fn is_repetition_violation(&self, fingerprint: &str) -> bool {
        self.config.ruleset.enforces_superko()
            && self.position_counts.get(fingerprint).copied().unwrap_or(0) > 0
    }

    // -- Undo / redo --

    /// Take back the last turn, restoring the full prior board (grid,
    /// captures and ko lock at once). Leaves the scoring phase if it was
    /// entered. Returns the turn that was undone.
    pub fn undo(&mut self) -> Option<Turn> {
        if matches!(self.status, Status::Ended(_)) {
            return None;
        }
        let entry = self.history.pop()?;

        if entry.turn.is_play()
            && let Some(count) = self.position_counts.get_mut(&entry.fingerprint)
        {
            *count -= 1;
            if *count == 0 {
                self.position_counts.remove(&entry.fingerprint);
            }
        }

        self.goban = entry.prior;
        self.turn = entry.turn.stone;
        self.status = Status::Active;
        self.dead_stones.clear();
        self.redo_stack.push(entry.turn.clone());
        Some(entry.turn)
    }

    /// Replay the most recently undone turn. Returns it on success.
    pub fn redo(&mut self) -> Option<Turn> {
        let turn = self.redo_stack.pop()?;
        let result = match turn.pos {
            Some(point) if turn.is_play() => self.apply_play(turn.stone, point, false),
            _ if turn.is_pass() => self.apply_pass(turn.stone, false),
            _ => {
                self.redo_stack.push(turn);
                return None;
            }
        };
        match result {
            Ok(()) => Some(turn),
            Err(_) => {
                self.redo_stack.push(turn);
                None
            }
        }
    }

    // -- Scoring phase --

    /// Replace the dead-stone marks with the engine's prediction. Only
    /// meaningful in the scoring phase; marks remain editable afterwards
    /// via `toggle_dead`.
    pub fn mark_dead(&mut self) -> Result<(), GoError> {
        if self.status != Status::Scoring {
            return Err(GoError::GameOver);
        }
        self.dead_stones = scoring::predict_dead_stones(&self.goban);
        Ok(())
    }

    /// Flip the life/death mark of the chain at `point`.
    pub fn toggle_dead(&mut self, point: Point) -> Result<(), GoError> {
        if self.status != Status::Scoring {
            return Err(GoError::GameOver);
        }
        scoring::toggle_dead_chain(&self.goban, &mut self.dead_stones, point);
        Ok(())
    }

    /// Current score given the dead-stone marks. Memoized on the position
    /// fingerprint plus the marks, since the computation is pure.
    pub fn calculate_score(&mut self) -> GameScore {
        let key = self.score_key();
        if let Some((memo_key, score)) = &self.score_memo
            && *memo_key == key
        {
            return *score;
        }

        let score = scoring::score(
            &self.goban,
            &self.dead_stones,
            self.config.komi,
            self.config.ruleset,
            self.config.handicap,
        );
        self.score_memo = Some((key, score));
        score
    }

    fn score_key(&self) -> String {
        let mut marks: Vec<Point> = self.dead_stones.iter().copied().collect();
        marks.sort();
        format!("{}|{marks:?}", self.goban.fingerprint())
    }

    /// Settle the game from the scoring phase.
    pub fn finalize(&mut self) -> Result<GameOutcome, GoError> {
        if self.status != Status::Scoring {
            return Err(GoError::GameOver);
        }
        let score = self.calculate_score();
        let outcome = GameOutcome::Scored(score);
        debug!(result = %score.result(), "game finished");
        self.status = Status::Ended(outcome);
        Ok(outcome)
    }

    /// The outcome, once the game has ended.
    pub fn outcome(&self) -> Option<GameOutcome> {
        match self.status {
            Status::Ended(outcome) => Some(outcome),
            _ => None,
        }
    }

    // -- Clock bookkeeping --

    /// Charge `elapsed` thinking time to `stone`. Main time is consumed
    /// first, then byoyomi periods (a period is lost only when a move
    /// overruns it; otherwise it resets). Returns the outcome if the flag
    /// fell. No-op without time settings or after the game has ended.
    pub fn record_elapsed(&mut self, stone: Stone, elapsed: Duration) -> Option<GameOutcome> {
        if matches!(self.status, Status::Ended(_)) {
            return None;
        }
        let clocks = self.clocks.as_mut()?;
        let settings = clocks.settings;
        let clock = clocks.get_mut(stone);

        if elapsed <= clock.main_left {
            clock.main_left -= elapsed;
            return None;
        }

        let overflow = elapsed - clock.main_left;
        clock.main_left = Duration::ZERO;

        let timed_out = if clock.periods_left == 0 || settings.byoyomi_period.is_zero() {
            true
        } else {
            let consumed = (overflow.as_nanos() / settings.byoyomi_period.as_nanos()) as u32;
            if consumed >= clock.periods_left {
                true
            } else {
                clock.periods_left -= consumed;
                false
            }
        };

        if timed_out {
            clock.periods_left = 0;
            let outcome = GameOutcome::Timeout {
                winner: stone.opp(),
            };
            debug!(%stone, "flag fell");
            self.status = Status::Ended(outcome);
            return Some(outcome);
        }
        None
    }

    // -- Snapshots --

    pub fn snapshot(&self) -> SessionState {
        SessionState {
            config: self.config.clone(),
            goban: self.goban.clone(),
            turn: self.turn,
            status: self.status,
            history: self.history.clone(),
            redo_stack: self.redo_stack.clone(),
            dead_stones: self.dead_stones.clone(),
            position_counts: self.position_counts.clone(),
            clocks: self.clocks,
        }
    }

    pub fn restore(state: SessionState) -> Result<Self, ConfigError> {
        let config = state.config.validated()?;
        Ok(GameSession {
            config,
            goban: state.goban,
            turn: state.turn,
            status: state.status,
            history: state.history,
            redo_stack: state.redo_stack,
            dead_stones: state.dead_stones,
            position_counts: state.position_counts,
            clocks: state.clocks,
            score_memo: None,
        })
    }
}
