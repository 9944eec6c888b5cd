use arrayvec::ArrayVec;

use crate::Point;
use crate::error::GoError;
use crate::ko::Ko;
use crate::stone::Stone;

/// Capture tallies indexed by the capturing color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Captures {
    pub black: u32,
    pub white: u32,
}

impl Captures {
    pub fn get(&self, stone: Stone) -> u32 {
        match stone {
            Stone::Black => self.black,
            Stone::White => self.white,
        }
    }

    fn add(&mut self, stone: Stone, count: u32) {
        match stone {
            Stone::Black => self.black += count,
            Stone::White => self.white += count,
        }
    }
}

/// The board: a flat grid of cells (`1` Black, `-1` White, `0` empty), plus
/// capture tallies and the simple-ko lock.
///
/// `play` is pure: it returns the successor board and leaves `self`
/// untouched, so a rejected move can never leave partial state behind.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Goban {
    board: Vec<i8>,
    size: u8,
    captures: Captures,
    ko: Option<Ko>,
}

impl Goban {
    /// Create an empty square board.
    pub fn new(size: u8) -> Self {
        Goban {
            board: vec![0i8; size as usize * size as usize],
            size,
            captures: Captures::default(),
            ko: None,
        }
    }

    /// Build a board from a row-major matrix of cell values.
    pub fn from_matrix(rows: Vec<Vec<i8>>) -> Self {
        let size = rows.len() as u8;
        assert!(
            rows.iter().all(|row| row.len() == size as usize),
            "malformed board matrix"
        );
        Goban {
            board: rows.into_iter().flatten().collect(),
            size,
            captures: Captures::default(),
            ko: None,
        }
    }

    /// Restore a board from snapshot fields. The grid is authoritative; the
    /// caller is responsible for captures/ko matching it.
    pub fn from_state(board: Vec<i8>, size: u8, captures: Captures, ko: Option<Ko>) -> Self {
        assert_eq!(board.len(), size as usize * size as usize, "malformed grid");
        Goban {
            board,
            size,
            captures,
            ko,
        }
    }

    // -- Accessors --

    pub fn board(&self) -> &[i8] {
        &self.board
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn captures(&self) -> &Captures {
        &self.captures
    }

    pub fn ko(&self) -> Option<Ko> {
        self.ko
    }

    pub fn stone_at(&self, point: Point) -> Option<Stone> {
        if self.on_board(point) {
            Stone::from_int(self.board[self.idx(point)])
        } else {
            None
        }
    }

    pub fn on_board(&self, (col, row): Point) -> bool {
        col < self.size && row < self.size
    }

    pub fn is_empty(&self) -> bool {
        self.board.iter().all(|&s| s == 0)
    }

    pub fn empty_points(&self) -> Vec<Point> {
        let mut pts = Vec::new();
        for row in 0..self.size {
            for col in 0..self.size {
                if self.board[self.idx((col, row))] == 0 {
                    pts.push((col, row));
                }
            }
        }
        pts
    }

    /// Canonical serialization of the grid, used as the repetition/cache key.
    pub fn fingerprint(&self) -> String {
        self.board
            .iter()
            .map(|&v| match v.signum() {
                1 => 'b',
                -1 => 'w',
                _ => '.',
            })
            .collect()
    }

    // -- Game actions --

    /// Validate a move without applying it. Checks bounds, occupancy, ko and
    /// suicide; it shares the `place_stone` pipeline with `play`, so the two
    /// can never disagree. Positional superko is layered on by the session,
    /// which owns the position history.
    pub fn is_legal_move(&self, point: Point, stone: Stone) -> bool {
        self.place_stone(point, stone).is_ok()
    }

    /// Apply a move, returning the successor board.
    pub fn play(&self, point: Point, stone: Stone) -> Result<Goban, GoError> {
        self.play_detailed(point, stone).map(|(goban, _)| goban)
    }

    /// Apply a move, returning the successor board and the captured points.
    pub fn play_detailed(&self, point: Point, stone: Stone) -> Result<(Goban, Vec<Point>), GoError> {
        let (mut goban, dead_stones, liberties) = self.place_stone(point, stone)?;
        goban.ko = Self::detect_ko(&goban, &dead_stones, &liberties, point, stone);
        Ok((goban, dead_stones))
    }

    /// Pass: clears the ko lock in place.
    pub fn pass(&mut self) {
        self.ko = None;
    }

    /// Place a stone, resolve captures, reject ko and suicide.
    fn place_stone(
        &self,
        point: Point,
        stone: Stone,
    ) -> Result<(Goban, Vec<Point>, Vec<Point>), GoError> {
        if !self.on_board(point) {
            return Err(GoError::NotOnBoard);
        }
        if self.stone_at(point).is_some() {
            return Err(GoError::Overwrite);
        }
        if self.is_ko(point, stone) {
            return Err(GoError::KoViolation);
        }

        let mut goban = self.clone();
        goban.set_stone(point, stone);

        // Remove opposing neighbor chains left without liberties
        let mut dead_stones = Vec::new();
        for chain in goban.opponent_neighbor_chains(point) {
            if goban.chain_liberties(&chain).is_empty() {
                dead_stones.extend(chain);
            }
        }
        goban.capture_mut(&dead_stones);

        // Suicide: the placed group must end up with a liberty
        let liberties = goban.liberties(point);
        if liberties.is_empty() {
            return Err(GoError::Suicide);
        }

        Ok((goban, dead_stones, liberties))
    }

    fn capture_mut(&mut self, stones: &[Point]) {
        let Some(captured_color) = stones.first().and_then(|&p| self.stone_at(p)) else {
            return;
        };

        for &pt in stones {
            self.clear_stone(pt);
        }
        self.captures.add(captured_color.opp(), stones.len() as u32);
    }

    // -- Graph queries --

    /// On-board 4-connected neighbors.
    pub fn neighbors(&self, (col, row): Point) -> ArrayVec<Point, 4> {
        let mut result = ArrayVec::new();
        if col > 0 {
            result.push((col - 1, row));
        }
        if col + 1 < self.size {
            result.push((col + 1, row));
        }
        if row > 0 {
            result.push((col, row - 1));
        }
        if row + 1 < self.size {
            result.push((col, row + 1));
        }
        result
    }

    /// Flood-fill the maximal same-colored group containing `point`.
    pub fn chain(&self, point: Point) -> Vec<Point> {
        let mut visited = vec![false; self.board.len()];
        self.chain_from(point, &mut visited)
    }

    /// Flood-fill with a caller-provided visited bitset, so multiple chains
    /// can be collected in one scan without revisiting.
    pub(crate) fn chain_from(&self, point: Point, visited: &mut [bool]) -> Vec<Point> {
        let Some(stone) = self.stone_at(point) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        let mut stack = vec![point];

        while let Some(p) = stack.pop() {
            let vi = self.idx(p);
            if visited[vi] {
                continue;
            }
            visited[vi] = true;
            result.push(p);
            for n in self.neighbors(p) {
                if self.stone_at(n) == Some(stone) && !visited[self.idx(n)] {
                    stack.push(n);
                }
            }
        }

        result
    }

    /// Liberties of the group containing `point`.
    pub fn liberties(&self, point: Point) -> Vec<Point> {
        self.chain_liberties(&self.chain(point))
    }

    /// Liberties of a pre-computed chain.
    pub fn chain_liberties(&self, chain: &[Point]) -> Vec<Point> {
        let mut seen = vec![false; self.board.len()];
        let mut libs = Vec::new();
        for &p in chain {
            for n in self.neighbors(p) {
                let ni = self.idx(n);
                if !seen[ni] && self.stone_at(n).is_none() {
                    seen[ni] = true;
                    libs.push(n);
                }
            }
        }
        libs
    }

    fn opponent_neighbor_chains(&self, point: Point) -> Vec<Vec<Point>> {
        let Some(stone) = self.stone_at(point) else {
            return Vec::new();
        };
        let opponent = stone.opp();

        let mut chains = Vec::new();
        let mut visited = vec![false; self.board.len()];

        for n in self.neighbors(point) {
            if self.stone_at(n) != Some(opponent) || visited[self.idx(n)] {
                continue;
            }
            let ch = self.chain_from(n, &mut visited);
            if !ch.is_empty() {
                chains.push(ch);
            }
        }

        chains
    }

    // -- Eye and seki analysis --

    /// Simple eye: an empty point whose on-board neighbors are all stones of
    /// `stone`'s color.
    pub fn is_eye(&self, point: Point, stone: Stone) -> bool {
        if !self.on_board(point) || self.stone_at(point).is_some() {
            return false;
        }
        let ns = self.neighbors(point);
        !ns.is_empty() && ns.iter().all(|&n| self.stone_at(n) == Some(stone))
    }

    /// True eye: a simple eye whose neighbors all belong to a single chain
    /// with at least two liberties. An eye bordered by several distinct
    /// chains is a false eye — filling elsewhere can split it.
    pub fn is_true_eye(&self, point: Point, stone: Stone) -> bool {
        if !self.is_eye(point, stone) {
            return false;
        }
        let ns = self.neighbors(point);
        let chain = self.chain(ns[0]);
        if !ns.iter().all(|n| chain.contains(n)) {
            return false;
        }
        self.chain_liberties(&chain).len() >= 2
    }

    /// Seki test for the chain containing `point`: the chain has exactly two
    /// liberties and shares at least one of them with an adjacent opposing
    /// chain that also has exactly two. Neither side can fill first.
    pub fn is_seki_chain(&self, point: Point) -> bool {
        let Some(stone) = self.stone_at(point) else {
            return false;
        };
        let chain = self.chain(point);
        let libs = self.chain_liberties(&chain);
        if libs.len() != 2 {
            return false;
        }

        let mut visited = vec![false; self.board.len()];
        for &p in &chain {
            for n in self.neighbors(p) {
                if self.stone_at(n) != Some(stone.opp()) || visited[self.idx(n)] {
                    continue;
                }
                let opp_chain = self.chain_from(n, &mut visited);
                let opp_libs = self.chain_liberties(&opp_chain);
                if opp_libs.len() == 2 && opp_libs.iter().any(|l| libs.contains(l)) {
                    return true;
                }
            }
        }
        false
    }

    /// All stones belonging to chains locked in seki.
    pub fn seki_points(&self) -> Vec<Point> {
        let mut visited = vec![false; self.board.len()];
        let mut points = Vec::new();
        for row in 0..self.size {
            for col in 0..self.size {
                let p = (col, row);
                if visited[self.idx(p)] || self.stone_at(p).is_none() {
                    continue;
                }
                let in_seki = self.is_seki_chain(p);
                for &c in &self.chain_from(p, &mut visited) {
                    if in_seki {
                        points.push(c);
                    }
                }
            }
        }
        points
    }

    // -- Internal helpers --

    #[inline]
    fn idx(&self, (col, row): Point) -> usize {
        row as usize * self.size as usize + col as usize
    }

    pub(crate) fn set_stone(&mut self, point: Point, stone: Stone) {
        if self.on_board(point) {
            let i = self.idx(point);
            self.board[i] = stone.to_int();
        }
    }

    pub(crate) fn clear_stone(&mut self, point: Point) {
        if self.on_board(point) {
            let i = self.idx(point);
            self.board[i] = 0;
        }
    }

    fn is_ko(&self, point: Point, stone: Stone) -> bool {
        self.ko
            .is_some_and(|ko| ko.pos == point && ko.illegal == stone)
    }

    /// Simple ko: a lone stone captured exactly one stone and has exactly
    /// one liberty (the captured point). The opponent may not recapture
    /// immediately.
    fn detect_ko(
        goban: &Goban,
        dead_stones: &[Point],
        liberties: &[Point],
        point: Point,
        stone: Stone,
    ) -> Option<Ko> {
        let is_ko = dead_stones.len() == 1
            && liberties.len() == 1
            && liberties[0] == dead_stones[0]
            && goban
                .neighbors(point)
                .iter()
                .all(|&n| goban.stone_at(n) != Some(stone));

        is_ko.then(|| Ko {
            pos: dead_stones[0],
            illegal: stone.opp(),
        })
    }
}
