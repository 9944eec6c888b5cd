use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::Point;
use crate::config::Ruleset;
use crate::goban::Goban;
use crate::stone::Stone;

// ---------------------------------------------------------------------------
// Playout board — lightweight mutable grid for dead-stone estimation
// ---------------------------------------------------------------------------

struct PlayoutBoard {
    data: Vec<i8>,
    size: usize,
}

impl PlayoutBoard {
    fn from_goban(goban: &Goban) -> Self {
        Self {
            data: goban.board().to_vec(),
            size: goban.size() as usize,
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.size * self.size
    }

    fn neighbors(&self, v: usize) -> arrayvec::ArrayVec<usize, 4> {
        let mut result = arrayvec::ArrayVec::new();
        let x = v % self.size;
        let y = v / self.size;
        if x > 0 {
            result.push(v - 1);
        }
        if x + 1 < self.size {
            result.push(v + 1);
        }
        if y > 0 {
            result.push(v - self.size);
        }
        if y + 1 < self.size {
            result.push(v + self.size);
        }
        result
    }

    /// Early-exit liberty probe for the chain containing `v`.
    fn has_liberties(&self, v: usize, visited: &mut [bool]) -> bool {
        let sign = self.data[v];
        let mut stack = vec![v];
        while let Some(u) = stack.pop() {
            if visited[u] {
                continue;
            }
            visited[u] = true;
            for n in self.neighbors(u) {
                if self.data[n] == 0 {
                    return true;
                }
                if self.data[n] == sign && !visited[n] {
                    stack.push(n);
                }
            }
        }
        false
    }

    fn get_chain(&self, v: usize) -> Vec<usize> {
        let sign = self.data[v];
        let mut visited = vec![false; self.len()];
        let mut chain = Vec::new();
        let mut stack = vec![v];
        while let Some(u) = stack.pop() {
            if visited[u] {
                continue;
            }
            visited[u] = true;
            chain.push(u);
            for n in self.neighbors(u) {
                if self.data[n] == sign && !visited[n] {
                    stack.push(n);
                }
            }
        }
        chain
    }

    /// Pseudo-legal move for playouts: rejects eye fills, suicide, and
    /// immediate ko-like recaptures. Returns captured vertices on success.
    fn make_pseudo_move(&mut self, sign: i8, v: usize) -> Option<Vec<usize>> {
        let neighbors = self.neighbors(v);
        if neighbors.iter().all(|&n| self.data[n] == sign) {
            return None;
        }

        self.data[v] = sign;

        let opp = -sign;
        let mut captured = Vec::new();
        for &n in &neighbors {
            if self.data[n] == opp {
                let mut vis = vec![false; self.len()];
                if !self.has_liberties(n, &mut vis) {
                    let chain = self.get_chain(n);
                    for &c in &chain {
                        self.data[c] = 0;
                    }
                    captured.extend(chain);
                }
            }
        }

        if captured.is_empty() {
            let mut vis = vec![false; self.len()];
            if !self.has_liberties(v, &mut vis) {
                self.data[v] = 0;
                return None;
            }
        }

        // Lone stone retaking a lone stone with one liberty: treat as ko
        if captured.len() == 1 {
            let nbrs = self.neighbors(v);
            let is_single = nbrs.iter().all(|&n| self.data[n] != sign);
            let lib_count = nbrs.iter().filter(|&&n| self.data[n] == 0).count();
            if is_single && lib_count == 1 {
                self.data[v] = 0;
                self.data[captured[0]] = opp;
                return None;
            }
        }

        Some(captured)
    }
}

/// Play one random game to completion, returning the final cell signs.
fn play_till_end(goban: &Goban, starting_sign: i8, rng: &mut StdRng) -> Vec<i8> {
    let mut board = PlayoutBoard::from_goban(goban);
    let size = board.len();

    let mut empty: Vec<usize> = (0..size).filter(|&i| board.data[i] == 0).collect();
    let mut sign = starting_sign;
    let mut consecutive_passes = 0;

    // Ply cap: pseudo-legal playouts can shuffle stones around capture
    // cycles, so the board filling up is not a termination guarantee.
    for _ in 0..3 * size {
        if consecutive_passes >= 2 || empty.is_empty() {
            break;
        }
        let mut played = false;
        let mut attempts = empty.len();

        while attempts > 0 {
            let idx = rng.random_range(0..empty.len());
            let v = empty[idx];

            if board.data[v] != 0 {
                empty.swap_remove(idx);
                attempts = attempts.saturating_sub(1);
                continue;
            }

            if let Some(captured) = board.make_pseudo_move(sign, v) {
                empty.swap_remove(idx);
                empty.extend(captured);
                played = true;
                break;
            }
            attempts -= 1;
        }

        if played {
            consecutive_passes = 0;
        } else {
            consecutive_passes += 1;
        }

        sign = -sign;
    }

    // Patch leftover empties with a neighboring color
    for i in 0..size {
        if board.data[i] == 0 {
            for n in board.neighbors(i) {
                if board.data[n] != 0 {
                    board.data[i] = board.data[n];
                    break;
                }
            }
        }
    }

    board.data
}

/// Per-vertex ownership probability from random playouts, in [-1, +1]
/// (+1 certainly Black, -1 certainly White). Seeded, so deterministic.
fn ownership_probability(goban: &Goban, iterations: usize) -> Vec<f64> {
    let size = goban.size() as usize * goban.size() as usize;
    let mut black_wins = vec![0i32; size];
    let mut rng = StdRng::seed_from_u64(0x5E41);

    for i in 0..iterations {
        let starting_sign = if i % 2 == 0 { 1 } else { -1 };
        let result = play_till_end(goban, starting_sign, &mut rng);
        for (v, &s) in result.iter().enumerate() {
            black_wins[v] += s.signum() as i32;
        }
    }

    black_wins
        .iter()
        .map(|&bw| bw as f64 / iterations as f64)
        .collect()
}

// ---------------------------------------------------------------------------
// Territory
// ---------------------------------------------------------------------------

/// Compute territory ownership for each point.
///
/// Returns a flat map in the same layout as `goban.board()`: `1` Black
/// territory, `-1` White territory, `0` neutral. Dead-marked stones are
/// lifted off the board first, so their cells can become territory. Regions
/// touching both colors, or touching a chain locked in seki, stay neutral.
pub fn territory(goban: &Goban, dead_stones: &HashSet<Point>) -> Vec<i8> {
    let size = goban.size();
    let cells = size as usize * size as usize;

    let mut virtual_board = goban.board().to_vec();
    for &(col, row) in dead_stones {
        let idx = row as usize * size as usize + col as usize;
        if idx < cells {
            virtual_board[idx] = 0;
        }
    }
    let virtual_goban = Goban::from_state(virtual_board, size, *goban.captures(), None);

    let seki: HashSet<Point> = virtual_goban.seki_points().into_iter().collect();

    let mut ownership = vec![0i8; cells];
    let mut visited = vec![false; cells];

    for y in 0..size {
        for x in 0..size {
            let idx = y as usize * size as usize + x as usize;
            if visited[idx] || virtual_goban.stone_at((x, y)).is_some() {
                continue;
            }

            let mut region = Vec::new();
            let mut border_colors: u8 = 0; // bit 0 = Black, bit 1 = White
            let mut touches_seki = false;
            let mut stack = vec![(x, y)];

            while let Some(p) = stack.pop() {
                let pi = p.1 as usize * size as usize + p.0 as usize;
                if visited[pi] {
                    continue;
                }
                visited[pi] = true;
                region.push(pi);

                for n in virtual_goban.neighbors(p) {
                    match virtual_goban.stone_at(n) {
                        Some(Stone::Black) => border_colors |= 1,
                        Some(Stone::White) => border_colors |= 2,
                        None => {
                            if !visited[n.1 as usize * size as usize + n.0 as usize] {
                                stack.push(n);
                            }
                            continue;
                        }
                    }
                    if seki.contains(&n) {
                        touches_seki = true;
                    }
                }
            }

            let owner = match border_colors {
                1 if !touches_seki => 1i8,
                2 if !touches_seki => -1i8,
                _ => 0i8,
            };

            for &pi in &region {
                ownership[pi] = owner;
            }
        }
    }

    ownership
}

// ---------------------------------------------------------------------------
// Benson's algorithm (unconditional life)
// ---------------------------------------------------------------------------

/// All stones of `stone`'s color that are unconditionally alive: their chains
/// have at least two vital enclosed regions (empty regions bordered entirely
/// by friendly chains, every point of which is a liberty of the chain).
pub fn find_unconditionally_alive(goban: &Goban, stone: Stone) -> HashSet<Point> {
    let size = goban.size();
    let cells = size as usize * size as usize;

    let mut chain_visited = vec![false; cells];
    let mut chains: Vec<Vec<Point>> = Vec::new();

    for y in 0..size {
        for x in 0..size {
            let idx = y as usize * size as usize + x as usize;
            if chain_visited[idx] || goban.stone_at((x, y)) != Some(stone) {
                continue;
            }
            chains.push(goban.chain_from((x, y), &mut chain_visited));
        }
    }

    if chains.is_empty() {
        return HashSet::new();
    }

    let mut point_to_chain = vec![usize::MAX; cells];
    for (ci, chain) in chains.iter().enumerate() {
        for &(cx, cy) in chain {
            point_to_chain[cy as usize * size as usize + cx as usize] = ci;
        }
    }

    let chain_sets: Vec<HashSet<Point>> = chains
        .iter()
        .map(|chain| chain.iter().copied().collect())
        .collect();
    let mut chain_alive = vec![true; chains.len()];

    // Iteratively remove chains with fewer than two vital regions
    loop {
        let regions = find_enclosed_regions(goban, stone, &chains, &chain_alive, &point_to_chain);

        let mut vital_counts = vec![0usize; chains.len()];
        for region in &regions {
            for &ci in &region.bordering_chains {
                if is_vital_for(goban, region, &chain_sets[ci]) {
                    vital_counts[ci] += 1;
                }
            }
        }

        let mut changed = false;
        for ci in 0..chains.len() {
            if chain_alive[ci] && vital_counts[ci] < 2 {
                chain_alive[ci] = false;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    let mut alive_points = HashSet::new();
    for (ci, chain) in chains.iter().enumerate() {
        if chain_alive[ci] {
            alive_points.extend(chain.iter().copied());
        }
    }
    alive_points
}

struct EnclosedRegion {
    points: Vec<Point>,
    bordering_chains: Vec<usize>,
}

/// Empty regions bordered entirely by currently-alive chains of `stone`.
fn find_enclosed_regions(
    goban: &Goban,
    stone: Stone,
    chains: &[Vec<Point>],
    chain_alive: &[bool],
    point_to_chain: &[usize],
) -> Vec<EnclosedRegion> {
    let size = goban.size();
    let cells = size as usize * size as usize;
    let mut visited = vec![false; cells];
    let mut regions = Vec::new();

    for y in 0..size {
        for x in 0..size {
            let idx = y as usize * size as usize + x as usize;
            if visited[idx] || goban.stone_at((x, y)).is_some() {
                continue;
            }

            let mut region_points = Vec::new();
            let mut bordering_chain_set = HashSet::new();
            let mut is_enclosed = true;
            let mut stack = vec![(x, y)];

            while let Some(p) = stack.pop() {
                let pi = p.1 as usize * size as usize + p.0 as usize;
                if visited[pi] {
                    continue;
                }
                visited[pi] = true;
                region_points.push(p);

                for n in goban.neighbors(p) {
                    let ni = n.1 as usize * size as usize + n.0 as usize;
                    match goban.stone_at(n) {
                        Some(s) if s == stone => {
                            let ci = point_to_chain[ni];
                            if ci < chains.len() && chain_alive[ci] {
                                bordering_chain_set.insert(ci);
                            } else {
                                is_enclosed = false;
                            }
                        }
                        Some(_) => is_enclosed = false,
                        None => {
                            if !visited[ni] {
                                stack.push(n);
                            }
                        }
                    }
                }
            }

            if is_enclosed && !region_points.is_empty() {
                regions.push(EnclosedRegion {
                    points: region_points,
                    bordering_chains: bordering_chain_set.into_iter().collect(),
                });
            }
        }
    }

    regions
}

/// A region is vital for a chain if every empty point in it is a liberty of
/// that chain.
fn is_vital_for(goban: &Goban, region: &EnclosedRegion, chain_set: &HashSet<Point>) -> bool {
    region
        .points
        .iter()
        .all(|&rp| goban.neighbors(rp).iter().any(|n| chain_set.contains(n)))
}

// ---------------------------------------------------------------------------
// Dead-stone marking and prediction
// ---------------------------------------------------------------------------

/// Toggle the whole chain at `point` between dead and alive in the mark set.
/// No-op on empty points.
pub fn toggle_dead_chain(goban: &Goban, dead_stones: &mut HashSet<Point>, point: Point) {
    if goban.stone_at(point).is_none() {
        return;
    }

    let chain = goban.chain(point);
    if chain.iter().any(|pt| dead_stones.contains(pt)) {
        for pt in &chain {
            dead_stones.remove(pt);
        }
    } else {
        dead_stones.extend(chain);
    }
}

/// Advisory dead-stone prediction: Benson-alive chains are never dead; other
/// chains are dead when they sit in opponent Benson territory, have no
/// liberties left, or their liberties are firmly owned by the opponent in
/// random playouts. Authoritative scoring uses the explicitly marked set,
/// not this prediction. Seki chains are never predicted dead.
pub fn predict_dead_stones(goban: &Goban) -> HashSet<Point> {
    let mut alive = find_unconditionally_alive(goban, Stone::Black);
    alive.extend(find_unconditionally_alive(goban, Stone::White));

    let size = goban.size();
    let cells = size as usize * size as usize;
    let seki: HashSet<Point> = goban.seki_points().into_iter().collect();

    // Phase 1: territory of a board reduced to Benson-alive stones. Stones
    // sitting in the opponent's unconditional territory are dead.
    let mut simplified = vec![0i8; cells];
    for &(x, y) in &alive {
        if let Some(s) = goban.stone_at((x, y)) {
            simplified[y as usize * size as usize + x as usize] = s.to_int();
        }
    }
    let simplified_goban = Goban::from_state(simplified, size, *goban.captures(), None);
    let ownership = territory(&simplified_goban, &HashSet::new());

    let mut dead = HashSet::new();
    for y in 0..size {
        for x in 0..size {
            if alive.contains(&(x, y)) || seki.contains(&(x, y)) {
                continue;
            }
            if let Some(stone) = goban.stone_at((x, y)) {
                let idx = y as usize * size as usize + x as usize;
                if ownership[idx] == stone.opp().to_int() {
                    dead.insert((x, y));
                }
            }
        }
    }

    // Phase 2: random-playout ownership of each remaining chain's liberties
    let prob = ownership_probability(goban, 100);
    let mut visited = vec![false; cells];

    for y in 0..size {
        for x in 0..size {
            let idx = y as usize * size as usize + x as usize;
            if visited[idx] {
                continue;
            }
            let Some(stone) = goban.stone_at((x, y)) else {
                continue;
            };
            let chain = goban.chain_from((x, y), &mut visited);

            if chain
                .iter()
                .any(|pt| alive.contains(pt) || dead.contains(pt) || seki.contains(pt))
            {
                continue;
            }

            let mut lib_seen = vec![false; cells];
            let mut lib_prob_sum = 0.0;
            let mut lib_count = 0usize;
            for &(cx, cy) in &chain {
                for n in goban.neighbors((cx, cy)) {
                    let ni = n.1 as usize * size as usize + n.0 as usize;
                    if goban.stone_at(n).is_none() && !lib_seen[ni] {
                        lib_seen[ni] = true;
                        lib_prob_sum += prob[ni];
                        lib_count += 1;
                    }
                }
            }

            if lib_count == 0 {
                dead.extend(chain.iter().copied());
                continue;
            }

            let avg = lib_prob_sum / lib_count as f64;
            if stone.to_int() as f64 * avg < 0.0 {
                dead.extend(chain.iter().copied());
            }
        }
    }

    dead
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// Per-color point breakdown. Which fields count toward the total depends on
/// the ruleset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerPoints {
    /// Empty points wholly bordered by this color (seki-excluded).
    pub territory: u32,
    /// Stones on the board after dead removal (area rulesets).
    pub stones: u32,
    /// Prisoners plus dead opponent stones (territory rulesets).
    pub captures: u32,
}

/// Final score under a given ruleset. A pure function of the board, the
/// capture tallies, the dead marks, komi and handicap — safe to memoize by
/// that tuple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameScore {
    pub black: PlayerPoints,
    pub white: PlayerPoints,
    pub komi: f64,
    pub ruleset: Ruleset,
    /// AGA handicap compensation credited to White (one point per handicap
    /// stone beyond the first).
    pub handicap_compensation: f64,
}

impl GameScore {
    pub fn black_total(&self) -> f64 {
        match self.ruleset {
            Ruleset::Japanese => (self.black.territory + self.black.captures) as f64,
            Ruleset::Chinese | Ruleset::Aga => (self.black.territory + self.black.stones) as f64,
        }
    }

    pub fn white_total(&self) -> f64 {
        let base = match self.ruleset {
            Ruleset::Japanese => (self.white.territory + self.white.captures) as f64,
            Ruleset::Chinese | Ruleset::Aga => (self.white.territory + self.white.stones) as f64,
        };
        let compensation = match self.ruleset {
            Ruleset::Aga => self.handicap_compensation,
            _ => 0.0,
        };
        base + self.komi + compensation
    }

    /// The winner, or `None` on an exact tie.
    pub fn winner(&self) -> Option<Stone> {
        let diff = self.black_total() - self.white_total();
        if diff > 0.0 {
            Some(Stone::Black)
        } else if diff < 0.0 {
            Some(Stone::White)
        } else {
            None
        }
    }

    /// Result tag: "B+n", "W+n", or "Draw".
    pub fn result(&self) -> String {
        let diff = self.black_total() - self.white_total();
        if diff > 0.0 {
            format!("B+{diff}")
        } else if diff < 0.0 {
            format!("W+{}", -diff)
        } else {
            "Draw".to_string()
        }
    }
}

/// Score a finished board.
///
/// - Japanese: territory + prisoners (including dead marks), komi to White.
/// - Chinese: territory + stones remaining after dead removal, komi to White.
/// - AGA: Chinese-style area plus White's handicap compensation.
pub fn score(
    goban: &Goban,
    dead_stones: &HashSet<Point>,
    komi: f64,
    ruleset: Ruleset,
    handicap: u8,
) -> GameScore {
    let ownership = territory(goban, dead_stones);

    let mut black_territory = 0u32;
    let mut white_territory = 0u32;
    for &o in &ownership {
        match o {
            1 => black_territory += 1,
            -1 => white_territory += 1,
            _ => {}
        }
    }

    let mut dead_black = 0u32;
    let mut dead_white = 0u32;
    for &pt in dead_stones {
        match goban.stone_at(pt) {
            Some(Stone::Black) => dead_black += 1,
            Some(Stone::White) => dead_white += 1,
            None => {}
        }
    }

    let mut black_stones = 0u32;
    let mut white_stones = 0u32;
    for row in 0..goban.size() {
        for col in 0..goban.size() {
            let p = (col, row);
            if dead_stones.contains(&p) {
                continue;
            }
            match goban.stone_at(p) {
                Some(Stone::Black) => black_stones += 1,
                Some(Stone::White) => white_stones += 1,
                None => {}
            }
        }
    }

    let handicap_compensation = handicap.saturating_sub(1) as f64;

    GameScore {
        black: PlayerPoints {
            territory: black_territory,
            stones: black_stones,
            captures: goban.captures().get(Stone::Black) + dead_white,
        },
        white: PlayerPoints {
            territory: white_territory,
            stones: white_stones,
            captures: goban.captures().get(Stone::White) + dead_black,
        },
        komi,
        ruleset,
        handicap_compensation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goban::Captures;

    fn goban_from_layout(layout: &[&str]) -> Goban {
        let rows: Vec<Vec<i8>> = layout
            .iter()
            .map(|row| {
                row.chars()
                    .map(|c| match c {
                        'B' => Stone::Black.to_int(),
                        'W' => Stone::White.to_int(),
                        _ => 0,
                    })
                    .collect()
            })
            .collect();
        Goban::from_matrix(rows)
    }

    // -- Territory --

    #[test]
    fn empty_board_is_all_neutral() {
        let goban = Goban::new(9);
        let ownership = territory(&goban, &HashSet::new());
        assert!(ownership.iter().all(|&o| o == 0));
    }

    #[test]
    fn corner_territory() {
        let goban = goban_from_layout(&["++B+", "++B+", "BBB+", "++++"]);
        let ownership = territory(&goban, &HashSet::new());
        for idx in [0, 1, 4, 5] {
            assert_eq!(ownership[idx], 1, "index {idx} should be Black territory");
        }
    }

    #[test]
    fn dame_is_neutral() {
        let goban = goban_from_layout(&["B+W", "B+W", "B+W"]);
        let ownership = territory(&goban, &HashSet::new());
        for row in 0..3 {
            assert_eq!(ownership[row * 3 + 1], 0);
        }
        assert_eq!(ownership[0], 0); // left column is occupied, not territory
    }

    #[test]
    fn split_board_territories() {
        let goban = goban_from_layout(&["+B+W+", "+B+W+", "+B+W+", "+B+W+", "+B+W+"]);
        let ownership = territory(&goban, &HashSet::new());
        for row in 0..5 {
            assert_eq!(ownership[row * 5], 1);
            assert_eq!(ownership[row * 5 + 2], 0);
            assert_eq!(ownership[row * 5 + 4], -1);
        }
    }

    #[test]
    fn dead_marks_convert_to_territory() {
        let goban = goban_from_layout(&["BBB", "BWB", "BBB"]);
        let mut dead = HashSet::new();
        dead.insert((1u8, 1u8));
        let ownership = territory(&goban, &dead);
        assert_eq!(ownership[4], 1);
    }

    #[test]
    fn unmarked_stone_keeps_its_cell() {
        let goban = goban_from_layout(&["BBB", "BWB", "BBB"]);
        let ownership = territory(&goban, &HashSet::new());
        assert_eq!(ownership[4], 0);
    }

    #[test]
    fn seki_region_is_neutral() {
        // Same corner seki as the goban tests: shared liberties at (1,0)
        // and (1,1) must not count as territory for either side.
        let goban = goban_from_layout(&[
            "B+WB+", //
            "B+WB+", //
            "WWWB+", //
            "BBBB+", //
            "+++++",
        ]);
        let ownership = territory(&goban, &HashSet::new());
        assert_eq!(ownership[1], 0, "shared seki liberty (1,0)");
        assert_eq!(ownership[6], 0, "shared seki liberty (1,1)");
    }

    // -- Benson --

    #[test]
    fn two_eyed_group_is_alive() {
        let goban = goban_from_layout(&["BBBBB", "B+B+B", "BBBBB"]);
        let alive = find_unconditionally_alive(&goban, Stone::Black);
        for y in 0..3u8 {
            for x in 0..5u8 {
                if goban.stone_at((x, y)) == Some(Stone::Black) {
                    assert!(alive.contains(&(x, y)), "({x},{y}) should be alive");
                }
            }
        }
    }

    #[test]
    fn one_eyed_group_is_not_alive() {
        let goban = goban_from_layout(&["BBB", "B+B", "BBB"]);
        let alive = find_unconditionally_alive(&goban, Stone::Black);
        assert!(alive.is_empty());
    }

    #[test]
    fn empty_board_has_no_alive_groups() {
        let goban = Goban::new(9);
        assert!(find_unconditionally_alive(&goban, Stone::Black).is_empty());
        assert!(find_unconditionally_alive(&goban, Stone::White).is_empty());
    }

    // -- Dead-stone prediction --

    #[test]
    fn stone_behind_alive_wall_is_predicted_dead() {
        // The top black group has two vital eyes; the lone white stone sits
        // in territory that only the alive group borders.
        let goban = goban_from_layout(&["BBBBB", "B+B+B", "BBBBB", "++W++", "+++++"]);
        let dead = predict_dead_stones(&goban);
        assert!(dead.contains(&(2u8, 3u8)));
        for y in 0..5u8 {
            for x in 0..5u8 {
                if goban.stone_at((x, y)) == Some(Stone::Black) {
                    assert!(!dead.contains(&(x, y)), "({x},{y}) wrongly predicted dead");
                }
            }
        }
    }

    #[test]
    fn prediction_is_deterministic() {
        let goban = goban_from_layout(&["BBBBB", "B+B+B", "BBBBB", "++W++", "+++++"]);
        assert_eq!(predict_dead_stones(&goban), predict_dead_stones(&goban));
    }

    // -- Dead marking --

    #[test]
    fn toggle_marks_and_unmarks_whole_chain() {
        let goban = goban_from_layout(&["+++++", "+BWW+", "+BWW+", "+++++", "+++++"]);
        let mut dead = HashSet::new();
        toggle_dead_chain(&goban, &mut dead, (2, 1));
        for p in [(2u8, 1u8), (3, 1), (2, 2), (3, 2)] {
            assert!(dead.contains(&p));
        }
        assert!(!dead.contains(&(1u8, 1u8)));

        toggle_dead_chain(&goban, &mut dead, (3, 2));
        assert!(dead.is_empty());
    }

    #[test]
    fn toggle_on_empty_point_is_noop() {
        let goban = Goban::new(9);
        let mut dead = HashSet::new();
        toggle_dead_chain(&goban, &mut dead, (4, 4));
        assert!(dead.is_empty());
    }

    // -- Scores --

    #[test]
    fn japanese_score_counts_territory_and_captures() {
        let goban = goban_from_layout(&["BBB", "BWB", "BBB"]);
        let mut dead = HashSet::new();
        dead.insert((1u8, 1u8));
        let gs = score(&goban, &dead, 0.0, Ruleset::Japanese, 0);

        assert_eq!(gs.black.territory, 1);
        assert_eq!(gs.black.captures, 1);
        assert_eq!(gs.black_total(), 2.0);
        assert_eq!(gs.white_total(), 0.0);
        assert_eq!(gs.winner(), Some(Stone::Black));
        assert_eq!(gs.result(), "B+2");
    }

    #[test]
    fn chinese_score_counts_stones_not_captures() {
        // Same position: under area rules Black gets 8 stones + 1 territory.
        let goban = goban_from_layout(&["BBB", "BWB", "BBB"]);
        let mut dead = HashSet::new();
        dead.insert((1u8, 1u8));
        let gs = score(&goban, &dead, 0.0, Ruleset::Chinese, 0);

        assert_eq!(gs.black.stones, 8);
        assert_eq!(gs.black.territory, 1);
        assert_eq!(gs.black_total(), 9.0);
        assert_eq!(gs.white_total(), 0.0);
    }

    #[test]
    fn captures_tally_feeds_japanese_score() {
        let board = vec![
            1, 1, 1, 0, -1, //
            1, 0, 1, 0, -1, //
            1, 1, 1, 0, -1, //
            0, 0, 0, 0, -1, //
            -1, -1, -1, -1, -1,
        ];
        let goban = Goban::from_state(board, 5, Captures { black: 3, white: 0 }, None);
        let gs = score(&goban, &HashSet::new(), 6.5, Ruleset::Japanese, 0);

        assert_eq!(gs.black.territory, 1);
        assert_eq!(gs.black.captures, 3);
        assert_eq!(gs.black_total(), 4.0);
        assert_eq!(gs.white_total(), 6.5);
        assert_eq!(gs.winner(), Some(Stone::White));
    }

    #[test]
    fn komi_applies_to_white_only() {
        let goban = goban_from_layout(&["BBB", "BWB", "BBB"]);
        let mut dead = HashSet::new();
        dead.insert((1u8, 1u8));
        let gs = score(&goban, &dead, 6.5, Ruleset::Japanese, 0);
        assert_eq!(gs.black_total(), 2.0);
        assert_eq!(gs.white_total(), 6.5);
    }

    #[test]
    fn aga_handicap_compensation() {
        let goban = goban_from_layout(&["BBB", "BWB", "BBB"]);
        let mut dead = HashSet::new();
        dead.insert((1u8, 1u8));

        let no_handicap = score(&goban, &dead, 0.0, Ruleset::Aga, 0);
        let three_stones = score(&goban, &dead, 0.0, Ruleset::Aga, 3);

        assert_eq!(no_handicap.handicap_compensation, 0.0);
        assert_eq!(three_stones.handicap_compensation, 2.0);
        assert_eq!(
            three_stones.white_total(),
            no_handicap.white_total() + 2.0
        );
        // Black's side is unaffected
        assert_eq!(three_stones.black_total(), no_handicap.black_total());
    }

    #[test]
    fn exact_tie_is_a_draw() {
        // Integer komi can produce exact ties; the comparison must not
        // assume half-integer komi.
        let goban = goban_from_layout(&["B+B", "+++", "W+W"]);
        let gs = score(&goban, &HashSet::new(), 0.0, Ruleset::Japanese, 0);
        assert_eq!(gs.black_total(), gs.white_total());
        assert_eq!(gs.winner(), None);
        assert_eq!(gs.result(), "Draw");
    }

    #[test]
    fn scoring_is_deterministic() {
        let goban = goban_from_layout(&["BBB", "BWB", "BBB"]);
        let mut dead = HashSet::new();
        dead.insert((1u8, 1u8));
        for ruleset in [Ruleset::Japanese, Ruleset::Chinese, Ruleset::Aga] {
            let a = score(&goban, &dead, 5.5, ruleset, 2);
            let b = score(&goban, &dead, 5.5, ruleset, 2);
            assert_eq!(a, b);
        }
    }
}
