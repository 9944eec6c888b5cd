use std::collections::{HashMap, HashSet, VecDeque};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Point;
use crate::goban::Goban;
use crate::stone::Stone;

const EXPLORATION: f64 = 1.4;
const UCT_EPS: f64 = 1e-6;
const PLAYOUT_CAP: usize = 100;
const TABLE_CAPACITY: usize = 4096;

/// A move recommendation. `Pass` when no legal move is worth playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiMove {
    Play(Point),
    Pass,
}

/// How to spend the playout budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
    /// One tree, one thread.
    Serial,
    /// Root parallelism: the budget is split across this many workers, each
    /// growing an independent tree from the same position; root statistics
    /// are merged by move before selection.
    RootParallel(usize),
}

/// An owned search invocation: position, side to move, and budget. The
/// caller layers repetition constraints on top via `forbidden_positions`
/// (fingerprints the immediate reply must not recreate).
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub goban: Goban,
    pub to_move: Stone,
    pub budget: u32,
    pub mode: SearchMode,
    pub seed: u64,
    pub forbidden_positions: HashSet<String>,
}

impl SearchRequest {
    pub fn new(goban: Goban, to_move: Stone, budget: u32) -> Self {
        Self {
            goban,
            to_move,
            budget,
            mode: SearchMode::Serial,
            seed: 0,
            forbidden_positions: HashSet::new(),
        }
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn forbidding(mut self, fingerprints: HashSet<String>) -> Self {
        self.forbidden_positions = fingerprints;
        self
    }
}

// ---------------------------------------------------------------------------
// Transposition table
// ---------------------------------------------------------------------------

/// Bounded FIFO cache of previous recommendations, keyed by grid fingerprint
/// and side to move. Entries are advisory: the fingerprint does not encode
/// ko or repetition state, so every hit is re-validated against the actual
/// position before it is returned.
pub(crate) struct TranspositionTable {
    map: HashMap<(String, Stone), AiMove>,
    order: VecDeque<(String, Stone)>,
    capacity: usize,
}

impl TranspositionTable {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&self, fingerprint: &str, stone: Stone) -> Option<AiMove> {
        self.map.get(&(fingerprint.to_string(), stone)).copied()
    }

    fn insert(&mut self, fingerprint: String, stone: Stone, ai_move: AiMove) {
        let key = (fingerprint, stone);
        if self.map.insert(key.clone(), ai_move).is_none() {
            self.order.push_back(key);
            while self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.map.remove(&oldest);
                }
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}

// ---------------------------------------------------------------------------
// Tree arena
// ---------------------------------------------------------------------------

struct Node {
    parent: Option<usize>,
    /// The move that produced this node; `None` at the root.
    point: Option<Point>,
    /// The color that played `point`. The root holds the opponent of the
    /// side to move, so `stone.opp()` is always the side to move below.
    stone: Stone,
    wins: f64,
    visits: u32,
    children: Vec<usize>,
    untried: Vec<Point>,
}

struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn new(root_untried: Vec<Point>, to_move: Stone) -> Self {
        Tree {
            nodes: vec![Node {
                parent: None,
                point: None,
                stone: to_move.opp(),
                wins: 0.0,
                visits: 0,
                children: Vec::new(),
                untried: root_untried,
            }],
        }
    }

    fn add_child(&mut self, parent: usize, point: Point, stone: Stone, untried: Vec<Point>) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            parent: Some(parent),
            point: Some(point),
            stone,
            wins: 0.0,
            visits: 0,
            children: Vec::new(),
            untried,
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// UCT selection. Strict comparison, so ties resolve to the child that
    /// was expanded first.
    fn best_uct_child(&self, id: usize) -> usize {
        let parent_visits = self.nodes[id].visits as f64;
        let mut best = self.nodes[id].children[0];
        let mut best_score = f64::NEG_INFINITY;

        for &child in &self.nodes[id].children {
            let node = &self.nodes[child];
            let visits = node.visits as f64;
            let exploit = node.wins / (visits + UCT_EPS);
            let explore = EXPLORATION * ((parent_visits + 1.0).ln() / (visits + UCT_EPS)).sqrt();
            let score = exploit + explore;
            if score > best_score {
                best_score = score;
                best = child;
            }
        }
        best
    }

    /// Propagate a playout result up the path. `value_black` is the playout
    /// outcome for Black in [0, 1]; each node credits the color that played
    /// its move.
    fn backpropagate(&mut self, mut id: usize, value_black: f64) {
        loop {
            let node = &mut self.nodes[id];
            node.visits += 1;
            node.wins += match node.stone {
                Stone::Black => value_black,
                Stone::White => 1.0 - value_black,
            };
            match node.parent {
                Some(p) => id = p,
                None => break,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Move generation and playouts
// ---------------------------------------------------------------------------

/// Expansion-ordering heuristic: prefer captures, avoid self-atari.
fn move_prior(successor: &Goban, point: Point, captured: usize) -> i32 {
    let mut prior = captured as i32 * 10;
    if successor.liberties(point).len() == 1 {
        prior -= 5;
    }
    prior
}

/// Legal candidate moves for `stone`, excluding own true-eye fills, shuffled
/// and then ordered so the best prior sits at the end (expansion pops from
/// the back). `forbidden` filters moves whose successor grid repeats a
/// position; it is only supplied at the root, where repetition is decidable.
fn candidate_moves(
    goban: &Goban,
    stone: Stone,
    forbidden: Option<&HashSet<String>>,
    rng: &mut StdRng,
) -> Vec<Point> {
    let mut scored: Vec<(Point, i32)> = Vec::new();

    for point in goban.empty_points() {
        if goban.is_true_eye(point, stone) {
            continue;
        }
        let Ok((successor, captured)) = goban.play_detailed(point, stone) else {
            continue;
        };
        if let Some(banned) = forbidden
            && banned.contains(&successor.fingerprint())
        {
            continue;
        }
        scored.push((point, move_prior(&successor, point, captured.len())));
    }

    scored.shuffle(rng);
    scored.sort_by_key(|&(_, prior)| prior);
    scored.into_iter().map(|(point, _)| point).collect()
}

/// Uniform random playout with an eye-fill filter and a ply cap, evaluated
/// by stone-count differential.
fn playout(start: &Goban, mut to_move: Stone, rng: &mut StdRng) -> f64 {
    let mut board = start.clone();
    let mut passes = 0;

    for _ in 0..PLAYOUT_CAP {
        if passes >= 2 {
            break;
        }

        let empties = board.empty_points();
        let mut played = false;

        for _ in 0..empties.len() {
            let point = empties[rng.random_range(0..empties.len())];
            if board.is_true_eye(point, to_move) {
                continue;
            }
            if let Ok(next) = board.play(point, to_move) {
                board = next;
                played = true;
                break;
            }
        }

        if played {
            passes = 0;
        } else {
            board.pass();
            passes += 1;
        }
        to_move = to_move.opp();
    }

    let diff: i32 = board.board().iter().map(|&v| v.signum() as i32).sum();
    if diff > 0 {
        1.0
    } else if diff < 0 {
        0.0
    } else {
        0.5
    }
}

/// Grow one tree for `iterations` playouts and return per-root-child
/// statistics: (move, visits, wins).
fn run_tree(
    goban: &Goban,
    to_move: Stone,
    iterations: u32,
    seed: u64,
    forbidden: &HashSet<String>,
) -> Vec<(Point, u32, f64)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let root_untried = candidate_moves(goban, to_move, Some(forbidden), &mut rng);
    if root_untried.is_empty() {
        return Vec::new();
    }

    let mut tree = Tree::new(root_untried, to_move);

    for _ in 0..iterations {
        let mut board = goban.clone();
        let mut id = 0;

        // Selection
        while tree.nodes[id].untried.is_empty() && !tree.nodes[id].children.is_empty() {
            id = tree.best_uct_child(id);
            let node = &tree.nodes[id];
            let (point, stone) = (node.point, node.stone);
            let Some(point) = point else { break };
            let Ok(next) = board.play(point, stone) else {
                break; // vetted at expansion; unreachable on a consistent path
            };
            board = next;
        }

        // Expansion
        if let Some(point) = tree.nodes[id].untried.pop() {
            let stone = tree.nodes[id].stone.opp();
            if let Ok(next) = board.play(point, stone) {
                board = next;
                let untried = candidate_moves(&board, stone.opp(), None, &mut rng);
                id = tree.add_child(id, point, stone, untried);
            }
        }

        // Simulation + backpropagation
        let value_black = playout(&board, tree.nodes[id].stone.opp(), &mut rng);
        tree.backpropagate(id, value_black);
    }

    tree.nodes[0]
        .children
        .iter()
        .map(|&c| {
            let node = &tree.nodes[c];
            (node.point.unwrap_or((0, 0)), node.visits, node.wins)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Monte-Carlo tree search engine with a persistent transposition table.
/// Stateless across games apart from the table, which is advisory only.
pub struct SearchEngine {
    table: TranspositionTable,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchEngine {
    pub fn new() -> Self {
        Self {
            table: TranspositionTable::new(TABLE_CAPACITY),
        }
    }

    /// Recommend a move for the request's position.
    ///
    /// Degenerate cases: zero budget falls back to a uniform random legal
    /// move; a position with no acceptable move yields `AiMove::Pass`.
    pub fn search(&mut self, request: &SearchRequest) -> AiMove {
        let fingerprint = request.goban.fingerprint();

        if let Some(hit) = self.table.get(&fingerprint, request.to_move)
            && self.validate_cached(request, hit)
        {
            debug!(stone = %request.to_move, ?hit, "transposition hit");
            return hit;
        }

        let chosen = if request.budget == 0 {
            self.random_move(request)
        } else {
            self.tree_move(request)
        };

        if let AiMove::Play(_) = chosen {
            self.table.insert(fingerprint, request.to_move, chosen);
        }
        chosen
    }

    /// Cached entries carry no ko or repetition context; recheck both.
    fn validate_cached(&self, request: &SearchRequest, hit: AiMove) -> bool {
        let AiMove::Play(point) = hit else {
            return false;
        };
        match request.goban.play(point, request.to_move) {
            Ok(successor) => !request
                .forbidden_positions
                .contains(&successor.fingerprint()),
            Err(_) => false,
        }
    }

    fn random_move(&self, request: &SearchRequest) -> AiMove {
        let mut rng = StdRng::seed_from_u64(request.seed);
        let moves = candidate_moves(
            &request.goban,
            request.to_move,
            Some(&request.forbidden_positions),
            &mut rng,
        );
        match moves.is_empty() {
            true => AiMove::Pass,
            false => AiMove::Play(moves[rng.random_range(0..moves.len())]),
        }
    }

    fn tree_move(&self, request: &SearchRequest) -> AiMove {
        let stats = match request.mode {
            SearchMode::Serial => run_tree(
                &request.goban,
                request.to_move,
                request.budget,
                request.seed,
                &request.forbidden_positions,
            ),
            SearchMode::RootParallel(workers) => {
                let workers = workers.max(1);
                let per_worker = request.budget.div_ceil(workers as u32);
                let results: Vec<Vec<(Point, u32, f64)>> = {
                    use rayon::prelude::*;
                    (0..workers)
                        .into_par_iter()
                        .map(|w| {
                            run_tree(
                                &request.goban,
                                request.to_move,
                                per_worker,
                                request.seed.wrapping_add(w as u64),
                                &request.forbidden_positions,
                            )
                        })
                        .collect()
                };
                merge_root_stats(results)
            }
        };

        let mut best: Option<(Point, u32, f64)> = None;
        for (point, visits, wins) in stats {
            let better = match best {
                None => true,
                Some((_, bv, bw)) => visits > bv || (visits == bv && wins > bw),
            };
            if better {
                best = Some((point, visits, wins));
            }
        }

        match best {
            Some((point, visits, wins)) => {
                debug!(
                    stone = %request.to_move,
                    ?point,
                    visits,
                    winrate = wins / visits.max(1) as f64,
                    budget = request.budget,
                    "search finished"
                );
                AiMove::Play(point)
            }
            None => {
                debug!(stone = %request.to_move, "no acceptable move, passing");
                AiMove::Pass
            }
        }
    }
}

/// Merge per-worker root statistics by move coordinate.
fn merge_root_stats(results: Vec<Vec<(Point, u32, f64)>>) -> Vec<(Point, u32, f64)> {
    let mut merged: HashMap<Point, (u32, f64)> = HashMap::new();
    let mut order: Vec<Point> = Vec::new();

    for stats in results {
        for (point, visits, wins) in stats {
            let entry = merged.entry(point).or_insert_with(|| {
                order.push(point);
                (0, 0.0)
            });
            entry.0 += visits;
            entry.1 += wins;
        }
    }

    order
        .into_iter()
        .map(|p| {
            let (v, w) = merged[&p];
            (p, v, w)
        })
        .collect()
}
