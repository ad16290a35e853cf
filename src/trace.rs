use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::{rngs::StdRng, Rng};

use crate::cells::ActiveCells;
use crate::grid::Grid;

/// Longest trail a single pointer touch can grow.
pub(crate) const TRACE_LEN: usize = 25;
/// Fixed delay between growth steps of one trail.
pub(crate) const STEP_DELAY: Duration = Duration::from_millis(30);

/// One random-walk trail. Keyed in the set by its seed cell; the path only
/// ever appends and `complete` never flips back.
pub(crate) struct Trace {
    pub(crate) path: Vec<usize>,
    pub(crate) complete: bool,
    due: Instant,
}

/// Pick the next cell of the walk: any axis neighbor that stays on the grid,
/// chosen uniformly. No visited set; walking back over an earlier cell
/// re-arms its glow.
pub(crate) fn next_step(grid: &Grid, current: usize, rng: &mut StdRng) -> Option<usize> {
    let cols = grid.cols as usize;
    let rows = grid.rows as usize;
    let row = current / cols;
    let col = current % cols;

    let mut moves = [0usize; 4];
    let mut n = 0;
    if row > 0 {
        moves[n] = current - cols;
        n += 1;
    }
    if col + 1 < cols {
        moves[n] = current + 1;
        n += 1;
    }
    if row + 1 < rows {
        moves[n] = current + cols;
        n += 1;
    }
    if col > 0 {
        moves[n] = current - 1;
        n += 1;
    }

    if n == 0 {
        // only on a 1x1 grid
        None
    } else {
        Some(moves[rng.gen_range(0..n)])
    }
}

fn random_spin(rng: &mut StdRng) -> f32 {
    if rng.gen_bool(0.5) {
        1.0
    } else {
        -1.0
    }
}

pub(crate) struct TraceSet {
    map: HashMap<usize, Trace>,
}

impl TraceSet {
    pub(crate) fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.map.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    #[cfg(test)]
    pub(crate) fn get(&self, seed: usize) -> Option<&Trace> {
        self.map.get(&seed)
    }

    /// Seed a new trail: light its first cell and arm the first growth step.
    /// A still-growing trail with the same seed is replaced.
    pub(crate) fn start(
        &mut self,
        seed: usize,
        now: Instant,
        cells: &mut ActiveCells,
        rng: &mut StdRng,
    ) {
        cells.register(seed, random_spin(rng));
        self.map.insert(
            seed,
            Trace {
                path: vec![seed],
                complete: false,
                due: now + STEP_DELAY,
            },
        );
    }

    /// Run every growth step whose delay has elapsed. One step per trail per
    /// call; each step lights a cell and re-arms the trail, a full path or a
    /// walk with nowhere to go latches `complete`.
    pub(crate) fn grow_due(
        &mut self,
        now: Instant,
        grid: &Grid,
        cells: &mut ActiveCells,
        rng: &mut StdRng,
    ) {
        for trace in self.map.values_mut() {
            if trace.complete || now < trace.due {
                continue;
            }
            if trace.path.len() >= TRACE_LEN {
                trace.complete = true;
                continue;
            }
            let last = match trace.path.last() {
                Some(&i) => i,
                None => {
                    trace.complete = true;
                    continue;
                }
            };
            match next_step(grid, last, rng) {
                Some(next) => {
                    trace.path.push(next);
                    cells.register(next, random_spin(rng));
                    trace.due = now + STEP_DELAY;
                }
                None => trace.complete = true,
            }
        }
    }

    /// Drop trails that are complete and whose entire path has faded out.
    pub(crate) fn prune(&mut self, cells: &ActiveCells) {
        self.map
            .retain(|_, t| !t.complete || t.path.iter().any(|&i| cells.has(i)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0xDECAF)
    }

    fn t0() -> Instant {
        Instant::now()
    }

    #[test]
    fn corner_walk_only_moves_right_or_down() {
        let grid = Grid::configure(320, 320, 32);
        let mut rng = rng();
        for _ in 0..200 {
            let next = next_step(&grid, 0, &mut rng).unwrap();
            assert!(next == 1 || next == 10, "illegal move from corner: {next}");
        }
    }

    #[test]
    fn interior_walk_uses_all_four_neighbors() {
        let grid = Grid::configure(320, 320, 32);
        let mut rng = rng();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(next_step(&grid, 55, &mut rng).unwrap());
        }
        assert_eq!(seen, [45, 54, 56, 65].into_iter().collect());
    }

    #[test]
    fn single_cell_grid_has_no_move() {
        let grid = Grid::configure(32, 32, 32);
        assert_eq!(next_step(&grid, 0, &mut rng()), None);
    }

    #[test]
    fn start_lights_the_seed_and_arms_growth() {
        let grid = Grid::configure(320, 320, 32);
        let mut cells = ActiveCells::new(grid.total);
        let mut traces = TraceSet::new();
        let mut rng = rng();
        let now = t0();

        traces.start(55, now, &mut cells, &mut rng);
        assert_eq!(cells.get(55).unwrap().alpha, 1.0);
        let t = traces.get(55).unwrap();
        assert_eq!(t.path, vec![55]);
        assert!(!t.complete);

        // not due yet
        traces.grow_due(now + Duration::from_millis(10), &grid, &mut cells, &mut rng);
        assert_eq!(traces.get(55).unwrap().path.len(), 1);

        traces.grow_due(now + Duration::from_millis(31), &grid, &mut cells, &mut rng);
        assert_eq!(traces.get(55).unwrap().path.len(), 2);
        assert_eq!(cells.len(), 2);
    }

    #[test]
    fn growth_caps_at_max_length_and_latches_complete() {
        let grid = Grid::configure(320, 320, 32);
        let mut cells = ActiveCells::new(grid.total);
        let mut traces = TraceSet::new();
        let mut rng = rng();
        let start = t0();

        traces.start(55, start, &mut cells, &mut rng);
        for i in 1..=30u64 {
            let now = start + Duration::from_millis(31 * i);
            traces.grow_due(now, &grid, &mut cells, &mut rng);
        }

        let t = traces.get(55).unwrap();
        assert_eq!(t.path.len(), TRACE_LEN);
        assert!(t.complete);
        for &idx in &t.path {
            assert!(idx < grid.total);
        }

        // further invocations are no-ops
        let len = t.path.len();
        traces.grow_due(start + Duration::from_secs(5), &grid, &mut cells, &mut rng);
        assert_eq!(traces.get(55).unwrap().path.len(), len);
        assert!(traces.get(55).unwrap().complete);
    }

    #[test]
    fn degenerate_walk_completes_immediately() {
        let grid = Grid::configure(32, 32, 32);
        let mut cells = ActiveCells::new(grid.total);
        let mut traces = TraceSet::new();
        let mut rng = rng();
        let start = t0();

        traces.start(0, start, &mut cells, &mut rng);
        traces.grow_due(start + STEP_DELAY, &grid, &mut cells, &mut rng);
        let t = traces.get(0).unwrap();
        assert!(t.complete);
        assert_eq!(t.path, vec![0]);
    }

    #[test]
    fn prune_waits_for_completion_and_full_fade() {
        let grid = Grid::configure(320, 320, 32);
        let mut cells = ActiveCells::new(grid.total);
        let mut traces = TraceSet::new();
        let mut rng = rng();
        let start = t0();

        traces.start(55, start, &mut cells, &mut rng);
        traces.grow_due(start + STEP_DELAY, &grid, &mut cells, &mut rng);

        // growing, cells lit: stays
        traces.prune(&cells);
        assert_eq!(traces.len(), 1);

        // force completion, cells still lit: stays
        for i in 2..=30u64 {
            traces.grow_due(start + STEP_DELAY * i as u32, &grid, &mut cells, &mut rng);
        }
        assert!(traces.get(55).unwrap().complete);
        traces.prune(&cells);
        assert_eq!(traces.len(), 1);

        // fade everything out: goes
        for _ in 0..40 {
            cells.decay();
        }
        assert!(cells.is_empty());
        traces.prune(&cells);
        assert_eq!(traces.len(), 0);
    }
}
