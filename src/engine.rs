use std::time::{Duration, Instant};

use rand::{rngs::StdRng, SeedableRng};

use crate::cells::ActiveCells;
use crate::grid::Grid;
use crate::trace::TraceSet;

/// A frame cycle runs only once the previous one is at least this old,
/// capping update+render near 30 fps however fast the host loop spins.
pub(crate) const FRAME_GATE: Duration = Duration::from_millis(33);

/// The whole animation state behind one drawing surface: grid geometry,
/// glowing cells, growing trails, pointer tracking and the frame gate.
/// Time is always injected, so the engine runs the same under a test clock
/// as under the live loop.
pub(crate) struct Engine {
    grid: Grid,
    cells: ActiveCells,
    traces: TraceSet,
    pointer_cell: Option<usize>,
    last_triggered: Option<usize>,
    last_frame: Option<Instant>,
    rng: StdRng,
}

impl Engine {
    pub(crate) fn new(width: u32, height: u32, cell_size: u32, seed: u64) -> Self {
        let grid = Grid::configure(width, height, cell_size);
        let rng = if seed == 0 {
            StdRng::from_entropy()
        } else {
            StdRng::seed_from_u64(seed)
        };
        Self {
            grid,
            cells: ActiveCells::new(grid.total),
            traces: TraceSet::new(),
            pointer_cell: None,
            last_triggered: None,
            last_frame: None,
            rng,
        }
    }

    pub(crate) fn grid(&self) -> &Grid {
        &self.grid
    }

    pub(crate) fn cells(&self) -> &ActiveCells {
        &self.cells
    }

    pub(crate) fn trace_count(&self) -> usize {
        self.traces.len()
    }

    /// Surface changed size: new grid, and every piece of animation state is
    /// dropped wholesale. Trails armed against the old grid die with it.
    pub(crate) fn configure(&mut self, width: u32, height: u32) {
        self.grid = Grid::configure(width, height, self.grid.cell_size);
        self.cells.reset(self.grid.total);
        self.traces.clear();
        self.pointer_cell = None;
        self.last_triggered = None;
    }

    pub(crate) fn pointer_moved(&mut self, x: f32, y: f32) {
        self.pointer_cell = self.grid.cell_at(x, y);
    }

    pub(crate) fn pointer_cleared(&mut self) {
        self.pointer_cell = None;
    }

    /// One host callback. Growth timers run every call; the frame cycle
    /// (decay, trail pruning, pointer trigger) only once the gate opens.
    /// Returns true when the caller should render this frame. Cycle order
    /// matters: decay first, trigger after, so a cell touched this frame
    /// shows up at full opacity.
    pub(crate) fn advance(&mut self, now: Instant) -> bool {
        self.traces
            .grow_due(now, &self.grid, &mut self.cells, &mut self.rng);

        if let Some(last) = self.last_frame {
            if now.saturating_duration_since(last) <= FRAME_GATE {
                return false;
            }
        }

        self.cells.decay();
        self.traces.prune(&self.cells);

        if let Some(cell) = self.pointer_cell {
            if self.last_triggered != Some(cell) {
                self.last_triggered = Some(cell);
                self.traces
                    .start(cell, now, &mut self.cells, &mut self.rng);
            }
        }

        self.last_frame = Some(now);
        true
    }
}
