/// Per-tick opacity multiplier.
pub(crate) const DECAY: f32 = 0.9;
/// Entries fading below this are dropped.
pub(crate) const MIN_ALPHA: f32 = 0.02;

#[derive(Clone, Copy, Debug)]
pub(crate) struct ActiveCell {
    /// Visibility in (0, 1], starts at 1 and decays every tick.
    pub(crate) alpha: f32,
    /// Rotation direction, -1.0 or 1.0, fixed when the cell lights up.
    pub(crate) spin: f32,
}

/// Sparse set of currently-glowing cells, stored as a dense arena indexed by
/// cell so iteration order never matters and lookups are a slot read.
pub(crate) struct ActiveCells {
    slots: Vec<Option<ActiveCell>>,
    live: usize,
}

impl ActiveCells {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            slots: vec![None; total],
            live: 0,
        }
    }

    /// Rebuild for a new grid; everything currently glowing is dropped.
    pub(crate) fn reset(&mut self, total: usize) {
        self.slots.clear();
        self.slots.resize(total, None);
        self.live = 0;
    }

    /// Light a cell at full opacity. Re-registering a live cell re-arms it.
    pub(crate) fn register(&mut self, index: usize, spin: f32) {
        if let Some(slot) = self.slots.get_mut(index) {
            if slot.is_none() {
                self.live += 1;
            }
            *slot = Some(ActiveCell { alpha: 1.0, spin });
        }
    }

    /// One decay tick over every entry; entries below the floor vanish.
    pub(crate) fn decay(&mut self) {
        for slot in &mut self.slots {
            if let Some(cell) = slot {
                cell.alpha *= DECAY;
                if cell.alpha < MIN_ALPHA {
                    *slot = None;
                    self.live -= 1;
                }
            }
        }
    }

    pub(crate) fn has(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Some(_)))
    }

    pub(crate) fn get(&self, index: usize) -> Option<ActiveCell> {
        self.slots.get(index).copied().flatten()
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, ActiveCell)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|c| (i, c)))
    }
}
