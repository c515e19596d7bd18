use std::collections::BTreeMap;

/// Source of the `(level, step, index)` position attached to every captured line.
///
/// The counters are owned by the implementor. `get_current_step` and
/// `get_step_for_level` are allowed to differ: the latter may allocate a fresh
/// step and index, the former only reports what is current.
pub trait LevelTracker {
    fn is_level_set(&self) -> bool;
    fn get_current_level(&self) -> u32;
    fn set_level(&mut self, level: u32) -> u32;
    fn increment_level(&mut self, delta: i32) -> u32;
    fn get_current_step(&mut self, level: u32) -> (u64, u64);
    fn get_step_for_level(&mut self, level: u32) -> (u64, u64);
}

impl<T: LevelTracker + ?Sized> LevelTracker for &mut T {
    fn is_level_set(&self) -> bool {
        (**self).is_level_set()
    }

    fn get_current_level(&self) -> u32 {
        (**self).get_current_level()
    }

    fn set_level(&mut self, level: u32) -> u32 {
        (**self).set_level(level)
    }

    fn increment_level(&mut self, delta: i32) -> u32 {
        (**self).increment_level(delta)
    }

    fn get_current_step(&mut self, level: u32) -> (u64, u64) {
        (**self).get_current_step(level)
    }

    fn get_step_for_level(&mut self, level: u32) -> (u64, u64) {
        (**self).get_step_for_level(level)
    }
}

impl<T: LevelTracker + ?Sized> LevelTracker for Box<T> {
    fn is_level_set(&self) -> bool {
        (**self).is_level_set()
    }

    fn get_current_level(&self) -> u32 {
        (**self).get_current_level()
    }

    fn set_level(&mut self, level: u32) -> u32 {
        (**self).set_level(level)
    }

    fn increment_level(&mut self, delta: i32) -> u32 {
        (**self).increment_level(delta)
    }

    fn get_current_step(&mut self, level: u32) -> (u64, u64) {
        (**self).get_current_step(level)
    }

    fn get_step_for_level(&mut self, level: u32) -> (u64, u64) {
        (**self).get_step_for_level(level)
    }
}

/// In-memory tracker with one step counter per level and a single global index.
///
/// Runner hooks mark an annotated section with [`LevelCounters::enter_level`]
/// and close it with [`LevelCounters::leave_level`]; outside a section the
/// level is reported as not set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelCounters {
    current_level: u32,
    level_set: bool,
    steps: BTreeMap<u32, u64>,
    index: u64,
}

impl LevelCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_level(&mut self, level: u32) {
        self.current_level = level;
        self.level_set = true;
    }

    pub fn leave_level(&mut self) {
        self.level_set = false;
    }

    pub fn last_index(&self) -> u64 {
        self.index
    }
}

impl LevelTracker for LevelCounters {
    fn is_level_set(&self) -> bool {
        self.level_set
    }

    fn get_current_level(&self) -> u32 {
        self.current_level
    }

    fn set_level(&mut self, level: u32) -> u32 {
        self.current_level = level;
        self.current_level
    }

    fn increment_level(&mut self, delta: i32) -> u32 {
        self.current_level = self.current_level.saturating_add_signed(delta);
        self.current_level
    }

    fn get_current_step(&mut self, level: u32) -> (u64, u64) {
        match self.steps.get(&level).copied() {
            Some(step) => (step, self.index),
            None => self.get_step_for_level(level),
        }
    }

    fn get_step_for_level(&mut self, level: u32) -> (u64, u64) {
        let step = self.steps.entry(level).or_insert(0);
        *step += 1;
        let step = *step;
        // a new step on one level restarts numbering underneath it
        self.steps.retain(|deeper, _| *deeper <= level);
        self.index += 1;
        (step, self.index)
    }
}
