use tracing::debug;

/// The simulation's time-acceleration control. Rates are coarse indices
/// (0 = real time, 1 = first step up, ...).
pub trait TimeWarp {
    fn current_rate(&self) -> u32;
    fn set_rate(&mut self, rate: u32);
}

/// Time warp that only remembers the last rate it was given.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeWarp {
    pub rate: u32,
    /// Every rate change, oldest first.
    pub changes: Vec<u32>,
}

impl TimeWarp for ManualTimeWarp {
    fn current_rate(&self) -> u32 {
        self.rate
    }

    fn set_rate(&mut self, rate: u32) {
        self.rate = rate;
        self.changes.push(rate);
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Remembers, restores and requests time acceleration on behalf of the
/// ascent state machine.
pub struct TimeAccelerationCoordinator {
    warp: Box<dyn TimeWarp>,
    remembered: Option<u32>,
    enabled: bool,
}

impl TimeAccelerationCoordinator {
    pub fn new(warp: Box<dyn TimeWarp>, enabled: bool) -> Self {
        Self { warp, remembered: None, enabled }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn current_rate(&self) -> u32 {
        self.warp.current_rate()
    }

    pub fn remembered(&self) -> Option<u32> {
        self.remembered
    }

    pub fn store(&mut self) {
        self.remembered = Some(self.warp.current_rate());
    }

    /// Reapply the stored rate, if any, and forget it.
    pub fn restore(&mut self) {
        if let Some(rate) = self.remembered.take().filter(|&r| r != 0) {
            debug!(rate, "restoring time warp");
            self.warp.set_rate(rate);
        }
    }

    /// Request at least `rate`, or the remembered rate if higher.
    /// Ignored unless speedup is enabled.
    pub fn apply(&mut self, rate: u32) {
        if !self.enabled {
            return;
        }
        let target = rate.max(self.remembered.unwrap_or(0));
        debug!(target, "applying time warp");
        self.warp.set_rate(target);
    }

    /// Drop to real time. Always allowed.
    pub fn stop(&mut self) {
        self.warp.set_rate(0);
    }
}

impl std::fmt::Debug for TimeAccelerationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeAccelerationCoordinator")
            .field("rate", &self.warp.current_rate())
            .field("remembered", &self.remembered)
            .field("enabled", &self.enabled)
            .finish()
    }
}
