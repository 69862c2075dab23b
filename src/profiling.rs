//! Physics Profiling API
//!
//! Lightweight performance counters for the step pipeline. Every call to
//! [`Engine::step`](crate::engine::Engine::step) returns a [`StepTimings`]
//! with the wall time of the three phases; [`StepProfiler`] aggregates them
//! into rolling last/average/peak statistics per phase, the numbers a debug
//! overlay or benchmark harness wants to display.
//!
//! # Profiled Stages
//!
//! - Integration (velocity/position updates + grid rebuild)
//! - Broadphase (parallel neighbor gathering + pair merge)
//! - Narrowphase (parallel SAT + resolution + grid reset)

/// Per-step phase wall times in microseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepTimings {
    /// Integration and grid rebuild.
    pub integration_us: f32,
    /// Neighbor gathering and pair merging.
    pub broadphase_us: f32,
    /// SAT, impulse resolution, correction flush, grid reset.
    pub narrowphase_us: f32,
}

impl StepTimings {
    /// Whole-step wall time.
    #[inline]
    #[must_use]
    pub fn total_us(&self) -> f32 {
        self.integration_us + self.broadphase_us + self.narrowphase_us
    }
}

/// A single profiling timer entry
#[derive(Clone, Debug)]
pub struct ProfileEntry {
    /// Stage name
    pub name: &'static str,
    /// Total accumulated microseconds
    pub total_us: f32,
    /// Number of recorded frames
    pub call_count: u64,
    /// Last frame's microseconds
    pub last_us: f32,
    /// Peak microseconds (single frame)
    pub peak_us: f32,
}

impl ProfileEntry {
    /// Create a new profile entry
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            total_us: 0.0,
            call_count: 0,
            last_us: 0.0,
            peak_us: 0.0,
        }
    }

    /// Average microseconds per frame
    #[inline]
    #[must_use]
    pub fn average_us(&self) -> f32 {
        if self.call_count == 0 {
            0.0
        } else {
            self.total_us / self.call_count as f32
        }
    }

    /// Record a measurement
    pub fn record(&mut self, us: f32) {
        self.total_us += us;
        self.call_count += 1;
        self.last_us = us;
        if us > self.peak_us {
            self.peak_us = us;
        }
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        self.total_us = 0.0;
        self.call_count = 0;
        self.last_us = 0.0;
        self.peak_us = 0.0;
    }
}

/// Stage index of integration in the profiler
pub const PHASE_INTEGRATION: usize = 0;
/// Broadphase stage index
pub const PHASE_BROADPHASE: usize = 1;
/// Narrowphase stage index
pub const PHASE_NARROWPHASE: usize = 2;
/// Total step stage index
pub const PHASE_TOTAL: usize = 3;

/// Rolling statistics over the step pipeline phases.
pub struct StepProfiler {
    entries: Vec<ProfileEntry>,
    /// Frames recorded since the last reset
    pub frame_count: u64,
    /// Whether recording is enabled
    pub enabled: bool,
}

impl StepProfiler {
    /// Create a profiler with the standard stages.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: vec![
                ProfileEntry::new("integration"),
                ProfileEntry::new("broadphase"),
                ProfileEntry::new("narrowphase"),
                ProfileEntry::new("total_step"),
            ],
            frame_count: 0,
            enabled: true,
        }
    }

    /// Record one step's timings.
    pub fn record_step(&mut self, timings: &StepTimings) {
        if !self.enabled {
            return;
        }
        self.entries[PHASE_INTEGRATION].record(timings.integration_us);
        self.entries[PHASE_BROADPHASE].record(timings.broadphase_us);
        self.entries[PHASE_NARROWPHASE].record(timings.narrowphase_us);
        self.entries[PHASE_TOTAL].record(timings.total_us());
        self.frame_count += 1;
    }

    /// Get a profile entry by stage index
    #[must_use]
    pub fn get(&self, stage: usize) -> Option<&ProfileEntry> {
        self.entries.get(stage)
    }

    /// Last frame's microseconds for a stage
    #[must_use]
    pub fn last_us(&self, stage: usize) -> f32 {
        self.entries.get(stage).map_or(0.0, |e| e.last_us)
    }

    /// Average microseconds for a stage
    #[must_use]
    pub fn average_us(&self, stage: usize) -> f32 {
        self.entries.get(stage).map_or(0.0, ProfileEntry::average_us)
    }

    /// Reset all profiling data
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.reset();
        }
        self.frame_count = 0;
    }

    /// Summary of all stages as `(name, last, average, peak)`.
    #[must_use]
    pub fn summary(&self) -> Vec<(&'static str, f32, f32, f32)> {
        self.entries
            .iter()
            .map(|e| (e.name, e.last_us, e.average_us(), e.peak_us))
            .collect()
    }
}

impl Default for StepProfiler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_entry() {
        let mut entry = ProfileEntry::new("test");
        entry.record(100.0);
        entry.record(200.0);
        entry.record(150.0);

        assert_eq!(entry.call_count, 3);
        assert_eq!(entry.total_us, 450.0);
        assert_eq!(entry.average_us(), 150.0);
        assert_eq!(entry.peak_us, 200.0);
        assert_eq!(entry.last_us, 150.0);
    }

    #[test]
    fn test_step_timings_total() {
        let t = StepTimings {
            integration_us: 10.0,
            broadphase_us: 20.0,
            narrowphase_us: 30.0,
        };
        assert_eq!(t.total_us(), 60.0);
    }

    #[test]
    fn test_profiler_records_all_phases() {
        let mut profiler = StepProfiler::new();
        profiler.record_step(&StepTimings {
            integration_us: 5.0,
            broadphase_us: 7.0,
            narrowphase_us: 11.0,
        });

        assert_eq!(profiler.frame_count, 1);
        assert_eq!(profiler.last_us(PHASE_INTEGRATION), 5.0);
        assert_eq!(profiler.last_us(PHASE_BROADPHASE), 7.0);
        assert_eq!(profiler.last_us(PHASE_NARROWPHASE), 11.0);
        assert_eq!(profiler.last_us(PHASE_TOTAL), 23.0);
    }

    #[test]
    fn test_profiler_disabled_records_nothing() {
        let mut profiler = StepProfiler::new();
        profiler.enabled = false;
        profiler.record_step(&StepTimings::default());
        assert_eq!(profiler.frame_count, 0);
    }

    #[test]
    fn test_profiler_summary_and_reset() {
        let mut profiler = StepProfiler::new();
        profiler.record_step(&StepTimings {
            integration_us: 42.0,
            broadphase_us: 0.0,
            narrowphase_us: 0.0,
        });

        let summary = profiler.summary();
        assert_eq!(summary.len(), 4);
        assert_eq!(summary[PHASE_INTEGRATION].1, 42.0);

        profiler.reset();
        assert_eq!(profiler.last_us(PHASE_INTEGRATION), 0.0);
        assert_eq!(profiler.frame_count, 0);
    }
}
