//! Simulation time model.
//!
//! # Design
//!
//! Time is represented as a monotonically increasing [`Timestep`] counter.
//! Each timestep is subdivided into a fixed number of substeps (arrivals,
//! wake, intent, apply — the scheduler phases live in `josh-sim`); `Timestep`
//! itself only counts whole steps. The mapping to wall-clock time is held in
//! [`RunClock`]:
//!
//!   wall_time = start_unix_secs + step * step_duration_secs
//!
//! Using an integer step as the canonical time unit means all schedule
//! arithmetic is exact (no floating-point drift) and comparisons are O(1).

use std::fmt;

// ── Timestep ─────────────────────────────────────────────────────────────────

/// An absolute simulation timestep counter.
///
/// Stored as `u64` to avoid overflow on any conceivable run length.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestep(pub u64);

impl Timestep {
    pub const ZERO: Timestep = Timestep(0);

    /// Return the timestep `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Timestep {
        Timestep(self.0 + n)
    }

    /// Steps elapsed from `earlier` to `self`.
    ///
    /// # Panics
    /// Panics in debug mode if `earlier > self`.
    #[inline]
    pub fn since(self, earlier: Timestep) -> u64 {
        self.0 - earlier.0
    }
}

impl std::ops::Add<u64> for Timestep {
    type Output = Timestep;
    #[inline]
    fn add(self, rhs: u64) -> Timestep {
        Timestep(self.0 + rhs)
    }
}

impl std::ops::Sub for Timestep {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Timestep) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Timestep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── RunClock ──────────────────────────────────────────────────────────────────

/// Converts between timestep counts and Unix wall-clock seconds, and tracks
/// which substep within the current step the scheduler is in.
///
/// `RunClock` is cheap to clone and intentionally holds no heap data.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunClock {
    /// Unix timestamp (seconds since epoch) of step 0.
    pub start_unix_secs: i64,
    /// How many real seconds one step represents. Purely informational —
    /// the scheduler never blocks on wall-clock time except via the
    /// cancellation deadline in `josh-sim`.
    pub step_duration_secs: u32,
    /// The current step — advanced by `RunClock::advance_step()`.
    pub current_step: Timestep,
    /// The current substep within `current_step`, in `0..substeps_per_step`.
    pub current_substep: u32,
    /// Number of substeps per step (arrivals/wake/intent/apply is one
    /// substep in the simplest configuration; programs may request more).
    pub substeps_per_step: u32,
}

impl RunClock {
    /// Create a clock starting at `start_unix_secs` with the given resolution.
    pub fn new(start_unix_secs: i64, step_duration_secs: u32, substeps_per_step: u32) -> Self {
        Self {
            start_unix_secs,
            step_duration_secs,
            current_step: Timestep::ZERO,
            current_substep: 0,
            substeps_per_step: substeps_per_step.max(1),
        }
    }

    /// Advance to the next substep, rolling over into the next step when the
    /// last substep of the current step completes. Returns `true` if a step
    /// boundary was crossed.
    #[inline]
    pub fn advance_substep(&mut self) -> bool {
        self.current_substep += 1;
        if self.current_substep >= self.substeps_per_step {
            self.current_substep = 0;
            self.current_step = self.current_step.offset(1);
            true
        } else {
            false
        }
    }

    /// Advance a whole step, resetting the substep counter.
    #[inline]
    pub fn advance_step(&mut self) {
        self.current_step = self.current_step.offset(1);
        self.current_substep = 0;
    }

    /// `true` when positioned at the last substep of the current step —
    /// the point at which the apply phase commits shadow values.
    #[inline]
    pub fn is_final_substep(&self) -> bool {
        self.current_substep + 1 == self.substeps_per_step
    }

    /// Elapsed simulated seconds since step 0.
    #[inline]
    pub fn elapsed_secs(&self) -> i64 {
        self.current_step.0 as i64 * self.step_duration_secs as i64
    }

    /// Current Unix timestamp corresponding to `current_step`.
    #[inline]
    pub fn current_unix_secs(&self) -> i64 {
        self.start_unix_secs + self.elapsed_secs()
    }

    /// Break elapsed time into (day, hour, minute) components from run start.
    pub fn elapsed_dhm(&self) -> (u64, u32, u32) {
        let total_secs = self.elapsed_secs().max(0) as u64;
        let days = total_secs / 86_400;
        let hours = ((total_secs % 86_400) / 3_600) as u32;
        let minutes = ((total_secs % 3_600) / 60) as u32;
        (days, hours, minutes)
    }
}

impl fmt::Display for RunClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (d, h, m) = self.elapsed_dhm();
        write!(
            f,
            "{}.{} (day {} {:02}:{:02})",
            self.current_step, self.current_substep, d, h, m
        )
    }
}

// ── RunConfig ─────────────────────────────────────────────────────────────────

/// Top-level run configuration.
///
/// Loaded from an external configuration source (DSL program metadata, CLI
/// flags) and passed to [`josh_sim`] unchanged — this crate never reads
/// configuration files itself.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunConfig {
    /// Unix timestamp for step 0.
    pub start_unix_secs: i64,

    /// Seconds per step. Informational only.
    pub step_duration_secs: u32,

    /// Substeps per step. Must be >= 1.
    pub substeps_per_step: u32,

    /// Total steps to simulate.
    pub total_steps: u64,

    /// Master RNG seed. The same seed always produces identical results.
    pub seed: u64,

    /// Number of replicates to run for this job.
    pub replicates: u32,

    /// Worker thread count passed to Rayon. `None` uses all logical cores.
    pub num_threads: Option<usize>,

    /// Freeze and export a snapshot every N steps. 1 = every step.
    pub output_interval_steps: u64,
}

impl RunConfig {
    /// The last step index the run commits, inclusive. `total_steps` counts
    /// commits, not a step index, so a run of 3 steps commits `0, 1, 2`.
    #[inline]
    pub fn end_step(&self) -> Timestep {
        Timestep(self.total_steps.saturating_sub(1))
    }

    /// Construct a `RunClock` pre-configured for this run.
    pub fn make_clock(&self) -> RunClock {
        RunClock::new(self.start_unix_secs, self.step_duration_secs, self.substeps_per_step)
    }
}
