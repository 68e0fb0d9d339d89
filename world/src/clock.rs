use std::time::Duration;

/// Fastest supported speed multiplier.
pub const MAX_SPEED: f32 = 100.0;

/// Converts wall-clock frame time into simulation steps.
///
/// Raw frame time is capped before scaling so a stalled frame cannot push
/// units through each other in a single step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationClock {
    paused: bool,
    speed: f32,
    max_step: Duration,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self {
            paused: false,
            speed: 1.0,
            max_step: Duration::from_millis(100),
        }
    }
}

impl SimulationClock {
    /// Clock running at `speed` times real time.
    #[must_use]
    pub fn with_speed(speed: f32) -> Self {
        let mut clock = Self::default();
        clock.set_speed(speed);
        clock
    }

    /// Current speed multiplier.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Sets the speed multiplier, clamped to `0..=MAX_SPEED`. Negative or
    /// non-finite values stop time.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = if speed.is_finite() {
            speed.clamp(0.0, MAX_SPEED)
        } else {
            0.0
        };
    }

    /// Whether the clock is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pauses or resumes the clock.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Flips the paused flag.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Simulation time corresponding to `raw` frame time.
    #[must_use]
    pub fn scaled(&self, raw: Duration) -> Duration {
        if self.paused {
            return Duration::ZERO;
        }
        let seconds = raw.min(self.max_step).as_secs_f64() * f64::from(self.speed);
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
    }
}
