use instant::Instant;

/// Which phase of a room tick is being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemPhase {
    TileMotion = 0,
    Physics = 1,
    Interaction = 2,
}

impl SystemPhase {
    pub const ALL: [SystemPhase; 3] = [Self::TileMotion, Self::Physics, Self::Interaction];

    pub fn label(self) -> &'static str {
        match self {
            Self::TileMotion => "Tiles",
            Self::Physics => "Physics",
            Self::Interaction => "Interaction",
        }
    }
}

/// Per-phase timing with exponential moving average smoothing.
pub struct SystemTimers {
    /// EMA-smoothed duration in microseconds per phase.
    pub durations_us: [f64; 3],
    start: Instant,
}

const EMA_ALPHA: f64 = 0.1;

impl Default for SystemTimers {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemTimers {
    pub fn new() -> Self {
        Self {
            durations_us: [0.0; 3],
            start: Instant::now(),
        }
    }

    /// Call before a phase runs.
    pub fn begin(&mut self) {
        self.start = Instant::now();
    }

    /// Call after a phase finishes.
    pub fn end(&mut self, phase: SystemPhase) {
        let elapsed_us = self.start.elapsed().as_secs_f64() * 1_000_000.0;
        let idx = phase as usize;
        self.durations_us[idx] =
            self.durations_us[idx] * (1.0 - EMA_ALPHA) + elapsed_us * EMA_ALPHA;
    }

    pub fn duration_us(&self, phase: SystemPhase) -> f64 {
        self.durations_us[phase as usize]
    }

    /// Sum of all phase durations (microseconds).
    pub fn total_us(&self) -> f64 {
        self.durations_us.iter().sum()
    }

    /// One-line breakdown for the log.
    pub fn summary(&self) -> String {
        SystemPhase::ALL
            .iter()
            .map(|&p| format!("{}: {:.1}us", p.label(), self.duration_us(p)))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_accumulate_separately() {
        let mut timers = SystemTimers::new();
        timers.begin();
        std::thread::sleep(std::time::Duration::from_millis(2));
        timers.end(SystemPhase::Physics);
        assert!(timers.duration_us(SystemPhase::Physics) > 0.0);
        assert_eq!(timers.duration_us(SystemPhase::TileMotion), 0.0);
        assert_eq!(timers.total_us(), timers.duration_us(SystemPhase::Physics));
        assert!(timers.summary().contains("Physics"));
    }
}
