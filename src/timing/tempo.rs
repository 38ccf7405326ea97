use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// 120 BPM.
pub const DEFAULT_MICROS_PER_QUARTER: u32 = 500_000;

/// Tempo shared by every track of one performance.
///
/// The tempo lives in a single atomic word, so a reader sees either the old
/// or the new value, never a mix. The resolution is fixed for the lifetime
/// of the file.
#[derive(Debug)]
pub struct TempoClock {
    micros_per_quarter: AtomicU32,
    ticks_per_quarter: u32,
}

impl TempoClock {
    /// Returns `None` for a zero resolution.
    pub fn new(ticks_per_quarter: u32) -> Option<Self> {
        Self::with_tempo(ticks_per_quarter, DEFAULT_MICROS_PER_QUARTER)
    }

    pub fn with_tempo(ticks_per_quarter: u32, micros_per_quarter: u32) -> Option<Self> {
        if ticks_per_quarter == 0 || micros_per_quarter == 0 {
            return None;
        }
        Some(Self {
            micros_per_quarter: AtomicU32::new(micros_per_quarter),
            ticks_per_quarter,
        })
    }

    pub fn ticks_per_quarter(&self) -> u32 {
        self.ticks_per_quarter
    }

    pub fn current_micros_per_quarter(&self) -> u32 {
        self.micros_per_quarter.load(Ordering::Acquire)
    }

    /// Commits a new tempo. Zero is refused and leaves the tempo unchanged.
    pub fn set_micros_per_quarter(&self, micros_per_quarter: u32) -> bool {
        if micros_per_quarter == 0 {
            tracing::warn!("ignoring tempo change to zero microseconds per quarter note");
            return false;
        }
        let previous = self
            .micros_per_quarter
            .swap(micros_per_quarter, Ordering::AcqRel);
        tracing::debug!(previous, micros_per_quarter, "tempo changed");
        true
    }

    pub fn bpm(&self) -> f64 {
        60_000_000.0 / self.current_micros_per_quarter() as f64
    }

    /// Wall-clock length of `delta_ticks` at the current tempo.
    pub fn delay_for(&self, delta_ticks: u32) -> Duration {
        let tempo = self.current_micros_per_quarter();
        let nanos = delta_ticks as u128 * tempo as u128 * 1_000 / self.ticks_per_quarter as u128;
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }
}
