use crate::models::device::Reading;
use crate::models::snapshot::Sample;
use std::time::Duration;

/// How a sample was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No baseline yet: rates are 0.
    First,
    Measured,
    /// At least one counter went backwards; that direction reads 0.
    CounterReset,
    /// Elapsed time was not positive; the previous rates are held.
    ClockAnomaly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sampled {
    pub sample:   Sample,
    pub outcome:  Outcome,
    /// Reading to use as the baseline on the next tick.
    pub baseline: Reading,
}

/// Turns successive cumulative counter readings into rates.
#[derive(Debug, Clone)]
pub struct Sampler {
    epsilon_secs: f64,
    smoothing:    f64,
}

impl Sampler {
    /// `min_elapsed` bounds the divisor; `smoothing` in (0, 1] is the weight
    /// of the newest raw rate (1.0 publishes raw rates).
    pub fn new(min_elapsed: Duration, smoothing: f64) -> Self {
        let smoothing = if smoothing.is_finite() && smoothing > 0.0 { smoothing.min(1.0) } else { 1.0 };
        Self { epsilon_secs: min_elapsed.as_secs_f64(), smoothing }
    }

    pub fn sample(
        &self,
        device_id: &str,
        previous:  Option<&Reading>,
        held:      Option<&Sample>,
        current:   Reading,
    ) -> Sampled {
        let Some(prev) = previous else {
            return Sampled {
                sample:   Sample::idle(device_id, current.at),
                outcome:  Outcome::First,
                baseline: current,
            };
        };

        let elapsed = match (current.at - prev.at).to_std() {
            Ok(d) if !d.is_zero() => d.as_secs_f64(),
            _ => {
                let sample = match held {
                    Some(h) => Sample { at: current.at, device_id: device_id.to_string(), ..h.clone() },
                    None    => Sample::idle(device_id, current.at),
                };
                return Sampled { sample, outcome: Outcome::ClockAnomaly, baseline: current };
            }
        };

        let secs  = elapsed.max(self.epsilon_secs);
        let read  = rate(prev.counters.read_bytes, current.counters.read_bytes, secs);
        let write = rate(prev.counters.write_bytes, current.counters.write_bytes, secs);

        let outcome = if read.is_none() || write.is_none() {
            Outcome::CounterReset
        } else {
            Outcome::Measured
        };

        let (mut read, mut write) = (read.unwrap_or(0.0), write.unwrap_or(0.0));
        if outcome == Outcome::Measured {
            if let Some(h) = held {
                read  = self.smooth(read, h.read_bytes_per_sec);
                write = self.smooth(write, h.write_bytes_per_sec);
            }
        }

        Sampled {
            sample: Sample {
                device_id:           device_id.to_string(),
                read_bytes_per_sec:  read,
                write_bytes_per_sec: write,
                at:                  current.at,
            },
            outcome,
            baseline: current,
        }
    }

    fn smooth(&self, raw: f64, previous: f64) -> f64 {
        self.smoothing * raw + (1.0 - self.smoothing) * previous
    }
}

/// Bytes per second between two counter values; `None` when the counter
/// went backwards (reset or re-attach).
pub fn rate(previous: u64, current: u64, elapsed_secs: f64) -> Option<f64> {
    current.checked_sub(previous).map(|delta| delta as f64 / elapsed_secs)
}
