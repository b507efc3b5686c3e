//! Jitter estimation from (RTP timestamp, arrival time) samples.
//!
//! Two estimators are run side by side for every source. [`BaseJitter`] tracks
//! how far arrivals drift from the schedule set by the first packet, and is used
//! to size the playout delay. [`InterArrivalJitter`] is the classic
//! [RFC 3550 6.4.1][rfc] estimate that goes into receiver reports.
//!
//! [rfc]: https://www.rfc-editor.org/rfc/rfc3550#section-6.4.1

use std::fmt;
use std::time::{Duration, Instant};

use crate::rtp::{extend_u32, Frequency};

/// Consumes timestamp/arrival pairs and exposes a jitter estimate.
pub trait JitterEstimator: fmt::Debug + Send {
    /// Feed one sample.
    fn put(&mut self, rtp_time: u32, arrival: Instant);

    /// The current estimate.
    fn jitter(&self) -> Duration;

    /// The current estimate in whole milliseconds.
    fn jitter_ms(&self) -> u32 {
        self.jitter().as_millis().min(u32::MAX as u128) as u32
    }
}

/// Signed microseconds from `earlier` to `later`.
fn signed_micros(later: Instant, earlier: Instant) -> i64 {
    if later >= earlier {
        (later - earlier).as_micros() as i64
    } else {
        -((earlier - later).as_micros() as i64)
    }
}

/// Smoothed drift of arrivals relative to the schedule of the first packet.
///
/// Each sample compares the time elapsed since the first arrival with the time
/// the RTP timestamps say should have elapsed. The difference is folded into
/// the estimate as `base = (base * 15 + correction) / 16`.
#[derive(Debug)]
pub struct BaseJitter {
    clock_rate: Frequency,
    first: Option<(u64, Instant)>,
    last_ext: Option<u64>,
    base_us: i64,
}

impl BaseJitter {
    /// New estimator seeded with an initial value.
    pub fn new(clock_rate: Frequency, seed: Duration) -> Self {
        BaseJitter {
            clock_rate,
            first: None,
            last_ext: None,
            base_us: seed.as_micros() as i64,
        }
    }
}

impl JitterEstimator for BaseJitter {
    fn put(&mut self, rtp_time: u32, arrival: Instant) {
        let ext = extend_u32(self.last_ext, rtp_time);
        self.last_ext = Some(ext);

        let Some((first_ext, first_arrival)) = self.first else {
            self.first = Some((ext, arrival));
            return;
        };

        let rtp_delta = ext as i64 - first_ext as i64;
        let scheduled_us = rtp_delta * 1_000_000 / self.clock_rate.get() as i64;
        let elapsed_us = signed_micros(arrival, first_arrival);
        let correction_us = elapsed_us - scheduled_us;

        self.base_us = (self.base_us * 15 + correction_us) / 16;
    }

    fn jitter(&self) -> Duration {
        Duration::from_micros(self.base_us.max(0) as u64)
    }
}

/// Interarrival jitter as defined in RFC 3550.
///
/// `J(i) = J(i-1) + (|D(i-1,i)| - J(i-1)) / 16`
#[derive(Debug)]
pub struct InterArrivalJitter {
    clock_rate: Frequency,
    prior: Option<(u32, Instant)>,
    /// Estimate in microseconds.
    jitter: f64,
}

impl InterArrivalJitter {
    /// New estimator starting at 0.
    pub fn new(clock_rate: Frequency) -> Self {
        InterArrivalJitter {
            clock_rate,
            prior: None,
            jitter: 0.0,
        }
    }
}

impl JitterEstimator for InterArrivalJitter {
    fn put(&mut self, rtp_time: u32, arrival: Instant) {
        if let Some((prior_time, prior_arrival)) = self.prior {
            if prior_time == rtp_time {
                // Packets of the same frame share timestamp. Only the first
                // packet of the frame is used.
                return;
            }

            // Time units are microseconds. Milliseconds are too coarse for
            // the typical 1/90_000 RTP tick.
            let rtp_delta = rtp_time.wrapping_sub(prior_time) as i32 as f64;
            let rdur = rtp_delta * 1_000_000.0 / self.clock_rate.get() as f64;
            let tdur = signed_micros(arrival, prior_arrival) as f64;

            let d = (tdur - rdur).abs();

            trace!("Interarrival delta: {}", d);

            self.jitter += (1.0 / 16.0) * (d - self.jitter);
        }

        self.prior = Some((rtp_time, arrival));
    }

    fn jitter(&self) -> Duration {
        Duration::from_micros(self.jitter as u64)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // 100 fps in clock rate 90kHz => 90_000/100 = 900 per frame
    // 1/100 * 1_000_000 = 10_000 microseconds per frame.
    const FRAME: Duration = Duration::from_micros(10_000);

    #[test]
    fn inter_arrival_at_0() {
        let mut j = InterArrivalJitter::new(Frequency::NINETY_KHZ);
        let start = Instant::now();

        for i in 4..8 {
            j.put(1234 + i * 900, start + i * FRAME);
        }

        assert_eq!(j.jitter, 0.0);
        assert_eq!(j.jitter_ms(), 0);
    }

    #[test]
    fn inter_arrival_at_20() {
        let mut j = InterArrivalJitter::new(Frequency::NINETY_KHZ);
        let start = Instant::now();
        let off = Duration::from_micros(10);

        for i in 4..1000 {
            let arrival = if i % 2 == 0 {
                start + (i * FRAME) - off
            } else {
                start + i * FRAME + off
            };
            j.put(1234 + i * 900, arrival);
        }

        assert!(
            (20.0 - j.jitter).abs() < 0.01,
            "Expected jitter to converge at 20.0, jitter was: {}",
            j.jitter
        );
    }

    #[test]
    fn inter_arrival_skips_same_timestamp() {
        let mut j = InterArrivalJitter::new(Frequency::NINETY_KHZ);
        let start = Instant::now();

        j.put(0, start);
        j.put(0, start + Duration::from_millis(300));
        j.put(900, start + FRAME);

        assert_eq!(j.jitter, 0.0);
    }

    #[test]
    fn inter_arrival_rtp_wrap() {
        let mut j = InterArrivalJitter::new(Frequency::NINETY_KHZ);
        let start = Instant::now();

        j.put(u32::MAX - 449, start);
        j.put(450, start + FRAME);

        assert_eq!(j.jitter, 0.0);
    }

    #[test]
    fn base_jitter_keeps_seed_on_schedule() {
        let mut j = BaseJitter::new(Frequency::NINETY_KHZ, Duration::from_millis(48));
        let start = Instant::now();

        for i in 0..4 {
            j.put(i * 900, start + i * FRAME);
        }

        // 48_000 * 15/16 three times
        assert_eq!(j.jitter(), Duration::from_micros(39_550));
    }

    #[test]
    fn base_jitter_follows_late_arrivals() {
        let mut j = BaseJitter::new(Frequency::NINETY_KHZ, Duration::ZERO);
        let start = Instant::now();
        let late = Duration::from_millis(20);

        j.put(0, start);
        for i in 1..200 {
            j.put(i * 900, start + i * FRAME + late);
        }

        let ms = j.jitter_ms();
        assert!((19..=20).contains(&ms), "base jitter {ms}");
    }

    #[test]
    fn base_jitter_never_negative() {
        let mut j = BaseJitter::new(Frequency::NINETY_KHZ, Duration::ZERO);
        let start = Instant::now() + Duration::from_secs(1);

        j.put(90_000, start);
        // arrives 100ms early compared to schedule
        j.put(90_000 + 18_000, start + Duration::from_millis(100));

        assert_eq!(j.jitter(), Duration::ZERO);
    }
}
