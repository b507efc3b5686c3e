use std::time::{Instant, SystemTime};

use crate::rtp::Frequency;
use crate::util::{dlsr, lsr, ntp_offset, ntp_to_system_time};

/// Correlation between RTP time and NTP wallclock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SyncPoint {
    pub rtp_time: u32,
    pub ntp_time: u64,
    /// When the correlation was received.
    pub local: Instant,
}

impl SyncPoint {
    /// LSR and DLSR fields of a reception report.
    pub fn lsr_dlsr(&self, now: Instant) -> (u32, u32) {
        let delay = now.saturating_duration_since(self.local);
        (lsr(self.ntp_time), dlsr(delay))
    }

    /// Extrapolate the NTP time of `rtp_time`.
    pub fn rtp_to_ntp(&self, rtp_time: u32, clock_rate: Frequency) -> u64 {
        let delta = rtp_time.wrapping_sub(self.rtp_time) as i32;
        ntp_offset(self.ntp_time, delta as i64, clock_rate.get())
    }

    /// Extrapolate the wallclock of `rtp_time`.
    pub fn rtp_to_system_time(&self, rtp_time: u32, clock_rate: Frequency) -> Option<SystemTime> {
        ntp_to_system_time(self.rtp_to_ntp(rtp_time, clock_rate))
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    fn point(local: Instant) -> SyncPoint {
        SyncPoint {
            rtp_time: 90_000,
            ntp_time: 0xb44d_b705_2000_0000,
            local,
        }
    }

    #[test]
    fn lsr_dlsr() {
        let now = Instant::now();
        let p = point(now);
        assert_eq!(p.lsr_dlsr(now + Duration::from_millis(5_250)), (0xb705_2000, 0x0005_4000));
    }

    #[test]
    fn rtp_to_ntp_both_directions() {
        let p = point(Instant::now());
        let clock = Frequency::NINETY_KHZ;

        assert_eq!(p.rtp_to_ntp(90_000, clock), p.ntp_time);
        assert_eq!(p.rtp_to_ntp(180_000, clock), p.ntp_time + (1 << 32));
        assert_eq!(p.rtp_to_ntp(45_000, clock), p.ntp_time - (1 << 31));
    }

    #[test]
    fn rtp_to_ntp_across_wrap() {
        let p = SyncPoint {
            rtp_time: u32::MAX - 44_999,
            ntp_time: 100 << 32,
            local: Instant::now(),
        };
        assert_eq!(p.rtp_to_ntp(45_000, Frequency::NINETY_KHZ), 101 << 32);
    }
}
