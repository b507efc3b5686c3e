use std::time::{Duration, Instant};

use crate::config::SourceConfig;
use crate::rtp::rtcp::TmmbrEntry;
use crate::rtp::Ssrc;

/// Decides when a Full Intra Request goes out and numbers them.
#[derive(Debug)]
pub(crate) struct FirControl {
    periodic: bool,
    periodic_interval: Duration,
    min_interval: Duration,
    /// Assembler saw a broken picture.
    by_assembler: bool,
    last_sent: Option<Instant>,
    seq_no: u8,
}

impl FirControl {
    pub fn new(config: &SourceConfig) -> Self {
        FirControl {
            periodic: config.periodic_fir(),
            periodic_interval: config.periodic_fir_interval(),
            min_interval: config.fir_min_interval(),
            by_assembler: false,
            last_sent: None,
            seq_no: config.initial_fir_seq_no().unwrap_or_else(|| fastrand::u8(..)),
        }
    }

    pub fn set_periodic(&mut self, enabled: bool) {
        self.periodic = enabled;
    }

    pub fn periodic(&self) -> bool {
        self.periodic
    }

    pub fn request_by_assembler(&mut self) {
        self.by_assembler = true;
    }

    /// The sequence number the next FIR will carry.
    pub fn next_seq_no(&self) -> u8 {
        self.seq_no
    }

    /// Tells if a FIR should be sent at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        if !self.periodic && !self.by_assembler {
            return false;
        }

        let Some(last) = self.last_sent else {
            // First FIR goes immediately.
            return true;
        };

        let since = now.saturating_duration_since(last);

        if self.by_assembler && since >= self.min_interval {
            return true;
        }

        self.periodic && since >= self.periodic_interval
    }

    /// Record that a FIR was sent. Returns its sequence number.
    pub fn sent(&mut self, now: Instant) -> u8 {
        let x = self.seq_no;
        self.seq_no = self.seq_no.wrapping_add(1);
        self.last_sent = Some(now);
        self.by_assembler = false;
        x
    }
}

/// Rate limiting of TMMBR.
#[derive(Debug)]
pub(crate) struct TmmbrControl {
    min_interval: Duration,
    overhead: u16,
    /// Time and wire bitrate of last sent request.
    last: Option<(Instant, u64)>,
}

impl TmmbrControl {
    pub fn new(config: &SourceConfig) -> Self {
        TmmbrControl {
            min_interval: config.tmmbr_min_interval(),
            overhead: config.tmmbr_overhead(),
            last: None,
        }
    }

    pub fn entry(&self, ssrc: Ssrc, bitrate: u64) -> TmmbrEntry {
        TmmbrEntry {
            ssrc,
            bitrate,
            overhead: self.overhead,
        }
    }

    /// Tells if a request for `entry` should be sent at `now`.
    pub fn is_due(&self, now: Instant, entry: &TmmbrEntry) -> bool {
        if entry.bitrate == 0 {
            return false;
        }

        let Some((last, _)) = self.last else {
            return true;
        };

        now.saturating_duration_since(last) >= self.min_interval
    }

    pub fn sent(&mut self, now: Instant, entry: &TmmbrEntry) {
        self.last = Some((now, entry.wire_bitrate()));
    }

    pub fn last_bitrate(&self) -> Option<u64> {
        self.last.map(|(_, b)| b)
    }
}
