use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rtp::Frequency;

/// Configuration for an [`RtpSource`][crate::RtpSource].
///
/// Created with defaults and adjusted using the `set_*` builder methods.
///
/// ```
/// # use rtpsource::SourceConfig;
/// # use std::time::Duration;
/// let config = SourceConfig::new()
///     .set_periodic_fir(true)
///     .set_static_jitter(Duration::from_millis(80));
///
/// assert!(config.periodic_fir());
/// ```
///
/// The config can also be read from a document where missing fields take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    clock_rate: Frequency,
    static_jitter: Duration,
    periodic_fir: bool,
    periodic_fir_interval: Duration,
    fir_min_interval: Duration,
    initial_fir_seq_no: Option<u8>,
    tmmbr_min_interval: Duration,
    tmmbr_overhead: u16,
    nack_retention: u16,
    max_nack_fci: usize,
    early_notify_loss_threshold: u64,
    autodown_loss_fraction: f32,
    autodown_intervals: usize,
    cvo_extension_id: Option<u8>,
    max_events: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            clock_rate: Frequency::NINETY_KHZ,
            static_jitter: Duration::from_millis(50),
            periodic_fir: false,
            periodic_fir_interval: Duration::from_secs(5),
            fir_min_interval: Duration::from_secs(1),
            initial_fir_seq_no: None,
            tmmbr_min_interval: Duration::from_secs(1),
            tmmbr_overhead: 40,
            nack_retention: 100,
            max_nack_fci: 10,
            early_notify_loss_threshold: 5,
            autodown_loss_fraction: 0.3,
            autodown_intervals: 3,
            cvo_extension_id: None,
            max_events: 1024,
        }
    }
}

impl SourceConfig {
    /// Creates a new default config.
    pub fn new() -> Self {
        SourceConfig::default()
    }

    /// Clock rate of the RTP timestamps, as negotiated for the payload.
    pub fn clock_rate(&self) -> Frequency {
        self.clock_rate
    }

    /// Set the RTP clock rate.
    ///
    /// Defaults to 90kHz.
    pub fn set_clock_rate(mut self, clock_rate: Frequency) -> Self {
        self.clock_rate = clock_rate;
        self
    }

    /// The configured jitter floor.
    pub fn static_jitter(&self) -> Duration {
        self.static_jitter
    }

    /// Set the jitter floor. Also seeds the base jitter estimate.
    ///
    /// Defaults to 50ms.
    pub fn set_static_jitter(mut self, jitter: Duration) -> Self {
        self.static_jitter = jitter;
        self
    }

    /// Whether FIR is requested periodically.
    pub fn periodic_fir(&self) -> bool {
        self.periodic_fir
    }

    /// Toggle periodic FIR requests.
    ///
    /// Defaults to false.
    pub fn set_periodic_fir(mut self, enabled: bool) -> Self {
        self.periodic_fir = enabled;
        self
    }

    /// Interval between periodic FIR requests.
    pub fn periodic_fir_interval(&self) -> Duration {
        self.periodic_fir_interval
    }

    /// Set the interval between periodic FIR requests.
    ///
    /// Defaults to 5 seconds.
    pub fn set_periodic_fir_interval(mut self, interval: Duration) -> Self {
        self.periodic_fir_interval = interval;
        self
    }

    /// Minimum time between FIR requested by the assembler.
    pub fn fir_min_interval(&self) -> Duration {
        self.fir_min_interval
    }

    /// Set minimum time between FIR requested by the assembler.
    ///
    /// Defaults to 1 second.
    pub fn set_fir_min_interval(mut self, interval: Duration) -> Self {
        self.fir_min_interval = interval;
        self
    }

    /// First FIR sequence number. `None` means random.
    pub fn initial_fir_seq_no(&self) -> Option<u8> {
        self.initial_fir_seq_no
    }

    /// Set the first FIR sequence number.
    pub fn set_initial_fir_seq_no(mut self, seq_no: Option<u8>) -> Self {
        self.initial_fir_seq_no = seq_no;
        self
    }

    /// Minimum time between two TMMBR that don't lower the bitrate.
    pub fn tmmbr_min_interval(&self) -> Duration {
        self.tmmbr_min_interval
    }

    /// Set the minimum time between two TMMBR.
    ///
    /// A request lowering the bitrate is never held back.
    ///
    /// Defaults to 1 second.
    pub fn set_tmmbr_min_interval(mut self, interval: Duration) -> Self {
        self.tmmbr_min_interval = interval;
        self
    }

    /// Per packet overhead in bytes reported in TMMBR.
    pub fn tmmbr_overhead(&self) -> u16 {
        self.tmmbr_overhead
    }

    /// Set the per packet overhead reported in TMMBR. Capped at 511 on the wire.
    ///
    /// Defaults to 40 (IPv4 + UDP + RTP).
    pub fn set_tmmbr_overhead(mut self, overhead: u16) -> Self {
        self.tmmbr_overhead = overhead;
        self
    }

    /// How many sequence numbers a missing packet is requested for.
    pub fn nack_retention(&self) -> u16 {
        self.nack_retention
    }

    /// Set how far the highest sequence number may move past a gap before
    /// the gap is abandoned.
    ///
    /// Defaults to 100.
    pub fn set_nack_retention(mut self, retention: u16) -> Self {
        self.nack_retention = retention;
        self
    }

    /// Max number of FCI entries in one NACK packet.
    pub fn max_nack_fci(&self) -> usize {
        self.max_nack_fci
    }

    /// Set max number of FCI entries in one NACK packet.
    ///
    /// Defaults to 10.
    pub fn set_max_nack_fci(mut self, max: usize) -> Self {
        self.max_nack_fci = max;
        self
    }

    /// Packets lost since the last regular quality notification that
    /// warrants an early one.
    pub fn early_notify_loss_threshold(&self) -> u64 {
        self.early_notify_loss_threshold
    }

    /// Set the early notification loss threshold.
    ///
    /// Defaults to 5.
    pub fn set_early_notify_loss_threshold(mut self, threshold: u64) -> Self {
        self.early_notify_loss_threshold = threshold;
        self
    }

    /// Loss fraction (0.0 - 1.0) that counts a regular interval as bad.
    pub fn autodown_loss_fraction(&self) -> f32 {
        self.autodown_loss_fraction
    }

    /// Set the loss fraction of a bad interval.
    ///
    /// Defaults to 0.3.
    pub fn set_autodown_loss_fraction(mut self, fraction: f32) -> Self {
        self.autodown_loss_fraction = fraction;
        self
    }

    /// Consecutive bad intervals before autodown.
    pub fn autodown_intervals(&self) -> usize {
        self.autodown_intervals
    }

    /// Set the number of consecutive bad intervals before autodown.
    ///
    /// Defaults to 3.
    pub fn set_autodown_intervals(mut self, intervals: usize) -> Self {
        self.autodown_intervals = intervals;
        self
    }

    /// Header extension id carrying video orientation (CVO).
    pub fn cvo_extension_id(&self) -> Option<u8> {
        self.cvo_extension_id
    }

    /// Set header extension id of `urn:3gpp:video-orientation`.
    pub fn set_cvo_extension_id(mut self, id: Option<u8>) -> Self {
        self.cvo_extension_id = id;
        self
    }

    /// Max number of events held waiting for [`RtpSource::poll_event()`][crate::RtpSource::poll_event].
    pub fn max_events(&self) -> usize {
        self.max_events
    }

    /// Set the max number of unpolled events. The oldest is dropped when full.
    ///
    /// Defaults to 1024.
    pub fn set_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }
}
