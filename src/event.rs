use std::time::Duration;

use crate::rtp::{Bitrate, SeqNo, Ssrc, VideoOrientation};

/// Notifications from an [`RtpSource`][crate::RtpSource].
///
/// Drained with [`RtpSource::poll_event()`][crate::RtpSource::poll_event].
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SourceEvent {
    /// The first RTP packet was accepted. Posted once.
    FirstRtpPacket {
        /// SSRC of the source.
        ssrc: Ssrc,
        /// Sequence number of the first packet.
        seq_no: SeqNo,
        /// RTP timestamp of the first packet.
        rtp_time: u32,
    },

    /// The first time correlation (usually from a sender report) arrived. Posted once.
    FirstRtcpPacket,

    /// A new RTP/NTP time correlation was recorded.
    TimeUpdate {
        /// RTP timestamp of the correlation.
        rtp_time: u32,
        /// NTP time of the correlation.
        ntp_time: u64,
    },

    /// A regular or early quality report.
    Quality(QualityReport),

    /// Feedback was written for sending.
    FeedbackSent(FeedbackKind),

    /// Loss has persisted over several regular intervals.
    AutoDown {
        /// Loss fraction of the last interval, 0.0 to 1.0.
        fraction_lost: f32,
        /// Number of consecutive intervals above the threshold.
        intervals: usize,
    },

    /// Video orientation (CVO) changed, or was seen for the first time.
    VideoOrientation(VideoOrientation),

    /// The remote sent BYE. Posted once.
    Bye,
}

/// Kind of feedback written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    /// Generic NACK with number of FCI entries.
    Nack(usize),
    /// Full Intra Request with its sequence number.
    Fir(u8),
    /// TMMBR with the bitrate as written on the wire.
    Tmmbr(u64),
}

/// Reception quality over one interval.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    /// Whether this is a regular report. False for early reports.
    pub regular: bool,
    /// Bitrate sample supplied with the report.
    pub bitrate: Bitrate,
    /// Packets expected in the interval.
    pub expected: i64,
    /// Packets received in the interval.
    pub received: i64,
    /// Packets lost in the interval. Negative with duplicates.
    pub lost: i64,
    /// Loss fraction of the interval, 0.0 to 1.0.
    pub fraction_lost: f32,
    /// Packets lost since the start of the stream.
    pub cumulative_lost: i64,
    /// Highest extended sequence number.
    pub highest_seq_no: SeqNo,
    /// Current base jitter.
    pub base_jitter: Duration,
    /// Current inter-arrival jitter.
    pub inter_arrival_jitter: Duration,
}
