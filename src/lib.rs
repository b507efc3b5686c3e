//! Per source RTP receive tracking and RTCP feedback in Sans I/O style.
//!
//! An [`RtpSource`] follows one remote media stream, identified by its SSRC. It
//! is fed raw RTP datagrams and produces the RTCP feedback a receiver sends back:
//!
//! * Receiver Reports ([RFC 3550][rfc3550]) with loss and interarrival jitter.
//! * Generic NACK ([RFC 4585][rfc4585]) for packets that went missing.
//! * Full Intra Request and TMMBR ([RFC 5104][rfc5104]) for keyframe recovery
//!   and bitrate ceilings.
//!
//! Like the rest of the Sans I/O family, the source does no network talking and
//! has no internal threads or timers. Time is passed in as `now: Instant`, feedback
//! is written into a caller supplied [`RtcpBuf`][rtp::rtcp::RtcpBuf] whenever the
//! caller's RTCP timer fires, and notifications are polled.
//!
//! ```
//! # use rtpsource::{RtpSource, SourceConfig, SourceEvent};
//! # use rtpsource::rtp::rtcp::RtcpBuf;
//! # use std::time::Instant;
//! let source = RtpSource::new(0x1234.into(), SourceConfig::new());
//! source.set_self_id(0x5678.into());
//!
//! let packet = |seq: u16| {
//!     let mut b = vec![0x80, 96];
//!     b.extend_from_slice(&seq.to_be_bytes());
//!     b.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0x12, 0x34, 0xff]);
//!     b
//! };
//!
//! let now = Instant::now();
//! source.process_rtp_packet(now, packet(100));
//! source.process_rtp_packet(now, packet(103));
//!
//! // 101 and 102 are missing.
//! assert_eq!(source.nack_pending(), vec![101, 102]);
//!
//! let mut buf = RtcpBuf::new(1200);
//! source.add_receiver_report(now, &mut buf);
//! source.add_nack(&mut buf);
//!
//! // buf now holds a compound RTCP packet to send.
//! assert!(!buf.is_empty());
//!
//! while let Some(event) = source.poll_event() {
//!     match event {
//!         SourceEvent::FirstRtpPacket { .. } => {}
//!         SourceEvent::FeedbackSent(_) => {}
//!         _ => {}
//!     }
//! }
//! ```
//!
//! # Threads
//!
//! [`RtpSource`] is `Send + Sync` and every method takes `&self`. The packet path
//! and a feedback timer may call it from different threads. The NACK map sits
//! behind a lock of its own so producing NACK feedback doesn't wait for packet
//! processing.
//!
//! [rfc3550]: https://www.rfc-editor.org/rfc/rfc3550
//! [rfc4585]: https://www.rfc-editor.org/rfc/rfc4585
//! [rfc5104]: https://www.rfc-editor.org/rfc/rfc5104

#![forbid(unsafe_code)]
#![allow(clippy::new_without_default)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::manual_range_contains)]
#![warn(missing_docs)]

#[macro_use]
extern crate tracing;

use thiserror::Error;

mod config;
pub use config::SourceConfig;

mod event;
pub use event::{FeedbackKind, QualityReport, SourceEvent};

pub mod jitter;

pub mod rtp;

mod source;
pub use source::{DropReason, PacketOutcome, RtpSource, SourceStats};

mod util;

/// Errors for a packet that can't be taken in by a source.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SourceError {
    /// The RTP header is broken.
    #[error("{0}")]
    Rtp(#[from] rtp::RtpError),

    /// The packet belongs to a different SSRC.
    #[error("Packet for SSRC {actual} given to source {expected}")]
    ForeignSsrc {
        /// SSRC of the source.
        expected: rtp::Ssrc,
        /// SSRC in the packet.
        actual: rtp::Ssrc,
    },
}
