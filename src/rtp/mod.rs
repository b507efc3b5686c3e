//! RTP packet level types: identifiers, header parsing and RTCP feedback formats.

use thiserror::Error;

mod id;
pub use id::{Frequency, SeqNo, Ssrc};

mod header;
pub use header::{extend_u32, seq_distance};
pub use header::{RtpHeader, VideoOrientation};

mod bandwidth;
pub use bandwidth::Bitrate;

mod packet;
pub use packet::RtpPacket;

pub mod rtcp;

/// Errors that can arise in RTP.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RtpError {
    /// Failed to parse RTP header.
    #[error("Failed to parse RTP header: {0}")]
    ParseHeader(&'static str),
}
