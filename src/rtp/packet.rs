use std::time::Instant;

use super::{RtpHeader, SeqNo};

/// A received RTP packet, ready for the assembler.
///
/// Packets are handed over in arrival order. Reordering by `seq_no` is up to
/// the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    /// Extended sequence number.
    pub seq_no: SeqNo,
    /// Parsed header.
    pub header: RtpHeader,
    /// Payload without header and padding.
    pub payload: Vec<u8>,
    /// When the packet arrived.
    pub timestamp: Instant,
}

impl RtpPacket {
    /// Split a datagram into header and payload. Reuses the allocation.
    pub(crate) fn new(
        seq_no: SeqNo,
        header: RtpHeader,
        mut buf: Vec<u8>,
        timestamp: Instant,
    ) -> Self {
        buf.truncate(buf.len().saturating_sub(header.padding_len));
        buf.drain(..header.header_len.min(buf.len()));

        RtpPacket {
            seq_no,
            header,
            payload: buf,
            timestamp,
        }
    }
}
