//! RTCP wire formats produced for a received source.
//!
//! Receiver Report ([RFC 3550 6.4.2][rr]), Generic NACK ([RFC 4585 6.2.1][nack]),
//! Full Intra Request and TMMBR ([RFC 5104 4.3][ccm]).
//!
//! [rr]: https://www.rfc-editor.org/rfc/rfc3550#section-6.4.2
//! [nack]: https://www.rfc-editor.org/rfc/rfc4585#section-6.2.1
//! [ccm]: https://www.rfc-editor.org/rfc/rfc5104#section-4.3

#![allow(clippy::unusual_byte_groupings)]

mod header;
pub use header::{FeedbackMessageType, PayloadType, RtcpHeader, RtcpType, TransportType};

mod rr;
pub use rr::{ReceiverReport, ReceptionReport};

mod nack;
pub use nack::{Nack, NackEntry};

mod fir;
pub use fir::{Fir, FirEntry};

mod tmmbr;
pub use tmmbr::{Tmmbr, TmmbrEntry};

/// An RTCP packet that can be serialized.
pub trait RtcpPacket {
    /// The common RTCP header for this packet.
    fn header(&self) -> RtcpHeader;

    /// Length of entire RTCP packet (including header) in words (4 bytes).
    fn length_words(&self) -> usize;

    /// Write this packet to the buffer.
    ///
    /// Panics if the buffer doesn't have capacity to hold length_words * 4 bytes.
    fn write_to(&self, buf: &mut [u8]) -> usize;
}

/// RTCP packets this crate produces and understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rtcp {
    /// Receiver report. Also known as RR.
    ReceiverReport(ReceiverReport),
    /// Reports missing packets.
    Nack(Nack),
    /// Full Intra Request. Complete restart of a video decoder.
    Fir(Fir),
    /// Temporary Maximum Media Stream Bit Rate Request.
    Tmmbr(Tmmbr),
}

impl Rtcp {
    /// Parse a compound RTCP packet.
    ///
    /// Packets of types not handled here are skipped.
    pub fn read_packet(buf: &[u8]) -> Vec<Rtcp> {
        let mut out = Vec::new();
        let mut buf = buf;

        while !buf.is_empty() {
            let header: RtcpHeader = match buf.try_into() {
                Ok(v) => v,
                Err(e) => {
                    debug!("{}", e);
                    break;
                }
            };

            let full_length = header.length_words() * 4;

            if full_length > buf.len() {
                // this length is incorrect.
                break;
            }

            match Rtcp::try_from(&buf[..full_length]) {
                Ok(v) => out.push(v),
                Err(e) => trace!("{}", e),
            }

            buf = &buf[full_length..];
        }

        out
    }
}

impl RtcpPacket for Rtcp {
    fn header(&self) -> RtcpHeader {
        match self {
            Rtcp::ReceiverReport(v) => v.header(),
            Rtcp::Nack(v) => v.header(),
            Rtcp::Fir(v) => v.header(),
            Rtcp::Tmmbr(v) => v.header(),
        }
    }

    fn length_words(&self) -> usize {
        match self {
            Rtcp::ReceiverReport(v) => v.length_words(),
            Rtcp::Nack(v) => v.length_words(),
            Rtcp::Fir(v) => v.length_words(),
            Rtcp::Tmmbr(v) => v.length_words(),
        }
    }

    fn write_to(&self, buf: &mut [u8]) -> usize {
        match self {
            Rtcp::ReceiverReport(v) => v.write_to(buf),
            Rtcp::Nack(v) => v.write_to(buf),
            Rtcp::Fir(v) => v.write_to(buf),
            Rtcp::Tmmbr(v) => v.write_to(buf),
        }
    }
}

impl<'a> TryFrom<&'a [u8]> for Rtcp {
    type Error = &'static str;

    fn try_from(buf: &'a [u8]) -> Result<Self, Self::Error> {
        let header: RtcpHeader = buf.try_into()?;

        // By constraining the length, all subparsing can go
        // until they exhaust the buffer length.
        let buf = &buf[4..];

        Ok(match header.feedback_message_type {
            FeedbackMessageType::ReceptionReport(_)
                if header.rtcp_type == RtcpType::ReceiverReport =>
            {
                Rtcp::ReceiverReport(buf.try_into()?)
            }
            FeedbackMessageType::TransportFeedback(TransportType::Nack) => {
                Rtcp::Nack(buf.try_into()?)
            }
            FeedbackMessageType::TransportFeedback(TransportType::Tmmbr) => {
                Rtcp::Tmmbr(buf.try_into()?)
            }
            FeedbackMessageType::PayloadFeedback(PayloadType::FullIntraRequest) => {
                Rtcp::Fir(buf.try_into()?)
            }
            _ => return Err("Ignore unhandled RTCP type"),
        })
    }
}

/// Output buffer for RTCP feedback with a fixed capacity.
///
/// Packets are appended one after another, forming a compound RTCP packet.
/// A packet that doesn't fit the remaining capacity is not written.
#[derive(Debug, Clone)]
pub struct RtcpBuf {
    data: Vec<u8>,
    capacity: usize,
}

impl RtcpBuf {
    /// Creates an empty buffer that will hold at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        RtcpBuf {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Tells if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left before the buffer is full.
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// The written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Take the written bytes, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    /// Check there is room for `len` more bytes.
    pub(crate) fn fits(&self, len: usize) -> bool {
        len <= self.remaining()
    }

    /// Append a packet.
    ///
    /// Returns the number of bytes written, or None if the packet doesn't fit.
    pub(crate) fn append(&mut self, packet: &impl RtcpPacket) -> Option<usize> {
        let len = packet.length_words() * 4;

        if !self.fits(len) {
            warn!(
                "RTCP buffer too small to accommodate {:?}: {} > {}",
                packet.header().rtcp_type,
                len,
                self.remaining()
            );
            return None;
        }

        let offset = self.data.len();
        self.data.resize(offset + len, 0);
        let written = packet.write_to(&mut self.data[offset..]);
        debug_assert_eq!(written, len, "length_words equals write_to length");

        Some(written)
    }
}
