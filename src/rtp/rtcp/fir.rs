use super::super::Ssrc;
use super::{FeedbackMessageType, PayloadType, RtcpHeader, RtcpPacket, RtcpType};

/// Full Intra Request, PSFB (PT 206) FMT 4. Asks the sender for a keyframe.
///
/// <https://www.rfc-editor.org/rfc/rfc5104#section-4.3.1>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fir {
    /// Local SSRC.
    pub sender_ssrc: Ssrc,
    /// The requests. The media SSRC of the packet itself is always 0.
    pub reports: Vec<FirEntry>,
}

/// One keyframe request in a [`Fir`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirEntry {
    /// Source that should send the keyframe.
    pub ssrc: Ssrc,
    /// Command sequence number, bumped for each new request. Wraps at 255.
    pub seq_no: u8,
}

impl RtcpPacket for Fir {
    fn header(&self) -> RtcpHeader {
        RtcpHeader {
            rtcp_type: RtcpType::PayloadSpecificFeedback,
            feedback_message_type: FeedbackMessageType::PayloadFeedback(
                PayloadType::FullIntraRequest,
            ),
            words_less_one: (self.length_words() - 1) as u16,
        }
    }

    fn length_words(&self) -> usize {
        // header
        // sender SSRC
        // media SSRC (set to 0)
        // reports * FirEntry: SSRC + seqNo
        1 + 1 + 1 + self.reports.len() * 2
    }

    fn write_to(&self, buf: &mut [u8]) -> usize {
        self.header().write_to(&mut buf[..4]);

        buf[4..8].copy_from_slice(&self.sender_ssrc.to_be_bytes());

        // RFC 5104 4.3.1.2: the media source SSRC is unused and set to 0.
        buf[8..12].copy_from_slice(&[0, 0, 0, 0]);

        let mut buf = &mut buf[12..];
        for r in &self.reports {
            buf[0..4].copy_from_slice(&r.ssrc.to_be_bytes());
            buf[4..8].copy_from_slice(&[r.seq_no, 0, 0, 0]);
            buf = &mut buf[8..];
        }

        self.length_words() * 4
    }
}

impl<'a> TryFrom<&'a [u8]> for Fir {
    type Error = &'static str;

    fn try_from(buf: &'a [u8]) -> Result<Self, Self::Error> {
        if buf.len() < 16 {
            return Err("Fir less than 16 bytes");
        }

        let sender_ssrc = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]).into();

        let mut reports = Vec::new();

        let mut buf = &buf[8..];
        let count = buf.len() / 8;

        for _ in 0..count.min(31) {
            let ssrc = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]).into();
            let seq_no = buf[4];
            reports.push(FirEntry { ssrc, seq_no });
            buf = &buf[8..];
        }

        Ok(Fir {
            sender_ssrc,
            reports,
        })
    }
}
