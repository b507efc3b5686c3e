use super::super::Ssrc;
use super::{FeedbackMessageType, RtcpHeader, RtcpPacket, RtcpType, TransportType};

/// Generic NACK, RTPFB (PT 205) FMT 1, requesting retransmission.
///
/// <https://www.rfc-editor.org/rfc/rfc4585#section-6.2.1>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nack {
    /// Local SSRC.
    pub sender_ssrc: Ssrc,
    /// Source the packets are missing from.
    pub ssrc: Ssrc,
    /// Pending entries of the NACK map, at most `max_nack_fci` of them.
    pub reports: Vec<NackEntry>,
}

/// A range of sequence numbers missing.
///
/// `pid` is missing, and bit `i` of `blp` set means `pid + i + 1` is missing too.
#[allow(missing_docs)]
#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
pub struct NackEntry {
    pub pid: u16,
    pub blp: u16,
}

impl RtcpPacket for Nack {
    fn header(&self) -> RtcpHeader {
        RtcpHeader {
            rtcp_type: RtcpType::TransportLayerFeedback,
            feedback_message_type: FeedbackMessageType::TransportFeedback(TransportType::Nack),
            words_less_one: (self.length_words() - 1) as u16,
        }
    }

    fn length_words(&self) -> usize {
        // header
        // sender SSRC
        // media SSRC
        // 1 word per NackEntry
        1 + 2 + self.reports.len()
    }

    fn write_to(&self, buf: &mut [u8]) -> usize {
        self.header().write_to(&mut buf[..4]);
        buf[4..8].copy_from_slice(&self.sender_ssrc.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ssrc.to_be_bytes());
        let mut buf = &mut buf[12..];
        for r in &self.reports {
            buf[0..2].copy_from_slice(&r.pid.to_be_bytes());
            buf[2..4].copy_from_slice(&r.blp.to_be_bytes());
            buf = &mut buf[4..];
        }
        self.length_words() * 4
    }
}

impl<'a> TryFrom<&'a [u8]> for Nack {
    type Error = &'static str;

    fn try_from(buf: &'a [u8]) -> Result<Self, Self::Error> {
        if buf.len() < 12 {
            return Err("Nack less than 12 bytes");
        }

        let sender_ssrc = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]).into();
        let ssrc = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]).into();

        let mut reports = Vec::new();

        let mut buf = &buf[8..];
        let count = buf.len() / 4;

        for _ in 0..count {
            let pid = u16::from_be_bytes([buf[0], buf[1]]);
            let blp = u16::from_be_bytes([buf[2], buf[3]]);
            reports.push(NackEntry { pid, blp });
            buf = &buf[4..];
        }

        Ok(Nack {
            sender_ssrc,
            ssrc,
            reports,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nack_layout() {
        let nack = Nack {
            sender_ssrc: 1.into(),
            ssrc: 2.into(),
            reports: vec![NackEntry { pid: 101, blp: 0b1 }],
        };
        let mut buf = vec![0; nack.length_words() * 4];
        nack.write_to(&mut buf);
        assert_eq!(
            buf,
            vec![0x81, 205, 0, 3, 0, 0, 0, 1, 0, 0, 0, 2, 0, 101, 0, 1]
        );
    }
}
