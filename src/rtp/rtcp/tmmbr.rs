use super::super::Ssrc;
use super::{FeedbackMessageType, RtcpHeader, RtcpPacket, RtcpType, TransportType};

const MANTISSA_BITS: u32 = 17;
const MAX_MANTISSA: u64 = (1 << MANTISSA_BITS) - 1;
const MAX_EXP: u32 = 63;
const MAX_OVERHEAD: u16 = (1 << 9) - 1;

/// Temporary Maximum Media Stream Bit Rate Request (TMMBR).
///
/// Asks the sender of each entry's SSRC to cap its bitrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tmmbr {
    /// Sender of this feedback.
    pub sender_ssrc: Ssrc,
    /// The requested caps.
    pub reports: Vec<TmmbrEntry>,
}

/// A bitrate cap for one SSRC.
///
/// The bitrate is carried as a 17 bit mantissa and 6 bit exponent, which means
/// values beyond 17 bits of precision are rounded down when serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TmmbrEntry {
    /// The SSRC the cap applies to.
    pub ssrc: Ssrc,
    /// Maximum total media bitrate in bits per second.
    pub bitrate: u64,
    /// Measured per packet overhead in bytes. 9 bits on the wire.
    pub overhead: u16,
}

impl TmmbrEntry {
    /// Split the bitrate into exponent and mantissa.
    ///
    /// Picks the smallest exponent where the mantissa fits, so the decoded
    /// value is the largest representable one not above `bitrate`.
    pub fn exp_mantissa(&self) -> (u8, u32) {
        let mut exp = 0;
        let mut mantissa = self.bitrate;

        while mantissa > MAX_MANTISSA && exp < MAX_EXP {
            mantissa >>= 1;
            exp += 1;
        }

        (exp as u8, mantissa.min(MAX_MANTISSA) as u32)
    }

    /// The bitrate as it reads after a trip through the wire format.
    pub fn wire_bitrate(&self) -> u64 {
        let (exp, mantissa) = self.exp_mantissa();
        (mantissa as u64) << exp
    }

    fn write_to(&self, buf: &mut [u8]) {
        let (exp, mantissa) = self.exp_mantissa();
        let overhead = self.overhead.min(MAX_OVERHEAD) as u32;

        let word = (exp as u32) << 26 | mantissa << 9 | overhead;

        buf[0..4].copy_from_slice(&self.ssrc.to_be_bytes());
        buf[4..8].copy_from_slice(&word.to_be_bytes());
    }
}

impl RtcpPacket for Tmmbr {
    fn header(&self) -> RtcpHeader {
        RtcpHeader {
            rtcp_type: RtcpType::TransportLayerFeedback,
            feedback_message_type: FeedbackMessageType::TransportFeedback(TransportType::Tmmbr),
            words_less_one: (self.length_words() - 1) as u16,
        }
    }

    fn length_words(&self) -> usize {
        // header
        // sender SSRC
        // media SSRC (set to 0)
        // reports * TmmbrEntry: SSRC + exp/mantissa/overhead
        1 + 1 + 1 + self.reports.len() * 2
    }

    fn write_to(&self, buf: &mut [u8]) -> usize {
        self.header().write_to(&mut buf[..4]);

        buf[4..8].copy_from_slice(&self.sender_ssrc.to_be_bytes());
        buf[8..12].copy_from_slice(&[0, 0, 0, 0]);

        let mut buf = &mut buf[12..];
        for r in &self.reports {
            r.write_to(buf);
            buf = &mut buf[8..];
        }

        self.length_words() * 4
    }
}

impl<'a> TryFrom<&'a [u8]> for Tmmbr {
    type Error = &'static str;

    fn try_from(buf: &'a [u8]) -> Result<Self, Self::Error> {
        if buf.len() < 16 {
            return Err("Tmmbr less than 16 bytes");
        }

        let sender_ssrc = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]).into();

        let mut reports = Vec::new();

        let mut buf = &buf[8..];
        let count = buf.len() / 8;

        for _ in 0..count {
            let ssrc = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]).into();
            let word = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);

            let exp = word >> 26;
            let mantissa = (word >> 9) as u64 & MAX_MANTISSA;
            let overhead = (word & MAX_OVERHEAD as u32) as u16;

            reports.push(TmmbrEntry {
                ssrc,
                bitrate: mantissa.checked_shl(exp).unwrap_or(u64::MAX),
                overhead,
            });
            buf = &buf[8..];
        }

        Ok(Tmmbr {
            sender_ssrc,
            reports,
        })
    }
}
