/// The common header of every RTCP packet.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|   FMT   |       PT      |          length               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtcpHeader {
    /// Type of RTCP packet.
    pub rtcp_type: RtcpType,
    /// Interpretation of the FMT/count field depends on the `rtcp_type`.
    pub feedback_message_type: FeedbackMessageType,
    /// Length of the packet in 32 bit words minus one.
    pub words_less_one: u16,
}

impl RtcpHeader {
    /// Type of RTCP packet.
    pub fn rtcp_type(&self) -> RtcpType {
        self.rtcp_type
    }

    /// Length of packet, including this header, in 32 bit words.
    pub fn length_words(&self) -> usize {
        self.words_less_one as usize + 1
    }

    pub(crate) fn write_to(&self, buf: &mut [u8]) -> usize {
        let fmt: u8 = self.feedback_message_type.into();
        buf[0] = 0b10_0_00000 | (fmt & 0b11111);
        buf[1] = self.rtcp_type as u8;
        buf[2..4].copy_from_slice(&self.words_less_one.to_be_bytes());
        4
    }
}

impl<'a> TryFrom<&'a [u8]> for RtcpHeader {
    type Error = &'static str;

    fn try_from(buf: &'a [u8]) -> Result<Self, Self::Error> {
        if buf.len() < 4 {
            return Err("Less than 4 bytes for RtcpHeader");
        }

        let version = (buf[0] & 0b11_0_00000) >> 6;
        if version != 2 {
            return Err("RTCP version is not 2");
        }

        let fmt = buf[0] & 0b00_0_11111;
        let rtcp_type: RtcpType = buf[1].try_into()?;

        let feedback_message_type = match rtcp_type {
            RtcpType::SenderReport | RtcpType::ReceiverReport => {
                FeedbackMessageType::ReceptionReport(fmt)
            }
            RtcpType::SourceDescription | RtcpType::Goodbye => {
                FeedbackMessageType::SourceCount(fmt)
            }
            RtcpType::ApplicationDefined => FeedbackMessageType::Subtype(fmt),
            RtcpType::TransportLayerFeedback => {
                FeedbackMessageType::TransportFeedback(fmt.try_into()?)
            }
            RtcpType::PayloadSpecificFeedback => {
                FeedbackMessageType::PayloadFeedback(fmt.try_into()?)
            }
        };

        let words_less_one = u16::from_be_bytes([buf[2], buf[3]]);

        Ok(RtcpHeader {
            rtcp_type,
            feedback_message_type,
            words_less_one,
        })
    }
}

/// Kind of RTCP packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RtcpType {
    SenderReport = 200,
    ReceiverReport = 201,
    SourceDescription = 202,
    Goodbye = 203,
    ApplicationDefined = 204,
    /// RTPFB, RFC 4585.
    TransportLayerFeedback = 205,
    /// PSFB, RFC 4585.
    PayloadSpecificFeedback = 206,
}

impl TryFrom<u8> for RtcpType {
    type Error = &'static str;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        use RtcpType::*;
        match v {
            200 => Ok(SenderReport),
            201 => Ok(ReceiverReport),
            202 => Ok(SourceDescription),
            203 => Ok(Goodbye),
            204 => Ok(ApplicationDefined),
            205 => Ok(TransportLayerFeedback),
            206 => Ok(PayloadSpecificFeedback),
            _ => {
                trace!("Unknown RtcpType: {}", v);
                Err("Unknown RtcpType")
            }
        }
    }
}

/// Number of _something_ in the RTCP packet.
///
/// The RTCP type determines how to interpret the FMT field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackMessageType {
    /// When packet type SenderReport or ReceiverReport.
    ///
    /// The contained u8 is number of reception reports.
    ReceptionReport(u8),

    /// When packet type SourceDescription (SDES) or Goodbye.
    SourceCount(u8),

    /// When packet type ApplicationDefined.
    Subtype(u8),

    /// When packet type is TransportLayerFeedback.
    TransportFeedback(TransportType),

    /// When packet type is PayloadSpecificFeedback.
    PayloadFeedback(PayloadType),
}

impl From<FeedbackMessageType> for u8 {
    fn from(val: FeedbackMessageType) -> Self {
        use FeedbackMessageType::*;
        match val {
            ReceptionReport(v) | SourceCount(v) | Subtype(v) => {
                debug_assert!(v <= 31, "rtcp fmt when count must be <= 31");
                v & 0b11111
            }
            TransportFeedback(v) => v as u8,
            PayloadFeedback(v) => v as u8,
        }
    }
}

/// Subtypes of [`FeedbackMessageType::TransportFeedback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    /// Generic NACK.
    ///
    /// Definition: <https://www.rfc-editor.org/rfc/rfc4585#section-6.2.1>
    Nack = 1,

    /// Temporary Maximum Media Stream Bit Rate Request.
    ///
    /// Definition: <https://www.rfc-editor.org/rfc/rfc5104#section-4.2.1>
    Tmmbr = 3,
}

impl TryFrom<u8> for TransportType {
    type Error = &'static str;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        use TransportType::*;
        match v {
            1 => Ok(Nack),
            3 => Ok(Tmmbr),
            _ => {
                trace!("Unknown TransportType: {}", v);
                Err("Unknown TransportType")
            }
        }
    }
}

/// Subtypes of [`FeedbackMessageType::PayloadFeedback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadType {
    /// FIR packet type.
    ///
    /// Definition: <https://www.rfc-editor.org/rfc/rfc5104.html#section-4.3.1>
    FullIntraRequest = 4,
}

impl TryFrom<u8> for PayloadType {
    type Error = &'static str;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        use PayloadType::*;
        match v {
            4 => Ok(FullIntraRequest),
            _ => {
                trace!("Unknown PayloadType: {}", v);
                Err("Unknown PayloadType")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_write_read() {
        let header = RtcpHeader {
            rtcp_type: RtcpType::TransportLayerFeedback,
            feedback_message_type: FeedbackMessageType::TransportFeedback(TransportType::Tmmbr),
            words_less_one: 4,
        };

        let mut buf = [0; 4];
        header.write_to(&mut buf);
        assert_eq!(buf, [0b1000_0011, 205, 0, 4]);

        let parsed: RtcpHeader = buf.as_slice().try_into().unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.length_words(), 5);
    }

    #[test]
    fn header_rejects_bad_version() {
        let buf = [0b0100_0001, 201, 0, 1];
        let res: Result<RtcpHeader, _> = buf.as_slice().try_into();
        assert!(res.is_err());
    }
}
