#![allow(clippy::unusual_byte_groupings)]

use super::{RtpError, Ssrc};

/// One-byte header extension form, RFC 8285 section 4.2.
const EXT_FORM_ONE_BYTE: u16 = 0xBEDE;

/// Two-byte header extension form, RFC 8285 section 4.3. Low 4 bits are app bits.
const EXT_FORM_TWO_BYTE: u16 = 0x1000;

/// Parsed header from an RTP packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpHeader {
    /// Always 2
    pub version: u8,
    /// Whether the RTP packet has padding to be an equal of 4 bytes.
    pub has_padding: bool,
    /// RTP packet has "RTP header extensions".
    pub has_extension: bool,
    /// For video, this marker signifies the end of a series of packets that
    /// together form a single video frame.
    /// For audio, it marks the beginning of a talkspurt, which is a burst of
    /// audio packets.
    pub marker: bool,
    /// Type of payload being carried. What this correlates to is sent in the SDP.
    pub payload_type: u8,
    /// Sequence number increasing by 1 for each RTP packet.
    pub sequence_number: u16,
    /// Timestamp in media time for the RTP packet. What the media time base is depends
    /// on the codec.
    pub timestamp: u32,
    /// Sender source identifier.
    pub ssrc: Ssrc,
    /// Video orientation, if the packet carried the configured CVO extension.
    pub video_orientation: Option<VideoOrientation>,
    /// Length of header.
    pub header_len: usize,
    /// Number of padding bytes at the end of the packet.
    pub padding_len: usize,
}

/// Coordination of video orientation in RTP streams, 3GPP TS 26.114.
///
/// The extension byte is laid out as `0 0 0 0 C F R1 R0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoOrientation {
    /// Front facing (false) or back facing (true) camera.
    pub back_camera: bool,
    /// Horizontal flip (mirror) to apply before rotation.
    pub flip: bool,
    /// Clockwise rotation in degrees. One of 0, 90, 180 or 270.
    pub rotation: u16,
}

impl VideoOrientation {
    fn from_byte(b: u8) -> Self {
        VideoOrientation {
            back_camera: b & 0b1000 > 0,
            flip: b & 0b0100 > 0,
            rotation: (b & 0b11) as u16 * 90,
        }
    }

    /// Serialize to the extension byte.
    pub fn to_byte(self) -> u8 {
        (if self.back_camera { 0b1000 } else { 0 })
            | (if self.flip { 0b0100 } else { 0 })
            | ((self.rotation / 90) as u8 & 0b11)
    }
}

impl RtpHeader {
    /// Parse an RTP header.
    ///
    /// `cvo_id` is the negotiated header extension id for video orientation, if any.
    pub fn parse(buf: &[u8], cvo_id: Option<u8>) -> Result<RtpHeader, RtpError> {
        let orig_len = buf.len();
        if buf.len() < 12 {
            trace!("RTP header too short < 12: {}", buf.len());
            return Err(RtpError::ParseHeader("too short"));
        }

        let version = (buf[0] & 0b1100_0000) >> 6;
        if version != 2 {
            trace!("RTP version is not 2");
            return Err(RtpError::ParseHeader("version is not 2"));
        }
        let has_padding = buf[0] & 0b0010_0000 > 0;
        let has_extension = buf[0] & 0b0001_0000 > 0;
        let csrc_count = (buf[0] & 0b0000_1111) as usize;
        let marker = buf[1] & 0b1000_0000 > 0;
        let payload_type = buf[1] & 0b0111_1111;
        let sequence_number = u16::from_be_bytes([buf[2], buf[3]]);

        let timestamp = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);

        let ssrc = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);

        let buf: &[u8] = &buf[12..];

        let csrc_len = 4 * csrc_count;
        if buf.len() < csrc_len {
            trace!("RTP header invalid, not enough csrc");
            return Err(RtpError::ParseHeader("not enough csrc"));
        }

        let buf: &[u8] = &buf[csrc_len..];

        let mut video_orientation = None;

        let rest = if !has_extension {
            buf
        } else {
            if buf.len() < 4 {
                trace!("RTP bad header extension");
                return Err(RtpError::ParseHeader("bad header extension"));
            }

            let form = u16::from_be_bytes([buf[0], buf[1]]);
            let ext_words = u16::from_be_bytes([buf[2], buf[3]]);
            let ext_len = ext_words as usize * 4;

            let buf: &[u8] = &buf[4..];

            if buf.len() < ext_len {
                trace!("RTP ext len larger than header {} > {}", buf.len(), ext_len);
                return Err(RtpError::ParseHeader("extension longer than packet"));
            }

            if let Some(id) = cvo_id {
                video_orientation = find_extension(&buf[..ext_len], form, id)
                    .and_then(|v| v.first().copied())
                    .map(VideoOrientation::from_byte);
            }

            &buf[ext_len..]
        };

        let padding_len = if has_padding {
            let Some(pad) = rest.last().copied() else {
                trace!("RTP padding bit set without padding");
                return Err(RtpError::ParseHeader("padding without payload"));
            };
            if pad == 0 || pad as usize > rest.len() {
                trace!("RTP padding invalid: {} of {}", pad, rest.len());
                return Err(RtpError::ParseHeader("invalid padding"));
            }
            pad as usize
        } else {
            0
        };

        let header_len = orig_len - rest.len();

        Ok(RtpHeader {
            version,
            has_padding,
            has_extension,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc: ssrc.into(),
            video_orientation,
            header_len,
            padding_len,
        })
    }
}

// https://tools.ietf.org/html/rfc8285
fn find_extension(mut buf: &[u8], form: u16, wanted: u8) -> Option<&[u8]> {
    let one_byte = if form == EXT_FORM_ONE_BYTE {
        true
    } else if form & 0xfff0 == EXT_FORM_TWO_BYTE {
        false
    } else {
        trace!("Ignoring unknown RTP header extensions form: {:?}", form);
        return None;
    };

    loop {
        if buf.is_empty() {
            return None;
        }

        if buf[0] == 0 {
            // padding
            buf = &buf[1..];
            continue;
        }

        let (id, len) = if one_byte {
            let id = buf[0] >> 4;
            let len = (buf[0] & 0xf) as usize + 1;
            buf = &buf[1..];

            if id == 15 {
                // Processing of the entire extension terminates at id 15.
                return None;
            }
            (id, len)
        } else {
            if buf.len() < 2 {
                trace!("Not enough ext header len: {} < {}", buf.len(), 2);
                return None;
            }
            let id = buf[0];
            let len = buf[1] as usize;
            buf = &buf[2..];
            (id, len)
        };

        if buf.len() < len {
            trace!("Not enough type ext len: {} < {}", buf.len(), len);
            return None;
        }

        if id == wanted {
            return Some(&buf[..len]);
        }

        buf = &buf[len..];
    }
}

/// Extend a 32 bit RTP timestamp into 64 bits using the previous extended value.
///
/// Same scheme as the SRTP packet index, with the rollover counter in the
/// upper 32 bits. <https://tools.ietf.org/html/rfc3711#appendix-A>
pub fn extend_u32(prev_ext: Option<u64>, v: u32) -> u64 {
    const MAX: u64 = 1 << 32;
    const HALF: u64 = MAX / 2;

    let v = v as u64;

    let Some(prev_ext) = prev_ext else {
        return v;
    };

    let roc = (prev_ext >> 32) as i64;
    let prev = prev_ext & (MAX - 1);

    let roc = if prev < HALF {
        if v > HALF + prev {
            roc - 1
        } else {
            roc
        }
    } else if prev > v + HALF {
        roc + 1
    } else {
        roc
    };

    if roc < 0 {
        // Before the first value at rollover 0.
        return 0;
    }

    roc as u64 * MAX + v
}

/// Signed distance from `b` to `a` in 16 bit sequence number space.
///
/// Positive when `a` is newer than `b`.
pub fn seq_distance(a: u16, b: u16) -> i16 {
    a.wrapping_sub(b) as i16
}
