#![allow(missing_docs)]

use std::fmt;
use std::num::NonZeroU32;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

macro_rules! num_id {
    ($id:ident, $t:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $id($t);

        impl Deref for $id {
            type Target = $t;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<$t> for $id {
            fn from(v: $t) -> Self {
                $id(v)
            }
        }

        impl fmt::Display for $id {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

num_id!(Ssrc, u32);
num_id!(SeqNo, u64);

impl SeqNo {
    /// The 16 bit sequence number as seen on the wire.
    pub fn as_u16(&self) -> u16 {
        self.0 as u16
    }
}

/// Clock rate of an RTP stream.
///
/// Typically 90kHz for video and 48kHz for audio. Never zero, which means the
/// conversions between RTP time and wallclock can divide freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Frequency(NonZeroU32);

impl Frequency {
    /// Microsecond resolution.
    pub const MICROS: Frequency = Frequency::from_const(1_000_000);
    /// Video.
    pub const NINETY_KHZ: Frequency = Frequency::from_const(90_000);
    /// Opus.
    pub const FORTY_EIGHT_KHZ: Frequency = Frequency::from_const(48_000);
    /// G.711 and friends.
    pub const EIGHT_KHZ: Frequency = Frequency::from_const(8_000);

    const fn from_const(v: u32) -> Self {
        match NonZeroU32::new(v) {
            Some(v) => Frequency(v),
            None => panic!("Frequency must be non-zero"),
        }
    }

    /// A frequency in Hz, None if `hz` is 0.
    pub fn from_hz(hz: u32) -> Option<Self> {
        NonZeroU32::new(hz).map(Frequency)
    }

    /// The frequency in Hz.
    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<u32> for Frequency {
    type Error = &'static str;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Frequency::from_hz(value).ok_or("clock rate must be non-zero")
    }
}

impl From<Frequency> for u32 {
    fn from(value: Frequency) -> Self {
        value.get()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz", self.0)
    }
}
