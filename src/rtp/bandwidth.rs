#![allow(missing_docs)]

use std::fmt;

/// A data rate expressed as bits per second(bps).
///
/// Internally the value is tracked as a floating point number for accuracy in the presence of
/// repeated calculations that can yield decimal values.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Bitrate(f64);

impl Bitrate {
    pub const ZERO: Self = Self::new(0);

    pub const fn new(bps: u64) -> Self {
        Bitrate(bps as f64)
    }

    pub const fn kbps(kbps: u64) -> Self {
        Self::new(kbps * 10_u64.pow(3))
    }

    pub const fn mbps(mbps: u64) -> Self {
        Self::new(mbps * 10_u64.pow(6))
    }

    /// Whole bits per second, rounded down. Negative and NaN rates are 0.
    pub fn as_u64(&self) -> u64 {
        if self.0.is_nan() || self.0 <= 0.0 {
            return 0;
        }
        self.0.floor() as u64
    }
}

impl From<u64> for Bitrate {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<f64> for Bitrate {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rate = self.0;
        if rate <= 0.0 {
            return write!(f, "{rate}bit/s");
        }
        let log = rate.log10().floor() as u64;

        match log {
            0..=2 => write!(f, "{rate}bit/s"),
            3..=5 => write!(f, "{:.3}kbit/s", rate / 10.0_f64.powf(3.0)),
            6..=8 => write!(f, "{:.3}Mbit/s", rate / 10.0_f64.powf(6.0)),
            _ => write!(f, "{:.3}Gbit/s", rate / 10.0_f64.powf(9.0)),
        }
    }
}
