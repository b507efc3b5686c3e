use std::time::{Duration, SystemTime};

// RFC 3550 "wallclock" uses NTP time, which starts at 1900-01-01.
//
// https://tools.ietf.org/html/rfc868
//
// 365 days * 70 years + 17 leap year days
// (365 * 70 + 17) * 86400 = 2208988800
const SECS_1900: u64 = 2_208_988_800;

/// The middle 32 bits of an NTP timestamp, as used for LSR in reception reports.
pub(crate) fn lsr(ntp_time: u64) -> u32 {
    (ntp_time >> 16) as u32
}

/// Delay expressed in units of 1/65536 seconds, as used for DLSR.
pub(crate) fn dlsr(delay: Duration) -> u32 {
    let v = (delay.as_micros() * 65_536) / 1_000_000;
    v.min(u32::MAX as u128) as u32
}

/// Offset an NTP 64 bit timestamp by a signed number of clock ticks.
pub(crate) fn ntp_offset(ntp_time: u64, ticks: i64, clock_rate: u32) -> u64 {
    let offset = ((ticks as i128) << 32) / clock_rate as i128;
    (ntp_time as i128 + offset).clamp(0, u64::MAX as i128) as u64
}

/// Convert an NTP 64 bit timestamp to wallclock.
///
/// None if the time is before the unix epoch.
pub(crate) fn ntp_to_system_time(ntp_time: u64) -> Option<SystemTime> {
    // https://tools.ietf.org/html/rfc3550#section-4
    // The full resolution NTP timestamp is a 64-bit unsigned fixed-point
    // number with the integer part in the first 32 bits and the fractional
    // part in the last 32 bits.
    let secs = ntp_time >> 32;
    let fract = ntp_time & 0xffff_ffff;

    let secs_epoch = secs.checked_sub(SECS_1900)?;
    let nanos = (fract * 1_000_000_000) >> 32;

    Some(SystemTime::UNIX_EPOCH + Duration::new(secs_epoch, nanos as u32))
}
