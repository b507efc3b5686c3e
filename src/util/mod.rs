use std::sync::{Mutex, MutexGuard};

mod ntp;
pub(crate) use ntp::{dlsr, lsr, ntp_offset, ntp_to_system_time};

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// No state in this crate is left half updated across a panic point.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
