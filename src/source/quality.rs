use crate::config::SourceConfig;

use super::register::Interval;

/// Policy for early quality notifications and autodown.
///
/// An early notification is due when more than `early_threshold` packets were
/// lost since the last regular one. It latches until the next regular
/// notification, so one loss event gives at most one early notification.
///
/// Autodown fires once after `autodown_intervals` consecutive regular intervals
/// with a loss fraction at or above `autodown_fraction`, and re-arms when an
/// interval comes in below it.
#[derive(Debug)]
pub(crate) struct QualityMonitor {
    early_threshold: u64,
    autodown_fraction: f32,
    autodown_intervals: usize,

    early_posted: bool,
    bad_intervals: usize,
    autodown_fired: bool,
}

/// Outcome of a regular interval with persistent loss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AutoDown {
    pub fraction_lost: f32,
    pub intervals: usize,
}

impl QualityMonitor {
    pub fn new(config: &SourceConfig) -> Self {
        QualityMonitor {
            early_threshold: config.early_notify_loss_threshold(),
            autodown_fraction: config.autodown_loss_fraction(),
            autodown_intervals: config.autodown_intervals(),
            early_posted: false,
            bad_intervals: 0,
            autodown_fired: false,
        }
    }

    /// Tells if loss in the current interval warrants an early notification.
    pub fn is_need_to_early_notify(&self, interval: Interval) -> bool {
        !self.early_posted && interval.lost() > self.early_threshold as i64
    }

    /// Register that a notification was posted for `interval`.
    pub fn notified(&mut self, interval: Interval, regular: bool) -> Option<AutoDown> {
        if !regular {
            self.early_posted = true;
            return None;
        }

        self.early_posted = false;

        let fraction_lost = interval.fraction_lost();

        if interval.expected > 0 && fraction_lost >= self.autodown_fraction {
            self.bad_intervals += 1;
        } else {
            self.bad_intervals = 0;
            self.autodown_fired = false;
        }

        if self.autodown_fired
            || self.autodown_intervals == 0
            || self.bad_intervals < self.autodown_intervals
        {
            return None;
        }

        self.autodown_fired = true;

        debug!(
            "Autodown after {} intervals, fraction lost {}",
            self.bad_intervals, fraction_lost
        );

        Some(AutoDown {
            fraction_lost,
            intervals: self.bad_intervals,
        })
    }
}
