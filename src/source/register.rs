use crate::rtp::rtcp::ReceptionReport;
use crate::rtp::{seq_distance, SeqNo};

/// Loss and ordering bookkeeping for one source.
///
/// Keeps two independent snapshots of expected/received. One is reset by
/// receiver reports, the other by regular quality notifications.
#[derive(Debug)]
pub(crate) struct SequenceTracker {
    /// First sequence number received. Never changes once set.
    first: Option<SeqNo>,

    /// Base for the expected count.
    base: SeqNo,

    /// Highest sequence number seen.
    highest: SeqNo,

    /// Number of packets received, including duplicates and late packets.
    received: u64,

    /// Expected/received at last regular quality notification.
    expected_prior: i64,
    received_prior: i64,

    /// Expected/received at last reception report generation.
    expected_prior_rr: i64,
    received_prior_rr: i64,
}

/// Outcome of registering a sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeqUpdate {
    /// The first packet of the stream.
    First(SeqNo),
    /// A packet newer than the previous highest. `missing` packets were skipped.
    Newer { seq_no: SeqNo, missing: u64 },
    /// A packet at or behind the highest. None if it is older than anything
    /// that can be represented, i.e. before the first packet at ROC 0.
    Older(Option<SeqNo>),
}

/// Packets over an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Interval {
    pub expected: i64,
    pub received: i64,
}

impl Interval {
    pub fn lost(&self) -> i64 {
        self.expected - self.received
    }

    /// Loss as 0.0 - 1.0.
    pub fn fraction_lost(&self) -> f32 {
        if self.expected <= 0 || self.lost() <= 0 {
            return 0.0;
        }
        (self.lost() as f32 / self.expected as f32).min(1.0)
    }
}

impl SequenceTracker {
    pub fn new() -> Self {
        SequenceTracker {
            first: None,
            base: 0.into(),
            highest: 0.into(),
            received: 0,
            expected_prior: 0,
            received_prior: 0,
            expected_prior_rr: 0,
            received_prior_rr: 0,
        }
    }

    pub fn update(&mut self, seq: u16) -> SeqUpdate {
        if self.first.is_none() {
            let seq_no: SeqNo = (seq as u64).into();
            self.first = Some(seq_no);
            self.base = seq_no;
            self.highest = seq_no;
            self.received = 1;
            return SeqUpdate::First(seq_no);
        }

        self.received += 1;

        let distance = seq_distance(seq, self.highest.as_u16());
        let seq_no = self
            .highest
            .checked_add_signed(distance as i64)
            .map(SeqNo::from);

        match seq_no {
            Some(seq_no) if distance > 0 => {
                let missing = distance as u64 - 1;
                self.highest = seq_no;
                SeqUpdate::Newer { seq_no, missing }
            }
            _ => SeqUpdate::Older(seq_no),
        }
    }

    pub fn highest(&self) -> Option<SeqNo> {
        self.first.map(|_| self.highest)
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    /// Packets expected since the start of the stream.
    pub fn expected(&self) -> i64 {
        if self.first.is_none() {
            return 0;
        }
        expected(self.base, self.highest)
    }

    /// Packets lost since the start of the stream. Negative with duplicates.
    pub fn cumulative_lost(&self) -> i64 {
        self.expected() - self.received as i64
    }

    /// Buffers the assembler gave up on are accounted as lost.
    pub fn abandon(&mut self, count: u64) {
        self.received = self.received.saturating_sub(count);
    }

    /// Packets since the last regular quality notification.
    pub fn interval(&self) -> Interval {
        Interval {
            expected: self.expected() - self.expected_prior,
            received: self.received as i64 - self.received_prior,
        }
    }

    /// Start a new quality interval.
    pub fn reset_interval(&mut self) {
        self.expected_prior = self.expected();
        self.received_prior = self.received as i64;
    }

    /// Packets since the last reception report.
    pub fn rr_interval(&self) -> Interval {
        Interval {
            expected: self.expected() - self.expected_prior_rr,
            received: self.received as i64 - self.received_prior_rr,
        }
    }

    /// Create a new reception report.
    ///
    /// This modifies the state since fraction_lost is calculated since the
    /// last call to this function. The caller fills in SSRC, jitter and
    /// the sender report fields.
    pub fn reception_report(&mut self) -> Option<ReceptionReport> {
        self.first?;

        let interval = self.rr_interval();
        self.expected_prior_rr = self.expected();
        self.received_prior_rr = self.received as i64;

        Some(ReceptionReport {
            ssrc: 0.into(),
            fraction_lost: fraction_lost(interval),
            packets_lost: packets_lost(self.cumulative_lost()),
            max_seq: (*self.highest % ((u32::MAX as u64) + 1_u64)) as u32,
            jitter: 0,
            last_sr_time: 0,
            last_sr_delay: 0,
        })
    }
}

// Calculations from here
// https://www.rfc-editor.org/rfc/rfc3550#appendix-A.3

/// Fraction lost in 1/256 units.
fn fraction_lost(interval: Interval) -> u8 {
    let expected_interval = interval.expected;
    let lost_interval = interval.lost();

    let lost = if expected_interval <= 0 || lost_interval <= 0 {
        0
    } else {
        ((lost_interval << 8) / expected_interval).min(255)
    } as u8;

    trace!("Reception fraction lost: {}", lost);

    lost
}

/// Cumulative number of lost packets as signed 24 bit.
fn packets_lost(lost: i64) -> u32 {
    // Since this signed number is carried in 24 bits, it should be clamped
    // at 0x7fffff for positive loss or 0x800000 for negative loss rather
    // than wrapping around.
    let clamped = lost.clamp(-0x80_0000, 0x7f_ffff);
    (clamped as i32 as u32) & 0x00ff_ffff
}

fn expected(first: SeqNo, last: SeqNo) -> i64 {
    let delta = (*last).saturating_sub(*first) as i64;
    delta.saturating_add(1)
}

#[cfg(test)]
mod test {
    use super::*;

    fn tracker(seqs: &[u16]) -> SequenceTracker {
        let mut t = SequenceTracker::new();
        for s in seqs {
            t.update(*s);
        }
        t
    }

    #[test]
    fn expected_received_loss() {
        let expected = expected(14.into(), 17.into());
        assert_eq!(expected, 4);
        // none of 4 was lost
        assert_eq!(packets_lost(expected - 4), 0);
        // one of 4 was lost
        assert_eq!(packets_lost(expected - 3), 1);
    }

    #[test]
    fn packets_lost_clamps() {
        assert_eq!(packets_lost(0x100_0000), 0x7f_ffff);
        assert_eq!(packets_lost(-1), 0xff_ffff);
        assert_eq!(packets_lost(-0x100_0000), 0x80_0000);
    }

    #[test]
    fn first_packet() {
        let mut t = SequenceTracker::new();
        assert_eq!(t.expected(), 0);
        assert_eq!(t.update(500), SeqUpdate::First(500.into()));
        assert_eq!(t.highest(), Some(500.into()));
        assert_eq!(t.expected(), 1);
        assert_eq!(t.received(), 1);
    }

    #[test]
    fn newer_across_wrap() {
        let mut t = tracker(&[65_534]);
        assert_eq!(
            t.update(65_535),
            SeqUpdate::Newer {
                seq_no: 65_535.into(),
                missing: 0
            }
        );
        assert_eq!(
            t.update(1),
            SeqUpdate::Newer {
                seq_no: 65_537.into(),
                missing: 1
            }
        );
        assert_eq!(t.highest(), Some(65_537.into()));
        assert_eq!(t.expected(), 4);
        assert_eq!(t.received(), 3);
    }

    #[test]
    fn older_does_not_advance() {
        let mut t = tracker(&[100, 103]);
        assert_eq!(t.update(101), SeqUpdate::Older(Some(101.into())));
        assert_eq!(t.update(103), SeqUpdate::Older(Some(103.into())));
        assert_eq!(t.highest(), Some(103.into()));
        assert_eq!(t.received(), 4);
    }

    #[test]
    fn older_than_representable() {
        let mut t = tracker(&[3]);
        assert_eq!(t.update(65_534), SeqUpdate::Older(None));
        assert_eq!(t.highest(), Some(3.into()));
        assert_eq!(t.received(), 2);
    }

    #[test]
    fn receiver_report() {
        // 50 % lost
        let mut t = tracker(&[10, 11, 12, 13, 19]);

        let report = t.reception_report().expect("some report");
        assert_eq!(128, report.fraction_lost);
        assert_eq!(5, report.packets_lost);
        assert_eq!(19, report.max_seq);
    }

    #[test]
    fn receiver_report_resets_own_interval() {
        let mut t = tracker(&[10, 12]);

        let report = t.reception_report().unwrap();
        assert_eq!(report.fraction_lost, 85);

        // nothing more arrived
        let report = t.reception_report().unwrap();
        assert_eq!(report.fraction_lost, 0);
        assert_eq!(report.packets_lost, 1);

        t.update(13);
        t.update(14);
        let report = t.reception_report().unwrap();
        assert_eq!(report.fraction_lost, 0);

        // quality interval is untouched by the reports
        assert_eq!(t.interval(), Interval { expected: 5, received: 4 });
    }

    #[test]
    fn fraction_lost_clamps_to_one() {
        let interval = Interval {
            expected: 10,
            received: 0,
        };
        assert_eq!(fraction_lost(interval), 255);
        assert_eq!(interval.fraction_lost(), 1.0);

        let duplicates = Interval {
            expected: 10,
            received: 12,
        };
        assert_eq!(fraction_lost(duplicates), 0);
        assert_eq!(duplicates.fraction_lost(), 0.0);
    }

    #[test]
    fn abandon_counts_as_lost() {
        let mut t = tracker(&[1, 2, 3, 4]);
        t.abandon(2);
        assert_eq!(t.received(), 2);
        assert_eq!(t.cumulative_lost(), 2);
        t.abandon(10);
        assert_eq!(t.received(), 0);
    }

    #[test]
    fn no_report_before_first_packet() {
        let mut t = SequenceTracker::new();
        assert!(t.reception_report().is_none());
    }
}
