//! State of one remote RTP source.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};

use crate::config::SourceConfig;
use crate::event::{FeedbackKind, QualityReport, SourceEvent};
use crate::jitter::{BaseJitter, InterArrivalJitter, JitterEstimator};
use crate::rtp::rtcp::{Fir, FirEntry, ReceiverReport, ReceptionReport};
use crate::rtp::rtcp::{RtcpBuf, RtcpPacket, Tmmbr};
use crate::rtp::{Bitrate, Frequency, RtpError, RtpHeader, RtpPacket};
use crate::rtp::{SeqNo, Ssrc, VideoOrientation};
use crate::util::lock;
use crate::SourceError;

mod feedback;
use feedback::{FirControl, TmmbrControl};

mod nack;
use nack::NackTracker;

mod quality;
use quality::QualityMonitor;

mod register;
use register::{SeqUpdate, SequenceTracker};

mod sync;
use sync::SyncPoint;

/// Tracks one remote RTP source (SSRC) and produces RTCP feedback for it.
///
/// The source is [Sans I/O][sansio]: it never reads the clock and owns no threads.
/// Every call that depends on time takes a `now` argument. Notifications are
/// drained with [`RtpSource::poll_event()`] and received packets with
/// [`RtpSource::poll_packet()`]. Both must be polled regularly. Events beyond
/// [`SourceConfig::max_events()`] push out the oldest one.
///
/// All methods take `&self`, so the packet path and a timer driven feedback
/// path can share the source between threads. The NACK map has a lock of its
/// own, which means [`RtpSource::add_nack()`] never waits on packet processing.
///
/// ```
/// # use rtpsource::{RtpSource, SourceConfig, PacketOutcome};
/// # use rtpsource::rtp::rtcp::RtcpBuf;
/// # use std::time::Instant;
/// let source = RtpSource::new(0x1234.into(), SourceConfig::new());
///
/// let packet = vec![
///     0x80, 96, 0, 1, // V=2, PT=96, seq 1
///     0, 0, 0, 0,     // timestamp
///     0, 0, 0x12, 0x34, // SSRC
///     1, 2, 3,        // payload
/// ];
///
/// let now = Instant::now();
/// assert_eq!(source.process_rtp_packet(now, packet), PacketOutcome::Queued);
/// assert_eq!(source.poll_packet().unwrap().payload, vec![1, 2, 3]);
///
/// let mut buf = RtcpBuf::new(1200);
/// let report = source.add_receiver_report(now, &mut buf).unwrap();
/// assert_eq!(report.fraction_lost, 0);
/// ```
///
/// [sansio]: https://sans-io.readthedocs.io
#[derive(Debug)]
pub struct RtpSource {
    id: Ssrc,
    config: SourceConfig,
    self_id: AtomicU32,
    bye: AtomicBool,
    /// Lock order is `state` then the NACK map. `events` is only ever taken last.
    state: Mutex<SourceState>,
    nack: NackTracker,
    events: Mutex<VecDeque<SourceEvent>>,
    events_dropped: AtomicU64,
}

#[derive(Debug)]
struct SourceState {
    register: SequenceTracker,
    anchor: Option<StreamAnchor>,
    queue: VecDeque<RtpPacket>,
    static_jitter: Duration,
    base_jitter: Box<dyn JitterEstimator>,
    inter_arrival_jitter: Box<dyn JitterEstimator>,
    sync: Option<SyncPoint>,
    fir: FirControl,
    tmmbr: TmmbrControl,
    quality: QualityMonitor,
    video_orientation: Option<VideoOrientation>,
    stats: SourceStats,
}

/// Captured from the first accepted packet. Never changes after.
#[derive(Debug, Clone, Copy)]
struct StreamAnchor {
    seq_no: SeqNo,
    rtp_time: u32,
    arrival: Instant,
}

/// What happened to a packet given to [`RtpSource::process_rtp_packet()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    /// Accepted and queued for the assembler.
    Queued,
    /// Not accepted. Only counted in stats.
    Dropped(DropReason),
}

/// Why a packet was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The RTP header could not be parsed.
    Malformed(RtpError),
    /// The packet belongs to another SSRC.
    ForeignSsrc(Ssrc),
    /// The source has sent BYE.
    AfterBye,
}

impl From<SourceError> for DropReason {
    fn from(value: SourceError) -> Self {
        match value {
            SourceError::Rtp(e) => DropReason::Malformed(e),
            SourceError::ForeignSsrc { actual, .. } => DropReason::ForeignSsrc(actual),
        }
    }
}

/// Counters for a source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// Packets accepted.
    pub packets: u64,
    /// Bytes of accepted packets, including headers.
    pub bytes: u64,
    /// Accepted packets at or behind the highest sequence number that did
    /// not fill a known gap.
    pub duplicates: u64,
    /// Packets dropped for a bad RTP header.
    pub malformed: u64,
    /// Packets dropped for belonging to another SSRC.
    pub foreign_ssrc: u64,
    /// Packets dropped after BYE.
    pub after_bye: u64,
    /// NACK FCI entries written.
    pub nack_fci_sent: u64,
    /// FIR written.
    pub fir_sent: u64,
    /// TMMBR written.
    pub tmmbr_sent: u64,
    /// NACK entries dropped for being too old.
    pub nack_stale: u64,
    /// Events pushed out of a full event queue.
    pub events_dropped: u64,
}

impl RtpSource {
    /// Create a source for SSRC `id` with the default jitter estimators.
    pub fn new(id: Ssrc, config: SourceConfig) -> Self {
        let base = BaseJitter::new(config.clock_rate(), config.static_jitter());
        let inter_arrival = InterArrivalJitter::new(config.clock_rate());
        Self::with_estimators(id, config, Box::new(base), Box::new(inter_arrival))
    }

    /// Create a source with custom jitter estimators.
    pub fn with_estimators(
        id: Ssrc,
        config: SourceConfig,
        base_jitter: Box<dyn JitterEstimator>,
        inter_arrival_jitter: Box<dyn JitterEstimator>,
    ) -> Self {
        debug!("Create RtpSource {} clock rate {}", id, config.clock_rate());

        let state = SourceState {
            register: SequenceTracker::new(),
            anchor: None,
            queue: VecDeque::new(),
            static_jitter: config.static_jitter(),
            base_jitter,
            inter_arrival_jitter,
            sync: None,
            fir: FirControl::new(&config),
            tmmbr: TmmbrControl::new(&config),
            quality: QualityMonitor::new(&config),
            video_orientation: None,
            stats: SourceStats::default(),
        };

        RtpSource {
            id,
            nack: NackTracker::new(config.nack_retention(), config.max_nack_fci()),
            config,
            self_id: AtomicU32::new(0),
            bye: AtomicBool::new(false),
            state: Mutex::new(state),
            events: Mutex::new(VecDeque::new()),
            events_dropped: AtomicU64::new(0),
        }
    }

    /// SSRC of the remote source.
    pub fn id(&self) -> Ssrc {
        self.id
    }

    /// The config this source was created with.
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// SSRC of the local endpoint, used as sender in feedback.
    pub fn self_id(&self) -> Ssrc {
        self.self_id.load(Ordering::Relaxed).into()
    }

    /// Set the SSRC of the local endpoint.
    pub fn set_self_id(&self, id: Ssrc) {
        self.self_id.store(*id, Ordering::Relaxed);
    }

    /// Handle an incoming RTP datagram.
    ///
    /// The buffer is owned by the source from here on. If accepted, it is
    /// queued for [`RtpSource::poll_packet()`] without header and padding.
    pub fn process_rtp_packet(&self, now: Instant, buf: Vec<u8>) -> PacketOutcome {
        let mut state = lock(&self.state);

        if self.is_bye_received() {
            trace!("Drop packet after BYE for {}", self.id);
            state.stats.after_bye += 1;
            return PacketOutcome::Dropped(DropReason::AfterBye);
        }

        let header = match self.parse_header(&buf) {
            Ok(v) => v,
            Err(e) => {
                match e {
                    SourceError::Rtp(_) => state.stats.malformed += 1,
                    SourceError::ForeignSsrc { .. } => state.stats.foreign_ssrc += 1,
                }
                return PacketOutcome::Dropped(e.into());
            }
        };

        let seq = header.sequence_number;

        let seq_no = match state.register.update(seq) {
            SeqUpdate::First(seq_no) => {
                debug!("First RTP packet for {}: {}", self.id, seq_no);
                state.anchor = Some(StreamAnchor {
                    seq_no,
                    rtp_time: header.timestamp,
                    arrival: now,
                });
                self.post(SourceEvent::FirstRtpPacket {
                    ssrc: self.id,
                    seq_no,
                    rtp_time: header.timestamp,
                });
                seq_no
            }
            SeqUpdate::Newer { seq_no, missing } => {
                if missing > 0 {
                    trace!("Gap of {} before {}", missing, seq_no);
                    self.nack.register_gap(seq, missing);
                }
                seq_no
            }
            SeqUpdate::Older(seq_no) => {
                if !self.nack.resolve(seq) {
                    state.stats.duplicates += 1;
                }
                seq_no.unwrap_or_else(|| (seq as u64).into())
            }
        };

        state.base_jitter.put(header.timestamp, now);
        state.inter_arrival_jitter.put(header.timestamp, now);

        if let Some(o) = header.video_orientation {
            if state.video_orientation != Some(o) {
                debug!("Video orientation for {}: {:?}", self.id, o);
                state.video_orientation = Some(o);
                self.post(SourceEvent::VideoOrientation(o));
            }
        }

        state.stats.packets += 1;
        state.stats.bytes += buf.len() as u64;

        let packet = RtpPacket::new(seq_no, header, buf, now);
        state.queue.push_back(packet);

        PacketOutcome::Queued
    }

    fn parse_header(&self, buf: &[u8]) -> Result<RtpHeader, SourceError> {
        let header = RtpHeader::parse(buf, self.config.cvo_extension_id())?;

        if header.ssrc != self.id {
            warn!("Packet for {} received by source {}", header.ssrc, self.id);
            return Err(SourceError::ForeignSsrc {
                expected: self.id,
                actual: header.ssrc,
            });
        }

        Ok(header)
    }

    /// Record a correlation between RTP time and NTP time, typically from a sender report.
    pub fn time_update(&self, now: Instant, rtp_time: u32, ntp_time: u64) {
        let mut state = lock(&self.state);

        if state.sync.is_none() {
            debug!("First RTCP time update for {}", self.id);
            self.post(SourceEvent::FirstRtcpPacket);
        }

        state.sync = Some(SyncPoint {
            rtp_time,
            ntp_time,
            local: now,
        });

        self.post(SourceEvent::TimeUpdate { rtp_time, ntp_time });
    }

    /// The remote source sent BYE.
    ///
    /// Later packets are dropped and no more feedback is produced.
    pub fn bye_received(&self) {
        // Taking the state lock orders this with any packet being processed.
        let _state = lock(&self.state);

        if !self.bye.swap(true, Ordering::Relaxed) {
            debug!("BYE received for {}", self.id);
            self.post(SourceEvent::Bye);
        }
    }

    /// Whether BYE has been received.
    pub fn is_bye_received(&self) -> bool {
        self.bye.load(Ordering::Relaxed)
    }

    /// Configured jitter floor.
    pub fn static_jitter(&self) -> Duration {
        lock(&self.state).static_jitter
    }

    /// Change the jitter floor.
    pub fn set_static_jitter(&self, jitter: Duration) {
        lock(&self.state).static_jitter = jitter;
    }

    /// Operating jitter target. The base estimate, but never below the static jitter.
    pub fn base_jitter(&self) -> Duration {
        let state = lock(&self.state);
        state.base_jitter.jitter().max(state.static_jitter)
    }

    /// Interarrival jitter estimate.
    pub fn inter_arrival_jitter(&self) -> Duration {
        lock(&self.state).inter_arrival_jitter.jitter()
    }

    /// Feed the base jitter estimator directly.
    pub fn put_base_jitter_data(&self, rtp_time: u32, arrival: Instant) {
        lock(&self.state).base_jitter.put(rtp_time, arrival);
    }

    /// Feed the interarrival jitter estimator directly.
    pub fn put_inter_arrival_jitter_data(&self, rtp_time: u32, arrival: Instant) {
        lock(&self.state).inter_arrival_jitter.put(rtp_time, arrival);
    }

    /// Write a receiver report for this source.
    ///
    /// Loss is calculated since the previous report. Returns None when nothing
    /// was written: no packet received yet, BYE received, or no room in `buf`.
    pub fn add_receiver_report(
        &self,
        now: Instant,
        buf: &mut RtcpBuf,
    ) -> Option<ReceptionReport> {
        if self.is_bye_received() {
            return None;
        }

        let mut state = lock(&self.state);

        // Check room before the report resets the interval.
        let empty = ReceiverReport {
            sender_ssrc: self.self_id(),
            reports: vec![],
        };
        if !buf.fits(empty.length_words() * 4 + 24) {
            warn!("No room for receiver report: {}", buf.remaining());
            return None;
        }

        let mut report = state.register.reception_report()?;

        report.ssrc = self.id;
        report.jitter = rtp_units(state.inter_arrival_jitter.jitter(), self.config.clock_rate());

        if let Some(sync) = state.sync {
            let (lsr, dlsr) = sync.lsr_dlsr(now);
            report.last_sr_time = lsr;
            report.last_sr_delay = dlsr;
        }

        let rr = ReceiverReport {
            reports: vec![report],
            ..empty
        };
        buf.append(&rr)?;

        trace!("Created receiver report for {}: {:?}", self.id, report);

        Some(report)
    }

    /// Write a Full Intra Request if one is due.
    ///
    /// A FIR is due when periodic FIR is enabled or the assembler asked for one,
    /// subject to the configured intervals. Returns true if written.
    pub fn add_fir(&self, now: Instant, buf: &mut RtcpBuf) -> bool {
        if self.is_bye_received() {
            return false;
        }

        let mut state = lock(&self.state);

        if !state.fir.is_due(now) {
            return false;
        }

        let mut fir = Fir {
            sender_ssrc: self.self_id(),
            reports: vec![FirEntry {
                ssrc: self.id,
                seq_no: state.fir.next_seq_no(),
            }],
        };

        if !buf.fits(fir.length_words() * 4) {
            warn!("No room for FIR: {}", buf.remaining());
            return false;
        }

        let seq_no = state.fir.sent(now);
        fir.reports[0].seq_no = seq_no;

        if buf.append(&fir).is_none() {
            return false;
        }

        debug!("Send FIR {} for {}", seq_no, self.id);
        state.stats.fir_sent += 1;
        self.post(SourceEvent::FeedbackSent(FeedbackKind::Fir(seq_no)));

        true
    }

    /// Write a TMMBR proposing `bitrate` as the new ceiling of the sender.
    ///
    /// The wire encoding rounds down, never above `bitrate`. A request within
    /// `tmmbr_min_interval` of the previous one is dropped. Returns true if written.
    pub fn add_tmmbr(&self, now: Instant, buf: &mut RtcpBuf, bitrate: Bitrate) -> bool {
        if self.is_bye_received() {
            return false;
        }

        let mut state = lock(&self.state);

        let entry = state.tmmbr.entry(self.id, bitrate.as_u64());

        if !state.tmmbr.is_due(now, &entry) {
            trace!("TMMBR {} not due", bitrate);
            return false;
        }

        let tmmbr = Tmmbr {
            sender_ssrc: self.self_id(),
            reports: vec![entry],
        };

        if buf.append(&tmmbr).is_none() {
            return false;
        }

        let wire = entry.wire_bitrate();
        debug!("Send TMMBR {} for {}", Bitrate::from(wire), self.id);

        state.tmmbr.sent(now, &entry);
        state.stats.tmmbr_sent += 1;
        self.post(SourceEvent::FeedbackSent(FeedbackKind::Tmmbr(wire)));

        true
    }

    /// Bitrate of the last TMMBR written, as encoded on the wire.
    pub fn last_tmmbr_bitrate(&self) -> Option<u64> {
        lock(&self.state).tmmbr.last_bitrate()
    }

    /// Write a Generic NACK for pending missing packets.
    ///
    /// Returns the number of FCI entries written, or None if nothing is pending.
    pub fn add_nack(&self, buf: &mut RtcpBuf) -> Option<usize> {
        if self.is_bye_received() {
            return None;
        }

        let count = self.nack.add_nack(self.self_id(), self.id, buf)?;

        self.post(SourceEvent::FeedbackSent(FeedbackKind::Nack(count)));

        Some(count)
    }

    /// Register a missing sequence number, and a mask of up to 16 following ones.
    ///
    /// `head` is the highest sequence number when the gap was detected.
    pub fn set_seq_num_to_nack(&self, seq: u16, mask: u16, head: u16) {
        self.nack.register(seq, mask, head);
    }

    /// Sequence numbers pending in the NACK map, oldest first.
    pub fn nack_pending(&self) -> Vec<u16> {
        self.nack.pending()
    }

    /// Toggle periodic FIR requests.
    pub fn set_periodic_fir(&self, enabled: bool) {
        lock(&self.state).fir.set_periodic(enabled);
    }

    /// Whether periodic FIR is enabled.
    pub fn periodic_fir(&self) -> bool {
        lock(&self.state).fir.periodic()
    }

    /// The assembler saw a broken picture. The next [`RtpSource::add_fir()`]
    /// writes a FIR, subject to the minimum interval.
    pub fn on_issue_fir_by_assembler(&self) {
        trace!("FIR requested by assembler for {}", self.id);
        lock(&self.state).fir.request_by_assembler();
    }

    /// Sequence number the next FIR carries.
    pub fn next_fir_seq_no(&self) -> u8 {
        lock(&self.state).fir.next_seq_no()
    }

    /// The assembler discarded `count` buffers.
    ///
    /// They are accounted as lost and the `count` oldest NACK entries are dropped.
    pub fn notice_abandon_buffer(&self, count: usize) {
        let mut state = lock(&self.state);
        state.register.abandon(count as u64);
        self.nack.abandon(count);
    }

    /// Post a quality report with a bitrate sample.
    ///
    /// A regular report starts a new interval. An early report (`is_regular`
    /// false) does not, and suppresses further early reports until the next
    /// regular one.
    pub fn notify_pkt_info(&self, bitrate: Bitrate, is_regular: bool) {
        let mut state = lock(&self.state);

        let interval = state.register.interval();

        let report = QualityReport {
            regular: is_regular,
            bitrate,
            expected: interval.expected,
            received: interval.received,
            lost: interval.lost(),
            fraction_lost: interval.fraction_lost(),
            cumulative_lost: state.register.cumulative_lost(),
            highest_seq_no: state.register.highest().unwrap_or_else(|| 0.into()),
            base_jitter: state.base_jitter.jitter().max(state.static_jitter),
            inter_arrival_jitter: state.inter_arrival_jitter.jitter(),
        };

        let autodown = state.quality.notified(interval, is_regular);

        if is_regular {
            state.register.reset_interval();
        }

        self.post(SourceEvent::Quality(report));

        if let Some(a) = autodown {
            self.post(SourceEvent::AutoDown {
                fraction_lost: a.fraction_lost,
                intervals: a.intervals,
            });
        }
    }

    /// Tells if loss since the last regular report warrants an early one.
    pub fn is_need_to_early_notify(&self) -> bool {
        if self.is_bye_received() {
            return false;
        }
        let state = lock(&self.state);
        state.quality.is_need_to_early_notify(state.register.interval())
    }

    /// Next pending notification.
    ///
    /// Unpolled events are kept up to [`SourceConfig::max_events()`].
    pub fn poll_event(&self) -> Option<SourceEvent> {
        lock(&self.events).pop_front()
    }

    /// Oldest queued packet, in arrival order.
    pub fn poll_packet(&self) -> Option<RtpPacket> {
        lock(&self.state).queue.pop_front()
    }

    /// Number of queued packets.
    pub fn queue_len(&self) -> usize {
        lock(&self.state).queue.len()
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> SourceStats {
        let mut stats = lock(&self.state).stats.clone();
        let (fci_sent, stale) = self.nack.counters();
        stats.nack_fci_sent = fci_sent;
        stats.nack_stale = stale;
        stats.events_dropped = self.events_dropped.load(Ordering::Relaxed);
        stats
    }

    /// Clock rate of the RTP timestamps.
    pub fn clock_rate(&self) -> Frequency {
        self.config.clock_rate()
    }

    /// Sequence number of the first accepted packet.
    pub fn first_seq_no(&self) -> Option<SeqNo> {
        lock(&self.state).anchor.map(|a| a.seq_no)
    }

    /// RTP timestamp of the first accepted packet.
    pub fn first_rtp_time(&self) -> Option<u32> {
        lock(&self.state).anchor.map(|a| a.rtp_time)
    }

    /// Arrival of the first accepted packet.
    pub fn first_arrival(&self) -> Option<Instant> {
        lock(&self.state).anchor.map(|a| a.arrival)
    }

    /// Highest extended sequence number seen.
    pub fn highest_seq_no(&self) -> Option<SeqNo> {
        lock(&self.state).register.highest()
    }

    /// Number of packets received. Includes duplicates, excludes abandoned buffers.
    pub fn received(&self) -> u64 {
        lock(&self.state).register.received()
    }

    /// Number of packets expected from the first to the highest sequence number.
    pub fn expected(&self) -> i64 {
        lock(&self.state).register.expected()
    }

    /// Packets lost since the start of the stream.
    pub fn cumulative_lost(&self) -> i64 {
        lock(&self.state).register.cumulative_lost()
    }

    /// Last seen video orientation.
    pub fn video_orientation(&self) -> Option<VideoOrientation> {
        lock(&self.state).video_orientation
    }

    /// Extrapolate the NTP time of an RTP timestamp from the last time update.
    pub fn rtp_to_ntp(&self, rtp_time: u32) -> Option<u64> {
        let sync = lock(&self.state).sync?;
        Some(sync.rtp_to_ntp(rtp_time, self.config.clock_rate()))
    }

    /// Extrapolate the wallclock of an RTP timestamp from the last time update.
    pub fn rtp_to_system_time(&self, rtp_time: u32) -> Option<SystemTime> {
        let sync = lock(&self.state).sync?;
        sync.rtp_to_system_time(rtp_time, self.config.clock_rate())
    }

    /// Estimate when media with `rtp_time` would have arrived, given the
    /// first packet was on schedule.
    pub fn estimate_wallclock(&self, rtp_time: u32) -> Option<Instant> {
        let anchor = lock(&self.state).anchor?;

        let delta = rtp_time.wrapping_sub(anchor.rtp_time) as i32;
        let micros = delta.unsigned_abs() as u64 * 1_000_000 / self.config.clock_rate().get() as u64;
        let offset = Duration::from_micros(micros);

        if delta >= 0 {
            anchor.arrival.checked_add(offset)
        } else {
            anchor.arrival.checked_sub(offset)
        }
    }

    fn post(&self, event: SourceEvent) {
        let mut events = lock(&self.events);
        events.push_back(event);

        while events.len() > self.config.max_events() {
            let Some(dropped) = events.pop_front() else {
                break;
            };
            trace!("Event queue full for {}, drop {:?}", self.id, dropped);
            self.events_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Jitter in RTP timestamp units.
fn rtp_units(jitter: Duration, clock_rate: Frequency) -> u32 {
    let v = jitter.as_micros() * clock_rate.get() as u128 / 1_000_000;
    v.min(u32::MAX as u128) as u32
}

#[cfg(test)]
mod test {
    use super::*;

    fn packet(seq: u16, ts: u32, ssrc: u32) -> Vec<u8> {
        let mut buf = vec![0x80, 96];
        buf.extend_from_slice(&seq.to_be_bytes());
        buf.extend_from_slice(&ts.to_be_bytes());
        buf.extend_from_slice(&ssrc.to_be_bytes());
        buf.extend_from_slice(&[0xaa; 10]);
        buf
    }

    fn source() -> RtpSource {
        let config = SourceConfig::new().set_initial_fir_seq_no(Some(0));
        let s = RtpSource::new(42.into(), config);
        s.set_self_id(7.into());
        s
    }

    fn events(s: &RtpSource) -> Vec<SourceEvent> {
        std::iter::from_fn(|| s.poll_event()).collect()
    }

    #[test]
    fn event_queue_is_bounded() {
        let config = SourceConfig::new().set_max_events(3);
        let s = RtpSource::new(42.into(), config);
        let now = Instant::now();

        for i in 0..5 {
            s.time_update(now, i, 0);
        }

        assert_eq!(
            events(&s),
            vec![
                SourceEvent::TimeUpdate {
                    rtp_time: 2,
                    ntp_time: 0
                },
                SourceEvent::TimeUpdate {
                    rtp_time: 3,
                    ntp_time: 0
                },
                SourceEvent::TimeUpdate {
                    rtp_time: 4,
                    ntp_time: 0
                },
            ]
        );
        // FirstRtcpPacket and the first two updates.
        assert_eq!(s.stats().events_dropped, 3);

        s.time_update(now, 5, 0);
        assert_eq!(events(&s).len(), 1);
        assert_eq!(s.stats().events_dropped, 3);
    }

    #[test]
    fn first_packet_anchor() {
        let s = source();
        let now = Instant::now();

        assert_eq!(s.first_seq_no(), None);
        assert_eq!(s.process_rtp_packet(now, packet(10, 900, 42)), PacketOutcome::Queued);
        s.process_rtp_packet(now + Duration::from_millis(10), packet(11, 1800, 42));

        assert_eq!(s.first_seq_no(), Some(10.into()));
        assert_eq!(s.first_rtp_time(), Some(900));
        assert_eq!(s.first_arrival(), Some(now));
        assert_eq!(
            events(&s),
            vec![SourceEvent::FirstRtpPacket {
                ssrc: 42.into(),
                seq_no: 10.into(),
                rtp_time: 900
            }]
        );
    }

    #[test]
    fn drops_malformed_and_foreign() {
        let s = source();
        let now = Instant::now();

        assert!(matches!(
            s.process_rtp_packet(now, vec![0x80, 96, 0]),
            PacketOutcome::Dropped(DropReason::Malformed(_))
        ));
        assert_eq!(
            s.process_rtp_packet(now, packet(1, 0, 43)),
            PacketOutcome::Dropped(DropReason::ForeignSsrc(43.into()))
        );

        let stats = s.stats();
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.foreign_ssrc, 1);
        assert_eq!(stats.packets, 0);
        assert_eq!(s.queue_len(), 0);
        assert_eq!(s.first_seq_no(), None);
    }

    #[test]
    fn queue_in_arrival_order() {
        let s = source();
        let now = Instant::now();

        for seq in [5, 7, 6] {
            s.process_rtp_packet(now, packet(seq, 0, 42));
        }

        let seqs: Vec<u64> = std::iter::from_fn(|| s.poll_packet())
            .map(|p| *p.seq_no)
            .collect();
        assert_eq!(seqs, vec![5, 7, 6]);
    }

    #[test]
    fn payload_without_header() {
        let s = source();
        s.process_rtp_packet(Instant::now(), packet(5, 0, 42));
        let p = s.poll_packet().unwrap();
        assert_eq!(p.payload, vec![0xaa; 10]);
        assert_eq!(p.header.sequence_number, 5);
    }

    #[test]
    fn duplicate_counted() {
        let s = source();
        let now = Instant::now();

        s.process_rtp_packet(now, packet(5, 0, 42));
        s.process_rtp_packet(now, packet(5, 0, 42));

        assert_eq!(s.received(), 2);
        assert_eq!(s.stats().duplicates, 1);
        assert_eq!(s.cumulative_lost(), -1);
    }

    #[test]
    fn receiver_report_fields() {
        let s = source();
        let now = Instant::now();

        s.process_rtp_packet(now, packet(1, 0, 42));
        s.process_rtp_packet(now, packet(3, 1800, 42));
        s.time_update(now, 0, 0xb44d_b705_2000_0000);

        let mut buf = RtcpBuf::new(1200);
        let report = s
            .add_receiver_report(now + Duration::from_millis(5_250), &mut buf)
            .unwrap();

        assert_eq!(report.ssrc, 42.into());
        assert_eq!(report.fraction_lost, 85);
        assert_eq!(report.packets_lost, 1);
        assert_eq!(report.max_seq, 3);
        assert_eq!(report.last_sr_time, 0xb705_2000);
        assert_eq!(report.last_sr_delay, 0x0005_4000);

        assert_eq!(buf.len(), 32);
        assert_eq!(&buf.as_bytes()[0..8], &[0x81, 201, 0, 7, 0, 0, 0, 7]);
    }

    #[test]
    fn receiver_report_needs_room() {
        let s = source();
        let now = Instant::now();

        s.process_rtp_packet(now, packet(1, 0, 42));
        s.process_rtp_packet(now, packet(3, 0, 42));

        let mut buf = RtcpBuf::new(31);
        assert!(s.add_receiver_report(now, &mut buf).is_none());

        // Interval was not reset by the failed attempt.
        let mut buf = RtcpBuf::new(32);
        assert_eq!(s.add_receiver_report(now, &mut buf).unwrap().fraction_lost, 85);
    }

    #[test]
    fn no_receiver_report_before_packets() {
        let s = source();
        let mut buf = RtcpBuf::new(1200);
        assert!(s.add_receiver_report(Instant::now(), &mut buf).is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn fir_from_assembler() {
        let s = source();
        let now = Instant::now();

        let mut buf = RtcpBuf::new(1200);
        assert!(!s.add_fir(now, &mut buf));

        s.on_issue_fir_by_assembler();
        assert!(s.add_fir(now, &mut buf));
        assert!(!s.add_fir(now, &mut buf));
        assert_eq!(buf.len(), 20);
        assert_eq!(s.next_fir_seq_no(), 1);
        assert_eq!(
            events(&s),
            vec![SourceEvent::FeedbackSent(FeedbackKind::Fir(0))]
        );
    }

    #[test]
    fn cvo_change_posts_event() {
        let config = SourceConfig::new().set_cvo_extension_id(Some(3));
        let s = RtpSource::new(42.into(), config);
        let now = Instant::now();

        let with_cvo = |seq: u16, cvo: u8| {
            let mut buf = vec![0x90, 96];
            buf.extend_from_slice(&seq.to_be_bytes());
            buf.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 42]);
            buf.extend_from_slice(&[0xbe, 0xde, 0, 1, 0x30, cvo, 0, 0]);
            buf.extend_from_slice(&[1, 2, 3]);
            buf
        };

        s.process_rtp_packet(now, with_cvo(1, 0b01));
        s.process_rtp_packet(now, with_cvo(2, 0b01));
        s.process_rtp_packet(now, with_cvo(3, 0b1010));

        let orientations: Vec<_> = events(&s)
            .into_iter()
            .filter_map(|e| match e {
                SourceEvent::VideoOrientation(o) => Some(o),
                _ => None,
            })
            .collect();

        assert_eq!(
            orientations,
            vec![
                VideoOrientation {
                    back_camera: false,
                    flip: false,
                    rotation: 90
                },
                VideoOrientation {
                    back_camera: true,
                    flip: false,
                    rotation: 180
                },
            ]
        );
        assert_eq!(s.poll_packet().unwrap().payload, vec![1, 2, 3]);
    }

    #[test]
    fn estimate_wallclock_from_first_packet() {
        let s = source();
        let now = Instant::now() + Duration::from_secs(10);

        assert_eq!(s.estimate_wallclock(0), None);
        s.process_rtp_packet(now, packet(1, 90_000, 42));

        assert_eq!(s.estimate_wallclock(180_000), Some(now + Duration::from_secs(1)));
        assert_eq!(s.estimate_wallclock(45_000), Some(now - Duration::from_millis(500)));
    }

    #[test]
    fn time_update_events() {
        let s = source();
        let now = Instant::now();

        assert_eq!(s.rtp_to_ntp(0), None);

        s.time_update(now, 1000, 5 << 32);
        s.time_update(now, 2000, 6 << 32);

        assert_eq!(
            events(&s),
            vec![
                SourceEvent::FirstRtcpPacket,
                SourceEvent::TimeUpdate {
                    rtp_time: 1000,
                    ntp_time: 5 << 32
                },
                SourceEvent::TimeUpdate {
                    rtp_time: 2000,
                    ntp_time: 6 << 32
                },
            ]
        );

        assert_eq!(s.rtp_to_ntp(2000 + 90_000), Some(7 << 32));
    }

    #[test]
    fn base_jitter_floor() {
        let s = source();
        assert_eq!(s.static_jitter(), Duration::from_millis(50));
        assert_eq!(s.base_jitter(), Duration::from_millis(50));

        s.set_static_jitter(Duration::from_millis(120));
        assert_eq!(s.base_jitter(), Duration::from_millis(120));
    }

    #[test]
    fn rtp_units_conversion() {
        assert_eq!(rtp_units(Duration::from_millis(10), Frequency::NINETY_KHZ), 900);
        assert_eq!(rtp_units(Duration::from_micros(20), Frequency::NINETY_KHZ), 1);
    }
}
