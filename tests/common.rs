#![allow(unused)]
use std::sync::Once;
use std::time::{Duration, Instant};

use rtpsource::rtp::rtcp::{Nack, ReceptionReport, Rtcp, RtcpBuf, Tmmbr};
use rtpsource::{RtpSource, SourceConfig, SourceEvent};

pub const SSRC: u32 = 0x4242;
pub const SELF_SSRC: u32 = 0x0707;

pub fn init_log() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    static START: Once = Once::new();

    START.call_once(|| {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(env_filter)
            .init();
    });
}

/// Source with a fixed FIR start so tests are deterministic.
pub fn source(config: SourceConfig) -> RtpSource {
    let config = config.set_initial_fir_seq_no(Some(0));
    let s = RtpSource::new(SSRC.into(), config);
    s.set_self_id(SELF_SSRC.into());
    s
}

/// Minimal RTP packet with a small payload.
pub fn rtp(seq: u16, rtp_time: u32) -> Vec<u8> {
    rtp_for(SSRC, seq, rtp_time)
}

pub fn rtp_for(ssrc: u32, seq: u16, rtp_time: u32) -> Vec<u8> {
    let mut buf = vec![0x80, 96];
    buf.extend_from_slice(&seq.to_be_bytes());
    buf.extend_from_slice(&rtp_time.to_be_bytes());
    buf.extend_from_slice(&ssrc.to_be_bytes());
    buf.extend_from_slice(&[0x01, 0x02, 0x03, 0x04]);
    buf
}

/// Feed packets 20ms apart at 90kHz. Returns the time after the last one.
pub fn feed(s: &RtpSource, start: Instant, seqs: impl IntoIterator<Item = u16>) -> Instant {
    let mut now = start;
    for seq in seqs {
        let rtp_time = (seq as u32).wrapping_mul(1800);
        s.process_rtp_packet(now, rtp(seq, rtp_time));
        now += Duration::from_millis(20);
    }
    now
}

pub fn events(s: &RtpSource) -> Vec<SourceEvent> {
    std::iter::from_fn(|| s.poll_event()).collect()
}

pub fn parse(buf: &RtcpBuf) -> Vec<Rtcp> {
    Rtcp::read_packet(buf.as_bytes())
}

pub fn nacks(buf: &RtcpBuf) -> Vec<Nack> {
    parse(buf)
        .into_iter()
        .filter_map(|r| match r {
            Rtcp::Nack(v) => Some(v),
            _ => None,
        })
        .collect()
}

pub fn tmmbrs(buf: &RtcpBuf) -> Vec<Tmmbr> {
    parse(buf)
        .into_iter()
        .filter_map(|r| match r {
            Rtcp::Tmmbr(v) => Some(v),
            _ => None,
        })
        .collect()
}

pub fn reports(buf: &RtcpBuf) -> Vec<ReceptionReport> {
    parse(buf)
        .into_iter()
        .filter_map(|r| match r {
            Rtcp::ReceiverReport(v) => Some(v),
            _ => None,
        })
        .flat_map(|rr| rr.reports)
        .collect()
}

/// Every sequence number requested by NACKs in `buf`.
pub fn nacked(buf: &RtcpBuf) -> Vec<u16> {
    let mut out = vec![];
    for nack in nacks(buf) {
        for e in nack.reports {
            out.push(e.pid);
            for i in 0..16_u16 {
                if e.blp & (1 << i) > 0 {
                    out.push(e.pid.wrapping_add(i + 1));
                }
            }
        }
    }
    out
}
