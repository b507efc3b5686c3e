use std::time::{Duration, Instant};

use rtpsource::rtp::rtcp::RtcpBuf;
use rtpsource::rtp::Frequency;
use rtpsource::{RtpSource, SourceConfig};

mod common;
use common::{feed, init_log, SSRC};

#[test]
pub fn partial_config_takes_defaults() {
    init_log();

    let json = r#"{
        "clock_rate": 48000,
        "periodic_fir": true,
        "static_jitter": { "secs": 0, "nanos": 80000000 },
        "nack_retention": 50
    }"#;

    let config: SourceConfig = serde_json::from_str(json).unwrap();

    assert_eq!(config.clock_rate(), Frequency::FORTY_EIGHT_KHZ);
    assert!(config.periodic_fir());
    assert_eq!(config.static_jitter(), Duration::from_millis(80));
    assert_eq!(config.nack_retention(), 50);

    let defaults = SourceConfig::new();
    assert_eq!(config.max_nack_fci(), defaults.max_nack_fci());
    assert_eq!(config.fir_min_interval(), defaults.fir_min_interval());
    assert_eq!(config.tmmbr_overhead(), defaults.tmmbr_overhead());
    assert_eq!(config.cvo_extension_id(), None);
}

#[test]
pub fn zero_clock_rate_rejected() {
    init_log();

    let res: Result<SourceConfig, _> = serde_json::from_str(r#"{ "clock_rate": 0 }"#);
    assert!(res.is_err());
}

#[test]
pub fn config_survives_serialization() {
    init_log();

    let config = SourceConfig::new()
        .set_clock_rate(Frequency::EIGHT_KHZ)
        .set_max_nack_fci(4)
        .set_cvo_extension_id(Some(3));

    let json = serde_json::to_string(&config).unwrap();
    let back: SourceConfig = serde_json::from_str(&json).unwrap();

    assert_eq!(config, back);
}

#[test]
pub fn config_applies_to_source() {
    init_log();

    let config = SourceConfig::new()
        .set_static_jitter(Duration::from_millis(120))
        .set_max_nack_fci(2);

    let s = RtpSource::new(SSRC.into(), config);
    assert_eq!(s.clock_rate(), Frequency::NINETY_KHZ);
    assert_eq!(s.static_jitter(), Duration::from_millis(120));
    assert_eq!(s.base_jitter(), Duration::from_millis(120));

    feed(&s, Instant::now(), [0, 2, 4, 6, 8]);

    let mut buf = RtcpBuf::new(1200);
    assert_eq!(s.add_nack(&mut buf), Some(2));
    assert_eq!(s.config().max_nack_fci(), 2);
}
