//! Unit tests for rate values, match rules, and limit specs.

use tc_warden::models::limit::{LimitSpec, LimitTarget, MatchRule};
use tc_warden::models::rate::{LimitValue, RateUnit};

#[test]
fn rate_parses_all_three_units() {
    let cases = [
        ("8bps", 8, RateUnit::Bps),
        ("64kbps", 64, RateUnit::Kbps),
        ("10mbps", 10, RateUnit::Mbps),
    ];
    for (input, magnitude, unit) in cases {
        let value: LimitValue = input.parse().unwrap();
        assert_eq!(value.magnitude(), magnitude, "input {input}");
        assert_eq!(value.unit(), unit, "input {input}");
    }
}

#[test]
fn rate_rejects_overflowing_magnitude() {
    assert!("99999999999999999999999kbps".parse::<LimitValue>().is_err());
}

#[test]
fn rate_rejects_trailing_garbage() {
    assert!("10kbps/s".parse::<LimitValue>().is_err());
    assert!("1.5mbps".parse::<LimitValue>().is_err());
}

#[test]
fn match_rule_requires_a_name() {
    assert!(MatchRule::new(vec![]).is_err());
    assert!(MatchRule::new(vec![String::new()]).is_err());
    assert!(MatchRule::new(vec!["firefox".into(), " ".into()]).is_err());
}

#[test]
fn match_rule_primary_is_first_name() {
    let rule = MatchRule::new(vec!["firefox".into(), "firefox-bin".into()]).unwrap();
    assert_eq!(rule.primary(), "firefox");
    assert_eq!(rule.names().len(), 2);
}

#[test]
fn spec_builders_set_each_field() {
    let rate: LimitValue = "1kbps".parse().unwrap();
    let spec = LimitSpec::global()
        .with_download(rate)
        .with_upload(rate)
        .with_download_minimum(rate)
        .with_upload_minimum(rate);

    assert_eq!(spec.target, LimitTarget::Global);
    assert_eq!(spec.download, Some(rate));
    assert_eq!(spec.upload, Some(rate));
    assert_eq!(spec.download_minimum, Some(rate));
    assert_eq!(spec.upload_minimum, Some(rate));
    assert!(!spec.is_unbounded());
    assert_eq!(spec.process_name(), None);
}

#[test]
fn named_spec_reports_primary_process_name() {
    let spec = LimitSpec::named(MatchRule::new(vec!["wget".into()]).unwrap());
    assert_eq!(spec.process_name(), Some("wget"));
    assert!(spec.is_unbounded());
}
