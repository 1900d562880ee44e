use logdup::{
    build_engine, content_id, normalize, Fingerprinter, FingerprintConfig, LogEntry,
    LogdupConfig, NormalizeConfig,
};
use serde_json::json;

const LINE: &str = "2024-03-01T12:00:01Z worker 7 fetched https://cdn.example.com/a.png from 10.1.2.3";

#[test]
fn fingerprints_match_across_instances() {
    let a = Fingerprinter::new(FingerprintConfig::default()).unwrap();
    let b = Fingerprinter::new(FingerprintConfig::default()).unwrap();
    assert_eq!(a.fingerprint(LINE), b.fingerprint(LINE));
}

#[test]
fn parallel_and_serial_signatures_agree() {
    let serial = Fingerprinter::new(FingerprintConfig::default().with_parallel(false)).unwrap();
    let parallel = Fingerprinter::new(FingerprintConfig::default().with_parallel(true)).unwrap();
    assert_eq!(
        serial.fingerprint(LINE).signature,
        parallel.fingerprint(LINE).signature
    );
}

#[test]
fn seed_changes_signature() {
    let a = Fingerprinter::new(FingerprintConfig::default()).unwrap();
    let b = Fingerprinter::new(FingerprintConfig::default().with_seed(7)).unwrap();
    assert_ne!(a.fingerprint(LINE).signature, b.fingerprint(LINE).signature);
}

#[test]
fn normalization_is_repeatable() {
    let cfg = NormalizeConfig::default();
    assert_eq!(normalize(LINE, &cfg), normalize(LINE, &cfg));
}

#[test]
fn ids_ignore_metadata_key_order() {
    let a = content_id("boom", &json!({"pod_name": "api-1", "level": "error"}));
    let b = content_id("boom", &json!({"level": "error", "pod_name": "api-1"}));
    assert_eq!(a, b);
    assert_ne!(a, content_id("boom", &json!({"pod_name": "api-2", "level": "error"})));
}

#[test]
fn separate_engines_assign_the_same_ids() {
    let entry = LogEntry::new(LINE).with_field("pod_name", "api-1");
    let first = build_engine(&LogdupConfig::default())
        .unwrap()
        .ingest(&[entry.clone()])
        .unwrap();
    let second = build_engine(&LogdupConfig::default())
        .unwrap()
        .ingest(&[entry])
        .unwrap();
    assert_eq!(first.outcomes[0].id, second.outcomes[0].id);
    assert_eq!(first.outcomes[0].decision, second.outcomes[0].decision);
}
