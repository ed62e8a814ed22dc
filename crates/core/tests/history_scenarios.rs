use std::collections::BTreeMap;

use nidscope_core::analysis::{analyze_all, analyze_library, NidStatus, VersionBuckets};
use nidscope_core::model::{NidEntry, Version};
use nidscope_core::nid::{Nid, NidHasher};

struct FakeHasher(BTreeMap<String, u32>);

impl FakeHasher {
    fn new(pairs: &[(&str, u32)]) -> Self {
        Self(pairs.iter().map(|(n, v)| (n.to_string(), *v)).collect())
    }
}

impl NidHasher for FakeHasher {
    fn compute(&self, name: &str) -> Nid {
        Nid(self.0.get(name).copied().unwrap_or(0xFFFF_FFFF))
    }
}

fn entry(nid: u32, name: &str, versions: &[&str]) -> NidEntry {
    NidEntry::new(Nid(nid), name, "L").with_versions(versions.iter().copied())
}

/// The three-version walkthrough: a verified baseline, an ordinary API churn
/// that a verifying newcomer disqualifies, then a full randomization.
fn scenario_entries() -> (FakeHasher, Vec<NidEntry>) {
    let hasher = FakeHasher::new(&[
        ("alpha", 0xAAAA_0001),
        ("beta", 0xAAAA_0002),
        ("gamma", 0xAAAA_0003),
        ("delta", 0xAAAA_0004),
    ]);
    let entries = vec![
        entry(0xAAAA_0001, "alpha", &["1.0", "1.1"]),
        entry(0xAAAA_0002, "beta", &["1.0", "1.1"]),
        entry(0xAAAA_0003, "gamma", &["1.0"]),
        entry(0xAAAA_0004, "delta", &["1.1"]),
        entry(0x1111_1111, "L_11111111", &["2.0"]),
        entry(0x2222_2222, "L_22222222", &["2.0"]),
        entry(0x3333_3333, "L_33333333", &["2.0"]),
    ];
    (hasher, entries)
}

#[test]
fn worked_scenario_detects_randomization_at_the_final_version() {
    let (hasher, entries) = scenario_entries();
    let refs: Vec<&NidEntry> = entries.iter().collect();
    let history = analyze_library("L", &refs, &hasher);

    assert_eq!(history.versions.len(), 3);

    // 1.0: all three NIDs verify.
    let v0 = &history.versions[0];
    assert_eq!(v0.version, Version::new("1.0"));
    assert!(!v0.randomized && !v0.randomized_here);
    match &v0.buckets {
        VersionBuckets::Plain(b) => {
            assert_eq!(b.known.len(), 3);
            assert!(b.unknown.is_empty() && b.mismatched.is_empty());
        }
        VersionBuckets::Randomized(_) => panic!("1.0 must classify as plain"),
    }

    // 1.1: one third churn on both sides, but delta hash-verifies, so the
    // tentative detection is revoked.
    let v1 = &history.versions[1];
    assert!(!v1.randomized && !v1.randomized_here);
    match &v1.buckets {
        VersionBuckets::Plain(b) => assert_eq!(b.known.len(), 3),
        VersionBuckets::Randomized(_) => panic!("1.1 must classify as plain"),
    }

    // 2.0: full turnover with placeholder names only.
    let v2 = &history.versions[2];
    assert!(v2.randomized && v2.randomized_here);
    match &v2.buckets {
        VersionBuckets::Randomized(b) => {
            assert_eq!(b.unknown_randomized.len(), 3);
            assert!(b.known.is_empty());
            assert!(b.carried_over.is_empty());
            assert!(b.dubious.is_empty());
            assert!(b.unknown_preserved.is_empty());
        }
        VersionBuckets::Plain(_) => panic!("2.0 must classify as randomized"),
    }

    assert!(history.finally_randomized());
    assert!(history.diagnostics.is_empty());
}

#[test]
fn randomized_flag_is_monotonic_across_the_sequence() {
    let (hasher, mut entries) = scenario_entries();
    // A calm version after the randomization: same NIDs as 2.0.
    for e in entries.iter_mut().filter(|e| e.versions.contains(&Version::new("2.0"))) {
        e.versions.insert(Version::new("3.0"));
    }
    let refs: Vec<&NidEntry> = entries.iter().collect();
    let history = analyze_library("L", &refs, &hasher);

    let flags: Vec<bool> = history.versions.iter().map(|v| v.randomized).collect();
    assert_eq!(flags, vec![false, false, true, true]);
    for pair in flags.windows(2) {
        assert!(pair[0] <= pair[1], "sticky flag must never revert");
    }

    // 3.0 had no churn: the boundary event flag is fresh per transition.
    assert!(!history.versions[3].randomized_here);
    // Still classified under the randomized bucket set.
    assert!(matches!(history.versions[3].buckets, VersionBuckets::Randomized(_)));
}

#[test]
fn every_version_partitions_all_of_its_entries() {
    let (hasher, entries) = scenario_entries();
    let refs: Vec<&NidEntry> = entries.iter().collect();
    let history = analyze_library("L", &refs, &hasher);

    for report in &history.versions {
        let present =
            entries.iter().filter(|e| e.versions.contains(&report.version)).count();
        assert_eq!(report.buckets.total(), present, "partition must be exhaustive");

        let sum: usize =
            report.buckets.statuses().iter().map(|(_, bucket)| bucket.len()).sum();
        assert_eq!(sum, present, "buckets must be disjoint");
    }
}

#[test]
fn library_randomized_from_the_start_is_processed_as_plain() {
    // All placeholders, nothing verifies, single version: the documented
    // detection gap. Must not crash, must use the non-randomized buckets.
    let hasher = FakeHasher::new(&[]);
    let entries = vec![
        entry(0x1111_1111, "L_11111111", &["1.0"]),
        entry(0x2222_2222, "L_22222222", &["1.0"]),
    ];
    let refs: Vec<&NidEntry> = entries.iter().collect();
    let history = analyze_library("L", &refs, &hasher);

    assert_eq!(history.versions.len(), 1);
    assert!(!history.finally_randomized());
    match &history.versions[0].buckets {
        VersionBuckets::Plain(b) => {
            assert_eq!(b.unknown.len(), 2);
            assert!(b.known.is_empty() && b.mismatched.is_empty());
        }
        VersionBuckets::Randomized(_) => panic!("detection gap must classify as plain"),
    }
}

#[test]
fn rerunning_the_engine_is_deterministic() {
    let (hasher, mut entries) = scenario_entries();
    entries.push(
        NidEntry::new(Nid(0xBBBB_0001), "other_fn", "M").with_versions(["1.0", "1.1"]),
    );

    let first = analyze_all(&entries, &hasher);
    let second = analyze_all(&entries, &hasher);
    assert_eq!(first, second);

    // Byte-identical when serialized, too.
    let a = serde_json::to_vec(&first).expect("serialize first");
    let b = serde_json::to_vec(&second).expect("serialize second");
    assert_eq!(a, b);

    // Libraries come out in name order.
    let names: Vec<&str> = first.iter().map(|h| h.library.as_str()).collect();
    assert_eq!(names, vec!["L", "M"]);
}

#[test]
fn carried_over_names_survive_across_a_randomization() {
    let hasher = FakeHasher::new(&[("alpha", 0xAAAA_0001), ("beta", 0xAAAA_0002)]);
    let entries = vec![
        entry(0xAAAA_0001, "alpha", &["1.0"]),
        entry(0xAAAA_0002, "beta", &["1.0"]),
        // After randomization, alpha's name survives on a fresh NID; a
        // second fresh NID carries an untraceable name.
        entry(0x1111_1111, "alpha", &["2.0"]),
        entry(0x2222_2222, "imported_name", &["2.0"]),
    ];
    let refs: Vec<&NidEntry> = entries.iter().collect();
    let history = analyze_library("L", &refs, &hasher);

    let v1 = &history.versions[1];
    assert!(v1.randomized);
    match &v1.buckets {
        VersionBuckets::Randomized(b) => {
            assert_eq!(b.carried_over.len(), 1);
            assert_eq!(b.carried_over[0].name, "alpha");
            assert_eq!(b.dubious.len(), 1);
            assert_eq!(b.dubious[0].name, "imported_name");
        }
        VersionBuckets::Plain(_) => panic!("2.0 must classify as randomized"),
    }

    // Statuses carry the right labels for reporting.
    let labels: Vec<&str> =
        v1.buckets.statuses().iter().map(|(status, _)| status.as_str()).collect();
    assert_eq!(
        labels,
        vec!["known", "carried-over", "dubious", "unknown-preserved", "unknown-randomized"]
    );
    assert_eq!(NidStatus::CarriedOver.as_str(), "carried-over");
}
