use std::path::PathBuf;

use arkiv_types::error::ArkivError;
use arkiv_types::request::TransferRequest;
use arkiv_types::ScopedName;

use super::helpers::*;
use crate::config::{LocatorConfig, ZeroSizePolicy};
use crate::desired::DesiredStateBuilder;
use crate::sources::{self, RawEntry};

fn build_from_sources(config: &crate::config::ArkivConfig) -> crate::desired::DesiredState {
    let entries = sources::read_all(&config.sources, &config.grouping_pattern).unwrap();
    DesiredStateBuilder::new(config).build(entries).unwrap()
}

#[test]
fn groups_items_into_one_container_and_policy_per_key() {
    let (_dir, config) = fixture(&[
        ("run_0042_a.dat", "a"),
        ("run_0042_b.dat", "bb"),
        ("run_0043_a2.dat", "ccc"),
    ]);
    let desired = build_from_sources(&config);

    assert_eq!(desired.items.len(), 3);
    assert_eq!(desired.containers.len(), 2);
    assert_eq!(desired.policies.len(), 2);

    let c42 = &desired.containers[&container_id("0042")];
    assert_eq!(
        c42.members,
        vec![item_id("run_0042_a.dat"), item_id("run_0042_b.dat")]
    );
    let policy = &desired.policies[&container_id("0043")];
    assert_eq!(policy.location, DEST);
    assert_eq!(policy.replicas, 1);

    let item = desired.items.get(&item_id("run_0042_b.dat")).unwrap();
    assert_eq!(item.size, 2);
    assert_eq!(item.container, container_id("0042"));
    assert_eq!(item.transfer.location, UPLOAD);
    assert!(item.transfer.register_after_transfer);
    assert!(!item.present_in_catalog);
}

#[test]
fn unmatched_entries_are_skipped_not_fatal() {
    let (_dir, config) = fixture(&[("run_0042_a.dat", "a"), ("notes.txt", "x"), ("calib_7.dat", "y")]);
    let desired = build_from_sources(&config);
    assert_eq!(desired.items.len(), 1);
    assert_eq!(desired.unmatched, 2);
}

#[test]
fn nothing_matching_yields_empty_state() {
    let (_dir, config) = fixture(&[("notes.txt", "x")]);
    let desired = build_from_sources(&config);
    assert!(desired.is_empty());
    assert!(desired.containers.is_empty());
    assert_eq!(desired.unmatched, 1);
}

#[test]
fn differing_content_under_one_identity_is_a_collision() {
    let (_dir, config) = fixture(&[
        ("one/run_0042_a.dat", "first"),
        ("two/run_0042_a.dat", "second"),
    ]);
    let entries = sources::read_all(&config.sources, &config.grouping_pattern).unwrap();
    let err = DesiredStateBuilder::new(&config).build(entries).unwrap_err();
    match err {
        ArkivError::NamingCollision { identity, first, second } => {
            assert_eq!(identity, item_id("run_0042_a.dat"));
            assert!(first.ends_with("one/run_0042_a.dat"));
            assert!(second.ends_with("two/run_0042_a.dat"));
        }
        other => panic!("expected NamingCollision, got {other}"),
    }
}

#[test]
fn identical_copies_keep_the_first_path() {
    let (dir, config) = fixture(&[
        ("one/run_0042_a.dat", "same"),
        ("two/run_0042_a.dat", "same"),
    ]);
    let desired = build_from_sources(&config);
    assert_eq!(desired.items.len(), 1);
    let item = desired.items.get(&item_id("run_0042_a.dat")).unwrap();
    assert_eq!(item.path, dir.path().join("one/run_0042_a.dat"));
    assert_eq!(desired.containers[&container_id("0042")].members.len(), 1);
}

#[test]
fn repeated_locator_is_not_a_collision() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "run_0042_a.dat", b"x");
    let config = make_test_config(dir.path());
    let locator = path.to_string_lossy().to_string();
    let entries = vec![
        RawEntry::new(locator.clone(), "run_0042_a.dat"),
        RawEntry::new(locator, "run_0042_a.dat"),
    ];
    let desired = DesiredStateBuilder::new(&config).build(entries).unwrap();
    assert_eq!(desired.items.len(), 1);
}

#[test]
fn zero_size_files_are_held_back_by_default() {
    let (_dir, config) = fixture(&[("run_0042_a.dat", "data"), ("run_0042_empty.dat", "")]);
    let desired = build_from_sources(&config);
    assert_eq!(desired.items.len(), 1);
    assert_eq!(desired.zero_size.len(), 1);
    assert!(desired.zero_size.contains(&item_id("run_0042_empty.dat")));
    assert_eq!(desired.containers[&container_id("0042")].members.len(), 1);
}

#[test]
fn zero_size_files_can_be_included() {
    let (_dir, mut config) = fixture(&[("run_0042_a.dat", "data"), ("run_0042_empty.dat", "")]);
    config.zero_size = ZeroSizePolicy::Include;
    let desired = build_from_sources(&config);
    assert_eq!(desired.items.len(), 2);
    assert!(desired.zero_size.is_empty());
}

#[test]
fn remote_locators_are_translated_to_local_paths() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "pnfs/run_0042_a.dat", b"abc");
    let mut config = make_test_config(dir.path());
    config.locator = Some(LocatorConfig {
        remote_prefix: "gsiftp://door.example.org".into(),
        local_prefix: dir.path().to_string_lossy().to_string(),
        strict: false,
    });
    let entries = vec![RawEntry::new(
        "gsiftp://door.example.org/pnfs/run_0042_a.dat",
        "run_0042_filelist.dat",
    )];
    let desired = DesiredStateBuilder::new(&config).build(entries).unwrap();
    let item = desired.items.get(&item_id("run_0042_a.dat")).unwrap();
    assert_eq!(item.path, dir.path().join("pnfs/run_0042_a.dat"));
    assert_eq!(item.size, 3);
}

#[test]
fn strict_locator_rule_rejects_foreign_locators() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = make_test_config(dir.path());
    config.locator = Some(LocatorConfig {
        remote_prefix: "gsiftp://door.example.org".into(),
        local_prefix: "/pnfs".into(),
        strict: true,
    });
    let entries = vec![RawEntry::new("root://other/pnfs/run_0042_a.dat", "run_0042_x")];
    let err = DesiredStateBuilder::new(&config).build(entries).unwrap_err();
    assert!(matches!(err, ArkivError::UntranslatableLocator(_)));
}

#[test]
fn grouping_key_comes_from_group_source_not_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "raw_a.dat", b"x");
    let config = make_test_config(dir.path());
    let builder = DesiredStateBuilder::new(&config);
    assert_eq!(builder.grouping_key("run_0099_filelist.dat"), Some("0099"));
    assert_eq!(builder.grouping_key("xrun_0099_filelist.dat"), None);

    let entries = vec![RawEntry::new(path.to_string_lossy(), "run_0099_filelist.dat")];
    let desired = builder.build(entries).unwrap();
    assert_eq!(
        desired.items.get(&item_id("raw_a.dat")).unwrap().container,
        container_id("0099")
    );
}

#[test]
fn recovered_requests_keep_their_identity() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "anything.dat", b"12345");
    let config = make_test_config(dir.path());
    let request = TransferRequest {
        path: path.clone(),
        item: ScopedName::new("user.old", "renamed.dat"),
        container: ScopedName::new("user.old", "run-0001-raw"),
        location: "OLD_DISK".into(),
        register_after_transfer: false,
        upload_ok: false,
        size: 0,
    };
    let desired = DesiredStateBuilder::new(&config)
        .build(vec![RawEntry::recovered(request)])
        .unwrap();

    let id = ScopedName::new("user.old", "renamed.dat");
    let item = desired.items.get(&id).unwrap();
    assert_eq!(item.container, ScopedName::new("user.old", "run-0001-raw"));
    assert_eq!(item.transfer.location, "OLD_DISK");
    assert!(!item.transfer.register_after_transfer);
    assert_eq!(item.size, 5);
    assert_eq!(item.path, PathBuf::from(&path));
    assert!(desired
        .policies
        .contains_key(&ScopedName::new("user.old", "run-0001-raw")));
}
