//! E2E Wave 1: Verifier discovery and the verifier cap
//!
//! Tests for missing and empty directories, disabled verification, and the
//! positive cap.

use super::*;
use imgverify_core::{CancellationToken, ImageVerifier};
use std::time::Duration;

/// E2E Test 1: A missing directory accepts with an informational reason
#[tokio::test]
async fn e2e_missing_directory() {
    let temp = tempfile::tempdir().unwrap();
    let v = verifier(&temp.path().join("missing_directory"), 10, Duration::from_secs(1));

    let j = v
        .verify_image(&CancellationToken::new(), IMAGE, &Descriptor::default())
        .await
        .unwrap();

    assert!(j.ok);
    assert!(!j.reason.is_empty());
    assert!(!j.reason.contains("rejected"));
    assert!(j.reason.contains("does not exist"));
}

/// E2E Test 2: An empty directory accepts with an informational reason
#[tokio::test]
async fn e2e_empty_directory() {
    let temp = tempfile::tempdir().unwrap();
    let v = verifier(temp.path(), 10, Duration::from_secs(1));

    let j = v
        .verify_image(&CancellationToken::new(), IMAGE, &Descriptor::default())
        .await
        .unwrap();

    assert!(j.ok);
    assert!(!j.reason.is_empty());
    assert!(!j.reason.contains("rejected"));
}

/// E2E Test 3: A directory holding only subdirectories counts as empty
#[tokio::test]
async fn e2e_directory_with_only_subdirectories() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::create_dir(temp.path().join("0.d")).unwrap();
    let v = verifier(temp.path(), -1, Duration::from_secs(1));

    let j = v
        .verify_image(&CancellationToken::new(), IMAGE, &Descriptor::default())
        .await
        .unwrap();

    assert!(j.ok);
    assert!(j.reason.starts_with("no image verifier binaries found in"));
}

/// E2E Test 4: max_verifiers = 0 runs nothing and gives an empty reason
#[tokio::test]
async fn e2e_max_verifiers_zero() {
    let out = tempfile::tempdir().unwrap();
    let marker = out.path().join("called");
    let bin = bin_dir(&[touching(&marker, 1)]);
    let v = verifier(bin.path(), 0, Duration::from_secs(1));

    let j = v
        .verify_image(&CancellationToken::new(), IMAGE, &Descriptor::default())
        .await
        .unwrap();

    assert!(j.ok);
    assert!(j.reason.is_empty());
    assert!(!marker.exists());
}

/// E2E Test 5: max_verifiers = 1 skips the rejecting second verifier
#[tokio::test]
async fn e2e_max_verifiers_one() {
    let out = tempfile::tempdir().unwrap();
    let marker = out.path().join("second");
    let bin = bin_dir(&[exit_with(0), touching(&marker, 1)]);
    let v = verifier(bin.path(), 1, Duration::from_secs(1));

    let j = v
        .verify_image(&CancellationToken::new(), IMAGE, &Descriptor::default())
        .await
        .unwrap();

    assert!(j.ok);
    assert_eq!(j.reason, "0.sh => ");
    assert!(!marker.exists());
}

/// E2E Test 6: max_verifiers = 2 runs exactly the first two verifiers
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn e2e_max_verifiers_two() {
    let out = tempfile::tempdir().unwrap();
    let markers: Vec<_> = (0..3).map(|i| out.path().join(format!("m{}", i))).collect();
    let bin = bin_dir(&[
        touching(&markers[0], 0),
        touching(&markers[1], 0),
        touching(&markers[2], 1),
    ]);
    let v = verifier(bin.path(), 2, Duration::from_secs(1));

    let j = v
        .verify_image(&CancellationToken::new(), IMAGE, &Descriptor::default())
        .await
        .unwrap();

    assert!(j.ok);
    assert!(!j.reason.is_empty());
    assert!(markers[0].exists());
    assert!(markers[1].exists());
    assert!(!markers[2].exists());
}

/// E2E Test 7: Verifiers are ordered by name, not by number
#[tokio::test]
async fn e2e_lexical_order() {
    let bin = tempfile::tempdir().unwrap();
    write_script(bin.path(), "9-last", &accept("nine"));
    write_script(bin.path(), "10-first", &accept("ten"));
    write_script(bin.path(), "b", &accept("bee"));
    let v = verifier(bin.path(), -1, Duration::from_secs(1));

    let j = v
        .verify_image(&CancellationToken::new(), IMAGE, &Descriptor::default())
        .await
        .unwrap();

    assert!(j.ok);
    assert_eq!(j.reason, "10-first => ten, 9-last => nine, b => bee");
}

/// E2E Test 8: The cap applies to name order
#[tokio::test]
async fn e2e_cap_follows_name_order() {
    let bin = tempfile::tempdir().unwrap();
    write_script(bin.path(), "b", &reject("should not run", 1));
    write_script(bin.path(), "a", &accept("first"));
    let v = verifier(bin.path(), 1, Duration::from_secs(1));

    let j = v
        .verify_image(&CancellationToken::new(), IMAGE, &Descriptor::default())
        .await
        .unwrap();

    assert!(j.ok);
    assert_eq!(j.reason, "a => first");
}
