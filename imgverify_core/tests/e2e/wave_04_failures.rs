//! E2E Wave 4: Infrastructure failures and cancellation
//!
//! Tests for timeouts, launch failures, caller cancellation and the
//! termination of siblings after a verdict.

use super::*;
use imgverify_core::{
    CancellationToken, CancellationTokenSource, ImageVerifier, InfraFailure, VerifyError,
};
use std::time::{Duration, Instant};

/// E2E Test 1: A verifier exceeding its budget is an error, not a verdict
#[tokio::test]
async fn e2e_timeout() {
    let bin = bin_dir(&["#!/bin/sh\nexec sleep 1000".to_string()]);
    let v = verifier(bin.path(), -1, Duration::from_millis(250));

    let start = Instant::now();
    let err = v
        .verify_image(&CancellationToken::new(), IMAGE, &descriptor())
        .await
        .unwrap_err();

    assert!(start.elapsed() < Duration::from_secs(5));
    match err {
        VerifyError::Verifier { verifier, cause } => {
            assert_eq!(verifier, "0.sh");
            assert!(matches!(cause, InfraFailure::Timeout(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// E2E Test 2: An interpreter that does not exist fails the launch
#[tokio::test]
async fn e2e_bad_shell() {
    let bin = bin_dir(&["#!/badshell\nexit 0".to_string()]);
    let v = verifier(bin.path(), -1, Duration::from_secs(5));

    let err = v
        .verify_image(&CancellationToken::new(), IMAGE, &descriptor())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        VerifyError::Verifier {
            cause: InfraFailure::Launch(_),
            ..
        }
    ));
    assert!(err.to_string().starts_with("failed to call image verifier 0.sh"));
}

/// E2E Test 3: A file without execute permission fails the launch
#[tokio::test]
async fn e2e_not_executable() {
    use std::os::unix::fs::PermissionsExt;

    let bin = bin_dir(&[exit_with(0)]);
    let path = bin.path().join("0.sh");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
    let v = verifier(bin.path(), -1, Duration::from_secs(5));

    let err = v
        .verify_image(&CancellationToken::new(), IMAGE, &descriptor())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        VerifyError::Verifier {
            cause: InfraFailure::Launch(_),
            ..
        }
    ));
}

/// E2E Test 4: An infrastructure failure beats accepting siblings
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn e2e_failure_overrides_accepts() {
    let bin = bin_dir(&[accept("Reason A"), "#!/badshell\nexit 0".to_string()]);
    let v = verifier(bin.path(), -1, Duration::from_secs(5));

    let err = v
        .verify_image(&CancellationToken::new(), IMAGE, &descriptor())
        .await
        .unwrap_err();

    match err {
        VerifyError::Verifier { verifier, .. } => assert_eq!(verifier, "1.sh"),
        other => panic!("unexpected error: {other}"),
    }
}

/// E2E Test 5: Caller cancellation ends the call with an error
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn e2e_caller_cancellation() {
    let bin = bin_dir(&["#!/bin/sh\nexec sleep 1000".to_string()]);
    let v = verifier(bin.path(), -1, Duration::from_secs(30));
    let source = CancellationTokenSource::new();
    let token = source.token();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        source.cancel();
    });

    let start = Instant::now();
    let err = v
        .verify_image(&token, IMAGE, &descriptor())
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, VerifyError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(5));
}

/// E2E Test 6: An already cancelled caller gets no verdict
#[tokio::test]
async fn e2e_cancelled_before_start() {
    let out = tempfile::tempdir().unwrap();
    let marker = out.path().join("called");
    let bin = bin_dir(&[touching(&marker, 0)]);
    let v = verifier(bin.path(), -1, Duration::from_secs(5));
    let source = CancellationTokenSource::new();
    source.cancel();

    let err = v
        .verify_image(&source.token(), IMAGE, &descriptor())
        .await
        .unwrap_err();

    assert!(matches!(err, VerifyError::Cancelled));
    assert!(!marker.exists());
}

/// E2E Test 7: A rejection terminates slower siblings
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn e2e_rejection_kills_siblings() {
    let out = tempfile::tempdir().unwrap();
    let marker = out.path().join("slow-finished");
    let bin = bin_dir(&[
        format!("#!/bin/sh\nsleep 1\ntouch {}\nexit 0", marker.display()),
        reject("denied", 1),
    ]);
    let v = verifier(bin.path(), -1, Duration::from_secs(10));

    let start = Instant::now();
    let j = v
        .verify_image(&CancellationToken::new(), IMAGE, &descriptor())
        .await
        .unwrap();

    assert!(!j.ok);
    assert_eq!(j.reason, "verifier 1.sh rejected image (exit code 1): denied");
    assert!(start.elapsed() < Duration::from_secs(1));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists());
}
