//! End-to-end flows through the public API: config validation, the
//! file-to-engine path, and batch joins, all over scripted transports.

use std::sync::Arc;

use anyhow::Result;
use backhaul_client::backhaul_core::{ConfigError, UploaderConfig};
use backhaul_client::testing::{config, AttemptScript, FixedResolver, ScriptedTransport};
use backhaul_client::{SetupError, UploadError, UploadJob, Uploader};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn scripted_uploader(
    max_retries: u32,
    scripts: Vec<AttemptScript>,
) -> (Uploader, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::new(scripts));
    let uploader = Uploader::with_transport(
        config(max_retries),
        transport.clone(),
        Arc::new(FixedResolver("text/plain")),
    )
    .unwrap();
    (uploader, transport)
}

#[test]
fn construction_fails_fast_without_credentials() {
    init_tracing();

    let mut incomplete = UploaderConfig::new("ak", "sk", "media");
    incomplete.key = String::new();
    let err = Uploader::new(incomplete).unwrap_err();
    assert!(matches!(
        err,
        SetupError::Config(ConfigError::MissingField("key"))
    ));

    // All three present is enough, even over a transport that does nothing.
    let transport = Arc::new(ScriptedTransport::new(Vec::new()));
    Uploader::with_transport(
        UploaderConfig::new("ak", "sk", "media"),
        transport,
        Arc::new(FixedResolver("text/plain")),
    )
    .unwrap();
}

#[tokio::test]
async fn file_upload_retries_to_success() -> Result<()> {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("report.txt");
    std::fs::write(&path, b"quarterly numbers")?;

    let (uploader, transport) = scripted_uploader(
        4,
        vec![
            AttemptScript::transport_error("connection reset"),
            AttemptScript::status(503),
            AttemptScript::ok(),
        ],
    );

    let receipt = uploader.upload(&path, "reports/q3.txt").await?;
    assert_eq!(receipt.status, 200);
    assert_eq!(receipt.attempts, 3);
    assert_eq!(transport.attempts(), 3);

    // The same buffer and headers are re-read on every attempt.
    for put in transport.recorded() {
        assert_eq!(put.payload, b"quarterly numbers");
        assert_eq!(put.headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(put.destination, "reports/q3.txt");
    }
    Ok(())
}

#[tokio::test]
async fn exhausted_file_upload_reports_attempts() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payload.bin");
    std::fs::write(&path, b"payload").unwrap();

    let (uploader, transport) =
        scripted_uploader(3, vec![AttemptScript::transport_error("unreachable")]);

    let err = uploader.upload(&path, "objects/payload.bin").await.unwrap_err();
    match err {
        UploadError::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected exhaustion, got {other:?}"),
    }
    assert_eq!(transport.attempts(), 3);
}

#[tokio::test]
async fn batch_preserves_input_order() -> Result<()> {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let mut jobs = Vec::new();
    for name in ["a.txt", "b.txt"] {
        let path = dir.path().join(name);
        std::fs::write(&path, name.as_bytes())?;
        jobs.push(UploadJob::new(path, format!("batch/{name}")));
    }

    let (uploader, _transport) = scripted_uploader(3, vec![AttemptScript::ok()]);
    let results = uploader.upload_files(jobs).await?;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|receipt| receipt.status == 200));
    Ok(())
}

#[tokio::test]
async fn batch_surfaces_the_first_error() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("present.txt");
    std::fs::write(&present, b"present").unwrap();

    let jobs = vec![
        UploadJob::new(present, "batch/present.txt"),
        UploadJob::new(dir.path().join("absent.txt"), "batch/absent.txt"),
    ];

    let (uploader, _transport) = scripted_uploader(3, vec![AttemptScript::ok()]);
    let err = uploader.upload_files(jobs).await.unwrap_err();

    assert_eq!(err.index, 1);
    assert!(matches!(err.source, UploadError::Source { .. }));
}
