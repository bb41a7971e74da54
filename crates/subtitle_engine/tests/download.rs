use std::fs;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use subtitle_core::{Artifact, JobId, JobStatus};
use subtitle_engine::{
    AtomicFileWriter, ClientSettings, DownloadError, Downloader, FailureKind, HttpBackend,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn downloader(server: &MockServer, dir: &TempDir) -> Downloader {
    let client = HttpBackend::new(ClientSettings {
        base_url: server.uri(),
        connect_timeout: Some(Duration::from_secs(2)),
        ..ClientSettings::default()
    })
    .unwrap();
    Downloader::new(Arc::new(client), AtomicFileWriter::new(dir.path()))
}

#[tokio::test]
async fn gate_declines_without_contacting_the_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let downloader = downloader(&server, &out);
    let id = JobId::from("abc123");

    for (status, artifact) in [
        (JobStatus::Transcribing, Artifact::Subtitles),
        (JobStatus::Rendering, Artifact::Video),
        (JobStatus::Failed, Artifact::Subtitles),
        (JobStatus::Error, Artifact::Video),
    ] {
        let err = downloader.download(&id, status, artifact).await.unwrap_err();
        assert!(
            matches!(err, DownloadError::NotAvailable { .. }),
            "{status} {artifact}"
        );
    }
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn subtitles_are_available_while_embedding() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/abc123/srt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("1\n00:00:00,000 --> 00:00:02,000\nHello\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let saved = downloader(&server, &out)
        .download(
            &JobId::from("abc123"),
            JobStatus::Embedding,
            Artifact::Subtitles,
        )
        .await
        .unwrap();

    assert_eq!(saved, out.path().join("abc123.srt"));
    assert!(fs::read_to_string(&saved).unwrap().contains("Hello"));
}

#[tokio::test]
async fn completed_video_is_saved_under_its_artifact_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 1, 2, 3]))
        .expect(1)
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let saved = downloader(&server, &out)
        .download(
            &JobId::from("abc123"),
            JobStatus::Completed,
            Artifact::Video,
        )
        .await
        .unwrap();

    assert_eq!(saved.file_name().unwrap(), "abc123_with_subtitles.mp4");
    assert_eq!(fs::read(&saved).unwrap(), vec![0u8, 1, 2, 3]);
}

#[tokio::test]
async fn backend_refusal_leaves_no_file_behind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/abc123"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({ "error": "Output file not found" })),
        )
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let err = downloader(&server, &out)
        .download(
            &JobId::from("abc123"),
            JobStatus::Completed,
            Artifact::Video,
        )
        .await
        .unwrap_err();

    match err {
        DownloadError::Backend(err) => {
            assert_eq!(err.kind, FailureKind::HttpStatus(404));
            assert_eq!(err.message, "Output file not found");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn download_current_checks_the_live_status_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "processing",
            "message": "Extracting audio",
            "filename": "clip.mp4",
            "uploaded_at": "2024-05-01T10:00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download/abc123/srt"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let err = downloader(&server, &out)
        .download_current(&JobId::from("abc123"), Artifact::Subtitles)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DownloadError::NotAvailable {
            artifact: Artifact::Subtitles,
            status: JobStatus::Processing
        }
    ));
}

#[test]
fn atomic_write_replaces_existing_files() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path());

    let first = writer.write("abc123.srt", b"old").unwrap();
    let second = writer.write("abc123.srt", b"new").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"new");
}

#[test]
fn write_into_a_file_path_fails_cleanly() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("abc123.srt", b"data").is_err());
    assert!(!file_path.with_file_name("abc123.srt").exists());
}
