use pretty_assertions::assert_eq;
use serde_json::json;
use subtitle_core::{Job, JobId, JobListing, JobStatus};

#[test]
fn status_literals_round_trip_through_from_str() {
    for status in JobStatus::ALL {
        assert_eq!(status.as_str().parse::<JobStatus>(), Ok(status));
    }
    assert!("Completed".parse::<JobStatus>().is_err());
}

#[test]
fn status_decodes_backend_intermediate_literals() {
    let decode = |raw: &str| serde_json::from_value::<JobStatus>(json!(raw)).unwrap();

    assert_eq!(decode("extracting_audio"), JobStatus::Processing);
    assert_eq!(decode("uploading"), JobStatus::Processing);
    assert_eq!(decode("translating"), JobStatus::Transcribing);
    assert_eq!(decode("rendering"), JobStatus::Rendering);
    assert!(serde_json::from_value::<JobStatus>(json!("paused")).is_err());
}

#[test]
fn terminal_and_failure_classification() {
    let terminal: Vec<_> = JobStatus::ALL
        .into_iter()
        .filter(|status| status.is_terminal())
        .collect();
    assert_eq!(
        terminal,
        vec![JobStatus::Completed, JobStatus::Failed, JobStatus::Error]
    );
    assert!(JobStatus::Failed.is_failure());
    assert!(JobStatus::Error.is_failure());
    assert!(!JobStatus::Completed.is_failure());
}

#[test]
fn transitions_are_monotonic() {
    assert!(JobStatus::Queued.can_transition_to(JobStatus::Processing));
    assert!(JobStatus::Transcribing.can_transition_to(JobStatus::Rendering));
    assert!(JobStatus::Embedding.can_transition_to(JobStatus::Error));
    assert!(JobStatus::Rendering.can_transition_to(JobStatus::Rendering));
    assert!(!JobStatus::Rendering.can_transition_to(JobStatus::Transcribing));
    assert!(!JobStatus::Completed.can_transition_to(JobStatus::Queued));
    assert!(!JobStatus::Failed.can_transition_to(JobStatus::Processing));
}

#[test]
fn job_decodes_status_payload() {
    let job: Job = serde_json::from_value(json!({
        "status": "processing",
        "message": "Extracting audio from video...",
        "filename": "clip.mp4",
        "uploaded_at": "2024-05-01T10:00:00.123456",
        "progress": 40
    }))
    .unwrap();

    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.filename, "clip.mp4");
    assert_eq!(job.progress, Some(40.0));
    assert_eq!(job.visible_progress(), Some(40.0));
    assert!(job.uploaded_at_key().is_some());
}

#[test]
fn job_accepts_created_at_and_missing_fields() {
    let job: Job = serde_json::from_value(json!({
        "job_id": "x",
        "status": "completed",
        "created_at": "2024-05-01T10:00:00+02:00"
    }))
    .unwrap();

    assert_eq!(job.message, "");
    assert_eq!(job.uploaded_at, "2024-05-01T10:00:00+02:00");
    let key = job.uploaded_at_key().unwrap();
    assert_eq!(key.to_string(), "2024-05-01 08:00:00");
}

#[test]
fn visible_progress_is_clamped_and_hidden_when_terminal() {
    let mut job: Job = serde_json::from_value(json!({
        "status": "rendering",
        "progress": 140.5
    }))
    .unwrap();
    assert_eq!(job.visible_progress(), Some(100.0));

    job.status = JobStatus::Completed;
    assert_eq!(job.visible_progress(), None);
}

#[test]
fn listing_accepts_id_keyed_map() {
    let listing: JobListing = serde_json::from_value(json!({
        "b": { "status": "queued", "message": "", "filename": "b.mp4", "uploaded_at": "2024-05-01T10:00:00" },
        "a": { "status": "completed", "message": "", "filename": "a.mp4", "uploaded_at": "2024-05-01T09:00:00" }
    }))
    .unwrap();

    let ids: Vec<JobId> = listing
        .into_entries()
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(ids, vec![JobId::from("a"), JobId::from("b")]);
}

#[test]
fn listing_accepts_envelope_with_job_ids() {
    let listing: JobListing = serde_json::from_value(json!({
        "total_jobs": 1,
        "jobs": [
            { "job_id": "abc123", "status": "error", "message": "Transcription failed", "filename": "clip.mp4", "created_at": "2024-05-01T10:00:00" }
        ]
    }))
    .unwrap();

    let entries = listing.into_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, JobId::from("abc123"));
    assert_eq!(entries[0].1.status, JobStatus::Error);
}

#[test]
fn empty_listing_is_an_empty_map() {
    let listing: JobListing = serde_json::from_value(json!({})).unwrap();
    assert!(listing.into_entries().is_empty());
}
