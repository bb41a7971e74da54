use std::sync::Once;
use std::time::Duration;

use pretty_assertions::assert_eq;
use subtitle_core::{
    update, Availability, Effect, Job, JobId, JobStatus, Msg, PollPhase, PollerState,
    DEFAULT_POLL_INTERVAL,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn job(status: JobStatus, progress: Option<f64>) -> Job {
    Job {
        status,
        message: format!("now {status}"),
        filename: "clip.mp4".to_string(),
        uploaded_at: "2024-05-01T10:00:00.000000".to_string(),
        progress,
    }
}

fn fetched(job_id: &str, status: JobStatus, progress: Option<f64>) -> Msg {
    Msg::StatusFetched {
        job_id: JobId::from(job_id),
        result: Ok(job(status, progress)),
    }
}

fn watch(state: PollerState, job_id: &str) -> (PollerState, Vec<Effect>) {
    update(state, Msg::Watch(JobId::from(job_id)))
}

fn scheduled_session(effects: &[Effect]) -> u64 {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::ScheduleFetch { session, .. } => Some(*session),
            _ => None,
        })
        .expect("schedule effect")
}

#[test]
fn watch_cancels_timer_and_fetches() {
    init_logging();
    let (mut state, effects) = watch(PollerState::new(), "abc123");

    assert_eq!(
        effects,
        vec![
            Effect::CancelTimer,
            Effect::FetchStatus {
                job_id: JobId::from("abc123")
            },
        ]
    );
    let view = state.view();
    assert_eq!(view.phase, PollPhase::Fetching);
    assert_eq!(view.job_id, Some(JobId::from("abc123")));
    assert!(view.polling);
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
}

#[test]
fn submission_to_completion_scenario() {
    init_logging();
    let (state, _) = watch(PollerState::new(), "abc123");

    let (state, effects) = update(state, fetched("abc123", JobStatus::Processing, Some(40.0)));
    assert_eq!(
        effects,
        vec![Effect::ScheduleFetch {
            job_id: JobId::from("abc123"),
            session: state.session(),
            delay: DEFAULT_POLL_INTERVAL,
        }]
    );
    let view = state.view();
    assert_eq!(view.phase, PollPhase::Settled(JobStatus::Processing));
    assert_eq!(view.progress, Some(40.0));
    assert_eq!(view.downloads, Availability::default());

    let session = scheduled_session(&effects);
    let (state, effects) = update(
        state,
        Msg::TimerElapsed {
            job_id: JobId::from("abc123"),
            session,
        },
    );
    assert_eq!(
        effects,
        vec![Effect::FetchStatus {
            job_id: JobId::from("abc123")
        }]
    );
    assert_eq!(state.phase(), PollPhase::Fetching);

    let (state, effects) = update(state, fetched("abc123", JobStatus::Embedding, None));
    assert_eq!(effects.len(), 1);
    assert_eq!(
        state.view().downloads,
        Availability {
            video: false,
            subtitles: true
        }
    );

    let session = scheduled_session(&effects);
    let (state, _) = update(
        state,
        Msg::TimerElapsed {
            job_id: JobId::from("abc123"),
            session,
        },
    );
    let (state, effects) = update(state, fetched("abc123", JobStatus::Completed, None));
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(
        view.downloads,
        Availability {
            video: true,
            subtitles: true
        }
    );
    assert!(!view.polling);
    assert!(view.is_quiescent());

    // A late timer tick after completion never triggers another fetch.
    let (state, effects) = update(
        state,
        Msg::TimerElapsed {
            job_id: JobId::from("abc123"),
            session,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.phase(), PollPhase::Settled(JobStatus::Completed));
}

#[test]
fn not_found_enters_errored_without_rescheduling() {
    init_logging();
    let (state, _) = watch(PollerState::new(), "missing");
    let session = state.session();

    let (state, effects) = update(
        state,
        Msg::StatusFetched {
            job_id: JobId::from("missing"),
            result: Err("job not found".to_string()),
        },
    );
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.phase, PollPhase::Errored);
    assert_eq!(view.error.as_deref(), Some("job not found"));
    assert!(view.is_quiescent());

    let (state, effects) = update(
        state,
        Msg::TimerElapsed {
            job_id: JobId::from("missing"),
            session,
        },
    );
    assert!(effects.is_empty());

    // Only an explicit re-check leaves the errored state.
    let (state, effects) = update(state, Msg::Refresh);
    assert_eq!(
        effects,
        vec![
            Effect::CancelTimer,
            Effect::FetchStatus {
                job_id: JobId::from("missing")
            },
        ]
    );
    assert_eq!(state.phase(), PollPhase::Fetching);
    assert_eq!(state.view().error, None);
}

#[test]
fn error_discards_previously_held_snapshot() {
    init_logging();
    let (state, _) = watch(PollerState::new(), "abc123");
    let (state, effects) = update(state, fetched("abc123", JobStatus::Rendering, Some(90.0)));
    let session = scheduled_session(&effects);
    let (state, _) = update(
        state,
        Msg::TimerElapsed {
            job_id: JobId::from("abc123"),
            session,
        },
    );

    let (state, _) = update(
        state,
        Msg::StatusFetched {
            job_id: JobId::from("abc123"),
            result: Err("Network error".to_string()),
        },
    );
    let view = state.view();
    assert_eq!(view.job, None);
    assert_eq!(view.progress, None);
    assert_eq!(view.downloads, Availability::default());
}

#[test]
fn no_second_fetch_while_one_is_in_flight() {
    init_logging();
    let (state, _) = watch(PollerState::new(), "abc123");

    let (state, effects) = watch(state, "abc123");
    assert!(effects.is_empty());

    let (state, effects) = update(state, Msg::Refresh);
    assert!(effects.is_empty());
    assert_eq!(state.phase(), PollPhase::Fetching);
}

#[test]
fn switching_jobs_discards_the_stale_result() {
    init_logging();
    let (state, _) = watch(PollerState::new(), "first");
    let (state, effects) = watch(state, "second");
    assert_eq!(
        effects,
        vec![
            Effect::CancelTimer,
            Effect::FetchStatus {
                job_id: JobId::from("second")
            },
        ]
    );

    let (state, effects) = update(state, fetched("first", JobStatus::Processing, None));
    assert!(effects.is_empty());
    assert_eq!(state.phase(), PollPhase::Fetching);
    assert_eq!(state.snapshot(), None);

    let (state, effects) = update(state, fetched("second", JobStatus::Queued, None));
    assert_eq!(effects.len(), 1);
    assert_eq!(state.phase(), PollPhase::Settled(JobStatus::Queued));
    assert_eq!(state.target(), Some(&JobId::from("second")));
}

#[test]
fn timer_from_a_previous_job_is_ignored() {
    init_logging();
    let (state, _) = watch(PollerState::new(), "first");
    let (state, effects) = update(state, fetched("first", JobStatus::Processing, None));
    let old_session = scheduled_session(&effects);

    let (state, _) = watch(state, "second");
    let (state, _) = update(state, fetched("second", JobStatus::Processing, None));

    let (_state, effects) = update(
        state,
        Msg::TimerElapsed {
            job_id: JobId::from("first"),
            session: old_session,
        },
    );
    assert!(effects.is_empty());
}

#[test]
fn rewatching_adopts_the_request_already_on_the_wire() {
    init_logging();
    let (state, _) = watch(PollerState::new(), "abc123");
    let (state, effects) = update(state, Msg::Unwatch);
    assert_eq!(effects, vec![Effect::CancelTimer]);
    assert_eq!(state.phase(), PollPhase::Idle);

    let (state, effects) = watch(state, "abc123");
    assert_eq!(effects, vec![Effect::CancelTimer]);

    let (state, effects) = update(state, fetched("abc123", JobStatus::Transcribing, None));
    assert_eq!(effects.len(), 1);
    assert_eq!(state.phase(), PollPhase::Settled(JobStatus::Transcribing));
}

#[test]
fn unwatch_discards_in_flight_result() {
    init_logging();
    let (state, _) = watch(PollerState::new(), "abc123");
    let (state, _) = update(state, Msg::Unwatch);

    let (state, effects) = update(state, fetched("abc123", JobStatus::Processing, None));
    assert!(effects.is_empty());
    assert_eq!(state.phase(), PollPhase::Idle);
    assert_eq!(state.view().job, None);
}

#[test]
fn interval_comes_from_state() {
    init_logging();
    let interval = Duration::from_millis(50);
    let (state, _) = watch(PollerState::with_interval(interval), "abc123");
    let (_state, effects) = update(state, fetched("abc123", JobStatus::Queued, None));

    assert!(matches!(
        effects.as_slice(),
        [Effect::ScheduleFetch { delay, .. }] if *delay == interval
    ));
}

#[test]
fn failure_literals_are_both_terminal() {
    init_logging();
    for status in [JobStatus::Failed, JobStatus::Error] {
        let (state, _) = watch(PollerState::new(), "abc123");
        let (state, effects) = update(state, fetched("abc123", status, Some(10.0)));

        assert!(effects.is_empty(), "{status} must stop polling");
        let view = state.view();
        assert_eq!(view.downloads, Availability::default());
        assert_eq!(view.progress, None);
        assert!(view.is_quiescent());
    }
}

#[test]
fn each_fetch_replaces_the_whole_snapshot() {
    init_logging();
    let (state, _) = watch(PollerState::new(), "abc123");
    let (state, effects) = update(state, fetched("abc123", JobStatus::Processing, Some(40.0)));
    let session = scheduled_session(&effects);
    let (state, _) = update(
        state,
        Msg::TimerElapsed {
            job_id: JobId::from("abc123"),
            session,
        },
    );

    let replacement = Job {
        status: JobStatus::Transcribing,
        message: "Requesting transcription...".to_string(),
        filename: "clip.mp4".to_string(),
        uploaded_at: "2024-05-01T10:00:00.000000".to_string(),
        progress: None,
    };
    let (state, _) = update(
        state,
        Msg::StatusFetched {
            job_id: JobId::from("abc123"),
            result: Ok(replacement.clone()),
        },
    );

    assert_eq!(state.snapshot(), Some(&replacement));
    assert_eq!(state.view().progress, None);
}

#[test]
fn refresh_keeps_snapshot_for_the_same_job() {
    init_logging();
    let (state, _) = watch(PollerState::new(), "abc123");
    let (state, _) = update(state, fetched("abc123", JobStatus::Embedding, None));

    let (state, effects) = update(state, Msg::Refresh);
    assert_eq!(effects.len(), 2);
    assert_eq!(state.phase(), PollPhase::Fetching);
    assert_eq!(state.view().status(), Some(JobStatus::Embedding));
    assert!(state.view().downloads.subtitles);
}
