use crate::{Effect, Msg, PollPhase, PollerState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: PollerState, msg: Msg) -> (PollerState, Vec<Effect>) {
    let effects = match msg {
        Msg::Watch(job_id) => {
            // Never overlap fetches for one job; the in-flight answer is as
            // fresh as a new one would be.
            if state.is_fetching(&job_id) {
                return (state, Vec::new());
            }
            state.begin_session(job_id.clone());
            let mut effects = vec![Effect::CancelTimer];
            if state.start_fetch(&job_id) {
                effects.push(Effect::FetchStatus { job_id });
            }
            effects
        }
        Msg::Refresh => match state.target().cloned() {
            Some(job_id) => return update(state, Msg::Watch(job_id)),
            None => Vec::new(),
        },
        Msg::Unwatch => {
            if state.target().is_none() && state.phase() == PollPhase::Idle {
                return (state, Vec::new());
            }
            state.end_session();
            vec![Effect::CancelTimer]
        }
        Msg::StatusFetched { job_id, result } => {
            if !state.finish_fetch(&job_id) {
                return (state, Vec::new());
            }
            match result {
                Ok(job) => {
                    let status = state.apply_snapshot(job);
                    if status.is_terminal() {
                        Vec::new()
                    } else {
                        vec![Effect::ScheduleFetch {
                            job_id,
                            session: state.session(),
                            delay: state.interval(),
                        }]
                    }
                }
                Err(message) => {
                    state.apply_error(message);
                    Vec::new()
                }
            }
        }
        Msg::TimerElapsed { job_id, session } => {
            let armed = match state.phase() {
                PollPhase::Settled(status) => !status.is_terminal(),
                _ => false,
            };
            if !armed || session != state.session() || state.target() != Some(&job_id) {
                return (state, Vec::new());
            }
            if state.start_fetch(&job_id) {
                vec![Effect::FetchStatus { job_id }]
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}
