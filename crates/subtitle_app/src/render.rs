use subtitle_core::{Availability, Job, JobId, JobRowView, PollPhase, PollerView, RegistryView};
use subtitle_engine::{HealthReport, SubmitReceipt};

pub fn receipt(receipt: &SubmitReceipt) -> String {
    match &receipt.message {
        Some(message) if !message.is_empty() => {
            format!("Submitted job {}: {}", receipt.job_id, message)
        }
        _ => format!("Submitted job {}", receipt.job_id),
    }
}

/// One line per job, as shown by `status`.
pub fn job_line(job_id: &JobId, job: &Job) -> String {
    let mut line = format!("[{job_id}] {}", job.status);
    if let Some(progress) = job.visible_progress() {
        line.push_str(&format!(" {progress:.0}%"));
    }
    if !job.message.is_empty() {
        line.push_str(&format!(" - {}", job.message));
    }
    let downloads = downloads_label(Availability::for_status(job.status));
    if !downloads.is_empty() {
        line.push_str(&format!(" (ready: {downloads})"));
    }
    line
}

pub fn poller_line(view: &PollerView) -> String {
    let Some(job_id) = &view.job_id else {
        return "Not watching any job".to_string();
    };
    match (&view.phase, &view.job) {
        (PollPhase::Errored, _) => format!(
            "[{job_id}] error: {}",
            view.error.as_deref().unwrap_or("status check failed")
        ),
        (_, Some(job)) => job_line(job_id, job),
        (PollPhase::Fetching, None) => format!("[{job_id}] checking status..."),
        (_, None) => format!("[{job_id}] no status yet"),
    }
}

pub fn registry_table(view: &RegistryView) -> String {
    let mut out = String::new();
    if let Some(error) = &view.error {
        out.push_str(&format!("Could not refresh job list: {error}\n"));
    }
    if view.jobs.is_empty() {
        out.push_str(if view.loaded {
            "No jobs yet."
        } else {
            "Job list not loaded."
        });
        return out;
    }

    let id_width = column_width(view.jobs.iter().map(|row| row.job_id.as_str()), "JOB");
    let status_width = column_width(view.jobs.iter().map(|row| row.status.as_str()), "STATUS");
    let uploaded_width = column_width(
        view.jobs.iter().map(|row| row.uploaded_at.as_str()),
        "UPLOADED",
    );
    out.push_str(&format!(
        "{:<id_width$}  {:<status_width$}  {:<uploaded_width$}  FILE",
        "JOB", "STATUS", "UPLOADED"
    ));
    for row in &view.jobs {
        out.push('\n');
        out.push_str(&format!(
            "{:<id_width$}  {:<status_width$}  {:<uploaded_width$}  {}",
            row.job_id.as_str(),
            row.status.as_str(),
            row.uploaded_at,
            row_detail(row)
        ));
    }
    out
}

pub fn health(backend_url: &str, report: &HealthReport) -> String {
    match &report.version {
        Some(version) => format!("{backend_url}: {} (version {version})", report.status),
        None => format!("{backend_url}: {}", report.status),
    }
}

fn row_detail(row: &JobRowView) -> String {
    let mut detail = row.filename.clone();
    if let Some(progress) = row.progress {
        detail.push_str(&format!(" {progress:.0}%"));
    }
    if row.status.is_failure() && !row.message.is_empty() {
        detail.push_str(&format!(" ({})", row.message));
    }
    detail
}

fn downloads_label(availability: Availability) -> String {
    availability
        .artifacts()
        .iter()
        .map(|artifact| artifact.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>, header: &str) -> usize {
    values.map(str::len).max().unwrap_or(0).max(header.len())
}
