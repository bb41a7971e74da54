use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use subtitle_core::Artifact;

use crate::logging::LogDestination;

/// Submit videos for automatic subtitling and track the jobs.
#[derive(Parser, Debug)]
#[command(name = "subtitle-tracker", version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Processing backend, or a proxy's `/api` prefix
    #[arg(
        long,
        global = true,
        env = "SUBTITLE_BACKEND_URL",
        default_value = "http://127.0.0.1:5000"
    )]
    pub backend_url: String,

    /// Delay between status checks while a job is in progress
    #[arg(long, global = true, env = "SUBTITLE_POLL_INTERVAL_MS", default_value_t = 2000)]
    pub poll_interval_ms: u64,

    /// Where downloaded videos and subtitles are written
    #[arg(long, global = true, env = "SUBTITLE_OUTPUT_DIR", default_value = "./downloads")]
    pub output_dir: PathBuf,

    /// Largest video accepted for upload, in megabytes
    #[arg(long, global = true, env = "SUBTITLE_MAX_UPLOAD_MB", default_value_t = 500)]
    pub max_upload_mb: u64,

    /// off, error, warn, info, debug or trace
    #[arg(
        long,
        global = true,
        env = "SUBTITLE_LOG_LEVEL",
        default_value = "warn",
        value_parser = parse_log_level
    )]
    pub log_level: LevelFilter,

    #[arg(long, global = true, value_enum, default_value = "terminal")]
    pub log_to: LogDestination,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a video and print the assigned job id
    Submit(SubmitArgs),

    /// Show the status of one job
    Status(StatusArgs),

    /// List all jobs, newest first
    Jobs,

    /// Save a job's subtitled video and/or SRT file
    Download(DownloadArgs),

    /// Delete a job record on the backend
    Delete(JobArg),

    /// Check that the backend is up
    Health,

    /// Serve the backend under /api on a local address
    Proxy(ProxyArgs),
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Video file (mp4, avi, mov, mkv, wmv, flv or webm)
    pub file: PathBuf,

    /// Keep polling until the job finishes
    #[arg(long)]
    pub follow: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    pub job_id: String,

    /// Keep polling until the job finishes
    #[arg(long)]
    pub follow: bool,
}

#[derive(Args, Debug)]
pub struct JobArg {
    pub job_id: String,
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    pub job_id: String,

    /// Only this artifact; default is everything the job's status allows
    #[arg(long, value_enum)]
    pub artifact: Option<ArtifactArg>,
}

#[derive(Args, Debug)]
pub struct ProxyArgs {
    #[arg(long, env = "SUBTITLE_PROXY_ADDR", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArtifactArg {
    Video,
    Subtitles,
}

impl From<ArtifactArg> for Artifact {
    fn from(arg: ArtifactArg) -> Self {
        match arg {
            ArtifactArg::Video => Artifact::Video,
            ArtifactArg::Subtitles => Artifact::Subtitles,
        }
    }
}

fn parse_log_level(raw: &str) -> Result<LevelFilter, String> {
    engine_logging::parse_level(raw).ok_or_else(|| format!("unknown log level `{raw}`"))
}
