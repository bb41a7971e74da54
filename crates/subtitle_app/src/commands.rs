use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use engine_logging::{engine_info, engine_warn};
use subtitle_core::{Artifact, Availability, JobId, PollPhase, PollerView};
use subtitle_engine::{
    AtomicFileWriter, BackendClient, Downloader, RegistryHandle, StatusPoller, SubmissionBus,
    Submitter,
};
use subtitle_proxy::ProxyConfig;
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Commands, DownloadArgs, JobArg, ProxyArgs, StatusArgs, SubmitArgs};
use crate::config::AppConfig;
use crate::render;

pub async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::from_args(&cli.global)?;
    match cli.command {
        Commands::Submit(args) => submit(&config, args).await,
        Commands::Status(args) => status(&config, args).await,
        Commands::Jobs => jobs(&config).await,
        Commands::Download(args) => download(&config, args).await,
        Commands::Delete(args) => delete(&config, args).await,
        Commands::Health => health(&config).await,
        Commands::Proxy(args) => proxy(&config, args).await,
    }
}

async fn submit(config: &AppConfig, args: SubmitArgs) -> Result<()> {
    let client = config.backend()?;
    let mut submitter = Submitter::new(
        client.clone(),
        SubmissionBus::default(),
        config.selection_limits(),
    );
    let receipt = submitter
        .submit_path(args.file.clone())
        .await
        .with_context(|| format!("could not submit {}", args.file.display()))?;
    println!("{}", render::receipt(&receipt));

    if args.follow {
        follow(config, client, receipt.job_id).await?;
    }
    Ok(())
}

async fn status(config: &AppConfig, args: StatusArgs) -> Result<()> {
    let client = config.backend()?;
    let job_id = JobId::new(args.job_id);
    if args.follow {
        return follow(config, client, job_id).await;
    }
    let job = client.status(&job_id).await?;
    println!("{}", render::job_line(&job_id, &job));
    Ok(())
}

/// Prints every change of the watched job until it settles or Ctrl-C.
async fn follow(config: &AppConfig, client: Arc<dyn BackendClient>, job_id: JobId) -> Result<()> {
    let poller = StatusPoller::spawn(client, config.poller_settings());
    let mut last_line = String::new();
    let view = tokio::select! {
        view = poller.follow(job_id.clone(), |view| {
            let line = render::poller_line(view);
            if line != last_line {
                println!("{line}");
                last_line = line;
            }
        }) => view,
        _ = tokio::signal::ctrl_c() => {
            engine_info!("stopped following job {}", job_id);
            return Ok(());
        }
    };
    outcome(&view)
}

fn outcome(view: &PollerView) -> Result<()> {
    match view.phase {
        PollPhase::Errored => Err(anyhow!(view
            .error
            .clone()
            .unwrap_or_else(|| "status check failed".to_string()))),
        PollPhase::Settled(status) if status.is_failure() => {
            let message = view
                .job
                .as_ref()
                .map(|job| job.message.as_str())
                .unwrap_or_default();
            bail!("job ended with status {status}: {message}")
        }
        _ => Ok(()),
    }
}

async fn jobs(config: &AppConfig) -> Result<()> {
    let registry = RegistryHandle::spawn(config.backend()?, &SubmissionBus::default());
    let view = registry.refreshed().await;
    println!("{}", render::registry_table(&view));
    match view.error {
        Some(error) if !view.loaded => Err(anyhow!(error)),
        _ => Ok(()),
    }
}

async fn download(config: &AppConfig, args: DownloadArgs) -> Result<()> {
    let client = config.backend()?;
    let downloader = Downloader::new(
        client.clone(),
        AtomicFileWriter::new(config.output_dir.clone()),
    );
    let job_id = JobId::new(args.job_id);

    if let Some(artifact) = args.artifact {
        let artifact: Artifact = artifact.into();
        let path = downloader.download_current(&job_id, artifact).await?;
        println!("Saved {artifact} to {}", path.display());
        return Ok(());
    }

    let job = client
        .status(&job_id)
        .await
        .with_context(|| format!("could not look up job {job_id}"))?;
    let artifacts = Availability::for_status(job.status).artifacts();
    if artifacts.is_empty() {
        bail!("nothing to download yet: job {job_id} is {}", job.status);
    }
    for artifact in artifacts {
        let path = downloader.download(&job_id, job.status, artifact).await?;
        println!("Saved {artifact} to {}", path.display());
    }
    Ok(())
}

async fn delete(config: &AppConfig, args: JobArg) -> Result<()> {
    let registry = RegistryHandle::spawn(config.backend()?, &SubmissionBus::default());
    let message = registry.remove(&JobId::new(args.job_id)).await?;
    println!("{message}");
    Ok(())
}

async fn health(config: &AppConfig) -> Result<()> {
    let report = config.backend()?.health().await?;
    println!("{}", render::health(&config.backend_url, &report));
    Ok(())
}

async fn proxy(config: &AppConfig, args: ProxyArgs) -> Result<()> {
    let proxy_config = ProxyConfig {
        listen: args.listen,
        backend_url: config.backend_url.clone(),
        max_body_bytes: usize::try_from(config.max_upload_bytes).unwrap_or(usize::MAX),
    };
    println!(
        "Forwarding http://{}{} to {}",
        proxy_config.listen,
        subtitle_proxy::API_PREFIX,
        proxy_config.backend_url
    );

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                engine_info!("shutdown requested");
                trigger.cancel();
            }
            Err(err) => engine_warn!("cannot listen for Ctrl-C: {}", err),
        }
    });

    subtitle_proxy::serve(proxy_config, shutdown)
        .await
        .context("proxy stopped with an error")
}
