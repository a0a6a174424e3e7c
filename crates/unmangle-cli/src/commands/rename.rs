//! `unmangle rename` command.

use clap::Args;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::PathBuf;
use unmangle_core::{JobConfig, ProgressSender, ProviderKind, RenameJob};

#[derive(Args, Debug)]
pub struct RenameArgs {
    /// JavaScript file to rename
    pub file: PathBuf,

    /// Write output here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// LLM backend ("openai" or "local")
    #[arg(long, default_value = "openai")]
    pub provider: String,

    /// Model name
    #[arg(long, default_value = "gpt-4o-mini")]
    pub model: String,

    /// Override the provider endpoint base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Maximum concurrent provider calls
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Model context window in tokens (required for --provider local)
    #[arg(long)]
    pub context_window: Option<usize>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f64>,
}

pub async fn run(args: RenameArgs) -> Result<()> {
    let source = std::fs::read_to_string(&args.file)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", args.file.display()))?;

    let provider: ProviderKind = args.provider.parse().into_diagnostic()?;
    let mut config = JobConfig::default()
        .with_provider(provider)
        .with_model(args.model);
    if let Some(base_url) = args.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(context_window) = args.context_window {
        config = config.with_context_window(context_window);
    }
    if let Some(temperature) = args.temperature {
        config = config.with_temperature(temperature);
    }

    let (progress, mut rx) = ProgressSender::channel();
    let reporter = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            tracing::info!(
                job_id = %event.job_id,
                kind = ?event.kind,
                pct = event.percentage,
                "{}",
                event.current_step
            );
        }
    });

    let mut job = RenameJob::new(config).with_progress(progress);
    let result = job.run(&source).await;
    drop(job); // closes the progress channel
    let _ = reporter.await;

    let output = result.into_diagnostic()?;

    for warning in &output.warnings {
        tracing::warn!(chunk = warning.chunk_index, "{}", warning.message);
    }
    tracing::info!(
        chunks = output.stats.chunk_count,
        renames = output.stats.rename_count,
        requests = output.stats.requests,
        tokens = output.stats.total_tokens,
        failed_chunks = output.stats.failed_chunks,
        "rename finished"
    );

    match &args.output {
        Some(path) => {
            std::fs::write(path, output.code)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote renamed source");
        }
        None => {
            print!("{}", output.code);
        }
    }

    Ok(())
}
