mod config;
mod dry_run;
mod error;
mod fs;
mod publish;
mod s3;

use anyhow::{Context, Result};
use aws_sdk_s3::types::ObjectCannedAcl;
use clap::Parser;
use console::style;
use std::path::PathBuf;
use tracing::{error, info};

use config::{Config, Credentials, DEFAULT_REGION};
use dry_run::DryRunUploader;
use fs::LocalFs;
use publish::{PublishSummary, Uploader, publish};
use s3::{APP_VERSION_TAG, S3Uploader, Tags, build_client, parse_metadata};

#[derive(Parser, Debug)]
#[command(
    name = "s3publish",
    version = env!("CARGO_PKG_VERSION"),
    about = "Publish a directory of static files to an S3-compatible bucket",
    long_about = "Walks a directory and uploads every file to an S3-compatible bucket with a public-read ACL. \
                  Object keys mirror the relative file paths and content types are inferred from file extensions. \
                  Every run re-uploads every file.",
    after_help = "Examples:\n  \
                  s3publish --bucket my-site                          # Publish the current directory\n  \
                  s3publish ./dist --bucket my-site --app-version 1.2.0\n  \
                  s3publish --bucket assets --endpoint http://localhost:9000 --path-style\n\n\
                  Credentials (environment or .env):\n  \
                  AWS_ACCESS_KEY_ID=...\n  \
                  AWS_SECRET_ACCESS_KEY=..."
)]
struct Cli {
    /// Directory to publish
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Bucket name
    #[arg(long, env = "S3_BUCKET")]
    bucket: String,

    /// Custom S3-compatible endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// AWS region
    #[arg(long, default_value = DEFAULT_REGION)]
    region: String,

    /// Application version to tag files with
    #[arg(long)]
    app_version: Option<String>,

    /// Key prefix for every uploaded object
    #[arg(long)]
    prefix: Option<String>,

    /// Extra metadata (key=value pairs, comma-separated)
    #[arg(long)]
    metadata: Option<String>,

    /// Use path-style bucket addressing (needed by most self-hosted stores)
    #[arg(long)]
    path_style: bool,

    /// Log what would be uploaded without uploading
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file early to get LOG_LEVEL and credentials
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL")
        .ok()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    info!("S3 Publish v{}", env!("CARGO_PKG_VERSION"));

    let credentials = Credentials::from_env().inspect_err(|e| error!("{}", e))?;
    let config = Config::new(
        cli.bucket,
        cli.region,
        cli.endpoint,
        cli.prefix,
        cli.path_style,
        credentials,
    )
    .context("Invalid configuration")?;

    let extra = cli
        .metadata
        .as_deref()
        .map(parse_metadata)
        .unwrap_or_default();
    let tags = Tags::for_release(cli.app_version.as_deref(), extra);
    if let Some(version) = tags.get(APP_VERSION_TAG) {
        info!("Tagging objects with app version {}", version);
    }

    let fs = LocalFs::new(cli.root);

    println!(
        "{}",
        style(format!(
            "📦 {} → s3://{}/{}",
            fs.root().display(),
            config.bucket,
            config.prefix.as_deref().unwrap_or_default()
        ))
        .cyan()
        .bold()
    );

    let uploader: Box<dyn Uploader> = if cli.dry_run {
        println!(
            "{}",
            style("🔍 DRY RUN MODE - No files will be uploaded")
                .yellow()
                .bold()
        );
        Box::new(DryRunUploader::new(&config.bucket, config.prefix.clone()))
    } else {
        let client = build_client(&config).await;
        Box::new(
            S3Uploader::new(client, &config.bucket, ObjectCannedAcl::PublicRead, tags)
                .with_prefix(config.prefix.clone()),
        )
    };

    match publish(&fs, uploader.as_ref()).await {
        Ok(summary) => {
            print_summary(&summary, cli.dry_run);
            Ok(())
        }
        Err(e) => {
            match e.path() {
                Some(path) => error!("Upload failed at {}: {}", path, e),
                None => error!("Upload failed: {}", e),
            }
            println!(
                "{} {}",
                style("✗").red(),
                style("Upload aborted; files uploaded before the failure remain in the bucket")
                    .red()
            );
            Err(e).context("Upload failed")
        }
    }
}

fn print_summary(summary: &PublishSummary, dry_run: bool) {
    let (count, verb) = if dry_run {
        (summary.rehearsed, "would be uploaded")
    } else {
        (summary.uploaded, "uploaded")
    };

    println!("\n{}", style("═".repeat(70)).dim());
    println!(
        "{}",
        style(format!(
            "Summary: {} file(s) {}, {} director(ies) walked",
            count, verb, summary.directories
        ))
        .bold()
    );
    println!(
        "{}",
        style(format!("Time: {:.2}s", summary.elapsed.as_secs_f64())).dim()
    );
}
