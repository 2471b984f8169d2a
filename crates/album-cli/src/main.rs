//! Album CLI: validate, convert and upload pictures to the album API.
//!
//! Configuration comes from the environment (or a `.env` file): ALBUM_API_URL,
//! TOKEN_STORE_PATH, MAX_FILE_SIZE_BYTES, HEIC_TARGET_TYPE and friends.

use std::path::PathBuf;
use std::sync::Arc;

use album_api_client::ApiClient;
use album_cli::{
    conversion_report, file_labels, ingest_failure_report, ingest_report, init_tracing,
    load_entries, validation_report, write_candidates,
};
use album_core::IngestConfig;
use album_processing::{AlbumTarget, FileValidator, HeicConverter, IngestPipeline};
use album_storage::PresignedPutUploader;
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "album", about = "Album picture ingestion CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate files without uploading them
    Validate {
        /// Files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Convert HEIC/HEIF files to the configured target type
    Convert {
        /// Files to convert; non-HEIC files are ignored
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Directory receiving the converted files
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Validate, convert and upload files into a new or existing album
    Upload {
        /// Title of a new album
        #[arg(long, conflicts_with = "album_id", required_unless_present = "album_id")]
        title: Option<String>,
        /// Identifier of an existing album to append to
        #[arg(long)]
        album_id: Option<String>,
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Store a refresh token and check it against the API
    Login {
        #[arg(long)]
        refresh_token: String,
    },
    /// Forget stored credentials
    Logout,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = IngestConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Validate { files } => {
            let entries = load_entries(&files).await;
            let validator = FileValidator::new(config.validation.clone());
            let summary = validator.validate_entries(&entries, |progress| {
                tracing::info!(
                    current = progress.current,
                    total = progress.total,
                    file = progress.result.file_name.as_deref().unwrap_or(""),
                    verdict = ?progress.result.verdict,
                    "Validated"
                );
            });
            print_json(&validation_report(&summary, &file_labels(&files)))?;
        }
        Commands::Convert { files, out_dir } => {
            let candidates = load_entries(&files)
                .await
                .into_iter()
                .flatten()
                .filter(|c| c.is_heic())
                .collect::<Vec<_>>();
            let converter = HeicConverter::new(config.conversion.clone());
            let outcome = converter.convert_batch(candidates).await;
            let written = write_candidates(&out_dir, &outcome.processed).await?;
            print_json(&conversion_report(&outcome, &written))?;
        }
        Commands::Upload {
            title,
            album_id,
            files,
        } => {
            let target = match (title, album_id) {
                (_, Some(album_id)) => AlbumTarget::append(album_id),
                (Some(title), None) => AlbumTarget::create(title),
                (None, None) => anyhow::bail!("Either --title or --album-id is required"),
            };

            let entries = load_entries(&files).await;
            let labels = file_labels(&files);
            let client = ApiClient::from_config(&config.client)
                .context("Failed to create API client")?;
            let uploader = PresignedPutUploader::new(config.client.timeout)
                .context("Failed to create object uploader")?;
            let pipeline =
                IngestPipeline::from_config(&config, Arc::new(client), Arc::new(uploader));

            let result = pipeline
                .run(&target, entries, |progress| {
                    tracing::info!(
                        current = progress.current,
                        total = progress.total,
                        verdict = ?progress.result.verdict,
                        "Validated"
                    );
                })
                .await;
            match result {
                Ok(report) => print_json(&ingest_report(&report, &labels))?,
                Err(e) => {
                    print_json(&ingest_failure_report(&e, &labels))?;
                    anyhow::bail!(e.source.detailed_message());
                }
            }
        }
        Commands::Login { refresh_token } => {
            let client = ApiClient::from_config(&config.client)
                .context("Failed to create API client")?;
            let auth = client.auth();
            auth.set_tokens(None, Some(refresh_token));
            if auth.refresh_access_token().await.is_none() {
                anyhow::bail!("Refresh token was rejected by the API");
            }
            print_json(&serde_json::json!({
                "logged_in": true,
                "token_store": config.client.token_store_path.display().to_string(),
            }))?;
        }
        Commands::Logout => {
            let client = ApiClient::from_config(&config.client)
                .context("Failed to create API client")?;
            client.auth().logout();
            print_json(&serde_json::json!({ "logged_out": true }))?;
        }
    }

    Ok(())
}
