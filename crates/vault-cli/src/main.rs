//! Product Vault CLI: upload product images and page through the catalog.
//!
//! Reads VAULT_API_URL (or API_URL) and the other VAULT_* settings from the
//! environment or a `.env` file.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use vault_api_client::ApiClient;
use vault_cli::{
    browse, ensure_uploaded, init_tracing, print_add_report, print_json, print_page_table,
    print_submit_result,
};
use vault_core::{ClientConfig, PendingFile, SortDirection};
use vault_sync::{Gallery, UploadHooks, UploadOptions, UploadOrchestrator};

#[derive(Parser)]
#[command(name = "vault", about = "Product Vault catalog CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload image files as one batch
    Upload {
        /// Paths of the files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List one page of products
    List {
        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: u32,
        /// Products per page (default: VAULT_PAGE_SIZE)
        #[arg(long)]
        page_size: Option<u32>,
        /// Sort field (default: VAULT_SORT_BY)
        #[arg(long)]
        sort_by: Option<String>,
        /// Sort direction: asc or desc (default: VAULT_SORT_DIRECTION)
        #[arg(long)]
        sort_dir: Option<String>,
        /// Output format: json or table
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Interactive gallery: browse pages and upload from one session
    Browse,
}

fn progress_hooks() -> UploadHooks {
    UploadHooks::new().on_progress(|percent| {
        eprint!("\rUploading {}%", percent);
        if percent == 100 {
            eprintln!();
        }
        let _ = std::io::stderr().flush();
    })
}

async fn upload(client: ApiClient, config: &ClientConfig, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let file = PendingFile::from_path(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(file);
    }

    let uploads = UploadOrchestrator::with_hooks(
        Arc::new(client),
        UploadOptions::from_config(config),
        progress_hooks(),
    );
    let report = uploads.add_files(files);
    print_add_report(&report);

    let result = uploads.submit().await;
    print_submit_result(&result, &uploads.snapshot());
    ensure_uploaded(&result)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ClientConfig::from_env().context("Failed to load configuration")?;
    config.validate()?;
    let client = ApiClient::from_config(&config).context("Failed to create API client")?;
    tracing::debug!(api_url = %client.base_url(), "Using catalog API");

    let cli = Cli::parse();

    match cli.command {
        Commands::Upload { files } => upload(client, &config, files).await?,
        Commands::List {
            page,
            page_size,
            sort_by,
            sort_dir,
            format,
        } => {
            let mut key = config.initial_page_key();
            key.page_number = page.saturating_sub(1);
            if let Some(size) = page_size.filter(|s| *s > 0) {
                key.page_size = size;
            }
            if let Some(sort_by) = sort_by {
                key.sort_by = sort_by;
            }
            if let Some(dir) = sort_dir {
                key.sort_direction = dir.parse::<SortDirection>().unwrap_or_default();
            }

            let result = client.list_products(&key).await?;
            match format.as_str() {
                "json" => print_json(&result)?,
                _ => print_page_table(&result, &key),
            }
        }
        Commands::Browse => {
            let gallery = Gallery::from_config(Arc::new(client), &config, progress_hooks());
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            browse::run(&gallery, stdin).await?;
        }
    }

    Ok(())
}
