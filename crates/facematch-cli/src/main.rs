use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use reqwest::StatusCode;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "facematch", about = "Face comparison service client")]
struct Cli {
    /// Base URL of the facematchd server
    #[arg(long, global = true, default_value = "http://localhost:5000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the faces in two image files
    Compare {
        /// First image file
        image1: PathBuf,
        /// Second image file
        image2: PathBuf,
        /// Match tolerance in [0.3, 1.0]; out-of-range values fall back
        /// to the server default
        #[arg(short, long)]
        tolerance: Option<f64>,
        /// Upload the files as multipart form data instead of base64 JSON
        #[arg(long)]
        multipart: bool,
    },
    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Compare {
            image1,
            image2,
            tolerance,
            multipart,
        } => {
            let (status, body) = if multipart {
                compare_files(&client, &cli.server, &image1, &image2, tolerance).await?
            } else {
                compare_base64(&client, &cli.server, &image1, &image2, tolerance).await?
            };

            println!("{body:#}");
            if !status.is_success() {
                anyhow::bail!("server returned {status}");
            }
            if let Some(error) = body.get("error").and_then(Value::as_str) {
                anyhow::bail!("{error}");
            }
            if let Some(same_person) = body.get("same_person").and_then(Value::as_bool) {
                let confidence = body.get("confidence").and_then(Value::as_f64).unwrap_or(0.0);
                if same_person {
                    println!("same person (confidence {confidence}%)");
                } else {
                    println!("different people (confidence {confidence}%)");
                }
            }
        }
        Commands::Health => {
            let url = format!("{}/health", cli.server);
            let response = client
                .get(&url)
                .send()
                .await
                .with_context(|| format!("requesting {url}"))?;
            let status = response.status();
            let body: Value = response.json().await.context("reading health response")?;

            println!("{body:#}");
            if !status.is_success() {
                anyhow::bail!("server returned {status}");
            }
        }
    }

    Ok(())
}

/// POST /compare with both images as base64 JSON fields.
async fn compare_base64(
    client: &reqwest::Client,
    server: &str,
    image1: &Path,
    image2: &Path,
    tolerance: Option<f64>,
) -> Result<(StatusCode, Value)> {
    let mut payload = serde_json::json!({
        "image1": read_base64(image1)?,
        "image2": read_base64(image2)?,
    });
    if let Some(tolerance) = tolerance {
        payload["tolerance"] = tolerance.into();
    }

    let url = format!("{server}/compare");
    let response = client
        .post(&url)
        .json(&payload)
        .send()
        .await
        .with_context(|| format!("requesting {url}"))?;
    let status = response.status();
    let body = response.json().await.context("reading comparison response")?;
    Ok((status, body))
}

/// POST /compare-files with both images as multipart file uploads.
async fn compare_files(
    client: &reqwest::Client,
    server: &str,
    image1: &Path,
    image2: &Path,
    tolerance: Option<f64>,
) -> Result<(StatusCode, Value)> {
    let mut form = reqwest::multipart::Form::new()
        .part("image1", file_part(image1)?)
        .part("image2", file_part(image2)?);
    if let Some(tolerance) = tolerance {
        form = form.text("tolerance", tolerance.to_string());
    }

    let url = format!("{server}/compare-files");
    let response = client
        .post(&url)
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("requesting {url}"))?;
    let status = response.status();
    let body = response.json().await.context("reading comparison response")?;
    Ok((status, body))
}

fn read_base64(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(BASE64.encode(bytes))
}

fn file_part(path: &Path) -> Result<reqwest::multipart::Part> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    Ok(reqwest::multipart::Part::bytes(bytes).file_name(name))
}
