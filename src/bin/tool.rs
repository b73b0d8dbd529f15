//! mre-sync-tool
//!
//! Diagnostics for the sync core: derive user ids, locate manifests, decode
//! physics snapshots and print the effective configuration.
//!
//! ## Configuration (env / file via `config` crate)
//!
//! | Key / Env                    | Default | Description                       |
//! |------------------------------|---------|-----------------------------------|
//! | `--config` / `MRE_CONFIG`    | unset   | Config file layered over defaults |
//! | `MRE_<SECTION>__<FIELD>`     |         | Per-field override                |

use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use mre_sync::connection::{manifest_url, permission_origin};
use mre_sync::physics::decode_transforms;
use mre_sync::{obfuscate_user_id, MreConfig};
use url::Url;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "mre-sync-tool", about = "MRE sync core diagnostics", version)]
struct Args {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(long, env = "MRE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the obfuscated user id for a host user under a salt
    UserId {
        #[arg(long)]
        host_user_id: String,
        /// App id (ephemeral or global) used as salt
        #[arg(long)]
        salt: String,
    },

    /// Print the manifest URL and permission origin for an app URL
    ManifestUrl { url: String },

    /// Decode a binary snapshot file and print its bodies as JSON
    DecodeSnapshot {
        file: PathBuf,
        /// File holds base64 text rather than raw bytes
        #[arg(long)]
        base64: bool,
    },

    /// Print the effective layered configuration
    Config,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mre_sync=info".parse()?),
        )
        .init();

    let args = Args::parse();
    tracing::debug!("{:?}", args);

    match args.command {
        Command::UserId { host_user_id, salt } => {
            println!("{}", obfuscate_user_id(&host_user_id, &salt));
        }
        Command::ManifestUrl { url } => {
            let url = Url::parse(&url).with_context(|| format!("Invalid app URL '{url}'"))?;
            let manifest = manifest_url(&url)?;
            println!("manifest: {manifest}");
            println!("origin:   {}", permission_origin(&url));
        }
        Command::DecodeSnapshot { file, base64 } => {
            let raw = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let bytes = if base64 {
                let text = String::from_utf8(raw).context("Snapshot file is not UTF-8")?;
                STANDARD
                    .decode(text.trim())
                    .context("Snapshot file is not valid base64")?
            } else {
                raw
            };
            let bodies = decode_transforms(&bytes).context("Failed to decode snapshot")?;
            tracing::info!("Decoded {} bodies", bodies.len());
            println!("{}", serde_json::to_string_pretty(&bodies)?);
        }
        Command::Config => {
            let cfg = MreConfig::load(args.config.as_deref())
                .context("Failed to load configuration")?;
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
    }
    Ok(())
}
