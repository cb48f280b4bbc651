#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::style)]

use std::path::Path;

use anyhow::{Context, bail};
use clap::Parser;
use sharelink::cli::Args;
use sharelink::settings::expand_tilde;
use sharelink::{Settings, ShareLink, get_version, parse_link_list_lossy};
use tokio::io::AsyncWriteExt;
use tracing::Level;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let is_verbose = args.verbose;
    tracing_subscriber::fmt()
        .with_max_level(if is_verbose {
            Level::TRACE
        } else {
            Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        tracing::error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    tracing::debug!("sharelink {}", get_version());

    let settings = match &args.settings {
        Some(path) => {
            tracing::info!("Loading settings from: {}", path);
            Settings::load(path).await?
        }
        None => Settings::default(),
    };

    let mut share_link = ShareLink::with_settings(settings);

    if let Some(input) = &args.input {
        let expanded = expand_tilde(input);
        let content = tokio::fs::read_to_string(&expanded)
            .await
            .with_context(|| format!("Failed to read links from {expanded:?}"))?;

        let descriptors = parse_link_list_lossy(&content);
        tracing::info!("Parsed {} links from {}", descriptors.len(), input);

        let Some(descriptor) = descriptors.into_iter().nth(args.index) else {
            bail!("No parsed link at index {}", args.index);
        };
        share_link.set_descriptor(descriptor);
    } else if let Some(link) = &args.link {
        share_link.parse(link).context("Failed to parse share link")?;
    }

    tracing::info!(
        "Using {} server {}:{} '{}'",
        share_link
            .descriptor()
            .map_or("unknown", |d| d.protocol().as_str()),
        share_link.address(),
        share_link.port(),
        share_link.remark()
    );

    if let Some(config) = share_link.full_configuration() {
        config.validate().context("Assembled config failed validation")?;
    }

    let json = if args.outbound_only {
        share_link.outbound_json(args.indent)?
    } else {
        share_link.json(args.indent)?
    };

    match &args.output {
        Some(output) => {
            let expanded = expand_tilde(output);
            let path = Path::new(&expanded);
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create output directory {parent:?}"))?;
            }
            tokio::fs::write(path, json.as_bytes())
                .await
                .with_context(|| format!("Failed to write config to {path:?}"))?;
            tracing::info!("Config written to {}", expanded);
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(json.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}
