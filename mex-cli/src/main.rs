//! mex-resolve
//!
//! Resolves the complete metadata graph of one or more services and writes
//! the flattened document set to a directory or prints a JSON report.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use mex::config::ResolverConfig;
use mex::{Document, DocumentKind, DocumentSet, MetadataExchangeClient, Seed};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Send a metadata get-request to each address
    Mex,
    /// Fetch each URL with a plain HTTP GET
    HttpGet,
}

#[derive(Parser, Debug)]
#[command(name = "mex-resolve")]
#[command(about = "Resolve the complete metadata document set of a service")]
struct Args {
    /// Seed addresses or locations
    #[arg(required = true)]
    urls: Vec<String>,

    #[arg(long, value_enum, default_value_t = Mode::Mex)]
    mode: Mode,

    /// TOML resolver configuration
    #[arg(long, env = "MEX_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Maximum number of distinct documents to fetch
    #[arg(long)]
    max_references: Option<usize>,

    /// Return pointer documents instead of following them
    #[arg(long)]
    no_nested: bool,

    /// Budget for the whole call, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Intermediary the get-requests are sent through (mex mode only)
    #[arg(long)]
    via: Option<String>,

    /// Write each resolved document into this directory
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Print a JSON report on stdout
    #[arg(long)]
    json: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn resolver_config(&self) -> anyhow::Result<ResolverConfig> {
        let mut config = match &self.config {
            Some(path) => ResolverConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ResolverConfig::default(),
        };
        if let Some(max) = self.max_references {
            config.max_resolved_references = max;
        }
        if self.no_nested {
            config.resolve_nested = false;
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = ms;
        }
        config.validate()?;
        Ok(config)
    }

    fn seeds(&self) -> anyhow::Result<Vec<Seed>> {
        if self.via.is_some() && self.mode == Mode::HttpGet {
            bail!("--via only applies to --mode mex");
        }
        Ok(self
            .urls
            .iter()
            .map(|url| match (self.mode, &self.via) {
                (Mode::Mex, Some(via)) => Seed::reference_via(url, via),
                (Mode::Mex, None) => Seed::reference(url),
                (Mode::HttpGet, _) => Seed::location(url),
            })
            .collect())
    }
}

#[derive(Serialize)]
struct Report<'a> {
    seeds: &'a [String],
    elapsed_ms: u128,
    count: usize,
    documents: &'a DocumentSet,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.resolver_config()?;
    let seeds = args.seeds()?;
    info!(
        "Resolving {} seed(s), limit {} references, timeout {:?}",
        seeds.len(),
        config.max_resolved_references,
        Duration::from_millis(config.timeout_ms)
    );

    let client = MetadataExchangeClient::new(config)?;
    let started = std::time::Instant::now();
    let documents = client.resolve(seeds).await?;
    let elapsed = started.elapsed();
    info!("Resolved {} documents in {:?}", documents.len(), elapsed);

    if let Some(dir) = &args.out_dir {
        let written = write_documents(dir, &documents)?;
        info!("Wrote {} files to {}", written, dir.display());
    }

    if args.json {
        let report = Report {
            seeds: &args.urls,
            elapsed_ms: elapsed.as_millis(),
            count: documents.len(),
            documents: &documents,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if args.out_dir.is_none() {
        for document in &documents {
            println!("{}", summary_line(document));
        }
    }

    Ok(())
}

fn summary_line(document: &Document) -> String {
    let target = match &document.body {
        mex::DocumentBody::ReferencePointer { address } => address.as_str(),
        mex::DocumentBody::LocationPointer { location } => location.as_str(),
        _ => document.identifier.as_deref().unwrap_or("-"),
    };
    format!(
        "{:<10} {:<40} {}",
        document.kind(),
        target,
        document.source_location.as_deref().unwrap_or("-")
    )
}

fn file_name(index: usize, kind: DocumentKind) -> String {
    let (stem, extension) = match kind {
        DocumentKind::InterfaceDescription => ("interface", "wsdl"),
        DocumentKind::Schema => ("schema", "xsd"),
        _ => ("document", "xml"),
    };
    format!("{:03}-{}.{}", index, stem, extension)
}

/// Documents without raw text (unresolved pointers) are skipped
fn write_documents(dir: &Path, documents: &DocumentSet) -> anyhow::Result<usize> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut written = 0;
    for document in documents {
        let Some(raw) = document.raw() else {
            warn!(
                "Not writing {} document from {}",
                document.kind(),
                document.source_location.as_deref().unwrap_or("-")
            );
            continue;
        };
        let path = dir.join(file_name(written, document.kind()));
        std::fs::write(&path, raw).with_context(|| format!("writing {}", path.display()))?;
        written += 1;
    }
    Ok(written)
}
