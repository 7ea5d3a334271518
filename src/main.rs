use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use dnsmux::common::error::DnsErrorKind;
use dnsmux::config::{self, Config};
use dnsmux::dns::{AnyRecordType, QueryOptions};

/// Resolve domain names through the configured DNS backends
#[derive(Parser, Debug)]
#[command(name = "dnsmux", version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Record type to query (A, AAAA, CNAME, TXT or numeric code); repeatable
    #[arg(short = 't', long = "type")]
    types: Vec<AnyRecordType>,

    /// Skip the answer cache
    #[arg(long)]
    no_cache: bool,

    /// Print record types as labels instead of numeric codes
    #[arg(long)]
    labels: bool,

    #[arg(required = true)]
    domains: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let client = config::build_client(&config)?;
    info!(tlds = client.registry().tlds().count(), "dnsmux ready");

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, cancelling in-flight queries");
            ctrl_c.cancel();
        }
    });

    let mut failed = false;
    for domain in &cli.domains {
        let mut options = QueryOptions::new()
            .with_types(cli.types.iter().copied())
            .with_signal(token.clone());
        if cli.no_cache {
            options = options.uncached();
        }
        if cli.labels {
            options = options.with_record_type_value(false);
        }

        match client.query(domain, options).await {
            Ok(response) => {
                for answer in &response.answers {
                    let ttl = answer.ttl.map(|t| t.to_string()).unwrap_or_default();
                    println!("{}\t{}\t{}\t{}", answer.name, answer.record_type, ttl, answer.data);
                }
            }
            Err(e) => {
                error!(domain = domain.as_str(), error = %e, "lookup failed");
                if e.kind() == DnsErrorKind::AllBackendsFailed {
                    for cause in e.errors() {
                        error!(domain = domain.as_str(), "  caused by: {}", cause);
                    }
                }
                failed = true;
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
