use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use logdup::{build_engine, parse_specs, DedupEngine, LogEntry, LogdupConfig};

#[derive(Parser)]
#[command(name = "logdup")]
#[command(about = "Near-duplicate detection for log lines")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// YAML config file; defaults plus LOGDUP_* overrides when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest an NDJSON file of log entries
    Ingest {
        file: PathBuf,

        #[arg(long, default_value = "64")]
        batch_size: usize,
    },
    /// Nearest stored entries to a line of text
    Search {
        text: String,

        /// Filter spec, a JSON object or array of objects
        #[arg(long)]
        filter: Option<String>,

        #[arg(long, default_value = "5")]
        top_k: usize,
    },
    /// List stored entries
    Scroll {
        #[arg(long)]
        filter: Option<String>,

        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show the lookup row for an entry id
    Lookup { id: String },
    /// Compute second-nearest-neighbour edges for unsynced entries
    Relink {
        /// Flag the scanned entries as relinked
        #[arg(long)]
        mark: bool,
    },
    /// Drop and recreate the collection and lookup table
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => LogdupConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => LogdupConfig::from_env().context("loading default config")?,
    };
    init_tracing(&config);

    let engine = build_engine(&config).context("starting dedup engine")?;
    match cli.command {
        Commands::Ingest { file, batch_size } => ingest_file(&engine, &file, batch_size),
        Commands::Search {
            text,
            filter,
            top_k,
        } => {
            let filters = parse_filters(filter.as_deref())?;
            for hit in engine.search(&text, &filters, top_k)? {
                println!("{}", serde_json::to_string(&hit)?);
            }
            Ok(())
        }
        Commands::Scroll { filter, limit } => {
            let filters = parse_filters(filter.as_deref())?;
            for point in engine.scroll(&filters, limit)? {
                println!("{}", serde_json::to_string(&point)?);
            }
            Ok(())
        }
        Commands::Lookup { id } => {
            match engine.find_near_occurrences(&id)? {
                Some(record) => println!("{}", serde_json::to_string(&record)?),
                None => bail!("no lookup row for {id}"),
            }
            Ok(())
        }
        Commands::Relink { mark } => {
            let edges = engine.relink()?;
            for edge in &edges {
                println!("{}", serde_json::to_string(edge)?);
            }
            if mark {
                let marked = engine.mark_relinked(&edges)?;
                info!(marked, "entries flagged as relinked");
            }
            Ok(())
        }
        Commands::Reset => {
            engine.reset()?;
            Ok(())
        }
    }
}

fn init_tracing(config: &LogdupConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn ingest_file(engine: &DedupEngine, path: &Path, batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        bail!("--batch-size must be greater than zero");
    }
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("opening {}", path.display()))?,
    );

    let mut batch = Vec::with_capacity(batch_size);
    let (mut canonical, mut duplicates) = (0usize, 0usize);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: LogEntry = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: not a log entry", path.display(), lineno + 1))?;
        batch.push(entry);
        if batch.len() == batch_size {
            let report = engine.ingest(&batch)?;
            canonical += report.canonical;
            duplicates += report.duplicates;
            batch.clear();
        }
    }
    if !batch.is_empty() {
        let report = engine.ingest(&batch)?;
        canonical += report.canonical;
        duplicates += report.duplicates;
    }

    if canonical + duplicates == 0 {
        warn!(file = %path.display(), "no entries found");
    }
    println!("{{\"canonical\":{canonical},\"duplicates\":{duplicates}}}");
    Ok(())
}

fn parse_filters(raw: Option<&str>) -> Result<Vec<Value>> {
    match raw {
        Some(raw) => parse_specs(raw).context("invalid --filter"),
        None => Ok(Vec::new()),
    }
}
