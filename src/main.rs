use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use redliner::document::DocumentSide;
use redliner::modifications::{ModificationSource, ParserChain, fetch_source};
use redliner::{Config, DocumentInfo, Outcome, Processor};

/// Find/replace in Word documents without losing formatting
#[derive(Parser, Debug)]
#[command(name = "redliner", version, about)]
struct Cli {
    /// Input document (.docx or .txt; .doc with --recover)
    input: PathBuf,

    /// Modifications as a JSON/CSV file, a URL, or inline JSON/CSV text
    #[arg(short, long)]
    modifications: Option<String>,

    /// Where to write the modified document
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the formatted content tree as JSON
    #[arg(long, value_enum)]
    preview: Option<DocumentSide>,

    /// Print document counts as JSON
    #[arg(long)]
    info: bool,

    /// Recover a legacy document into .docx before loading it
    #[arg(long)]
    recover: bool,

    /// Use this config file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a default config file and exit
    #[arg(long)]
    init_config: bool,
}

#[derive(Serialize)]
struct Summary<'a> {
    steps: Vec<(&'static str, &'a Outcome)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    info: Option<DocumentInfo>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.init_config {
        Config::init_default()?;
        if let Some(path) = Config::get_config_path() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => Config::load()?,
    };
    let fetch_timeout = config.fetch_timeout();
    let mut processor = Processor::with_config(config);

    let mut outcomes = Vec::new();

    let input = if cli.recover {
        let outcome = processor.recover_legacy_document(&cli.input);
        let recovered = outcome.success.then(|| outcome.detail.clone()).flatten();
        outcomes.push(("recover", outcome));
        match recovered {
            Some(path) => PathBuf::from(path),
            None => return finish(outcomes, None),
        }
    } else {
        cli.input.clone()
    };

    let loaded = processor.load_document(&input);
    let loaded_ok = loaded.success;
    outcomes.push(("load", loaded));
    if !loaded_ok {
        return finish(outcomes, None);
    }

    if let Some(source) = &cli.modifications {
        let source = ModificationSource::detect(source);
        let bytes = fetch_source(&source, fetch_timeout)?;
        let modifications = ParserChain::default()
            .parse_bytes(&bytes)
            .context("failed to parse modifications")?;
        outcomes.push(("apply", processor.apply_modifications(&modifications)));
    }

    if let Some(output) = &cli.output {
        outcomes.push(("save", processor.save_modified_document(output)));
    }

    if let Some(side) = cli.preview {
        let content = processor.extract_content_with_formatting(side)?;
        println!("{}", serde_json::to_string_pretty(&content)?);
    }

    let info = cli.info.then(|| processor.get_document_info());
    finish(outcomes, info)
}

fn finish(outcomes: Vec<(&'static str, Outcome)>, info: Option<DocumentInfo>) -> Result<()> {
    let summary = Summary {
        steps: outcomes.iter().map(|(step, o)| (*step, o)).collect(),
        info,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some((step, failed)) = outcomes.iter().find(|(_, o)| !o.success) {
        bail!("{step} failed: {}", failed.message);
    }
    Ok(())
}
