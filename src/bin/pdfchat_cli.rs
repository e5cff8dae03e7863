use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use pdfchat::{
    AppServices, config, logging,
    processing::PdfSource,
    session::Session,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "pdfchat-cli",
    about = "Ask questions about PDFs from the terminal"
)]
struct Cli {
    /// PDF files or directories containing PDFs.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Chunks retrieved per question; overrides RETRIEVAL_TOP_K.
    #[arg(long)]
    top_k: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    config::load_dotenv();
    logging::init_tracing("warn");
    let cli = Cli::parse();

    let mut config = config::init_config()
        .context("invalid configuration")?
        .clone();
    if let Some(top_k) = cli.top_k {
        if top_k == 0 {
            bail!("--top-k must be greater than zero");
        }
        config.retrieval_top_k = top_k;
    }
    let services = AppServices::from_config(&config)?;

    let sources = load_sources(&collect_pdf_paths(&cli.paths)?)?;
    let mut session = Session::new();
    match session.process_documents(&services.processor, sources).await {
        Ok(outcome) => {
            tracing::info!(
                documents = outcome.documents,
                chunks = outcome.chunk_count,
                "Documents processed"
            );
            println!("DONE");
        }
        Err(error) => match error.guidance() {
            Some(guidance) => {
                println!("{guidance}");
                return Ok(());
            }
            None => return Err(error.into()),
        },
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if matches!(question, "exit" | "quit") {
            break;
        }
        match session.ask(&services.pipeline, question).await {
            Ok(history) => {
                if let Some(turn) = history.turns().last() {
                    println!("{}", turn.answer);
                }
            }
            Err(error) => match error.guidance() {
                Some(guidance) => println!("{guidance}"),
                None => eprintln!("error: {error}"),
            },
        }
    }
    Ok(())
}

/// Expand files and directories into a sorted, de-duplicated list of `.pdf` paths.
fn collect_pdf_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file() && is_pdf(e.path()))
            {
                paths.push(entry.into_path());
            }
        } else if input.is_file() {
            paths.push(input.clone());
        } else {
            bail!("{} does not exist", input.display());
        }
    }
    paths.sort();
    paths.dedup();
    Ok(paths)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn load_sources(paths: &[PathBuf]) -> Result<Vec<PdfSource>> {
    paths
        .iter()
        .map(|path| {
            let bytes =
                fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(PdfSource::new(name, bytes))
        })
        .collect()
}
