mod api;
mod models;
mod render;
mod tui;
mod upload;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use api::{ApiClient, DEFAULT_BASE_URL};
use models::AnalysisResult;
use upload::{Handoff, ProgressObserver, SelectedFile, UploadSession};

#[derive(Parser)]
#[command(name = "resumatch")]
#[command(about = "Resume analysis client - upload a resume, get job-match insights")]
struct Cli {
    /// Base URL of the analysis API
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a resume and render the job-match report
    Analyze {
        /// Path to a PDF, DOC, or DOCX resume
        file: PathBuf,

        /// Print the raw analysis as JSON instead of a report
        #[arg(long)]
        json: bool,
    },

    /// Upload a resume without waiting for analysis
    Upload {
        /// Path to a PDF, DOC, or DOCX resume
        file: PathBuf,
    },

    /// Fetch a stored analysis by its identifier
    Show {
        /// Resume identifier returned by the server
        id: String,

        /// Print the raw analysis as JSON instead of a report
        #[arg(long)]
        json: bool,
    },

    /// List analyses stored on the server
    List,

    /// Browse stored analyses interactively
    Browse,

    /// Delete a stored analysis
    Delete {
        /// Resume identifier returned by the server
        id: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = ApiClient::new(&cli.base_url)?;

    match cli.command {
        Commands::Analyze { file, json } => analyze(&client, &file, json),
        Commands::Upload { file } => upload_only(&client, &file),
        Commands::Show { id, json } => show(&client, &id, json),
        Commands::List => list(&client),
        Commands::Browse => tui::run_browse(&client),
        Commands::Delete { id } => {
            client.delete_analysis(&id)?;
            println!("Deleted analysis {id}.");
            Ok(())
        }
    }
}

fn analyze(client: &ApiClient, path: &Path, json: bool) -> Result<()> {
    let mut session = UploadSession::new();
    session.select_file(SelectedFile::from_path(path)?);
    if let Some(message) = &session.error_message {
        bail!("{message}");
    }

    let name = session
        .file
        .as_ref()
        .map(|f| f.name.clone())
        .unwrap_or_default();
    let bar = upload_bar(name);
    let bar_handle = bar.clone();
    let observer: ProgressObserver = Arc::new(move |pct| bar_handle.set_position(pct as u64));

    match session.submit(client, observer) {
        Some(handoff) => {
            bar.finish();
            let result = render::resolve(handoff, client)?;
            print_result(&result, json)
        }
        None => {
            bar.abandon();
            match session.error_message {
                Some(message) => bail!("{message}"),
                None => bail!("Nothing to upload."),
            }
        }
    }
}

fn upload_only(client: &ApiClient, path: &Path) -> Result<()> {
    let mut session = UploadSession::new();
    session.select_file(SelectedFile::from_path(path)?);
    if let Some(message) = &session.error_message {
        bail!("{message}");
    }
    let Some(file) = session.file.as_ref() else {
        bail!("Nothing to upload.");
    };

    let bar = upload_bar(file.name.clone());
    let bar_handle = bar.clone();
    let hook: upload::ProgressHook = Arc::new(move |fraction| {
        bar_handle.set_position((fraction.clamp(0.0, 1.0) * 100.0) as u64);
    });

    let response = client.upload(file, hook)?;
    bar.finish();
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn show(client: &ApiClient, id: &str, json: bool) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Loading analysis...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let outcome = render::resolve(Handoff::Id(id.to_string()), client);
    spinner.finish_and_clear();

    match outcome {
        Ok(result) => print_result(&result, json),
        Err(err) => bail!("{err}\n{}", render::RETRY_HINT),
    }
}

fn list(client: &ApiClient) -> Result<()> {
    let analyses = client.list_analyses()?;
    if analyses.is_empty() {
        println!("No analyses found.");
        return Ok(());
    }
    println!("{:<6} {:<8} {:<40}", "INDEX", "MATCHES", "TOP MATCH");
    println!("{}", "-".repeat(56));
    for (i, analysis) in analyses.iter().enumerate() {
        let top = analysis
            .matches
            .first()
            .and_then(|m| m.title.clone())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<8} {:<40}",
            i + 1,
            analysis.matches.len(),
            render::truncate(&top, 38)
        );
    }
    Ok(())
}

fn print_result(result: &AnalysisResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print!("{}", render::render_report(&render::project(result)));
    }
    Ok(())
}

fn upload_bar(name: String) -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.set_message(name);
    bar
}
