pub mod cache;
pub mod cli;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod pages;
pub mod pdf;
pub mod report;
pub mod types;
pub mod util;

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;
use std::{env, fs, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{warn, LevelFilter};

use crate::cache::PreparedCache;
use crate::cli::{BrowseArgs, Cli, Commands, ExportArgs, ReportArgs, ShowArgs};
use crate::error::HotelError;
use crate::loader::PreparedTable;
use crate::pages::Page;
use crate::report::{ReportConfig, ReportFigures};

pub use crate::error::HotelError as Error;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("hotel_insights", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

/// Per-process state: the prepared table is loaded on first use and then
/// shared by every view.
pub struct Session {
    cache: PreparedCache,
}

impl Session {
    pub fn new(data: &Path) -> Self {
        Self {
            cache: PreparedCache::from_path(data),
        }
    }

    /// The prepared table, or `None` after telling the user why it is not
    /// available.
    pub fn table(&self) -> Option<&PreparedTable> {
        match self.cache.get() {
            Ok(table) => Some(table),
            Err(err) => {
                if matches!(err, HotelError::DataUnavailable { .. }) {
                    eprintln!(
                        "Warning: Please ensure '{}' is in the expected location.",
                        self.cache.key()
                    );
                }
                eprintln!("Data not loaded: {err}");
                None
            }
        }
    }
}

pub fn run() -> Result<ExitCode> {
    init_logging();
    let cli = Cli::parse();
    let session = Session::new(&cli.data);
    match cli.command {
        Some(Commands::Pages) => {
            for (i, page) in Page::ALL.iter().enumerate() {
                println!("[{}] {:<14} {}", i + 1, page.slug(), page.title());
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Show(args)) => handle_show(&session, &args),
        Some(Commands::Browse(args)) => handle_browse(&session, &args),
        None => handle_browse(&session, &BrowseArgs::default()),
        Some(Commands::Export(args)) => handle_export(&session, &args),
        Some(Commands::Report(args)) => handle_report(&session, &args),
    }
}

fn print_sidebar(table: &PreparedTable) {
    match pages::dataset_info(table) {
        Ok(info) => output::preview_table("Dataset Info", &output::dataset_rows(&info), 3),
        Err(err) => println!("Dataset Info unavailable: {err}\n"),
    }
}

/// Render one page; a failed computation is reported and leaves the
/// session usable.
fn show_page(table: &PreparedTable, page: Page, rows: usize) -> bool {
    println!("{}\n", page.title());
    match pages::build(page, table) {
        Ok(view) => {
            output::render_page(&view, rows);
            true
        }
        Err(err) => {
            println!("Cannot compute this page: {err}\n");
            false
        }
    }
}

fn handle_show(session: &Session, args: &ShowArgs) -> Result<ExitCode> {
    let Some(table) = session.table() else {
        return Ok(ExitCode::FAILURE);
    };
    print_sidebar(table);
    if show_page(table, args.page, args.rows) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Read one trimmed line after printing `prompt`; `None` on end of input.
fn prompt_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().lock().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Ask whether to go back to the page selection menu.
///
/// Returns `Some(true)` for `Y`, `Some(false)` for `N`, `None` on end of input.
fn prompt_back_to_menu() -> Option<bool> {
    loop {
        let resp = prompt_line("Back to page selection (Y/N): ")?.to_uppercase();
        match resp.as_str() {
            "Y" => return Some(true),
            "N" => return Some(false),
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn handle_browse(session: &Session, args: &BrowseArgs) -> Result<ExitCode> {
    let Some(table) = session.table() else {
        return Ok(ExitCode::FAILURE);
    };
    print_sidebar(table);
    loop {
        println!("Select Analysis:");
        for (i, page) in Page::ALL.iter().enumerate() {
            println!("[{}] {}", i + 1, page.title());
        }
        println!("[0] Exit\n");
        let Some(choice) = prompt_line("Enter choice: ") else {
            break;
        };
        let page = match choice.parse::<usize>() {
            Ok(0) => break,
            Ok(n) if n <= Page::ALL.len() => Page::ALL[n - 1],
            _ => match choice.parse::<Page>() {
                Ok(page) => page,
                Err(_) => {
                    println!("Invalid choice. Please enter 0-{}.\n", Page::ALL.len());
                    continue;
                }
            },
        };
        println!();
        show_page(table, page, args.rows);
        if !prompt_back_to_menu().unwrap_or(false) {
            break;
        }
    }
    println!("Exiting the program.");
    Ok(ExitCode::SUCCESS)
}

fn handle_export(session: &Session, args: &ExportArgs) -> Result<ExitCode> {
    let Some(table) = session.table() else {
        return Ok(ExitCode::FAILURE);
    };
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Creating output directory {:?}", args.out_dir))?;

    let prepared = args.out_dir.join(output::PREPARED_EXPORT);
    output::write_prepared(&prepared, table)
        .with_context(|| format!("Writing prepared table to {prepared:?}"))?;

    let mut files = 1usize;
    for page in Page::ALL {
        match pages::build(page, table) {
            Ok(view) => {
                let written = output::export_page(&view, &args.out_dir)
                    .with_context(|| format!("Exporting page '{page}'"))?;
                files += written.len();
            }
            Err(err) => warn!("Skipping page '{page}': {err}"),
        }
    }
    match pages::summary(table) {
        Ok(summary) => {
            let path = args.out_dir.join("summary.json");
            output::write_json(&path, &summary)
                .with_context(|| format!("Writing summary to {path:?}"))?;
            files += 1;
        }
        Err(err) => warn!("Skipping summary.json: {err}"),
    }
    println!(
        "Outputs saved to {} ({} file(s)).",
        args.out_dir.display(),
        files
    );
    Ok(ExitCode::SUCCESS)
}

fn handle_report(session: &Session, args: &ReportArgs) -> Result<ExitCode> {
    let figures = if args.live_summary {
        let Some(table) = session.table() else {
            return Ok(ExitCode::FAILURE);
        };
        ReportFigures::computed(table).context("Computing report figures")?
    } else {
        ReportFigures::authored()
    };

    let mut config = ReportConfig::new(chrono::Local::now().date_naive());
    config.output = args.output.clone();
    config.image_dir = args.images.clone();
    config.layout = pdf::Layout::new(args.page_size.into());
    config.layout.body_font = args.font.clone();
    config.layout.bold_font = args.bold_font.clone();
    config.author = args.author.clone();

    let outcome = report::assemble(&config, &figures)
        .with_context(|| format!("Assembling report {:?}", config.output))?;
    if outcome.missing_images.is_empty() {
        println!("All graph images found.");
    } else {
        println!("Warning: Some images are missing:");
        for path in &outcome.missing_images {
            println!("   - {}", path.display());
        }
    }
    println!(
        "PDF report generated: {} ({} pages)",
        outcome.path.display(),
        outcome.pages
    );
    Ok(ExitCode::SUCCESS)
}
