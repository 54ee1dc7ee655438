use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::loader::DEFAULT_DATA_FILE;
use crate::pages::Page;
use crate::pdf::PageSize;
use crate::report::{DEFAULT_AUTHOR, DEFAULT_IMAGE_DIR, DEFAULT_REPORT_FILE};

pub const DEFAULT_PREVIEW_ROWS: usize = 12;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Descriptive analytics dashboard and report for historical hotel bookings",
    long_about = None
)]
pub struct Cli {
    /// Booking data file (delimited, with a header row)
    #[arg(long, global = true, env = "HOTEL_DATA", default_value = DEFAULT_DATA_FILE)]
    pub data: PathBuf,
    /// Without a subcommand, starts the interactive page browser
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the dashboard pages
    Pages,
    /// Print the views of one dashboard page
    Show(ShowArgs),
    /// Navigate the dashboard pages interactively
    Browse(BrowseArgs),
    /// Write every derived view as CSV, plus summary.json and the prepared table
    Export(ExportArgs),
    /// Assemble the PDF analysis report from pre-rendered chart images
    Report(ReportArgs),
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Page to render (overview, cancellations, revenue, geography, seasonality, channels)
    pub page: Page,
    /// Maximum rows printed per table
    #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct BrowseArgs {
    /// Maximum rows printed per table
    #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
    pub rows: usize,
}

impl Default for BrowseArgs {
    fn default() -> Self {
        Self {
            rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Directory receiving the exported files
    #[arg(short, long = "out-dir", default_value = ".")]
    pub out_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PageSizeArg {
    Letter,
    A4,
}

impl From<PageSizeArg> for PageSize {
    fn from(arg: PageSizeArg) -> Self {
        match arg {
            PageSizeArg::Letter => PageSize::Letter,
            PageSizeArg::A4 => PageSize::A4,
        }
    }
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Output PDF path
    #[arg(short, long, default_value = DEFAULT_REPORT_FILE)]
    pub output: PathBuf,
    /// Directory holding the pre-rendered chart images
    #[arg(long, env = "HOTEL_REPORT_IMAGES", default_value = DEFAULT_IMAGE_DIR)]
    pub images: PathBuf,
    #[arg(long = "page-size", value_enum, default_value_t = PageSizeArg::Letter)]
    pub page_size: PageSizeArg,
    /// Body font (one of the standard PDF base-14 fonts)
    #[arg(long, default_value = "Helvetica")]
    pub font: String,
    /// Heading font (one of the standard PDF base-14 fonts)
    #[arg(long = "bold-font", default_value = "Helvetica-Bold")]
    pub bold_font: String,
    #[arg(long, default_value = DEFAULT_AUTHOR)]
    pub author: String,
    /// Derive the quoted figures from the booking data instead of the author's commentary
    #[arg(long = "live-summary")]
    pub live_summary: bool,
}
