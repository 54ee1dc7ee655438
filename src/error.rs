use std::path::PathBuf;

use thiserror::Error;

/// Failure conditions for loading, aggregating and reporting on bookings.
#[derive(Debug, Error)]
pub enum HotelError {
    /// The source file is missing or cannot be opened.
    #[error("booking data unavailable at '{}': {source}", path.display())]
    DataUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// A cell could not be interpreted. `line` is the 1-based line in the file.
    #[error("line {line}, column '{column}': cannot parse '{value}' ({reason})")]
    Parse {
        line: u64,
        column: String,
        value: String,
        reason: String,
    },

    /// Median imputation was requested on a column that has no values at all.
    #[error("column '{0}' has no values to impute from")]
    EmptyColumn(String),

    #[error("cannot compute {metric} over an empty dataset")]
    EmptyDataset { metric: &'static str },

    #[error("report resource missing: {}", path.display())]
    MissingResource { path: PathBuf },

    #[error("report layout error: {0}")]
    Layout(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl HotelError {
    /// Conditions that leave the session without a prepared table.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HotelError::DataUnavailable { .. }
                | HotelError::MissingColumns(_)
                | HotelError::Parse { .. }
                | HotelError::EmptyColumn(_)
                | HotelError::Layout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HotelError>;
