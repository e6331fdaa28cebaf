use std::path::PathBuf;

/// Failures while turning a delimited file into a table
#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bytes are not valid {0}")]
    Decode(&'static str),

    #[error("file has no header row")]
    Empty,

    #[error("malformed delimited text: {0}")]
    Format(#[from] csv::Error),

    #[error("line {line} has {found} fields, header has {expected}")]
    RaggedRow {
        line: u64,
        found: usize,
        expected: usize,
    },

    #[error("found {found} columns, at least {required} are required")]
    TooFewColumns { found: usize, required: usize },

    #[error("required column `{0}` is missing")]
    MissingColumn(String),

    #[error("cannot read {path}: unrecognized file format after {attempts} attempts")]
    Unrecognized {
        path: String,
        attempts: usize,
        #[source]
        last: Box<IngestError>,
    },
}

/// Failures while producing a download
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "web")]
    #[error(transparent)]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

pub type Result<T, E = IngestError> = core::result::Result<T, E>;
