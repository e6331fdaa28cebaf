use crate::error::{IngestError, Result};
use crate::loader::{self, Delimiter, TextEncoding};
use crate::table::{Table, Value};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Columns the recommendations file must provide
pub const REQUIRED_COLUMNS: [&str; 15] = [
    "student_id",
    "name",
    "recommendation_rank",
    "recommended_title",
    "recommended_company",
    "recommended_industry",
    "recommended_location",
    "recommended_job_type",
    "recommended_job_id",
    "semantic_similarity",
    "course_industry_score",
    "location_score",
    "diversity_score",
    "freshness_score",
    "final_score",
];

/// One student-to-job recommendation
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    /// Index of the source row in the ingested table
    #[serde(skip)]
    pub row: usize,
    pub student_id: String,
    pub name: String,
    /// 1-based position within the student's result set, lower is better
    pub rank: u32,
    pub job_id: String,
    pub company: String,
    pub title: String,
    pub industry: String,
    pub location: String,
    pub job_type: String,
    pub semantic_similarity: Option<f64>,
    pub course_industry_score: Option<f64>,
    pub location_score: Option<f64>,
    pub diversity_score: Option<f64>,
    pub freshness_score: Option<f64>,
    /// Precomputed ranking score, taken as-is from the file
    pub final_score: Option<f64>,
}

/// Reasons a single row cannot become a [`Recommendation`]
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RowError {
    #[error("row {0} has no student_id")]
    MissingStudent(usize),

    #[error("row {row} has an invalid recommendation_rank `{value}`")]
    InvalidRank { row: usize, value: String },
}

impl Recommendation {
    /// Build a typed record from one table row
    ///
    /// The table must already contain every column in [`REQUIRED_COLUMNS`],
    /// see [`check_columns`].
    ///
    /// # Arguments
    /// * `table` - Normalized recommendations table
    /// * `row` - Row index
    ///
    /// # Returns
    /// * `Result<Recommendation, RowError>` - The record, or why the row is unusable
    pub fn from_row(table: &Table, row: usize) -> std::result::Result<Self, RowError> {
        let text = |column: &str| {
            table
                .value(row, column)
                .map(|value| value.to_string())
                .unwrap_or_default()
        };
        let score = |column: &str| table.value(row, column).and_then(Value::as_number);

        let student_id = text("student_id");
        if student_id.is_empty() {
            return Err(RowError::MissingStudent(row));
        }

        let rank_text = text("recommendation_rank");
        let rank = parse_rank(&rank_text).ok_or(RowError::InvalidRank {
            row,
            value: rank_text,
        })?;

        Ok(Recommendation {
            row,
            student_id,
            name: text("name"),
            rank,
            job_id: text("recommended_job_id"),
            company: text("recommended_company"),
            title: text("recommended_title"),
            industry: text("recommended_industry"),
            location: text("recommended_location"),
            job_type: text("recommended_job_type"),
            semantic_similarity: score("semantic_similarity"),
            course_industry_score: score("course_industry_score"),
            location_score: score("location_score"),
            diversity_score: score("diversity_score"),
            freshness_score: score("freshness_score"),
            final_score: score("final_score"),
        })
    }

    /// The value of one of the five detail scores
    pub fn score(&self, kind: ScoreKind) -> Option<f64> {
        match kind {
            ScoreKind::SemanticSimilarity => self.semantic_similarity,
            ScoreKind::CourseIndustry => self.course_industry_score,
            ScoreKind::Location => self.location_score,
            ScoreKind::Diversity => self.diversity_score,
            ScoreKind::Freshness => self.freshness_score,
        }
    }
}

/// Ensure a table carries every required column
pub fn check_columns(table: &Table) -> Result<()> {
    match REQUIRED_COLUMNS
        .iter()
        .find(|column| table.column_index(column).is_none())
    {
        Some(column) => Err(IngestError::MissingColumn(column.to_string())),
        None => Ok(()),
    }
}

// Accepts "3" and integral floats such as "3.0"
fn parse_rank(text: &str) -> Option<u32> {
    if let Ok(rank) = text.parse::<u32>() {
        return (rank > 0).then_some(rank);
    }
    let value = text.parse::<f64>().ok()?;
    if value.fract() == 0.0 && value >= 1.0 && value <= f64::from(u32::MAX) {
        Some(value as u32)
    } else {
        None
    }
}

/// The five component scores behind a final score
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ScoreKind {
    SemanticSimilarity,
    CourseIndustry,
    Location,
    Diversity,
    Freshness,
}

impl ScoreKind {
    pub const ALL: [ScoreKind; 5] = [
        ScoreKind::SemanticSimilarity,
        ScoreKind::CourseIndustry,
        ScoreKind::Location,
        ScoreKind::Diversity,
        ScoreKind::Freshness,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ScoreKind::SemanticSimilarity => "Semantic similarity",
            ScoreKind::CourseIndustry => "Course-industry",
            ScoreKind::Location => "Location",
            ScoreKind::Diversity => "Diversity",
            ScoreKind::Freshness => "Freshness",
        }
    }
}

/// Where the apply button of a recommendation points
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyLink<'a> {
    Active(&'a str),
    Unavailable,
}

/// Job identifier to application URL lookup
#[derive(Clone, Debug, Default)]
pub struct JobLinks {
    links: HashMap<String, String>,
}

impl JobLinks {
    /// Build the lookup from a table with `job_id` and `url` columns
    ///
    /// Rows missing either value are skipped; a repeated job id keeps its last URL.
    pub fn from_table(table: &Table) -> Result<Self> {
        let job_col = table
            .column_index("job_id")
            .ok_or_else(|| IngestError::MissingColumn("job_id".to_string()))?;
        let url_col = table
            .column_index("url")
            .ok_or_else(|| IngestError::MissingColumn("url".to_string()))?;

        let links = table
            .rows()
            .iter()
            .filter_map(|row| {
                let job_id = row[job_col].to_string();
                let url = row[url_col].to_string();
                (!job_id.is_empty() && !url.is_empty()).then_some((job_id, url))
            })
            .collect();

        Ok(JobLinks { links })
    }

    /// Load the job postings file (UTF-8, comma separated)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let table = loader::read_delimited_file(path, TextEncoding::Utf8Sig, Delimiter::Comma)?;
        Self::from_table(&table)
    }

    /// Resolve the link for a job identifier
    pub fn get(&self, job_id: &str) -> ApplyLink<'_> {
        match self.links.get(job_id.trim()) {
            Some(url) => ApplyLink::Active(url),
            None => ApplyLink::Unavailable,
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for JobLinks {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        JobLinks {
            links: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
