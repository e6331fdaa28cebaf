use crate::config::Config;
use crate::error::{IngestError, Result};
use crate::loader::{self, Delimiter, TextEncoding};
use crate::record::{self, JobLinks, Recommendation};
use crate::table::Table;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// The recommendations file, ingested and typed
#[derive(Clone, Debug)]
pub struct Dataset {
    table: Table,
    records: Vec<Recommendation>,
    pub encoding: TextEncoding,
    pub delimiter: Delimiter,
}

impl Dataset {
    /// Resolve and type the recommendations file
    ///
    /// # Arguments
    /// * `path` - Path to the recommendations file
    ///
    /// # Returns
    /// * `Result<Dataset>` - The dataset, or the ingestion failure
    ///
    /// # Errors
    /// * Any resolver error from [`loader::load_table`]
    /// * `IngestError::MissingColumn` if a required column is absent
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let resolved = loader::load_table(path)?;
        Self::from_table(resolved.table, resolved.encoding, resolved.delimiter)
    }

    /// Type an already-resolved table
    ///
    /// Rows without a student or with an unusable rank are skipped, as is any row
    /// repeating a rank already seen for the same student.
    pub fn from_table(table: Table, encoding: TextEncoding, delimiter: Delimiter) -> Result<Self> {
        record::check_columns(&table)?;

        let mut seen: HashSet<(String, u32)> = HashSet::new();
        let mut records = Vec::with_capacity(table.height());
        for row in 0..table.height() {
            match Recommendation::from_row(&table, row) {
                Ok(rec) => {
                    if seen.insert((rec.student_id.clone(), rec.rank)) {
                        records.push(rec);
                    } else {
                        log::warn!(
                            "skipping row {}: student {} already has rank {}",
                            row,
                            rec.student_id,
                            rec.rank
                        );
                    }
                }
                Err(e) => log::warn!("skipping {}", e),
            }
        }

        Ok(Dataset {
            table,
            records,
            encoding,
            delimiter,
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn records(&self) -> &[Recommendation] {
        &self.records
    }

    /// All recommendations for one student, in file order
    pub fn student_records(&self, student_id: &str) -> Vec<&Recommendation> {
        let student_id = student_id.trim();
        self.records
            .iter()
            .filter(|rec| rec.student_id == student_id)
            .collect()
    }

    /// The student's source rows with every original column, in file order
    pub fn student_table(&self, student_id: &str) -> Table {
        let rows: Vec<usize> = self
            .student_records(student_id)
            .iter()
            .map(|rec| rec.row)
            .collect();
        self.table.select_rows(&rows)
    }

    /// Distinct student identifiers, sorted
    pub fn student_ids(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(|rec| rec.student_id.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Read-only access to both source tables
///
/// Built once at start-up and shared by every request. An unreadable
/// recommendations file is kept as an error so each request can report it;
/// an unreadable postings file degrades to an empty link table.
#[derive(Debug)]
pub struct DataService {
    recommendations: Result<Dataset>,
    links: JobLinks,
    links_notice: Option<String>,
}

impl DataService {
    pub fn load(config: &Config) -> Self {
        let recommendations = Dataset::load(&config.recommendations);
        match &recommendations {
            Ok(dataset) => log::info!(
                "loaded {} recommendations for {} students",
                dataset.records().len(),
                dataset.student_ids().len()
            ),
            Err(e) => log::error!("recommendations unavailable: {}", e),
        }

        let (links, links_notice) = match JobLinks::load(&config.job_postings) {
            Ok(links) => {
                log::info!("loaded {} job links", links.len());
                (links, None)
            }
            Err(e) => {
                log::error!("job postings unavailable: {}", e);
                (JobLinks::default(), Some(format!("Job links could not be loaded: {}", e)))
            }
        };

        DataService {
            recommendations,
            links,
            links_notice,
        }
    }

    pub fn from_parts(recommendations: Result<Dataset>, links: JobLinks) -> Self {
        DataService {
            recommendations,
            links,
            links_notice: None,
        }
    }

    pub fn dataset(&self) -> std::result::Result<&Dataset, &IngestError> {
        self.recommendations.as_ref()
    }

    pub fn links(&self) -> &JobLinks {
        &self.links
    }

    pub fn links_notice(&self) -> Option<&str> {
        self.links_notice.as_deref()
    }
}
