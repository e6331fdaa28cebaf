use crate::record::{ApplyLink, JobLinks, Recommendation, ScoreKind};
use crate::service::Dataset;
use serde::Serialize;
use std::collections::BTreeMap;

/// How many identifiers to list when a student is not found
pub const SAMPLE_SIZE: usize = 10;

/// Longest label shown for the most frequent industry/location
pub const LABEL_LIMIT: usize = 20;

const NOT_AVAILABLE: &str = "N/A";

/// Everything the dashboard shows for one student
#[derive(Debug, Serialize)]
pub struct StudentReport {
    pub student_id: String,
    pub name: String,
    pub total: usize,
    pub cards: Vec<Card>,
    pub stats: Stats,
}

/// One recommendation as displayed
#[derive(Debug, Serialize)]
pub struct Card {
    pub rank: u32,
    pub title: String,
    pub company: String,
    pub industry: String,
    pub location: String,
    pub job_type: String,
    pub final_score: String,
    /// Application URL, `None` renders the disabled placeholder
    pub apply_url: Option<String>,
    pub expanded: bool,
    pub details: Vec<ScoreLine>,
}

#[derive(Debug, Serialize)]
pub struct ScoreLine {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct Stats {
    pub average_final_score: String,
    pub top_industry: String,
    pub top_location: String,
}

/// Why no report could be built for an identifier
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ReportError {
    #[error("no recommendations found for student {student_id}")]
    UnknownStudent {
        student_id: String,
        /// Number of distinct identifiers in the data
        total: usize,
        /// The first identifiers in sorted order
        sample: Vec<String>,
        /// How many identifiers are not in `sample`
        remaining: usize,
    },
}

/// Build the report for a logged-in student
///
/// # Arguments
/// * `dataset` - Ingested recommendations
/// * `links` - Job link lookup
/// * `student_id` - Identifier to filter on (trimmed before matching)
/// * `expanded` - Rank whose detail scores are open, if any
///
/// # Returns
/// * `Result<StudentReport, ReportError>` - The report, or the list of known identifiers
pub fn build_report(
    dataset: &Dataset,
    links: &JobLinks,
    student_id: &str,
    expanded: Option<u32>,
) -> Result<StudentReport, ReportError> {
    let student_id = student_id.trim();
    let records = ranked_records(dataset, student_id);
    if records.is_empty() {
        return Err(unknown_student(dataset, student_id));
    }

    let cards = records
        .iter()
        .map(|rec| card(rec, links, expanded == Some(rec.rank)))
        .collect();

    let final_scores: Vec<f64> = records.iter().filter_map(|rec| rec.final_score).collect();
    let stats = Stats {
        average_final_score: format_score(mean(&final_scores)),
        top_industry: top_label(records.iter().map(|rec| rec.industry.as_str())),
        top_location: top_label(records.iter().map(|rec| rec.location.as_str())),
    };

    Ok(StudentReport {
        student_id: student_id.to_string(),
        name: records[0].name.clone(),
        total: records.len(),
        cards,
        stats,
    })
}

/// A student's recommendations sorted by ascending rank
pub fn ranked_records<'a>(dataset: &'a Dataset, student_id: &str) -> Vec<&'a Recommendation> {
    let mut records = dataset.student_records(student_id);
    records.sort_by_key(|rec| rec.rank);
    records
}

fn card(rec: &Recommendation, links: &JobLinks, expanded: bool) -> Card {
    let apply_url = match links.get(&rec.job_id) {
        ApplyLink::Active(url) => Some(url.to_string()),
        ApplyLink::Unavailable => None,
    };
    let details = if expanded {
        ScoreKind::ALL
            .iter()
            .map(|&kind| ScoreLine {
                label: kind.label(),
                value: format_score(rec.score(kind)),
            })
            .collect()
    } else {
        Vec::new()
    };

    Card {
        rank: rec.rank,
        title: rec.title.clone(),
        company: rec.company.clone(),
        industry: rec.industry.clone(),
        location: rec.location.clone(),
        job_type: rec.job_type.clone(),
        final_score: format_score(rec.final_score),
        apply_url,
        expanded,
        details,
    }
}

fn unknown_student(dataset: &Dataset, student_id: &str) -> ReportError {
    let ids = dataset.student_ids();
    let sample: Vec<String> = ids.iter().take(SAMPLE_SIZE).map(|id| id.to_string()).collect();
    ReportError::UnknownStudent {
        student_id: student_id.to_string(),
        total: ids.len(),
        remaining: ids.len() - sample.len(),
        sample,
    }
}

/// Arithmetic mean, `None` for no values
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Most frequent non-empty value; ties go to the lexicographically smallest
pub fn mode<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.into_iter().filter(|v| !v.is_empty()) {
        *counts.entry(value).or_insert(0) += 1;
    }
    // BTreeMap iterates in key order, so the first maximum is the smallest key
    counts
        .into_iter()
        .fold(None, |best: Option<(&str, usize)>, (value, count)| match best {
            Some((_, top)) if top >= count => best,
            _ => Some((value, count)),
        })
        .map(|(value, _)| value)
}

/// Cut a label to [`LABEL_LIMIT`] characters, marking the cut with `...`
pub fn truncate_label(label: &str) -> String {
    if label.chars().count() > LABEL_LIMIT {
        let head: String = label.chars().take(LABEL_LIMIT).collect();
        format!("{}...", head)
    } else {
        label.to_string()
    }
}

/// Three-decimal score, or `N/A` for the missing marker
pub fn format_score(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.3}", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn top_label<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    mode(values)
        .map(truncate_label)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_three_scores() {
        let avg = mean(&[0.81, 0.77, 0.69]);
        assert_eq!(format_score(avg), "0.757");
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn mode_prefers_smallest_on_tie() {
        assert_eq!(mode(["IT", "Finance", "IT", "Finance"]), Some("Finance"));
        assert_eq!(mode(["IT", "Finance", "IT"]), Some("IT"));
        assert_eq!(mode(["", ""]), None);
    }

    #[test]
    fn long_labels_are_truncated_by_characters() {
        assert_eq!(truncate_label("Seoul"), "Seoul");
        let korean = "가".repeat(25);
        assert_eq!(truncate_label(&korean), format!("{}...", "가".repeat(20)));
        assert_eq!(truncate_label(&"x".repeat(20)), "x".repeat(20));
    }

    #[test]
    fn missing_score_renders_not_available() {
        assert_eq!(format_score(None), "N/A");
        assert_eq!(format_score(Some(0.5)), "0.500");
    }
}
