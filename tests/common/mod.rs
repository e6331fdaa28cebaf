#![allow(dead_code)]

use std::io::Write;
use tempfile::NamedTempFile;

pub const HEADER: [&str; 15] = [
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

/// Rows for two students; the first student's ranks are out of file order
pub fn rows() -> Vec<[&'static str; 15]> {
    vec![
        [
            "202401020001", "Kim", "2", "Data Analyst", "Beta Corp", "Finance", "Busan",
            "Full-time", "J200", "0.70", "0.60", "0.50", "0.40", "0.30", "0.77",
        ],
        [
            "202401020001", "Kim", "1", "Backend Engineer", "Acme", "IT", "Seoul",
            "Full-time", "J100", "0.91", "0.80", "1.00", "0.20", "0.55", "0.81",
        ],
        [
            "202401020002", "Lee", "1", "Designer", "Gamma", "Media", "Incheon",
            "Contract", "J400", "n/a", "", "", "", "", "0.50",
        ],
        [
            "202401020001", "Kim", "3", "QA Engineer", "Delta", "IT", "Seoul",
            "Intern", "J300", "0.65", "0.45", "0.90", "0.70", "0.85", "0.69",
        ],
    ]
}

pub fn render(delimiter: char, rows: &[[&str; 15]]) -> String {
    let sep = delimiter.to_string();
    let mut text = HEADER.join(&sep);
    text.push('\n');
    for row in rows {
        text.push_str(&row.join(&sep));
        text.push('\n');
    }
    text
}

pub fn write_bytes(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(bytes).expect("write fixture");
    file.flush().expect("flush fixture");
    file
}

/// Comma-separated ASCII recommendations
pub fn recommendations_file() -> NamedTempFile {
    write_bytes(render(',', &rows()).as_bytes())
}

pub fn job_postings_file() -> NamedTempFile {
    write_bytes(b"job_id,url\nJ100,https://jobs.example.com/100\nJ300,https://jobs.example.com/300\n")
}
