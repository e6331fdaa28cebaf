mod common;

use recviewer::downloader;
use recviewer::loader::{self, Delimiter, TextEncoding};
use recviewer::report::{self, ReportError};
use recviewer::{Dataset, IngestError, JobLinks, Table};

fn dataset() -> Dataset {
    let file = common::recommendations_file();
    Dataset::load(file.path()).unwrap()
}

fn links() -> JobLinks {
    let file = common::job_postings_file();
    JobLinks::load(file.path()).unwrap()
}

#[test]
fn report_lists_cards_by_rank_with_statistics() {
    let dataset = dataset();
    let report = report::build_report(&dataset, &links(), "202401020001", None).unwrap();

    assert_eq!(report.name, "Kim");
    assert_eq!(report.total, 3);
    let ranks: Vec<u32> = report.cards.iter().map(|card| card.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    assert_eq!(report.cards[0].final_score, "0.810");
    assert_eq!(report.stats.average_final_score, "0.757");
    assert_eq!(report.stats.top_industry, "IT");
    assert_eq!(report.stats.top_location, "Seoul");
    assert!(report.cards.iter().all(|card| card.details.is_empty()));
}

#[test]
fn cards_link_only_known_jobs() {
    let dataset = dataset();
    let report = report::build_report(&dataset, &links(), "202401020001", None).unwrap();

    assert_eq!(
        report.cards[0].apply_url.as_deref(),
        Some("https://jobs.example.com/100")
    );
    assert_eq!(report.cards[1].apply_url, None);
    assert_eq!(
        report.cards[2].apply_url.as_deref(),
        Some("https://jobs.example.com/300")
    );
}

#[test]
fn expanded_card_shows_all_detail_scores() {
    let dataset = dataset();
    let report = report::build_report(&dataset, &links(), "202401020001", Some(2)).unwrap();

    let expanded: Vec<u32> = report
        .cards
        .iter()
        .filter(|card| card.expanded)
        .map(|card| card.rank)
        .collect();
    assert_eq!(expanded, vec![2]);
    let values: Vec<&str> = report.cards[1]
        .details
        .iter()
        .map(|line| line.value.as_str())
        .collect();
    assert_eq!(values, vec!["0.700", "0.600", "0.500", "0.400", "0.300"]);
}

#[test]
fn missing_scores_render_as_not_available() {
    let dataset = dataset();
    let report = report::build_report(&dataset, &links(), "202401020002", Some(1)).unwrap();

    assert_eq!(report.total, 1);
    assert_eq!(report.cards[0].final_score, "0.500");
    assert!(report.cards[0].details.iter().all(|line| line.value == "N/A"));
}

#[test]
fn unknown_student_gets_known_identifiers() {
    let dataset = dataset();
    let err = report::build_report(&dataset, &links(), "999", None).unwrap_err();
    assert_eq!(
        err,
        ReportError::UnknownStudent {
            student_id: "999".to_string(),
            total: 2,
            sample: vec!["202401020001".to_string(), "202401020002".to_string()],
            remaining: 0,
        }
    );
}

#[test]
fn identifiers_are_trimmed_before_matching() {
    let dataset = dataset();
    let report = report::build_report(&dataset, &links(), "  202401020002 ", None).unwrap();
    assert_eq!(report.student_id, "202401020002");
}

#[test]
fn duplicate_ranks_and_unusable_rows_are_skipped() {
    let mut rows = common::rows();
    let mut repeat = rows[1];
    repeat[3] = "Repeat Engineer";
    rows.push(repeat);
    let mut no_rank = rows[0];
    no_rank[2] = "first";
    rows.push(no_rank);

    let file = common::write_bytes(common::render(',', &rows).as_bytes());
    let dataset = Dataset::load(file.path()).unwrap();

    assert_eq!(dataset.table().height(), 6);
    assert_eq!(dataset.records().len(), 4);
    let titles: Vec<&str> = dataset
        .student_records("202401020001")
        .iter()
        .map(|rec| rec.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Data Analyst", "Backend Engineer", "QA Engineer"]);
}

#[test]
fn missing_required_column_fails_ingestion() {
    let text = common::render(',', &common::rows()).replacen("final_score", "score", 1);
    let file = common::write_bytes(text.as_bytes());
    let err = Dataset::load(file.path()).unwrap_err();
    assert!(matches!(err, IngestError::MissingColumn(column) if column == "final_score"));
}

#[test]
fn csv_export_reads_back_as_the_same_rows() {
    let dataset = dataset();
    let table = dataset.student_table("202401020001");
    assert_eq!(table.height(), 3);
    assert_eq!(table.columns(), dataset.table().columns());

    let bytes = downloader::to_csv(&table).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));

    let reread: Table = loader::read_delimited(&bytes, TextEncoding::Utf8Sig, Delimiter::Comma).unwrap();
    assert_eq!(reread, table);
}

#[test]
fn export_keeps_file_order_and_all_columns() {
    let dataset = dataset();
    let table = dataset.student_table("202401020001");
    let ranks: Vec<String> = table
        .column("recommendation_rank")
        .unwrap()
        .map(|value| value.to_string())
        .collect();
    assert_eq!(ranks, vec!["2", "1", "3"]);
    assert_eq!(
        downloader::export_file_name("202401020001", "csv"),
        "student_202401020001_recommendations.csv"
    );
}
