mod common;

use recviewer::loader::{self, Delimiter, TextEncoding};
use recviewer::{IngestError, Value};

#[test]
fn ascii_comma_file_resolves_to_first_encoding() {
    let file = common::recommendations_file();
    let resolved = loader::load_table(file.path()).unwrap();

    assert_eq!(resolved.encoding, TextEncoding::Cp949);
    assert_eq!(resolved.delimiter, Delimiter::Comma);
    assert_eq!(resolved.table.width(), 15);
    assert_eq!(resolved.table.height(), 4);
}

#[test]
fn semicolon_file_is_found_after_tab_and_comma() {
    let text = common::render(';', &common::rows());
    let resolved = loader::resolve_bytes(text.as_bytes(), "semicolon.csv").unwrap();
    assert_eq!(resolved.delimiter, Delimiter::Semicolon);
    assert_eq!(resolved.encoding, TextEncoding::Cp949);
}

#[test]
fn cp949_tab_file_decodes_hangul() {
    let text = common::render('\t', &common::rows()).replace("Seoul", "서울");
    let (bytes, _, unmappable) = encoding_rs::EUC_KR.encode(&text);
    assert!(!unmappable);

    let file = common::write_bytes(&bytes);
    let resolved = loader::load_table(file.path()).unwrap();

    assert_eq!(resolved.encoding, TextEncoding::Cp949);
    assert_eq!(resolved.delimiter, Delimiter::Tab);
    assert_eq!(
        resolved.table.value(1, "recommended_location"),
        Some(&Value::Text("서울".to_string()))
    );
}

#[test]
fn utf8_hangul_falls_through_to_utf8_sig() {
    let mut text = common::render(',', &common::rows()).replace("Seoul", "서울");
    text.insert(0, '\u{feff}');
    let resolved = loader::resolve_bytes(text.as_bytes(), "utf8.csv").unwrap();

    assert_eq!(resolved.encoding, TextEncoding::Utf8Sig);
    assert_eq!(resolved.delimiter, Delimiter::Comma);
    assert_eq!(resolved.table.columns()[0], "student_id");
    assert_eq!(
        resolved.table.value(1, "recommended_location"),
        Some(&Value::Text("서울".to_string()))
    );
}

#[test]
fn resolution_is_deterministic() {
    let text = common::render(',', &common::rows()).replace("Busan", "부산");
    let first = loader::resolve_bytes(text.as_bytes(), "a.csv").unwrap();
    let second = loader::resolve_bytes(text.as_bytes(), "a.csv").unwrap();
    assert_eq!(first.encoding, second.encoding);
    assert_eq!(first.delimiter, second.delimiter);
    assert_eq!(first.table, second.table);
}

#[test]
fn narrow_file_is_unrecognized_after_every_attempt() {
    let text = "a,b,c,d,e\n1,2,3,4,5\n";
    let err = loader::resolve_bytes(text.as_bytes(), "narrow.csv").unwrap_err();
    match err {
        IngestError::Unrecognized { path, attempts, .. } => {
            assert_eq!(path, "narrow.csv");
            assert_eq!(attempts, 12);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_file_is_unrecognized() {
    let err = loader::resolve_bytes(b"", "empty.csv").unwrap_err();
    assert!(matches!(err, IngestError::Unrecognized { .. }));
}

#[test]
fn row_with_extra_fields_rejects_the_delimiter() {
    let mut text = common::render(',', &common::rows());
    text.push_str("202401020003,Park,1,a,b,c,d,e,f,0.1,0.1,0.1,0.1,0.1,0.1,extra\n");
    let err = loader::resolve_bytes(text.as_bytes(), "ragged.csv").unwrap_err();
    assert!(matches!(err, IngestError::Unrecognized { .. }));
}

#[test]
fn unparseable_scores_become_missing() {
    let text = common::render(',', &common::rows());
    let resolved = loader::resolve_bytes(text.as_bytes(), "scores.csv").unwrap();
    let table = resolved.table;

    assert_eq!(table.value(2, "semantic_similarity"), Some(&Value::Missing));
    assert_eq!(table.value(2, "course_industry_score"), Some(&Value::Missing));
    assert_eq!(table.value(2, "final_score"), Some(&Value::Number(0.5)));
    // recommendation_rank is not a numeric column and stays text
    assert_eq!(
        table.value(0, "recommendation_rank"),
        Some(&Value::Text("2".to_string()))
    );
}

#[test]
fn headers_and_text_cells_are_trimmed() {
    let text = common::render(',', &common::rows())
        .replacen("student_id", "  student_id ", 1)
        .replace("Beta Corp", "  Beta Corp  ");
    let resolved = loader::resolve_bytes(text.as_bytes(), "spaces.csv").unwrap();
    assert_eq!(resolved.table.columns()[0], "student_id");
    assert_eq!(
        resolved.table.value(0, "recommended_company"),
        Some(&Value::Text("Beta Corp".to_string()))
    );
}

#[test]
fn missing_file_reports_io_error() {
    let err = loader::load_table("/definitely/not/here.csv").unwrap_err();
    assert!(matches!(err, IngestError::Io { .. }));
}
