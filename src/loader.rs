use crate::error::{IngestError, Result};
use crate::table::{Table, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

/// A file must have at least this many columns to be accepted
pub const MIN_COLUMNS: usize = 10;

/// Columns coerced to numbers after ingestion
pub const NUMERIC_COLUMNS: [&str; 6] = [
    "semantic_similarity",
    "course_industry_score",
    "location_score",
    "diversity_score",
    "freshness_score",
    "final_score",
];

/// Character encodings tried by the resolver, in priority order
pub const ENCODING_CANDIDATES: [TextEncoding; 4] = [
    TextEncoding::Cp949,
    TextEncoding::EucKr,
    TextEncoding::Utf8Sig,
    TextEncoding::Utf8,
];

/// Field delimiters tried for every encoding, in priority order
pub const DELIMITER_CANDIDATES: [Delimiter; 3] =
    [Delimiter::Tab, Delimiter::Comma, Delimiter::Semicolon];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text encodings the resolver knows how to decode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextEncoding {
    /// Windows code page 949 (Unified Hangul Code)
    Cp949,
    /// Strict KS X 1001 EUC-KR, a subset of CP949
    EucKr,
    /// UTF-8 with an optional leading byte-order mark, which is dropped
    Utf8Sig,
    /// Plain UTF-8; a byte-order mark is kept as text
    Utf8,
}

impl TextEncoding {
    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Cp949 => "cp949",
            TextEncoding::EucKr => "euc-kr",
            TextEncoding::Utf8Sig => "utf-8-sig",
            TextEncoding::Utf8 => "utf-8",
        }
    }

    /// Decode raw bytes without substituting replacement characters
    ///
    /// # Arguments
    /// * `bytes` - Raw file content
    ///
    /// # Returns
    /// * `Result<String>` - Decoded text, or `IngestError::Decode` on the first malformed sequence
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        let (encoding, body) = match self {
            TextEncoding::Cp949 => (encoding_rs::EUC_KR, bytes),
            TextEncoding::EucKr => {
                if !is_strict_euc_kr(bytes) {
                    return Err(IngestError::Decode(self.label()));
                }
                (encoding_rs::EUC_KR, bytes)
            }
            TextEncoding::Utf8Sig => (
                encoding_rs::UTF_8,
                bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes),
            ),
            TextEncoding::Utf8 => (encoding_rs::UTF_8, bytes),
        };

        encoding
            .decode_without_bom_handling_and_without_replacement(body)
            .map(|text| text.into_owned())
            .ok_or(IngestError::Decode(self.label()))
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Field delimiters the resolver knows about
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delimiter {
    Tab,
    Comma,
    Semicolon,
}

impl Delimiter {
    pub fn byte(self) -> u8 {
        match self {
            Delimiter::Tab => b'\t',
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Delimiter::Tab => "tab",
            Delimiter::Comma => "comma",
            Delimiter::Semicolon => "semicolon",
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A table together with the format it was read in
#[derive(Clone, Debug)]
pub struct Resolved {
    pub encoding: TextEncoding,
    pub delimiter: Delimiter,
    pub table: Table,
}

/// Load a delimited file whose encoding and delimiter are unknown
///
/// # Arguments
/// * `path` - Path to the file
///
/// # Returns
/// * `Result<Resolved>` - The normalized table and the format it was found in
///
/// # Errors
/// * `IngestError::Io` if the file cannot be read
/// * `IngestError::Unrecognized` if no encoding/delimiter pair yields a valid table
///
/// # Examples
/// ```no_run
/// use recviewer::loader::load_table;
///
/// match load_table("student_recommendations.csv") {
///     Ok(resolved) => println!("{} rows as {}", resolved.table.height(), resolved.encoding),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn load_table(path: impl AsRef<Path>) -> Result<Resolved> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    resolve_bytes(&bytes, &path.display().to_string())
}

/// Resolve the format of in-memory file content
///
/// Every encoding in [`ENCODING_CANDIDATES`] is combined with every delimiter in
/// [`DELIMITER_CANDIDATES`], in that order. The first pair that decodes, parses
/// and yields at least [`MIN_COLUMNS`] columns wins; its table is then normalized.
///
/// # Arguments
/// * `bytes` - Raw file content
/// * `source` - Name used in log lines and in the final error
///
/// # Returns
/// * `Result<Resolved>` - The normalized table and the chosen format
pub fn resolve_bytes(bytes: &[u8], source: &str) -> Result<Resolved> {
    let mut attempts = 0;
    let mut last = IngestError::Empty;

    for encoding in ENCODING_CANDIDATES {
        let text = match encoding.decode(bytes) {
            Ok(text) => text,
            Err(e) => {
                log::debug!("{}: not {}", source, encoding);
                attempts += DELIMITER_CANDIDATES.len();
                last = e;
                continue;
            }
        };

        for delimiter in DELIMITER_CANDIDATES {
            attempts += 1;
            let parsed = parse_table(&text, delimiter).and_then(|table| {
                if table.width() < MIN_COLUMNS {
                    Err(IngestError::TooFewColumns {
                        found: table.width(),
                        required: MIN_COLUMNS,
                    })
                } else {
                    Ok(table)
                }
            });

            match parsed {
                Ok(mut table) => {
                    normalize_table(&mut table, &NUMERIC_COLUMNS);
                    log::info!(
                        "{}: read {} rows x {} columns as {} / {}",
                        source,
                        table.height(),
                        table.width(),
                        encoding,
                        delimiter
                    );
                    return Ok(Resolved {
                        encoding,
                        delimiter,
                        table,
                    });
                }
                Err(e) => {
                    log::debug!("{}: {} / {} rejected: {}", source, encoding, delimiter, e);
                    last = e;
                }
            }
        }
    }

    log::error!("{}: no encoding/delimiter combination produced a table", source);
    Err(IngestError::Unrecognized {
        path: source.to_string(),
        attempts,
        last: Box::new(last),
    })
}

/// Read delimited bytes in a known format
///
/// Applies the same normalization as [`resolve_bytes`] but no column-count floor.
pub fn read_delimited(bytes: &[u8], encoding: TextEncoding, delimiter: Delimiter) -> Result<Table> {
    let text = encoding.decode(bytes)?;
    let mut table = parse_table(&text, delimiter)?;
    normalize_table(&mut table, &NUMERIC_COLUMNS);
    Ok(table)
}

/// Read a delimited file in a known format
pub fn read_delimited_file(
    path: impl AsRef<Path>,
    encoding: TextEncoding,
    delimiter: Delimiter,
) -> Result<Table> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_delimited(&bytes, encoding, delimiter)
}

/// Parse decoded text into a raw table
///
/// Cells are kept verbatim. Rows with fewer fields than the header are padded,
/// rows with more fields are an error.
fn parse_table(text: &str, delimiter: Delimiter) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter.byte())
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() || (headers.len() == 1 && headers[0].trim().is_empty()) {
        return Err(IngestError::Empty);
    }
    let expected = headers.len();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        if record.len() > expected {
            return Err(IngestError::RaggedRow {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                found: record.len(),
                expected,
            });
        }
        rows.push(
            record
                .iter()
                .map(|field| Value::Text(field.to_string()))
                .collect(),
        );
    }

    Ok(Table::new(headers.iter().map(str::to_string).collect(), rows))
}

/// Clean up a freshly parsed table in place
///
/// Header names and text cells are trimmed, empty cells become `Missing`, and
/// the named numeric columns are coerced, with unparseable values becoming `Missing`.
/// Later duplicates of a header name get a `.1`, `.2`, ... suffix, skipping any
/// suffixed name that is already a header of its own.
pub fn normalize_table(table: &mut Table, numeric: &[&str]) {
    dedupe_headers(table.columns_mut());

    let numeric_mask: Vec<bool> = table
        .columns()
        .iter()
        .map(|column| numeric.contains(&column.as_str()))
        .collect();

    for row in table.rows_mut().iter_mut() {
        for (value, &is_numeric) in row.iter_mut().zip(&numeric_mask) {
            *value = match std::mem::replace(value, Value::Missing) {
                Value::Text(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        Value::Missing
                    } else if is_numeric {
                        coerce_number(text)
                    } else {
                        Value::Text(text.to_string())
                    }
                }
                other => other,
            };
        }
    }
}

// Names are unique afterwards; original headers keep their spelling
fn dedupe_headers(columns: &mut [String]) {
    let originals: HashSet<String> = columns.iter().map(|c| c.trim().to_string()).collect();
    let mut taken: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();

    for column in columns.iter_mut() {
        let trimmed = column.trim().to_string();
        let name = if taken.contains(&trimmed) {
            let suffix = next_suffix.entry(trimmed.clone()).or_insert(1);
            loop {
                let candidate = format!("{}.{}", trimmed, suffix);
                *suffix += 1;
                if !taken.contains(&candidate) && !originals.contains(&candidate) {
                    break candidate;
                }
            }
        } else {
            trimmed
        };
        taken.insert(name.clone());
        *column = name;
    }
}

fn coerce_number(text: &str) -> Value {
    match text.parse::<f64>() {
        Ok(n) if !n.is_nan() => Value::Number(n),
        _ => Value::Missing,
    }
}

// KS X 1001 places both bytes of every double-byte character in 0xA1..=0xFE
fn is_strict_euc_kr(bytes: &[u8]) -> bool {
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] < 0x80 {
            i += 1;
            continue;
        }
        let in_range = |b: u8| (0xA1..=0xFE).contains(&b);
        match bytes.get(i + 1) {
            Some(&trail) if in_range(bytes[i]) && in_range(trail) => i += 2,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_euc_kr_rejects_extension_bytes() {
        let (wide, _, _) = encoding_rs::EUC_KR.encode("가나다");
        assert!(is_strict_euc_kr(&wide));
        // 0x81 0x41 is a CP949 extension syllable, outside KS X 1001
        assert!(!is_strict_euc_kr(&[0x81, 0x41]));
        assert!(!is_strict_euc_kr(&[0xB0]));
    }

    #[test]
    fn utf8_sig_drops_bom_but_utf8_keeps_it() {
        let bytes = b"\xEF\xBB\xBFid";
        assert_eq!(TextEncoding::Utf8Sig.decode(bytes).unwrap(), "id");
        assert_eq!(TextEncoding::Utf8.decode(bytes).unwrap(), "\u{feff}id");
    }

    #[test]
    fn cp949_refuses_utf8_hangul() {
        let utf8 = "서울".as_bytes();
        assert!(matches!(
            TextEncoding::Cp949.decode(utf8),
            Err(IngestError::Decode("cp949"))
        ));
    }

    #[test]
    fn longer_rows_are_rejected() {
        let err = parse_table("a,b\n1,2,3\n", Delimiter::Comma).unwrap_err();
        assert!(matches!(err, IngestError::RaggedRow { found: 3, expected: 2, .. }));
    }

    #[test]
    fn normalize_trims_coerces_and_dedupes() {
        let mut table = parse_table(
            " final_score ,name,name\n abc , Kim ,\n0.5,,Lee\n",
            Delimiter::Comma,
        )
        .unwrap();
        normalize_table(&mut table, &NUMERIC_COLUMNS);

        assert_eq!(table.columns(), ["final_score", "name", "name.1"]);
        assert_eq!(table.value(0, "final_score"), Some(&Value::Missing));
        assert_eq!(table.value(1, "final_score"), Some(&Value::Number(0.5)));
        assert_eq!(table.value(0, "name"), Some(&Value::Text("Kim".into())));
        assert_eq!(table.value(0, "name.1"), Some(&Value::Missing));
    }

    #[test]
    fn suffixes_skip_names_already_in_the_header() {
        let mut columns: Vec<String> = ["a", "a", "a.1", " a "].iter().map(|c| c.to_string()).collect();
        dedupe_headers(&mut columns);
        assert_eq!(columns, ["a", "a.2", "a.1", "a.3"]);

        let mut table = parse_table("id,id,id.1\n1,2,3\n", Delimiter::Comma).unwrap();
        normalize_table(&mut table, &[]);
        assert_eq!(table.columns(), ["id", "id.2", "id.1"]);
        assert_eq!(table.value(0, "id.1"), Some(&Value::Text("3".into())));
        assert_eq!(table.value(0, "id.2"), Some(&Value::Text("2".into())));
    }
}
