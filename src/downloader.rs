use crate::error::ExportError;
use crate::table::Table;
#[cfg(feature = "web")]
use crate::table::Value;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Name of the single sheet in a spreadsheet export
pub const SHEET_NAME: &str = "Recommendations";

/// Convert a table to CSV bytes
///
/// The output is UTF-8 with a leading byte-order mark so spreadsheet programs
/// pick the right encoding. The header row carries the table's column names,
/// numbers use their shortest round-trip form and missing cells are empty.
///
/// # Arguments
/// * `table` - Table to export
///
/// # Returns
/// * `Result<Vec<u8>, ExportError>` - CSV content or an error
///
/// # Examples
/// ```
/// use recviewer::table::{Table, Value};
/// use recviewer::downloader::to_csv;
///
/// let table = Table::new(vec!["id".into()], vec![vec![Value::Text("a".into())]]);
/// let csv = to_csv(&table).unwrap();
/// assert!(csv.starts_with(b"\xEF\xBB\xBFid"));
/// ```
pub fn to_csv(table: &Table) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|value| value.to_string()))?;
    }
    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

/// Convert a table to XLSX bytes
///
/// Numbers are written as numeric cells, text as strings and missing cells are left blank.
///
/// # Arguments
/// * `table` - Table to export
///
/// # Returns
/// * `Result<Vec<u8>, ExportError>` - XLSX file content or an error
#[cfg(feature = "web")]
pub fn to_xlsx(table: &Table) -> Result<Vec<u8>, ExportError> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    workbook.push_worksheet(recommendations_sheet(table)?);
    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}

/// Lay a table out on a worksheet named [`SHEET_NAME`] with a bold header row
#[cfg(feature = "web")]
fn recommendations_sheet(table: &Table) -> Result<rust_xlsxwriter::Worksheet, ExportError> {
    use rust_xlsxwriter::{Format, Worksheet};

    let mut worksheet = Worksheet::new();
    worksheet.set_name(SHEET_NAME)?;

    let header = Format::new().set_bold();
    for (c, column) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, column, &header)?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, value) in row.iter().enumerate() {
            let c = c as u16;
            match value {
                Value::Text(text) => {
                    worksheet.write_string(r, c, text)?;
                }
                Value::Number(n) => {
                    worksheet.write_number(r, c, *n)?;
                }
                Value::Missing => {}
            }
        }
    }

    Ok(worksheet)
}

/// Download file name for a student's export, e.g. `student_42_recommendations.csv`
pub fn export_file_name(student_id: &str, extension: &str) -> String {
    format!("student_{}_recommendations.{}", student_id.trim(), extension)
}
