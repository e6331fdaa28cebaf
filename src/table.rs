use serde::Serialize;
use std::fmt;

/// A single cell of an ingested table
///
/// Text cells are never empty: empty input becomes `Missing` during
/// normalization, which is also the marker for failed numeric coercion.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(f64),
    Missing,
}

impl Value {
    /// Text content, if this is a text cell
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Numeric content, if this is a number cell
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    /// Formats the cell the way it is written back to delimited text
    ///
    /// Numbers use the shortest representation that parses back to the same
    /// `f64`, and missing cells are rendered as an empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => f.write_str(text),
            Value::Number(n) => write!(f, "{}", n),
            Value::Missing => Ok(()),
        }
    }
}

/// Structured table produced by ingestion
///
/// Columns are ordered and named; every row holds exactly one value per column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table from a header and its rows
    ///
    /// # Arguments
    /// * `columns` - Column names, in file order
    /// * `rows` - Row values; rows shorter than the header are padded with `Missing`,
    ///   longer rows are truncated
    ///
    /// # Returns
    /// * `Table` - The rectangular table
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Missing);
                row
            })
            .collect();
        Table { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Position of a named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// All values of a named column, top to bottom
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    /// Value at a given row of a named column
    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        let index = self.column_index(name)?;
        self.rows.get(row).map(|values| &values[index])
    }

    /// Build a new table holding only the given rows, in the given order
    ///
    /// Out-of-range indices are ignored.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        let rows = indices
            .iter()
            .filter_map(|&i| self.rows.get(i).cloned())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    pub(crate) fn columns_mut(&mut self) -> &mut Vec<String> {
        &mut self.columns
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<Value>> {
        &mut self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec!["id".to_string(), "score".to_string(), "city".to_string()],
            vec![
                vec![Value::Text("a".into()), Value::Number(0.5)],
                vec![
                    Value::Text("b".into()),
                    Value::Missing,
                    Value::Text("Seoul".into()),
                ],
            ],
        )
    }

    #[test]
    fn short_rows_are_padded_with_missing() {
        let table = sample();
        assert_eq!(table.width(), 3);
        assert_eq!(table.value(0, "city"), Some(&Value::Missing));
    }

    #[test]
    fn column_iterates_in_row_order() {
        let table = sample();
        let ids: Vec<_> = table
            .column("id")
            .unwrap()
            .filter_map(Value::as_text)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(table.column("nope").is_none());
    }

    #[test]
    fn select_rows_keeps_header_and_order() {
        let table = sample().select_rows(&[1, 0, 7]);
        assert_eq!(table.height(), 2);
        assert_eq!(table.columns(), sample().columns());
        assert_eq!(table.value(0, "id"), Some(&Value::Text("b".into())));
    }

    #[test]
    fn display_writes_missing_as_empty() {
        assert_eq!(Value::Missing.to_string(), "");
        assert_eq!(Value::Number(0.81).to_string(), "0.81");
        assert_eq!(Value::Text("x y".into()).to_string(), "x y");
    }
}
