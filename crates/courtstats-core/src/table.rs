// Column-oriented in-memory table.
//
// Season files arrive as CSV with dozens of loosely-typed columns, so the
// pipeline carries them as named columns rather than fixed structs. A column
// is numeric when every non-empty cell parses as a number; everything else is
// text. Missing cells (empty, NaN, +-inf) are `None`.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("column `{name}` has {actual} rows but the table has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("missing column `{0}`")]
    MissingColumn(String),

    #[error("column `{0}` is not numeric")]
    NotNumeric(String),
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Num(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Num(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An all-missing column of the same kind.
    fn missing_like(&self, len: usize) -> Column {
        match self {
            Column::Num(_) => Column::Num(vec![None; len]),
            Column::Text(_) => Column::Text(vec![None; len]),
        }
    }

    fn select(&self, rows: &[usize]) -> Column {
        match self {
            Column::Num(v) => Column::Num(rows.iter().map(|&r| v[r]).collect()),
            Column::Text(v) => Column::Text(rows.iter().map(|&r| v[r].clone()).collect()),
        }
    }

    fn into_text(self) -> Vec<Option<String>> {
        match self {
            Column::Num(v) => v.into_iter().map(|c| c.map(format_number)).collect(),
            Column::Text(v) => v,
        }
    }

    /// Cell rendered for CSV output and join keys. Missing is the empty string.
    fn cell(&self, row: usize) -> Option<String> {
        match self {
            Column::Num(v) => v[row].map(format_number),
            Column::Text(v) => v[row].clone(),
        }
    }
}

/// Integral values print without a fractional part so ids survive a round trip.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn parse_cell(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: HashMap<String, Column>,
    len: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty table with a fixed row count, for building columns one by one.
    pub fn with_rows(len: usize) -> Self {
        Self {
            len,
            ..Self::default()
        }
    }

    /// Parse a CSV document with a header row.
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(rdr);

        let mut names: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for header in reader.headers()?.iter() {
            // Duplicate headers get a numeric suffix, the way spreadsheet exports do.
            let mut name = header.to_string();
            let mut n = 1;
            while seen.contains(&name) {
                name = format!("{header}.{n}");
                n += 1;
            }
            seen.insert(name.clone());
            names.push(name);
        }

        let mut raw: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        for record in reader.records() {
            let record = record?;
            for (i, cells) in raw.iter_mut().enumerate() {
                cells.push(record.get(i).unwrap_or("").to_string());
            }
        }

        let len = raw.first().map_or(0, Vec::len);
        let mut table = Table::with_rows(len);
        for (name, cells) in names.into_iter().zip(raw) {
            let numeric = cells
                .iter()
                .all(|c| c.is_empty() || c.parse::<f64>().is_ok());
            let column = if numeric {
                Column::Num(cells.iter().map(|c| parse_cell(c)).collect())
            } else {
                Column::Text(
                    cells
                        .into_iter()
                        .map(|c| if c.is_empty() { None } else { Some(c) })
                        .collect(),
                )
            };
            table.set_column(&name, column)?;
        }
        Ok(table)
    }

    /// Write the table as CSV with a header row. Missing cells are empty.
    pub fn to_writer<W: Write>(&self, wtr: W) -> Result<(), TableError> {
        let mut writer = csv::Writer::from_writer(wtr);
        if self.names.is_empty() {
            writer.flush().map_err(csv::Error::from)?;
            return Ok(());
        }
        writer.write_record(&self.names)?;
        for row in 0..self.len {
            let record: Vec<String> = self
                .names
                .iter()
                .map(|n| self.columns[n].cell(row).unwrap_or_default())
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Numeric column values, or `None` if absent or not numeric.
    pub fn num(&self, name: &str) -> Option<&[Option<f64>]> {
        match self.columns.get(name) {
            Some(Column::Num(v)) => Some(v),
            _ => None,
        }
    }

    pub fn require_num(&self, name: &str) -> Result<&[Option<f64>], TableError> {
        match self.columns.get(name) {
            Some(Column::Num(v)) => Ok(v),
            Some(Column::Text(_)) => Err(TableError::NotNumeric(name.to_string())),
            None => Err(TableError::MissingColumn(name.to_string())),
        }
    }

    pub fn text(&self, name: &str) -> Option<&[Option<String>]> {
        match self.columns.get(name) {
            Some(Column::Text(v)) => Some(v),
            _ => None,
        }
    }

    pub fn f64_at(&self, row: usize, name: &str) -> Option<f64> {
        match self.columns.get(name)? {
            Column::Num(v) => v[row],
            Column::Text(v) => v[row].as_deref().and_then(parse_cell),
        }
    }

    /// Cell as a string key regardless of column type (numbers print integral
    /// values without a fraction).
    pub fn key_at(&self, row: usize, name: &str) -> Option<String> {
        self.columns.get(name)?.cell(row)
    }

    /// Insert or overwrite a column. Overwriting keeps the column's position.
    pub fn set_column(&mut self, name: &str, column: Column) -> Result<(), TableError> {
        if self.names.is_empty() && self.len == 0 {
            self.len = column.len();
        }
        if column.len() != self.len {
            return Err(TableError::LengthMismatch {
                name: name.to_string(),
                expected: self.len,
                actual: column.len(),
            });
        }
        if !self.columns.contains_key(name) {
            self.names.push(name.to_string());
        }
        self.columns.insert(name.to_string(), column);
        Ok(())
    }

    pub fn set_num(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<(), TableError> {
        let values = values
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
        self.set_column(name, Column::Num(values))
    }

    pub fn set_text(&mut self, name: &str, values: Vec<Option<String>>) -> Result<(), TableError> {
        self.set_column(name, Column::Text(values))
    }

    /// Fill every row of a numeric column with one value.
    pub fn set_constant(&mut self, name: &str, value: Option<f64>) -> Result<(), TableError> {
        self.set_num(name, vec![value; self.len])
    }

    /// Replace missing cells of a numeric column, creating it if absent.
    pub fn fill_missing(&mut self, name: &str, value: f64) -> Result<(), TableError> {
        let filled: Vec<Option<f64>> = match self.columns.get(name) {
            Some(Column::Num(v)) => v.iter().map(|c| Some(c.unwrap_or(value))).collect(),
            Some(Column::Text(_)) => return Err(TableError::NotNumeric(name.to_string())),
            None => vec![Some(value); self.len],
        };
        self.set_num(name, filled)
    }

    /// Remove a column, returning it if it existed.
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let column = self.columns.remove(name)?;
        self.names.retain(|n| n != name);
        Some(column)
    }

    /// New table holding the given rows in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Table {
        let mut out = Table::with_rows(rows.len());
        for name in &self.names {
            out.names.push(name.clone());
            out.columns.insert(name.clone(), self.columns[name].select(rows));
        }
        out
    }

    /// Keep the first row for each distinct value of `key` (missing counts as
    /// one value).
    pub fn dedup_by(&self, key: &str) -> Table {
        let mut seen: HashSet<Option<String>> = HashSet::new();
        let rows: Vec<usize> = (0..self.len)
            .filter(|&r| seen.insert(self.key_at(r, key)))
            .collect();
        self.select_rows(&rows)
    }

    /// Stack tables vertically. The result has the union of all columns in
    /// first-seen order; rows from tables lacking a column are missing there.
    /// A column that is numeric in one table and text in another becomes text.
    pub fn concat(tables: &[Table]) -> Table {
        let mut names: Vec<String> = Vec::new();
        let mut text_columns: HashSet<String> = HashSet::new();
        for table in tables {
            for name in &table.names {
                if !names.contains(name) {
                    names.push(name.clone());
                }
                if matches!(table.columns[name], Column::Text(_)) {
                    text_columns.insert(name.clone());
                }
            }
        }

        let total: usize = tables.iter().map(Table::len).sum();
        let mut out = Table::with_rows(total);
        for name in names {
            let column = if text_columns.contains(&name) {
                let mut cells = Vec::with_capacity(total);
                for table in tables {
                    match table.columns.get(&name) {
                        Some(c) => cells.extend(c.clone().into_text()),
                        None => cells.extend(std::iter::repeat(None).take(table.len)),
                    }
                }
                Column::Text(cells)
            } else {
                let mut cells = Vec::with_capacity(total);
                for table in tables {
                    match table.columns.get(&name) {
                        Some(Column::Num(v)) => cells.extend_from_slice(v),
                        _ => cells.extend(std::iter::repeat(None).take(table.len)),
                    }
                }
                Column::Num(cells)
            };
            out.names.push(name.clone());
            out.columns.insert(name, column);
        }
        out
    }

    /// Append every column of `other` (same row count) onto this table.
    /// Name clashes get `_x` on this side and `_y` on the other.
    pub fn append_columns(&mut self, other: &Table) -> Result<(), TableError> {
        for name in &other.names {
            let column = other.columns[name].clone();
            if self.columns.contains_key(name) {
                let ours = self.columns.remove(name).unwrap_or_else(|| column.missing_like(self.len));
                let pos = self.names.iter().position(|n| n == name);
                if let Some(pos) = pos {
                    self.names[pos] = format!("{name}_x");
                }
                self.columns.insert(format!("{name}_x"), ours);
                self.set_column(&format!("{name}_y"), column)?;
            } else {
                self.set_column(name, column)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_columns_are_typed_by_content() {
        let csv_data = "\
player_id,player,g,mp
abc01,Ann Alpha,10,200.5
def02,Bea Beta,,150";

        let table = Table::from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.column_names(), &["player_id", "player", "g", "mp"]);
        assert!(table.num("g").is_some());
        assert!(table.text("player").is_some());
        assert_eq!(table.f64_at(0, "mp"), Some(200.5));
        assert_eq!(table.f64_at(1, "g"), None);
        assert_eq!(table.key_at(0, "player_id").as_deref(), Some("abc01"));
    }

    #[test]
    fn nan_and_inf_cells_are_missing() {
        let csv_data = "\
a,b
NaN,1
inf,2";

        let table = Table::from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(table.num("a").unwrap(), &[None, None]);
        assert_eq!(table.f64_at(1, "b"), Some(2.0));
    }

    #[test]
    fn duplicate_headers_get_suffix() {
        let csv_data = "\
x,x
1,2";
        let table = Table::from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(table.column_names(), &["x", "x.1"]);
    }

    #[test]
    fn set_column_rejects_length_mismatch() {
        let mut table = Table::with_rows(3);
        table.set_num("a", vec![Some(1.0), Some(2.0), None]).unwrap();
        let err = table.set_num("b", vec![Some(1.0)]).unwrap_err();
        match err {
            TableError::LengthMismatch { expected, actual, .. } => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 1);
            }
            other => panic!("expected LengthMismatch, got: {other}"),
        }
    }

    #[test]
    fn overwrite_keeps_position_and_drops_non_finite() {
        let mut table = Table::with_rows(2);
        table.set_num("a", vec![Some(1.0), Some(2.0)]).unwrap();
        table.set_num("b", vec![Some(1.0), Some(2.0)]).unwrap();
        table.set_num("a", vec![Some(f64::INFINITY), Some(5.0)]).unwrap();
        assert_eq!(table.column_names(), &["a", "b"]);
        assert_eq!(table.num("a").unwrap(), &[None, Some(5.0)]);
    }

    #[test]
    fn concat_unions_columns() {
        let mut a = Table::with_rows(1);
        a.set_num("x", vec![Some(1.0)]).unwrap();
        let mut b = Table::with_rows(2);
        b.set_num("y", vec![Some(2.0), Some(3.0)]).unwrap();
        b.set_text("x", vec![Some("t".into()), None]).unwrap();

        let c = Table::concat(&[a, b]);
        assert_eq!(c.len(), 3);
        assert_eq!(c.column_names(), &["x", "y"]);
        assert_eq!(c.text("x").unwrap()[0].as_deref(), Some("1"));
        assert_eq!(c.num("y").unwrap(), &[None, Some(2.0), Some(3.0)]);
    }

    #[test]
    fn dedup_keeps_first() {
        let csv_data = "\
id,v
a,1
b,2
a,3";
        let table = Table::from_reader(csv_data.as_bytes()).unwrap();
        let deduped = table.dedup_by("id");
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped.num("v").unwrap(), &[Some(1.0), Some(2.0)]);
    }

    #[test]
    fn append_columns_suffixes_clashes() {
        let mut left = Table::with_rows(1);
        left.set_num("k", vec![Some(1.0)]).unwrap();
        left.set_num("v", vec![Some(2.0)]).unwrap();
        let mut right = Table::with_rows(1);
        right.set_num("v", vec![Some(3.0)]).unwrap();

        left.append_columns(&right).unwrap();
        assert_eq!(left.column_names(), &["k", "v_x", "v_y"]);
        assert_eq!(left.f64_at(0, "v_y"), Some(3.0));
    }

    #[test]
    fn remove_column_drops_name_and_values() {
        let mut table = Table::from_reader("a,b,c\n1,2,3".as_bytes()).unwrap();
        assert_eq!(table.remove_column("b"), Some(Column::Num(vec![Some(2.0)])));
        assert_eq!(table.column_names(), &["a", "c"]);
        assert!(table.remove_column("b").is_none());
    }

    #[test]
    fn writer_renders_missing_as_empty() {
        let mut table = Table::with_rows(2);
        table.set_num("id", vec![Some(5.0), Some(0.25)]).unwrap();
        table.set_text("name", vec![None, Some("B".into())]).unwrap();

        let mut out = Vec::new();
        table.to_writer(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "id,name\n5,\n0.25,B\n");
    }

    #[test]
    fn table_without_columns_writes_nothing() {
        let mut out = Vec::new();
        Table::new().to_writer(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
