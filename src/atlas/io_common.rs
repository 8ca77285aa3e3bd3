// Conversion of the rows of a results table into candidate rows.

use std::collections::HashMap;

use crate::atlas::*;

pub const COL_AC_ID: &str = "AC ID";
pub const COL_AC_NAME: &str = "AC NAME";
pub const COL_STATE_NAME: &str = "STATE/UT NAME";
pub const COL_STATE_CODE: &str = "STATE CODE";
pub const COL_AC_NUMBER: &str = "AC NO.";
pub const COL_CANDIDATE_NAME: &str = "CANDIDATE NAME";
pub const COL_PARTY: &str = "PARTY";
pub const COL_AGE: &str = "AGE";
pub const COL_GENDER: &str = "GENDER";
pub const COL_CATEGORY: &str = "CATEGORY";
pub const COL_TOTAL: &str = "TOTAL";
pub const COL_POSTAL: &str = "POSTAL";
pub const COL_TOTAL_ELECTORS: &str = "TOTAL ELECTORS";
pub const COL_YEAR: &str = "YEAR";
pub const COL_BYELECTION: &str = "BYELECTION";
pub const COL_WIKI_LINK: &str = "WIKIPEDIA LINK";

const REQUIRED_COLUMNS: [&str; 2] = [COL_AC_ID, COL_TOTAL];

/// A cell, as read by any of the table readers.
#[derive(PartialEq, Debug, Clone)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl CellValue {
    /// Builds a cell from text, as found in csv files.
    pub fn from_text(s: &str) -> CellValue {
        let t = s.trim();
        if t.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(t.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Integral numbers only. Numbers stored as text are accepted.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            CellValue::Int(i) if *i >= 0 => Some(*i as u64),
            CellValue::Float(f) if *f >= 0.0 && f.fract() == 0.0 => Some(*f as u64),
            CellValue::Text(s) => {
                let t = s.trim();
                t.parse::<u64>().ok().or_else(|| {
                    t.parse::<f64>()
                        .ok()
                        .and_then(|f| CellValue::Float(f).as_u64())
                })
            }
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) if s.trim().is_empty() => None,
            CellValue::Text(s) => Some(s.trim().to_string()),
            CellValue::Int(i) => Some(i.to_string()),
            CellValue::Float(f) => Some(f.to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            CellValue::Int(0) => Some(false),
            CellValue::Int(1) => Some(true),
            CellValue::Float(f) if *f == 0.0 => Some(false),
            CellValue::Float(f) if *f == 1.0 => Some(true),
            CellValue::Text(s) => match s.trim().to_uppercase().as_str() {
                "0" | "FALSE" | "NO" => Some(false),
                "1" | "TRUE" | "YES" => Some(true),
                _ => None,
            },
            _ => None,
        }
    }
}

/// The positions of the recognized columns in a table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnMap {
    indices: HashMap<&'static str, usize>,
}

impl ColumnMap {
    const KNOWN: [&'static str; 16] = [
        COL_AC_ID,
        COL_AC_NAME,
        COL_STATE_NAME,
        COL_STATE_CODE,
        COL_AC_NUMBER,
        COL_CANDIDATE_NAME,
        COL_PARTY,
        COL_AGE,
        COL_GENDER,
        COL_CATEGORY,
        COL_TOTAL,
        COL_POSTAL,
        COL_TOTAL_ELECTORS,
        COL_YEAR,
        COL_BYELECTION,
        COL_WIKI_LINK,
    ];

    /// Finds the columns by name. Unknown columns are ignored.
    pub fn from_header(header: &[String], path: &str) -> BAtlasResult<ColumnMap> {
        let mut indices: HashMap<&'static str, usize> = HashMap::new();
        for (idx, name) in header.iter().enumerate() {
            let name = name.trim();
            match ColumnMap::KNOWN.iter().find(|k| **k == name) {
                Some(k) => {
                    if indices.contains_key(k) {
                        warn!(
                            "{}: column {:?} appears several times, using the first one",
                            path, k
                        );
                    } else {
                        indices.insert(*k, idx);
                    }
                }
                None => debug!("{}: ignoring column {:?}", path, name),
            }
        }
        for name in REQUIRED_COLUMNS.iter() {
            ensure!(
                indices.contains_key(name),
                MissingColumnSnafu {
                    path,
                    name: name.to_string()
                }
            );
        }
        for name in ColumnMap::KNOWN.iter() {
            if !indices.contains_key(name) {
                info!("{}: no column {:?}, this field will be empty", path, name);
            }
        }
        Ok(ColumnMap { indices })
    }

    fn cell<'a>(&self, cells: &'a [CellValue], name: &str) -> Option<&'a CellValue> {
        self.indices.get(name).and_then(|idx| cells.get(*idx))
    }

    fn text(&self, cells: &[CellValue], name: &str) -> Option<String> {
        self.cell(cells, name).and_then(|c| c.as_text())
    }

    fn number(&self, cells: &[CellValue], name: &str) -> Option<u64> {
        self.cell(cells, name).and_then(|c| c.as_u64())
    }

    fn required_number(
        &self,
        cells: &[CellValue],
        name: &str,
        path: &str,
        lineno: usize,
    ) -> BAtlasResult<u64> {
        let cell = self.cell(cells, name).unwrap_or(&CellValue::Empty);
        let x = cell.as_u64().context(WrongCellTypeSnafu {
            path,
            lineno,
            column: name,
            content: format!("{:?}", cell),
        })?;
        Ok(x)
    }

    /// Reads one candidate row. Returns None for a blank row.
    pub fn read_row(
        &self,
        cells: &[CellValue],
        path: &str,
        lineno: usize,
    ) -> BAtlasResult<Option<RawRow>> {
        if cells.iter().all(|c| c.is_empty()) {
            debug!("{}: skipping blank line {}", path, lineno);
            return Ok(None);
        }
        let small = |name: &str| self.number(cells, name).and_then(|x| u32::try_from(x).ok());
        let row = RawRow {
            ac_id: self.required_number(cells, COL_AC_ID, path, lineno)?,
            ac_name: self.text(cells, COL_AC_NAME).unwrap_or_default(),
            state_name: self.text(cells, COL_STATE_NAME).unwrap_or_default(),
            state_code: self.text(cells, COL_STATE_CODE),
            ac_number: small(COL_AC_NUMBER),
            candidate_name: self.text(cells, COL_CANDIDATE_NAME).unwrap_or_default(),
            party: self.text(cells, COL_PARTY).unwrap_or_default(),
            age: small(COL_AGE),
            gender: self.text(cells, COL_GENDER).map(|s| s.to_uppercase()),
            category: self.text(cells, COL_CATEGORY).map(|s| s.to_uppercase()),
            votes: self.required_number(cells, COL_TOTAL, path, lineno)?,
            postal_votes: self.number(cells, COL_POSTAL),
            total_electors: self.number(cells, COL_TOTAL_ELECTORS),
            year: small(COL_YEAR),
            by_election: self.cell(cells, COL_BYELECTION).and_then(|c| c.as_bool()),
            wiki_link: self.text(cells, COL_WIKI_LINK),
        };
        Ok(Some(row))
    }
}

/// Reads a whole table: the header first, then one candidate per row.
/// Every row comes with its line number in the source, starting at 1.
pub fn read_table<I>(mut rows: I, path: &str) -> BAtlasResult<Vec<RawRow>>
where
    I: Iterator<Item = (usize, Vec<CellValue>)>,
{
    let (_, header_cells) = rows.next().context(MissingHeaderSnafu { path })?;
    let header: Vec<String> = header_cells
        .iter()
        .map(|c| c.as_text().unwrap_or_default())
        .collect();
    debug!("{}: header: {:?}", path, header);
    let columns = ColumnMap::from_header(&header, path)?;

    let mut res: Vec<RawRow> = Vec::new();
    for (lineno, cells) in rows {
        if let Some(row) = columns.read_row(&cells, path, lineno)? {
            res.push(row);
        }
    }
    info!("{}: read {} candidate rows", path, res.len());
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|s| CellValue::from_text(s)).collect()
    }

    fn numbered(rows: Vec<Vec<CellValue>>) -> impl Iterator<Item = (usize, Vec<CellValue>)> {
        rows.into_iter().enumerate().map(|(idx, r)| (idx + 1, r))
    }

    #[test]
    fn cell_conversions() {
        assert_eq!(CellValue::Float(12.0).as_u64(), Some(12));
        assert_eq!(CellValue::Float(12.5).as_u64(), None);
        assert_eq!(CellValue::Int(-3).as_u64(), None);
        assert_eq!(CellValue::Text(" 42 ".to_string()).as_u64(), Some(42));
        assert_eq!(CellValue::Text("42.0".to_string()).as_u64(), Some(42));
        assert_eq!(CellValue::Text("yes".to_string()).as_bool(), Some(true));
        assert_eq!(CellValue::Int(0).as_bool(), Some(false));
        assert_eq!(CellValue::Text("maybe".to_string()).as_bool(), None);
        assert_eq!(CellValue::Int(7).as_text(), Some("7".to_string()));
    }

    #[test]
    fn table_with_optional_columns() {
        let rows = vec![
            text_row(&["PARTY", "AC ID", "TOTAL", "AGE", "EXTRA"]),
            text_row(&["AAA", "3", "120", "forty"]),
            text_row(&["", "", "", ""]),
            text_row(&["BBB", "3", "80", "51", "x"]),
        ];
        let res = read_table(numbered(rows), "test").unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].party, "AAA");
        assert_eq!(res[0].age, None);
        assert_eq!(res[1].age, Some(51));
        assert_eq!(res[1].votes, 80);
        assert_eq!(res[1].total_electors, None);
    }

    #[test]
    fn missing_required_column() {
        let rows = vec![text_row(&["AC ID", "PARTY"]), text_row(&["1", "AAA"])];
        let err = read_table(numbered(rows), "test").unwrap_err();
        assert!(matches!(*err, AtlasError::MissingColumn { ref name, .. } if name == "TOTAL"));
    }

    #[test]
    fn bad_required_cell_reports_the_line() {
        let rows = vec![
            text_row(&["AC ID", "TOTAL"]),
            text_row(&["1", "10"]),
            text_row(&["1", "ten"]),
        ];
        let err = read_table(numbered(rows), "test").unwrap_err();
        assert!(matches!(*err, AtlasError::WrongCellType { lineno: 3, .. }));
    }

    #[test]
    fn empty_table() {
        let err = read_table(numbered(vec![]), "test").unwrap_err();
        assert!(matches!(*err, AtlasError::MissingHeader { .. }));
    }
}
