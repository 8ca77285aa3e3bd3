// Primitives for reading CSV files.

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::atlas::io_common::{read_table, CellValue};
use crate::atlas::*;

const STDIN_PATH: &str = "-";

/// Reads a csv file. The path `-` reads the standard input.
pub fn read_csv_file(path: &Path) -> BAtlasResult<Vec<RawRow>> {
    if path == Path::new(STDIN_PATH) {
        let mut text = String::new();
        std::io::stdin()
            .lock()
            .read_to_string(&mut text)
            .context(CsvOpenSnafu { path: "<stdin>" })?;
        return read_csv(&text, "<stdin>");
    }
    let path_s = path.display().to_string();
    let text = fs::read_to_string(path).context(CsvOpenSnafu {
        path: path_s.clone(),
    })?;
    read_csv(&text, &path_s)
}

/// Reads candidate rows from csv text.
pub fn read_csv(text: &str, path: &str) -> BAtlasResult<Vec<RawRow>> {
    let mut builder = csv::ReaderBuilder::new();
    // The header goes through the same path as the other rows.
    builder.has_headers(false).flexible(true);
    let rdr = builder.from_reader(text.as_bytes());

    let mut rows: Vec<(usize, Vec<CellValue>)> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        let line = line_r.context(CsvLineParseSnafu {
            path,
            lineno: idx + 1,
        })?;
        let lineno = line
            .position()
            .map(|p| physical_line(text, p.byte() as usize))
            .unwrap_or(idx + 1);
        rows.push((lineno, line.iter().map(CellValue::from_text).collect()));
    }
    read_table(rows.into_iter(), path)
}

/// The 1-based line of the record starting at `byte`.
///
/// The reader skips blank lines without counting them in the positions it
/// reports, so the line is counted from the text itself. A record never
/// starts with a line break: any found at `byte` belong to skipped lines.
fn physical_line(text: &str, byte: usize) -> usize {
    let bytes = text.as_bytes();
    let mut start = byte.min(bytes.len());
    while start < bytes.len() && (bytes[start] == b'\n' || bytes[start] == b'\r') {
        start += 1;
    }
    bytes[..start].iter().filter(|b| **b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_from_bytes() {
        let data = "\
AC ID,AC NAME,STATE/UT NAME,PARTY,TOTAL,TOTAL ELECTORS,BYELECTION
1,Alpha,Goa,AAA,300,1000,NO
1,Alpha,Goa,BBB,200,1000,NO

2,Beta,Goa,AAA,100,,1
";
        let rows = read_csv(data, "memory").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].ac_name, "Alpha");
        assert_eq!(rows[0].total_electors, Some(1000));
        assert_eq!(rows[0].by_election, Some(false));
        assert_eq!(rows[2].ac_id, 2);
        assert_eq!(rows[2].total_electors, None);
        assert_eq!(rows[2].by_election, Some(true));
    }

    #[test]
    fn quoted_fields() {
        let data = "AC ID,AC NAME,TOTAL\n7,\"Name, with comma\",\" 12 \"\n";
        let rows = read_csv(data, "memory").unwrap();
        assert_eq!(rows[0].ac_name, "Name, with comma");
        assert_eq!(rows[0].votes, 12);
    }

    #[test]
    fn bad_vote_count() {
        let data = "AC ID,TOTAL\n7,12\n\n8,n/a\n";
        let err = read_csv(data, "memory").unwrap_err();
        assert!(matches!(*err, AtlasError::WrongCellType { lineno: 4, .. }));
        assert!(err.to_string().contains("TOTAL"));
    }

    #[test]
    fn line_numbers_count_skipped_lines() {
        let data = "AC ID,TOTAL\r\n\r\n7,12\r\n\r\n\r\n8,-3\r\n";
        let err = read_csv(data, "memory").unwrap_err();
        assert!(matches!(*err, AtlasError::WrongCellType { lineno: 6, .. }));
        assert_eq!(physical_line(data, 0), 1);
        assert_eq!(physical_line(data, 13), 3);
    }

    #[test]
    fn missing_file() {
        let err = read_csv_file(Path::new("/nonexistent/results.csv")).unwrap_err();
        assert!(matches!(*err, AtlasError::CsvOpen { .. }));
    }
}
