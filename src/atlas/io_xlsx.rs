// Primitives for reading Excel workbooks.

use std::path::Path;

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::atlas::io_common::{read_table, CellValue};
use crate::atlas::*;

/// Reads the candidate rows of a workbook.
/// Without a worksheet name, the first worksheet is used.
pub fn read_excel_file(path: &Path, worksheet: Option<&str>) -> BAtlasResult<Vec<RawRow>> {
    let path_s = path.display().to_string();
    let wrange = get_range(path, &path_s, worksheet)?;
    // The used range may not start at the first row of the sheet.
    let first_row = wrange.start().map(|(r, _)| r as usize).unwrap_or(0);
    debug!(
        "read_excel_file: {}: {:?} cells starting at row {}",
        path_s,
        wrange.get_size(),
        first_row + 1
    );
    let rows = wrange
        .rows()
        .enumerate()
        .map(|(idx, row)| (first_row + idx + 1, row.iter().map(read_cell).collect()));
    read_table(rows, &path_s)
}

fn get_range(path: &Path, path_s: &str, worksheet: Option<&str>) -> BAtlasResult<Range<DataType>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path: path_s })?;
    let wrange = match worksheet {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { path: path_s, name })?
            .context(OpeningExcelSnafu { path: path_s })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path: path_s })?
            .context(OpeningExcelSnafu { path: path_s })?,
    };
    Ok(wrange)
}

fn read_cell(cell: &DataType) -> CellValue {
    match cell {
        DataType::Empty => CellValue::Empty,
        DataType::String(s) => CellValue::from_text(s),
        DataType::Int(i) => CellValue::Int(*i),
        DataType::Float(f) => CellValue::Float(*f),
        DataType::Bool(b) => CellValue::Bool(*b),
        other => {
            debug!("read_cell: unsupported cell {:?}, reading it as empty", other);
            CellValue::Empty
        }
    }
}
