use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::{debug, info};
use snafu::prelude::*;

use entrant_selection::builder::Builder;

use crate::draw::{
    io_common::{reading_rules, resolve_layout, Roster, RosterColumns},
    *,
};

/// Reads the responses of a Microsoft Forms or Google Forms survey, exported
/// in the Excel format. The first row holds the questions.
pub fn read_msforms_roster(
    path: &str,
    worksheet_name: &Option<String>,
    columns: &RosterColumns,
) -> DrawResult<Roster> {
    let wrange = get_range(path, worksheet_name)?;

    let header = wrange.rows().next().context(EmptyExcelSnafu { path })?;
    debug!("read_msforms_roster: header: {:?}", header);
    let layout = resolve_layout(columns, &remap_header(header), path)?;
    let mut builder =
        Builder::new(&reading_rules(&layout)).context(InvalidRowSnafu { lineno: 1usize, path })?;

    let mut iter = wrange.rows();
    iter.next();
    for (idx, row) in iter.enumerate() {
        // Excel rows start at 1, and the first one is the header.
        let lineno = idx + 2;
        if row.iter().all(|c| matches!(c, DataType::Empty)) {
            debug!("read_msforms_roster: lineno: {:?} empty row", lineno);
            continue;
        }
        let email = read_cell(row, layout.email_idx, lineno)?;
        let name = read_cell(row, layout.name_idx, lineno)?;
        let mut answers: Vec<String> = Vec::new();
        for (col, _) in layout.questions.iter() {
            answers.push(read_cell(row, *col, lineno)?);
        }
        debug!(
            "read_msforms_roster: lineno: {:?} email: {:?} answers: {:?}",
            lineno, &email, &answers
        );
        builder
            .add_respondent(&email, &name, &answers)
            .context(InvalidRowSnafu { lineno, path })?;
    }
    let respondents = builder.build();
    info!(
        "read_msforms_roster: {} respondents read from {}",
        respondents.len(),
        path
    );
    Ok(Roster {
        questions: layout.question_names(),
        respondents,
    })
}

fn remap_header(header: &[DataType]) -> Vec<Option<String>> {
    header
        .iter()
        .map(|dt| match dt {
            DataType::String(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

// A missing cell at the end of a row reads as empty.
fn read_cell(row: &[DataType], col: usize, lineno: usize) -> DrawResult<String> {
    match row.get(col) {
        None => Ok("".to_string()),
        Some(cell) => cell_text(cell).context(ExcelWrongCellTypeSnafu {
            lineno: lineno as u64,
            content: format!("{:?}", cell),
        }),
    }
}

/// The text of a cell. Numbers and booleans are written out, so that they
/// never equal an accepted answer by accident.
fn cell_text(cell: &DataType) -> Option<String> {
    match cell {
        DataType::String(s) => Some(s.clone()),
        DataType::Empty => Some("".to_string()),
        DataType::Int(i) => Some(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
            Some(format!("{}", *f as i64))
        }
        DataType::Float(f) => Some(f.to_string()),
        DataType::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn get_range(path: &str, worksheet_name_o: &Option<String>) -> DrawResult<calamine::Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(worksheet_name)
            .context(MissingWorksheetSnafu {
                name: worksheet_name.clone(),
                path,
            })?
            .context(OpeningExcelSnafu { path })?;

        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => EmptyExcelSnafu { path }.fail(),
            [(worksheet_name, wrange)] => {
                debug!("get_range: path: {:?} worksheet: {:?}", path, worksheet_name);
                Ok(wrange.clone())
            }
            _ => AmbiguousWorksheetSnafu {
                names: all_worksheets
                    .iter()
                    .map(|(n, _)| n.clone())
                    .collect::<Vec<String>>(),
                path,
            }
            .fail(),
        }
    }
}
