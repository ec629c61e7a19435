use log::debug;
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::Path;

use crate::draw::*;

pub const DEFAULT_EMAIL_COLUMN: &str = "UCL Email Address";
pub const DEFAULT_NAME_COLUMN: &str = "Full Name (on your UCL Student Card)";
/// Column E of a form export: the questions come after the id, the
/// timestamps and the respondent's own details.
pub const DEFAULT_FIRST_ELIGIBILITY_COLUMN: usize = 4;

/// How the eligibility questions are found in the header of a roster.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum EligibilityColumns {
    /// The header of each question.
    Named(Vec<String>),
    /// All the columns from this (0-based) position onward.
    From(usize),
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RosterColumns {
    pub email: String,
    pub name: String,
    pub eligibility: EligibilityColumns,
}

/// The column positions of a roster, once its header has been read.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RosterLayout {
    pub email_idx: usize,
    pub name_idx: usize,
    /// Position and header of each eligibility question.
    pub questions: Vec<(usize, String)>,
}

impl RosterLayout {
    pub fn question_names(&self) -> Vec<String> {
        self.questions.iter().map(|(_, n)| n.clone()).collect()
    }
}

/// The respondents read out of a roster file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Roster {
    pub questions: Vec<String>,
    pub respondents: Vec<RespondentRecord>,
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Given the header of a file (names of each of the columns), and the names of the
/// requested columns, finds the position of each of them.
pub fn get_col_index_mapping(
    req_col_names: &[String],
    header: &[Option<String>],
    path: &str,
) -> DrawResult<Vec<(usize, String)>> {
    let mut col_names: HashMap<String, usize> = HashMap::new();
    for (idx, x) in header.iter().enumerate() {
        if let Some(s) = x {
            // Keep the first column when a header is repeated.
            col_names.entry(s.trim().to_string()).or_insert(idx);
        }
    }

    debug!("get_col_index_mapping: col_names: {:?}", col_names);

    let mut col_indexes: Vec<(usize, String)> = Vec::new();
    for cname in req_col_names {
        let idx = col_names
            .get(cname.trim())
            .context(MissingColumnSnafu {
                column: cname.clone(),
                path,
            })?;
        col_indexes.push((*idx, cname.clone()));
    }
    Ok(col_indexes)
}

/// Finds the email, name and eligibility columns in a header.
///
/// Positional eligibility columns are turned into names here, so that the
/// rest of the draw only deals with named questions.
pub fn resolve_layout(
    columns: &RosterColumns,
    header: &[Option<String>],
    path: &str,
) -> DrawResult<RosterLayout> {
    let ids = get_col_index_mapping(&[columns.email.clone(), columns.name.clone()], header, path)?;
    let questions: Vec<(usize, String)> = match &columns.eligibility {
        EligibilityColumns::Named(names) => get_col_index_mapping(names, header, path)?,
        EligibilityColumns::From(start) => {
            ensure!(
                *start <= header.len(),
                EligibilityColumnOutOfRangeSnafu {
                    index: *start + 1,
                    path
                }
            );
            header
                .iter()
                .enumerate()
                .skip(*start)
                .map(|(idx, h)| (idx, h.clone().unwrap_or_else(|| format!("column {}", idx + 1))))
                .collect()
        }
    };
    debug!(
        "resolve_layout: {}: email: {:?} name: {:?} questions: {:?}",
        path, ids[0], ids[1], questions
    );
    Ok(RosterLayout {
        email_idx: ids[0].0,
        name_idx: ids[1].0,
        questions,
    })
}

/// Rules that only carry the eligibility questions, for checking the rows
/// of a roster as they are read.
pub fn reading_rules(layout: &RosterLayout) -> SelectionRules {
    let mut rules = SelectionRules::new(0);
    rules.eligibility_questions = layout.question_names();
    rules
}
