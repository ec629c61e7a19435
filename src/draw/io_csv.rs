// Primitives for reading and writing CSV files.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use entrant_selection::builder::Builder;
use log::{debug, info, warn};
use snafu::prelude::*;

use crate::draw::{
    io_common::{get_col_index_mapping, reading_rules, resolve_layout, Roster, RosterColumns},
    *,
};

/// The columns of the membership registry.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MembershipColumns {
    pub membership_type: String,
    pub email: String,
    pub name: String,
}

impl Default for MembershipColumns {
    fn default() -> Self {
        MembershipColumns {
            membership_type: "Membership type".to_string(),
            email: "Email".to_string(),
            name: "Full name".to_string(),
        }
    }
}

pub fn read_csv_roster(path: &str, columns: &RosterColumns) -> DrawResult<Roster> {
    let rdr = open_csv(path)?;
    read_csv_roster_from(rdr, columns, path)
}

pub fn read_csv_roster_from<R: Read>(
    mut rdr: csv::Reader<R>,
    columns: &RosterColumns,
    path: &str,
) -> DrawResult<Roster> {
    let header = read_header(&mut rdr, path)?;
    debug!("read_csv_roster: header: {:?}", header);
    let layout = resolve_layout(columns, &header, path)?;
    let mut builder =
        Builder::new(&reading_rules(&layout)).context(InvalidRowSnafu { lineno: 1usize, path })?;

    for (idx, line_r) in rdr.records().enumerate() {
        // The header is the first line.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { path })?;
        if line.iter().all(|s| s.is_empty()) {
            debug!("read_csv_roster: lineno: {:?} empty line", lineno);
            continue;
        }
        let cell = |col: usize| -> DrawResult<String> {
            Ok(line
                .get(col)
                .context(CsvLineTooShortSnafu { lineno, path })?
                .to_string())
        };
        let email = cell(layout.email_idx)?;
        let name = cell(layout.name_idx)?;
        let mut answers: Vec<String> = Vec::new();
        for (col, _) in layout.questions.iter() {
            answers.push(cell(*col)?);
        }
        debug!(
            "read_csv_roster: lineno: {:?} email: {:?} answers: {:?}",
            lineno, email, answers
        );
        builder
            .add_respondent(&email, &name, &answers)
            .context(InvalidRowSnafu { lineno, path })?;
    }
    let respondents = builder.build();
    info!(
        "read_csv_roster: {} respondents read from {}",
        respondents.len(),
        path
    );
    Ok(Roster {
        questions: layout.question_names(),
        respondents,
    })
}

pub fn read_membership(
    path: &str,
    columns: &MembershipColumns,
) -> DrawResult<Vec<MembershipRecord>> {
    let rdr = open_csv(path)?;
    read_membership_from(rdr, columns, path)
}

pub fn read_membership_from<R: Read>(
    mut rdr: csv::Reader<R>,
    columns: &MembershipColumns,
    path: &str,
) -> DrawResult<Vec<MembershipRecord>> {
    let header = read_header(&mut rdr, path)?;
    let cols = get_col_index_mapping(
        &[
            columns.membership_type.clone(),
            columns.email.clone(),
            columns.name.clone(),
        ],
        &header,
        path,
    )?;
    let (type_idx, email_idx, name_idx) = (cols[0].0, cols[1].0, cols[2].0);

    let mut res: Vec<MembershipRecord> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { path })?;
        let cell = |col: usize| -> DrawResult<String> {
            Ok(line
                .get(col)
                .context(CsvLineTooShortSnafu { lineno, path })?
                .to_string())
        };
        res.push(MembershipRecord {
            membership_type: cell(type_idx)?,
            email: cell(email_idx)?,
            name: cell(name_idx)?,
        });
    }
    info!("read_membership: {} records read from {}", res.len(), path);
    Ok(res)
}

/// Where the outcome of a draw is stored.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SelectionFiles {
    pub selected: PathBuf,
    pub remaining: PathBuf,
}

/// Writes the selected and the remaining respondents.
///
/// Both files are first written next to their destination, and only moved
/// in place once both are complete. If one of them cannot be moved, the
/// previous pair is put back: a failed draw does not leave a selection
/// without its remainder (or the other way around).
pub fn write_selection(
    files: &SelectionFiles,
    email_column: &str,
    name_column: &str,
    questions: &[String],
    result: &SelectionResult,
) -> DrawResult<()> {
    for dest in [&files.selected, &files.remaining] {
        if dest.is_dir() {
            return Err::<(), _>(std::io::Error::new(
                std::io::ErrorKind::Other,
                "a directory is in the way",
            ))
            .context(PersistSnafu {
                path: dest.display().to_string(),
            });
        }
    }

    let selected_tmp = sibling_path(&files.selected, "tmp");
    let remaining_tmp = sibling_path(&files.remaining, "tmp");

    let selected_header: Vec<String> = vec![email_column.to_string(), name_column.to_string()];
    let remaining_header: Vec<String> = selected_header
        .iter()
        .chain(questions.iter())
        .cloned()
        .collect();

    let written = write_records(&selected_tmp, &selected_header, &result.selected, false)
        .and_then(|_| write_records(&remaining_tmp, &remaining_header, &result.remaining, true));
    if let Err(e) = written {
        let _ = fs::remove_file(&selected_tmp);
        let _ = fs::remove_file(&remaining_tmp);
        return Err(e);
    }
    replace_files(
        &[
            (remaining_tmp.as_path(), files.remaining.as_path()),
            (selected_tmp.as_path(), files.selected.as_path()),
        ],
        |from, to| fs::rename(from, to),
    )?;
    info!(
        "write_selection: {} selected written to {}, {} remaining written to {}",
        result.selected.len(),
        files.selected.display(),
        result.remaining.len(),
        files.remaining.display()
    );
    Ok(())
}

/// Moves each `(source, destination)` pair in place, all or nothing. The
/// current destinations are set aside first, and put back if any move fails.
fn replace_files<F>(moves: &[(&Path, &Path)], mut rename: F) -> DrawResult<()>
where
    F: FnMut(&Path, &Path) -> std::io::Result<()>,
{
    let mut backups: Vec<(PathBuf, &Path)> = Vec::new();
    let mut placed: Vec<&Path> = Vec::new();
    let mut outcome: DrawResult<()> = Ok(());

    for (_, dest) in moves.iter() {
        if dest.exists() {
            let backup = sibling_path(dest, "bak");
            if let Err(e) = rename(*dest, backup.as_path()) {
                outcome = Err::<(), _>(e).context(PersistSnafu {
                    path: dest.display().to_string(),
                });
                break;
            }
            backups.push((backup, *dest));
        }
    }
    if outcome.is_ok() {
        for (src, dest) in moves.iter() {
            if let Err(e) = rename(*src, *dest) {
                outcome = Err::<(), _>(e).context(PersistSnafu {
                    path: dest.display().to_string(),
                });
                break;
            }
            placed.push(*dest);
        }
    }

    if outcome.is_err() {
        for dest in placed {
            let _ = fs::remove_file(dest);
        }
        for (backup, dest) in backups.iter() {
            if let Err(e) = fs::rename(backup, dest) {
                warn!(
                    "replace_files: cannot restore {} from {}: {}",
                    dest.display(),
                    backup.display(),
                    e
                );
            }
        }
        for (src, _) in moves.iter() {
            let _ = fs::remove_file(src);
        }
    } else {
        for (backup, _) in backups.iter() {
            let _ = fs::remove_file(backup);
        }
    }
    outcome
}

fn write_records(
    path: &Path,
    header: &[String],
    records: &[RespondentRecord],
    with_answers: bool,
) -> DrawResult<()> {
    let p = path.display().to_string();
    let mut wtr = csv::Writer::from_path(path).context(CsvWriteSnafu { path: p.clone() })?;
    wtr.write_record(header)
        .context(CsvWriteSnafu { path: p.clone() })?;
    for r in records.iter() {
        let mut row: Vec<&str> = vec![r.email.as_str(), r.name.as_str()];
        if with_answers {
            row.extend(r.answers.iter().map(|s| s.as_str()));
        }
        wtr.write_record(&row)
            .context(CsvWriteSnafu { path: p.clone() })?;
    }
    wtr.flush().context(PersistSnafu { path: p })?;
    Ok(())
}

// `remaining.csv` -> `remaining.csv.tmp`
fn sibling_path(dest: &Path, extension: &str) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(extension);
    dest.with_file_name(name)
}

fn open_csv(path: &str) -> DrawResult<csv::Reader<File>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })
}

fn read_header<R: Read>(rdr: &mut csv::Reader<R>, path: &str) -> DrawResult<Vec<Option<String>>> {
    let header = rdr.headers().context(CsvLineParseSnafu { path })?;
    Ok(header.iter().map(|s| Some(s.to_string())).collect())
}

#[cfg(test)]
pub(crate) fn reader_for(content: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::io_common::EligibilityColumns;

    fn columns(eligibility: EligibilityColumns) -> RosterColumns {
        RosterColumns {
            email: "Email".to_string(),
            name: "Full Name".to_string(),
            eligibility,
        }
    }

    #[test]
    fn roster_with_named_questions() {
        let content = "\
Id,Full Name,Email,Attend?,Photos?
1,Jane Q. Doe, Jane.Doe@ucl.ac.uk ,Yes,Yes
2,Tom Ray,tom.ray@ucl.ac.uk,Yes,No
,,,,
3,Jane Doe,jane.doe@ucl.ac.uk,No,No
";
        let roster = read_csv_roster_from(
            reader_for(content),
            &columns(EligibilityColumns::Named(vec![
                "Attend?".to_string(),
                "Photos?".to_string(),
            ])),
            "roster.csv",
        )
        .unwrap();
        assert_eq!(roster.questions, vec!["Attend?", "Photos?"]);
        assert_eq!(roster.respondents.len(), 3);
        assert_eq!(roster.respondents[0].email, "jane.doe@ucl.ac.uk");
        assert_eq!(roster.respondents[0].name, "Jane Q. Doe");
        assert_eq!(roster.respondents[1].answers, vec!["Yes", "No"]);
    }

    #[test]
    fn roster_with_positional_questions() {
        let content = "Email,Full Name,Q1,Q2,Q3\na.b@x.org,A B,Yes,Yes,Yes\n";
        let roster =
            read_csv_roster_from(reader_for(content), &columns(EligibilityColumns::From(2)), "r")
                .unwrap();
        assert_eq!(roster.questions, vec!["Q1", "Q2", "Q3"]);
        assert_eq!(roster.respondents[0].answers.len(), 3);
    }

    #[test]
    fn short_line_is_an_error() {
        let content = "Email,Full Name,Q1\na.b@x.org,A B,Yes\nc.d@x.org,C D\n";
        let err = read_csv_roster_from(
            reader_for(content),
            &columns(EligibilityColumns::From(2)),
            "roster.csv",
        )
        .unwrap_err();
        assert!(matches!(err, DrawError::CsvLineTooShort { lineno: 3, .. }));
    }

    #[test]
    fn missing_email_is_an_error() {
        let content = "Email,Full Name\n,Nobody\n";
        let err = read_csv_roster_from(
            reader_for(content),
            &columns(EligibilityColumns::Named(vec![])),
            "roster.csv",
        )
        .unwrap_err();
        assert!(matches!(err, DrawError::InvalidRow { lineno: 2, .. }));
    }

    #[test]
    fn membership_registry() {
        let content = "\
Full name,Membership type,Email,Joined
Jane Doe,Standard,jane.doe@x.org,2021
Bob Ray,Associate,bob.ray@x.org,2022
";
        let members =
            read_membership_from(reader_for(content), &MembershipColumns::default(), "m.csv")
                .unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].membership_type, "Standard");
        assert_eq!(members[1].email, "bob.ray@x.org");
        assert_eq!(members[1].name, "Bob Ray");
    }

    #[test]
    fn membership_without_type_column() {
        let content = "Full name,Email\nJane Doe,jane.doe@x.org\n";
        let err = read_membership_from(reader_for(content), &MembershipColumns::default(), "m.csv")
            .unwrap_err();
        assert!(matches!(err, DrawError::MissingColumn { .. }));
    }

    #[test]
    fn selection_files_round_trip_as_roster() {
        let dir = tempfile::tempdir().unwrap();
        let files = SelectionFiles {
            selected: dir.path().join("selected.csv"),
            remaining: dir.path().join("remaining.csv"),
        };
        let questions = vec!["Attend?".to_string()];
        let yes = vec!["Yes".to_string()];
        let result = SelectionResult {
            selected: vec![RespondentRecord::new("a.b@x.org", "A B", &yes)],
            remaining: vec![
                RespondentRecord::new("c.d@x.org", "C, D", &yes),
                RespondentRecord::new("e.f@x.org", "E F", &yes),
            ],
            quota: 1,
            stats: SelectionStats::default(),
        };
        write_selection(&files, "Email", "Full Name", &questions, &result).unwrap();

        let selected = fs::read_to_string(&files.selected).unwrap();
        assert_eq!(selected, "Email,Full Name\na.b@x.org,A B\n");
        assert!(!dir.path().join("selected.csv.tmp").exists());
        assert!(!dir.path().join("remaining.csv.tmp").exists());

        let roster = read_csv_roster(
            files.remaining.to_str().unwrap(),
            &columns(EligibilityColumns::From(2)),
        )
        .unwrap();
        assert_eq!(roster.respondents, result.remaining);
        assert_eq!(roster.questions, questions);
    }

    fn one_drawn() -> SelectionResult {
        let yes = vec!["Yes".to_string()];
        SelectionResult {
            selected: vec![RespondentRecord::new("a.b@x.org", "A B", &yes)],
            remaining: vec![RespondentRecord::new("c.d@x.org", "C D", &yes)],
            quota: 1,
            stats: SelectionStats::default(),
        }
    }

    #[test]
    fn directory_in_the_way_keeps_previous_pair() {
        let dir = tempfile::tempdir().unwrap();
        let files = SelectionFiles {
            selected: dir.path().join("selected.csv"),
            remaining: dir.path().join("remaining.csv"),
        };
        fs::write(&files.remaining, "OLD REMAINDER").unwrap();
        fs::create_dir(&files.selected).unwrap();
        fs::write(files.selected.join("inner.txt"), "x").unwrap();

        let questions = vec!["Attend?".to_string()];
        let res = write_selection(&files, "Email", "Name", &questions, &one_drawn());
        assert!(matches!(res, Err(DrawError::Persist { .. })));
        assert_eq!(fs::read_to_string(&files.remaining).unwrap(), "OLD REMAINDER");
        assert!(!dir.path().join("selected.csv.tmp").exists());
        assert!(!dir.path().join("remaining.csv.tmp").exists());
    }

    #[test]
    fn failed_move_restores_previous_pair() {
        let dir = tempfile::tempdir().unwrap();
        let p = |f: &str| dir.path().join(f);
        fs::write(p("remaining.csv"), "OLD REMAINDER").unwrap();
        fs::write(p("selected.csv"), "OLD SELECTION").unwrap();
        fs::write(p("remaining.csv.tmp"), "NEW REMAINDER").unwrap();
        fs::write(p("selected.csv.tmp"), "NEW SELECTION").unwrap();

        let (remaining_tmp, remaining) = (p("remaining.csv.tmp"), p("remaining.csv"));
        let (selected_tmp, selected) = (p("selected.csv.tmp"), p("selected.csv"));
        // The second file cannot be moved in place.
        let res = replace_files(
            &[
                (remaining_tmp.as_path(), remaining.as_path()),
                (selected_tmp.as_path(), selected.as_path()),
            ],
            |from, to| {
                if from == selected_tmp.as_path() {
                    Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
                } else {
                    fs::rename(from, to)
                }
            },
        );
        assert!(matches!(res, Err(DrawError::Persist { .. })));
        assert_eq!(fs::read_to_string(&remaining).unwrap(), "OLD REMAINDER");
        assert_eq!(fs::read_to_string(&selected).unwrap(), "OLD SELECTION");
        for leftover in ["remaining.csv.tmp", "selected.csv.tmp", "remaining.csv.bak", "selected.csv.bak"] {
            assert!(!p(leftover).exists(), "{} left behind", leftover);
        }
    }

    #[test]
    fn successful_move_drops_backups() {
        let dir = tempfile::tempdir().unwrap();
        let files = SelectionFiles {
            selected: dir.path().join("selected.csv"),
            remaining: dir.path().join("remaining.csv"),
        };
        fs::write(&files.remaining, "OLD REMAINDER").unwrap();
        fs::write(&files.selected, "OLD SELECTION").unwrap();
        let questions = vec!["Attend?".to_string()];
        write_selection(&files, "Email", "Name", &questions, &one_drawn()).unwrap();
        assert_eq!(
            fs::read_to_string(&files.remaining).unwrap(),
            "Email,Name,Attend?\nc.d@x.org,C D,Yes\n"
        );
        assert_eq!(
            fs::read_to_string(&files.selected).unwrap(),
            "Email,Name\na.b@x.org,A B\n"
        );
        assert!(!dir.path().join("selected.csv.bak").exists());
        assert!(!dir.path().join("remaining.csv.bak").exists());
    }
}
