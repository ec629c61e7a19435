use log::{debug, info, warn};

pub use entrant_selection::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::draw::config_reader::*;
use crate::draw::io_common::*;
use crate::draw::io_csv::*;
use crate::draw::io_msforms::*;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_msforms;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DrawError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The spreadsheet {path} is empty"))]
    EmptyExcel { path: String },
    #[snafu(display("Cannot find the worksheet {name} in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display(
        "{path} has several worksheets ({names:?}), choose one with --excel-worksheet-name"
    ))]
    AmbiguousWorksheet { names: Vec<String>, path: String },
    #[snafu(display("Line {lineno}: cannot read the cell {content}"))]
    ExcelWrongCellType { lineno: u64, content: String },
    #[snafu(display("Cannot find the column {column:?} in {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("The eligibility questions start after the last column ({index}) of {path}"))]
    EligibilityColumnOutOfRange { index: usize, path: String },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a line of {path}"))]
    CsvLineParse { source: csv::Error, path: String },
    #[snafu(display("Line {lineno} of {path} has too few columns"))]
    CsvLineTooShort { lineno: usize, path: String },
    #[snafu(display("Line {lineno} of {path}: {source}"))]
    InvalidRow {
        source: SelectionErrors,
        lineno: usize,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Error saving {path}"))]
    Persist {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a positive number, found {content}"))]
    ParsingJsonNumber { content: String },
    #[snafu(display("The number of spaces is missing (--number-spaces)"))]
    MissingNumberSpaces {},
    #[snafu(display("No responses to draw from: pass --file-location or --draw-remaining"))]
    MissingRoster {},
    #[snafu(display("Unknown input type {input_type:?} (expected msforms or csv)"))]
    UnknownInputType { input_type: String },
    #[snafu(display("Cannot read the answer"))]
    Prompt { source: std::io::Error },
    #[snafu(display("The draw failed: {source}"))]
    Selection { source: SelectionErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DrawResult<T> = Result<T, DrawError>;

/// The formats a roster can be read from.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Provider {
    MsForms,
    Csv,
}

impl Provider {
    pub fn parse(input_type: &str) -> DrawResult<Provider> {
        match input_type {
            "msforms" => Ok(Provider::MsForms),
            "csv" => Ok(Provider::Csv),
            x => UnknownInputTypeSnafu { input_type: x }.fail(),
        }
    }

    /// CSV for `.csv` files, Excel otherwise.
    pub fn from_path(path: &str) -> Provider {
        match Path::new(path).extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Provider::Csv,
            _ => Provider::MsForms,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MembershipSettings {
    pub path: String,
    pub columns: MembershipColumns,
    pub active_type: String,
}

/// Everything a draw needs, assembled once from the command line and the
/// configuration file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DrawSettings {
    pub number_spaces: u32,
    pub pre_approved: Vec<String>,
    /// Draw among the respondents left by the previous draw.
    pub draw_remaining: bool,
    /// Unused when drawing from the remainder.
    pub roster_path: Option<String>,
    pub provider: Provider,
    pub excel_worksheet_name: Option<String>,
    pub columns: RosterColumns,
    pub accepted_answer: String,
    pub membership: MembershipSettings,
    pub files: SelectionFiles,
    pub seed: Option<u64>,
    pub out: Option<String>,
    pub reference: Option<String>,
}

/// Splits the human-entered list of pre-approved names: `Alice Smith, Bob Jones`.
pub fn parse_pre_approved(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .map(|x| x.to_string())
        .collect()
}

// Paths in the configuration file are relative to the file.
fn resolve(root: Option<&Path>, p: &str) -> String {
    match root {
        Some(r) if Path::new(p).is_relative() => r.join(p).display().to_string(),
        _ => p.to_string(),
    }
}

/// Merges the command line and the (optional) configuration file. The
/// command line takes precedence.
pub fn build_settings(
    args: &Args,
    config: Option<&DrawConfig>,
    config_root: Option<&Path>,
) -> DrawResult<DrawSettings> {
    let default_config = DrawConfig::default();
    let config = config.unwrap_or(&default_config);
    let roster_source = config.roster_source.clone().unwrap_or_default();
    let membership_source = config.membership_source.clone().unwrap_or_default();
    let rules = config.rules.clone().unwrap_or_default();
    let output_settings = config.output_settings.clone().unwrap_or_default();

    let number_spaces = match args.number_spaces {
        Some(n) => n,
        None => rules
            .number_of_spaces()?
            .context(MissingNumberSpacesSnafu {})?,
    };

    let pre_approved: Vec<String> = match (&args.preapproved, &rules.pre_approved) {
        (Some(s), _) => parse_pre_approved(s),
        (None, Some(l)) => l.clone(),
        (None, None) => Vec::new(),
    };

    let roster_path: Option<String> = args.file_location.clone().or_else(|| {
        roster_source
            .file_path
            .as_ref()
            .map(|p| resolve(config_root, p))
    });
    ensure!(
        args.draw_remaining || roster_path.is_some(),
        MissingRosterSnafu {}
    );

    let provider = match args
        .input_type
        .clone()
        .or_else(|| roster_source.provider.clone())
    {
        Some(t) => Provider::parse(&t)?,
        None => Provider::from_path(roster_path.as_deref().unwrap_or("")),
    };

    let eligibility = if let Some(names) = &args.eligibility_columns {
        EligibilityColumns::Named(names.clone())
    } else if let Some(first) = &args.first_eligibility_column {
        EligibilityColumns::From(read_column_index(&Some(JSValue::String(first.clone())))?)
    } else if let Some(names) = &roster_source.eligibility_columns {
        EligibilityColumns::Named(names.clone())
    } else if let Some(first) = roster_source.first_eligibility_column_index()? {
        EligibilityColumns::From(first)
    } else {
        info!(
            "build_settings: no eligibility questions configured, using all the columns from {}",
            DEFAULT_FIRST_ELIGIBILITY_COLUMN + 1
        );
        EligibilityColumns::From(DEFAULT_FIRST_ELIGIBILITY_COLUMN)
    };

    let columns = RosterColumns {
        email: args
            .email_column
            .clone()
            .or_else(|| roster_source.email_column.clone())
            .unwrap_or_else(|| DEFAULT_EMAIL_COLUMN.to_string()),
        name: args
            .name_column
            .clone()
            .or_else(|| roster_source.name_column.clone())
            .unwrap_or_else(|| DEFAULT_NAME_COLUMN.to_string()),
        eligibility,
    };

    let default_membership = MembershipColumns::default();
    let membership = MembershipSettings {
        path: args.membership.clone().unwrap_or_else(|| {
            resolve(
                config_root,
                membership_source
                    .file_path
                    .as_deref()
                    .unwrap_or("membership.csv"),
            )
        }),
        columns: MembershipColumns {
            membership_type: membership_source
                .type_column
                .clone()
                .unwrap_or(default_membership.membership_type),
            email: membership_source
                .email_column
                .clone()
                .unwrap_or(default_membership.email),
            name: membership_source
                .name_column
                .clone()
                .unwrap_or(default_membership.name),
        },
        active_type: membership_source
            .active_type
            .clone()
            .unwrap_or_else(|| SelectionRules::DEFAULT_MEMBERSHIP_TYPE.to_string()),
    };

    let output_directory: PathBuf = match &args.output_directory {
        Some(d) => PathBuf::from(d),
        None => PathBuf::from(resolve(
            config_root,
            output_settings.output_directory.as_deref().unwrap_or("."),
        )),
    };
    let files = SelectionFiles {
        selected: output_directory.join(
            output_settings
                .selected_file
                .as_deref()
                .unwrap_or("selected.csv"),
        ),
        remaining: output_directory.join(
            output_settings
                .remaining_file
                .as_deref()
                .unwrap_or("remaining.csv"),
        ),
    };

    let seed = match args.seed {
        Some(s) => Some(s),
        None => rules.random_seed()?,
    };

    let settings = DrawSettings {
        number_spaces,
        pre_approved,
        draw_remaining: args.draw_remaining,
        roster_path,
        provider,
        excel_worksheet_name: args
            .excel_worksheet_name
            .clone()
            .or_else(|| roster_source.excel_worksheet_name.clone()),
        columns,
        accepted_answer: rules
            .accepted_answer
            .clone()
            .unwrap_or_else(|| SelectionRules::DEFAULT_ACCEPTED_ANSWER.to_string()),
        membership,
        files,
        seed,
        out: args.out.clone(),
        reference: args.reference.clone(),
    };
    debug!("build_settings: {:?}", settings);
    Ok(settings)
}

fn read_roster(settings: &DrawSettings) -> DrawResult<Roster> {
    if settings.draw_remaining {
        // The remainder file holds the email, the name and then the questions.
        let columns = RosterColumns {
            eligibility: EligibilityColumns::From(2),
            ..settings.columns.clone()
        };
        let path = settings.files.remaining.display().to_string();
        info!("Drawing from the remaining respondents in {:?}", path);
        return read_csv_roster(&path, &columns);
    }
    let path = settings.roster_path.clone().context(MissingRosterSnafu {})?;
    info!("Attempting to read responses from {:?}", path);
    match settings.provider {
        Provider::MsForms => {
            read_msforms_roster(&path, &settings.excel_worksheet_name, &settings.columns)
        }
        Provider::Csv => read_csv_roster(&path, &settings.columns),
    }
}

/// Runs one draw: reads the inputs, selects, and saves the selected and
/// remaining respondents. Nothing is written unless the whole draw succeeded.
pub fn run_draw(settings: &DrawSettings) -> DrawResult<SelectionResult> {
    let roster = read_roster(settings)?;
    let members = read_membership(&settings.membership.path, &settings.membership.columns)?;

    let rules = SelectionRules {
        requested_count: settings.number_spaces,
        pre_approved: settings.pre_approved.clone(),
        eligibility_questions: roster.questions.clone(),
        accepted_answer: settings.accepted_answer.clone(),
        active_membership_type: settings.membership.active_type.clone(),
    };

    let mut rng = match settings.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let result = select(&roster.respondents, &members, &rules, &mut rng).context(SelectionSnafu {})?;

    // Assemble the summary before anything is written, so that a failure here
    // leaves the previous files untouched.
    let summary_js = build_summary_js(settings, &result);
    let pretty_js_summary =
        serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;

    // The reference summary, if provided for comparison
    if let Some(reference_p) = &settings.reference {
        let summary_ref = read_summary(reference_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_summary {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_summary.as_str(),
                "\n",
            );
            whatever!("Difference detected between the draw and the reference summary")
        }
    }

    if let Some(parent) = settings.files.selected.parent() {
        fs::create_dir_all(parent).context(PersistSnafu {
            path: parent.display().to_string(),
        })?;
    }
    write_selection(
        &settings.files,
        &settings.columns.email,
        &settings.columns.name,
        &roster.questions,
        &result,
    )?;

    match settings.out.as_deref() {
        Some("stdout") => println!("{}", pretty_js_summary),
        Some(out_p) => {
            fs::write(out_p, &pretty_js_summary).context(PersistSnafu { path: out_p })?;
            info!("Summary written to {:?}", out_p);
        }
        None => {}
    }

    Ok(result)
}

fn build_summary_js(settings: &DrawSettings, result: &SelectionResult) -> JSValue {
    let source = if settings.draw_remaining {
        simplify_file_name(&settings.files.remaining.display().to_string())
    } else {
        simplify_file_name(settings.roster_path.as_deref().unwrap_or(""))
    };
    let selected: Vec<JSValue> = result
        .selected
        .iter()
        .map(|r| json!({"email": r.email, "name": r.name}))
        .collect();
    json!({
        "config": {
            "numberOfSpaces": settings.number_spaces,
            "preApproved": settings.pre_approved,
            "drawRemaining": settings.draw_remaining,
            "source": source,
            "randomSeed": settings.seed.map(|s| s.to_string()),
        },
        "results": {
            "requested": settings.number_spaces,
            "preApproved": result.stats.pre_approved,
            "respondents": result.stats.roster_size,
            "duplicates": result.stats.duplicates,
            "failedQuestions": result.stats.failed_questions,
            "nonMembers": result.stats.non_members,
            "eligible": result.stats.eligible,
            "quota": result.quota,
            "selected": selected,
            "remaining": result.remaining.len(),
        }
    })
}
