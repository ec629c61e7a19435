use crate::draw::*;

use log::debug;
use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputSettings {
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "selectedFile")]
    pub selected_file: Option<String>,
    #[serde(rename = "remainingFile")]
    pub remaining_file: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct RosterSource {
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "emailColumn")]
    pub email_column: Option<String>,
    #[serde(rename = "nameColumn")]
    pub name_column: Option<String>,
    #[serde(rename = "eligibilityColumns")]
    pub eligibility_columns: Option<Vec<String>>,
    #[serde(rename = "firstEligibilityColumnIndex")]
    _first_eligibility_column_index: Option<JSValue>,
}

impl RosterSource {
    /// The 0-based position of the first eligibility column, if configured.
    pub fn first_eligibility_column_index(&self) -> DrawResult<Option<usize>> {
        if self._first_eligibility_column_index.is_some() {
            read_column_index(&self._first_eligibility_column_index).map(Some)
        } else {
            Ok(None)
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct MembershipSource {
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "typeColumn")]
    pub type_column: Option<String>,
    #[serde(rename = "emailColumn")]
    pub email_column: Option<String>,
    #[serde(rename = "nameColumn")]
    pub name_column: Option<String>,
    #[serde(rename = "activeType")]
    pub active_type: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct DrawRules {
    #[serde(rename = "numberOfSpaces")]
    _number_of_spaces: Option<JSValue>,
    #[serde(rename = "preApproved")]
    pub pre_approved: Option<Vec<String>>,
    #[serde(rename = "randomSeed")]
    _random_seed: Option<JSValue>,
    #[serde(rename = "acceptedAnswer")]
    pub accepted_answer: Option<String>,
}

impl DrawRules {
    pub fn number_of_spaces(&self) -> DrawResult<Option<u32>> {
        match &self._number_of_spaces {
            None => Ok(None),
            x => {
                let n = read_js_u64(x)?;
                let n32 = u32::try_from(n).ok().context(ParsingJsonNumberSnafu {
                    content: n.to_string(),
                })?;
                Ok(Some(n32))
            }
        }
    }

    pub fn random_seed(&self) -> DrawResult<Option<u64>> {
        match &self._random_seed {
            None => Ok(None),
            x => read_js_u64(x).map(Some),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct DrawConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: Option<OutputSettings>,
    #[serde(rename = "rosterSource")]
    pub roster_source: Option<RosterSource>,
    #[serde(rename = "membershipSource")]
    pub membership_source: Option<MembershipSource>,
    pub rules: Option<DrawRules>,
}

pub fn read_config(path: &str) -> DrawResult<DrawConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: DrawConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> DrawResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

/// Reads a column position, written either as a number starting at 1 or as
/// an Excel-style column name (`A`, `E`, `AB`). Returns the 0-based position.
pub fn read_column_index(x: &Option<JSValue>) -> DrawResult<usize> {
    let content = format!("{:?}", x);
    let one_based: usize = match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu { content })?,
        // Parsing the Excel-style columns
        Some(JSValue::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => {
            s.to_ascii_lowercase()
                .chars()
                .try_fold(0usize, |acc, c| {
                    acc.checked_mul(26)?
                        .checked_add(c as usize - 'a' as usize + 1)
                })
                .context(ParsingJsonNumberSnafu { content })?
        }
        Some(JSValue::String(s)) => s
            .trim()
            .parse::<usize>()
            .ok()
            .context(ParsingJsonNumberSnafu { content })?,
        _ => None::<usize>.context(ParsingJsonNumberSnafu { content })?,
    };
    ensure!(
        one_based >= 1,
        ParsingJsonNumberSnafu {
            content: one_based.to_string()
        }
    );
    Ok(one_based - 1)
}

fn read_js_u64(x: &Option<JSValue>) -> DrawResult<u64> {
    let content = format!("{:?}", x);
    match x {
        Some(JSValue::Number(n)) => n.as_u64().context(ParsingJsonNumberSnafu { content }),
        Some(JSValue::String(s)) => s
            .trim()
            .parse::<u64>()
            .ok()
            .context(ParsingJsonNumberSnafu { content }),
        _ => None.context(ParsingJsonNumberSnafu { content }),
    }
}
