// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// One respondent of the form, as read from the roster.
///
/// The email is the primary key of the record. It is normalized (trimmed and
/// lowercased) when the record is built through [`RespondentRecord::new`].
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct RespondentRecord {
    pub email: String,
    pub name: String,
    /// The answers to the eligibility questions, in the order of
    /// [`SelectionRules::eligibility_questions`].
    pub answers: Vec<String>,
}

impl RespondentRecord {
    pub fn new(email: &str, name: &str, answers: &[String]) -> RespondentRecord {
        RespondentRecord {
            email: normalize_email(email),
            name: name.trim().to_string(),
            answers: answers.to_vec(),
        }
    }
}

/// An entry of the membership registry.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct MembershipRecord {
    pub email: String,
    pub name: String,
    pub membership_type: String,
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ******** Output data structures *********

/// Counters collected while filtering the roster.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SelectionStats {
    /// Rows received, duplicates included.
    pub roster_size: usize,
    pub duplicates: usize,
    /// Records with at least one answer different from the accepted answer.
    pub failed_questions: usize,
    pub pre_approved: usize,
    pub non_members: usize,
    /// Size of the eligible pool.
    pub eligible: usize,
}

/// The outcome of one draw.
///
/// Invariant: `selected` and `remaining` are disjoint, and together they form
/// the eligible pool.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SelectionResult {
    /// The drawn records, in draw order.
    pub selected: Vec<RespondentRecord>,
    /// The eligible records that were not drawn, in roster order.
    pub remaining: Vec<RespondentRecord>,
    pub quota: usize,
    pub stats: SelectionStats,
}

/// Errors that prevent the selection from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SelectionErrors {
    /// The record at this (0-based) roster position has no email.
    EmptyEmail { position: usize },
    /// The number of answers does not match the number of eligibility questions.
    AnswerCountMismatch {
        email: String,
        expected: usize,
        found: usize,
    },
}

impl Error for SelectionErrors {}

impl Display for SelectionErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionErrors::EmptyEmail { position } => {
                write!(f, "roster row {} has no email", position + 1)
            }
            SelectionErrors::AnswerCountMismatch {
                email,
                expected,
                found,
            } => write!(
                f,
                "respondent {}: expected {} eligibility answers, found {}",
                email, expected, found
            ),
        }
    }
}

// ********* Configuration **********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SelectionRules {
    /// The total number of places, pre-approved entrants included.
    pub requested_count: u32,
    /// Full names of the entrants that get a place outside of the draw.
    pub pre_approved: Vec<String>,
    /// Names of the eligibility questions. Every answer must equal
    /// `accepted_answer` for a respondent to enter the draw.
    pub eligibility_questions: Vec<String>,
    pub accepted_answer: String,
    /// Only members with this membership type count as active.
    pub active_membership_type: String,
}

impl SelectionRules {
    pub const DEFAULT_ACCEPTED_ANSWER: &'static str = "Yes";
    pub const DEFAULT_MEMBERSHIP_TYPE: &'static str = "Standard";

    pub fn new(requested_count: u32) -> SelectionRules {
        SelectionRules {
            requested_count,
            pre_approved: Vec::new(),
            eligibility_questions: Vec::new(),
            accepted_answer: SelectionRules::DEFAULT_ACCEPTED_ANSWER.to_string(),
            active_membership_type: SelectionRules::DEFAULT_MEMBERSHIP_TYPE.to_string(),
        }
    }
}
