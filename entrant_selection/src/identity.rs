//! Matching respondents against the membership registry.
//!
//! A respondent counts as a member when any one of three signals agrees:
//! - the name-key of the respondent is the name-key of an active member
//! - the name-key of the respondent is the name derived from the email of an active member
//! - the normalized email of the respondent is the email of an active member
//!
//! The name-key keeps the first and the last word of a full name, so that
//! middle names and initials do not get in the way.

use log::debug;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::Display;

use crate::config::{normalize_email, MembershipRecord, RespondentRecord};

/// Normalizes a full name into its "first last" key.
///
/// ```
/// use entrant_selection::identity::name_key;
/// assert_eq!(name_key("  Jane Q. DOE "), "jane doe");
/// ```
pub fn name_key(full_name: &str) -> String {
    let lowered = full_name.trim().to_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => format!("{} {}", first, last),
        _ => String::new(),
    }
}

/// The name that can be read from the local part of an email.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum EmailName {
    /// Both a given name and a family name: `jane.doe@...`
    Full(String),
    /// The second segment is empty: `jane.@...`
    GivenOnly(String),
}

/// The local part of an email does not have the `given.family` structure.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum IdentityParseError {
    MissingDotSegment { email: String },
    EmptyGivenName { email: String },
}

impl Error for IdentityParseError {}

impl Display for IdentityParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityParseError::MissingDotSegment { email } => {
                write!(f, "email {:?} has no dot in its local part", email)
            }
            IdentityParseError::EmptyGivenName { email } => {
                write!(f, "email {:?} starts with an empty segment", email)
            }
        }
    }
}

/// Reads the given and family names out of an email.
///
/// The local part (before `@`) is split on dots: the first segment is the
/// given name and the second one the family name. Anything after the second
/// segment (year, number) is ignored.
pub fn email_name_key(email: &str) -> Result<EmailName, IdentityParseError> {
    let normalized = normalize_email(email);
    let local = match normalized.split_once('@') {
        Some((local, _)) => local,
        None => normalized.as_str(),
    };
    let mut segments = local.split('.');
    let given = segments.next().unwrap_or("");
    let family = match segments.next() {
        Some(f) => f,
        None => {
            return Err(IdentityParseError::MissingDotSegment {
                email: email.to_string(),
            })
        }
    };
    if given.is_empty() {
        return Err(IdentityParseError::EmptyGivenName {
            email: email.to_string(),
        });
    }
    if family.is_empty() {
        Ok(EmailName::GivenOnly(given.to_string()))
    } else {
        Ok(EmailName::Full(format!("{} {}", given, family)))
    }
}

/// Which of the signals established the membership.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum MatchStrategy {
    Name,
    EmailDerivedName,
    Email,
}

/// The active members, indexed by each of the matching signals.
#[derive(Debug, Clone)]
pub struct IdentityMatcher {
    name_keys: HashSet<String>,
    email_name_keys: HashSet<String>,
    emails: HashSet<String>,
}

impl IdentityMatcher {
    /// Indexes the members whose membership type is `active_type`. The other
    /// records are dropped before any matching happens.
    pub fn new(members: &[MembershipRecord], active_type: &str) -> IdentityMatcher {
        let mut name_keys: HashSet<String> = HashSet::new();
        let mut email_name_keys: HashSet<String> = HashSet::new();
        let mut emails: HashSet<String> = HashSet::new();
        let mut num_active = 0;
        for m in members
            .iter()
            .filter(|m| m.membership_type.trim() == active_type)
        {
            num_active += 1;
            let nk = name_key(&m.name);
            if !nk.is_empty() {
                name_keys.insert(nk);
            }
            match email_name_key(&m.email) {
                Ok(EmailName::Full(k)) => {
                    email_name_keys.insert(k);
                }
                // A single given name never equals a "first last" key.
                Ok(EmailName::GivenOnly(given)) => {
                    debug!(
                        "IdentityMatcher: {:?} only provides the given name {:?}",
                        m.email, given
                    );
                }
                Err(e) => {
                    debug!("IdentityMatcher: skipping email-derived name: {}", e);
                }
            }
            let email = normalize_email(&m.email);
            if !email.is_empty() {
                emails.insert(email);
            }
        }
        debug!(
            "IdentityMatcher: {} active members out of {} ({} name keys, {} email names, {} emails)",
            num_active,
            members.len(),
            name_keys.len(),
            email_name_keys.len(),
            emails.len()
        );
        IdentityMatcher {
            name_keys,
            email_name_keys,
            emails,
        }
    }

    /// The first signal that matches this respondent, if any.
    pub fn match_strategy(&self, respondent: &RespondentRecord) -> Option<MatchStrategy> {
        let nk = name_key(&respondent.name);
        if !nk.is_empty() {
            if self.name_keys.contains(&nk) {
                return Some(MatchStrategy::Name);
            }
            if self.email_name_keys.contains(&nk) {
                return Some(MatchStrategy::EmailDerivedName);
            }
        }
        let email = normalize_email(&respondent.email);
        if !email.is_empty() && self.emails.contains(&email) {
            return Some(MatchStrategy::Email);
        }
        None
    }

    pub fn is_member(&self, respondent: &RespondentRecord) -> bool {
        self.match_strategy(respondent).is_some()
    }
}
