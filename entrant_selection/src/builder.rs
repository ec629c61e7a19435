pub use crate::config::*;

/// A builder for assembling a roster.
///
/// Readers of spreadsheets and CSV files go through the builder, so that the
/// answers are checked against the eligibility questions as soon as a row is read.
///
/// ```
/// pub use entrant_selection::builder::Builder;
/// pub use entrant_selection::SelectionRules;
/// # use entrant_selection::SelectionErrors;
///
/// let mut rules = SelectionRules::new(3);
/// rules.eligibility_questions = vec!["Can you attend?".to_string()];
/// let mut builder = Builder::new(&rules)?;
///
/// builder.add_respondent("Anna.Lee@ucl.ac.uk", "Anna Lee", &["Yes".to_string()])?;
/// assert_eq!(builder.respondents()[0].email, "anna.lee@ucl.ac.uk");
///
/// # Ok::<(), SelectionErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: SelectionRules,
    pub(crate) _respondents: Vec<RespondentRecord>,
}

impl Builder {
    pub fn new(rules: &SelectionRules) -> Result<Builder, SelectionErrors> {
        Ok(Builder {
            _rules: rules.clone(),
            _respondents: Vec::new(),
        })
    }

    /// Adds one row of the roster.
    ///
    /// Duplicated emails are accepted here: the selection keeps the first
    /// occurrence.
    pub fn add_respondent(
        &mut self,
        email: &str,
        name: &str,
        answers: &[String],
    ) -> Result<(), SelectionErrors> {
        let record = RespondentRecord::new(email, name, answers);
        if record.email.is_empty() {
            return Err(SelectionErrors::EmptyEmail {
                position: self._respondents.len(),
            });
        }
        let expected = self._rules.eligibility_questions.len();
        if answers.len() != expected {
            return Err(SelectionErrors::AnswerCountMismatch {
                email: record.email,
                expected,
                found: answers.len(),
            });
        }
        self._respondents.push(record);
        Ok(())
    }

    pub fn respondents(&self) -> &[RespondentRecord] {
        &self._respondents
    }

    pub fn build(self) -> Vec<RespondentRecord> {
        self._respondents
    }
}
