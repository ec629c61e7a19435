//! Asks on the terminal for what the command line and the configuration
//! left out.

use log::debug;
use snafu::prelude::*;
use std::io::{BufRead, Write};

use crate::args::Args;
use crate::draw::config_reader::{DrawConfig, DrawRules};
use crate::draw::*;

fn config_rules(config: Option<&DrawConfig>) -> Option<&DrawRules> {
    config.and_then(|c| c.rules.as_ref())
}

fn has_spaces(args: &Args, config: Option<&DrawConfig>) -> DrawResult<bool> {
    if args.number_spaces.is_some() {
        return Ok(true);
    }
    match config_rules(config) {
        Some(rules) => Ok(rules.number_of_spaces()?.is_some()),
        None => Ok(false),
    }
}

fn has_roster(args: &Args, config: Option<&DrawConfig>) -> bool {
    args.draw_remaining
        || args.file_location.is_some()
        || config
            .and_then(|c| c.roster_source.as_ref())
            .and_then(|r| r.file_path.as_ref())
            .is_some()
}

/// True when the draw cannot start without asking the user.
pub fn needs_input(args: &Args, config: Option<&DrawConfig>) -> DrawResult<bool> {
    Ok(!has_spaces(args, config)? || !has_roster(args, config))
}

fn ask<R: BufRead, W: Write>(question: &str, input: &mut R, output: &mut W) -> DrawResult<String> {
    write!(output, "{}", question).context(PromptSnafu {})?;
    output.flush().context(PromptSnafu {})?;
    let mut line = String::new();
    let read = input.read_line(&mut line).context(PromptSnafu {})?;
    if read == 0 {
        whatever!("No answer to {:?}", question.trim())
    }
    Ok(line.trim().to_string())
}

/// Fills the missing arguments by asking the questions one after the other.
/// The number of spaces is asked again until it is a number.
pub fn complete_args<R: BufRead, W: Write>(
    args: &Args,
    config: Option<&DrawConfig>,
    input: &mut R,
    output: &mut W,
) -> DrawResult<Args> {
    let mut res = args.clone();

    if !has_spaces(args, config)? {
        loop {
            let answer = ask("Number of spaces: ", input, output)?;
            match answer.parse::<u32>() {
                Ok(n) => {
                    res.number_spaces = Some(n);
                    break;
                }
                Err(_) => {
                    writeln!(output, "{:?} is not a number", answer).context(PromptSnafu {})?;
                }
            }
        }
    }

    let ask_roster = !has_roster(args, config);
    if ask_roster {
        let answer = ask("Draw from remaining? (Y/N): ", input, output)?;
        res.draw_remaining = matches!(answer.chars().next(), Some('y') | Some('Y'));
    }

    let has_pre_approved =
        args.preapproved.is_some() || config_rules(config).and_then(|r| r.pre_approved.as_ref()).is_some();
    if !has_pre_approved {
        let answer = ask("Enter pre-approved names (alice, bob, jim): ", input, output)?;
        res.preapproved = Some(answer);
    }

    if ask_roster && !res.draw_remaining {
        let answer = ask("Enter file location of responses: ", input, output)?;
        res.file_location = Some(answer);
    }

    debug!("complete_args: {:?}", res);
    Ok(res)
}
