mod args;
mod draw;
mod prompt;

use clap::Parser;
use log::{debug, info};
use std::io;
use std::path::Path;

use crate::args::Args;
use crate::draw::config_reader::{read_config, DrawConfig};
use crate::draw::*;

fn run(args: &Args) -> DrawResult<SelectionResult> {
    let config: Option<DrawConfig> = match &args.config {
        Some(p) => Some(read_config(p)?),
        None => None,
    };
    let config_root: Option<&Path> = args.config.as_ref().and_then(|p| Path::new(p).parent());

    let args = if prompt::needs_input(args, config.as_ref())? {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        prompt::complete_args(args, config.as_ref(), &mut input, &mut io::stdout())?
    } else {
        args.clone()
    };

    let settings = build_settings(&args, config.as_ref(), config_root)?;
    run_draw(&settings)
}

fn print_selection(result: &SelectionResult) {
    println!("Selected {} members", result.selected.len());
    println!("\nSelected Names:");
    let names: Vec<&str> = result.selected.iter().map(|r| r.name.as_str()).collect();
    println!("{}", names.join(", "));
    println!("\nSelected Emails:");
    let emails: Vec<&str> = result.selected.iter().map(|r| r.email.as_str()).collect();
    println!("{}", emails.join(", "));
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    debug!("main: args: {:?}", args);

    match run(&args) {
        Ok(result) => {
            info!(
                "Draw complete: {} selected, {} remaining",
                result.selected.len(),
                result.remaining.len()
            );
            print_selection(&result);
        }
        Err(e) => {
            eprintln!("An error occured: {}", e);
            let mut source = std::error::Error::source(&e);
            while let Some(s) = source {
                eprintln!("  caused by: {}", s);
                source = s.source();
            }
            std::process::exit(1);
        }
    }
}
