use clap::Parser;
use matchstick::Regex;
use std::process::ExitCode;

/// Compiles a regular expression and lists every match in the input.
#[derive(Parser)]
#[command(name = "matchstick", version, about)]
struct Args {
    /// The pattern to compile
    pattern: String,
    /// The input to search
    input: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut regex = Regex::new();
    if let Err(error) = regex.compile(&args.pattern) {
        eprintln!("Unable to compile the regular expression - reason: \"{error}\"");
        return ExitCode::FAILURE;
    }

    let matches = match regex.matches(&args.input) {
        Ok(matches) => matches,
        Err(error) => {
            eprintln!("Unable to match the input - reason: \"{error}\"");
            return ExitCode::FAILURE;
        }
    };

    if matches.is_empty() {
        println!("no");
    } else {
        for (index, found) in matches.iter().enumerate() {
            println!("#{index}: {found}");
        }
    }
    ExitCode::SUCCESS
}
