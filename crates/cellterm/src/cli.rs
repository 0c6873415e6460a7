//! Command-line parsing.
//!
//! ```text
//! cellterm [-c COMMAND] [--config PATH]
//! ```

use std::path::PathBuf;

pub const USAGE: &str = "\
cellterm - run a shell inside a managed terminal window

Usage:
  cellterm [options]

Options:
  -c, --command CMD   Run CMD (via sh -c) instead of an interactive shell
      --config PATH   Read configuration from PATH
  -h, --help          Show this help
  -V, --version       Show version
";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Args {
    /// Command to run instead of the interactive shell.
    pub command: Option<String>,

    /// Explicit config file path.
    pub config: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Cli {
    Run(Args),
    Help,
    Version,
}

/// Parse arguments (without the program name).
pub fn parse(mut args: impl Iterator<Item = String>) -> Result<Cli, String> {
    let mut parsed = Args::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Cli::Help),
            "-V" | "--version" => return Ok(Cli::Version),
            "-c" | "--command" => {
                let cmd = args
                    .next()
                    .ok_or_else(|| format!("{} requires an argument", arg))?;
                parsed.command = Some(cmd);
            }
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| format!("{} requires an argument", arg))?;
                parsed.config = Some(PathBuf::from(path));
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
    }

    Ok(Cli::Run(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_strs(args: &[&str]) -> Result<Cli, String> {
        parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_args_runs_interactive() {
        assert_eq!(parse_strs(&[]), Ok(Cli::Run(Args::default())));
    }

    #[test]
    fn command_flag_captures_value() {
        let Ok(Cli::Run(args)) = parse_strs(&["-c", "ls -la"]) else {
            panic!("expected run");
        };
        assert_eq!(args.command.as_deref(), Some("ls -la"));
    }

    #[test]
    fn config_flag_captures_path() {
        let Ok(Cli::Run(args)) = parse_strs(&["--config", "/tmp/c.toml"]) else {
            panic!("expected run");
        };
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn missing_value_is_an_error() {
        assert!(parse_strs(&["-c"]).is_err());
        assert!(parse_strs(&["--config"]).is_err());
    }

    #[test]
    fn unknown_argument_is_an_error() {
        assert!(parse_strs(&["--frobnicate"]).is_err());
    }

    #[test]
    fn help_and_version_short_circuit() {
        assert_eq!(parse_strs(&["--help"]), Ok(Cli::Help));
        assert_eq!(parse_strs(&["-V", "-c", "x"]), Ok(Cli::Version));
    }
}
