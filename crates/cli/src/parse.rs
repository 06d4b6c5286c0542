//! REPL meta-commands and ArgMatches → ShellConfig.
//!
//! A line is a meta-command only when its first word is one of the words
//! below; everything else is handed to the script engine untouched, so
//! `use("shop")` stays a script call while `use shop` is a meta-command.

use std::path::{Path, PathBuf};

use clap::ArgMatches;
use docshell_executor::{Error, Result, ShellConfig, CONFIG_FILE_NAME};

/// REPL meta-commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Use { database: String },
    ShowCollections,
    ShowDatabases,
    Run { path: PathBuf },
    Help,
    Clear,
    Quit,
}

/// Check for a meta-command before handing the line to the script engine.
///
/// Returns `Some(Err(..))` for a recognised command with bad arguments.
pub fn check_meta_command(line: &str) -> Option<std::result::Result<MetaCommand, String>> {
    let trimmed = line.trim().trim_end_matches(';');
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let cmd = parts.next()?;
    let rest = parts.next().map(str::trim).unwrap_or("");

    match cmd {
        "quit" | "exit" if rest.is_empty() => Some(Ok(MetaCommand::Quit)),
        "clear" if rest.is_empty() => Some(Ok(MetaCommand::Clear)),
        "help" if rest.is_empty() => Some(Ok(MetaCommand::Help)),
        "show" => match rest {
            "collections" | "tables" => Some(Ok(MetaCommand::ShowCollections)),
            "databases" | "dbs" => Some(Ok(MetaCommand::ShowDatabases)),
            "" => Some(Err("usage: show collections | show databases".to_string())),
            other => Some(Err(format!("don't know how to show '{}'", other))),
        },
        "use" if !rest.starts_with('(') => Some(
            single_word(rest, "use <database>").map(|database| MetaCommand::Use { database }),
        ),
        "run" if !rest.starts_with('(') => Some(
            single_word(rest, "run <file>").map(|path| MetaCommand::Run {
                path: PathBuf::from(path),
            }),
        ),
        _ => None,
    }
}

// Quotes are allowed so names and paths may contain spaces.
fn single_word(rest: &str, usage: &str) -> std::result::Result<String, String> {
    let tokens = shlex::split(rest).ok_or_else(|| "Invalid quoting".to_string())?;
    match tokens.as_slice() {
        [one] if !one.is_empty() => Ok(one.clone()),
        _ => Err(format!("usage: {}", usage)),
    }
}

/// Build the effective configuration.
///
/// `--config` must exist; otherwise `./docshell.toml` is read when present.
/// Flags win over the file.
pub fn config_from_matches(matches: &ArgMatches) -> Result<ShellConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ShellConfig::from_file(Path::new(path))?,
        None if Path::new(CONFIG_FILE_NAME).is_file() => {
            ShellConfig::from_file(Path::new(CONFIG_FILE_NAME))?
        }
        None => ShellConfig::default(),
    };

    if let Some(host) = matches.get_one::<String>("host") {
        config.host = host.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        config.port = *port;
    }
    if let Some(db) = matches.get_one::<String>("db") {
        config.database = db.clone();
    }
    if let Some(ms) = matches.get_one::<u64>("timeout-ms") {
        config.timeout_ms = *ms;
    }

    config.validate().map_err(Error::from)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::build_cli;

    fn meta(line: &str) -> Option<MetaCommand> {
        check_meta_command(line).map(|r| r.unwrap())
    }

    #[test]
    fn test_simple_meta_commands() {
        assert_eq!(meta("exit"), Some(MetaCommand::Quit));
        assert_eq!(meta("quit"), Some(MetaCommand::Quit));
        assert_eq!(meta("  clear  "), Some(MetaCommand::Clear));
        assert_eq!(meta("help"), Some(MetaCommand::Help));
        assert_eq!(meta("show collections"), Some(MetaCommand::ShowCollections));
        assert_eq!(meta("show dbs"), Some(MetaCommand::ShowDatabases));
    }

    #[test]
    fn test_use_and_run_take_one_argument() {
        assert_eq!(
            meta("use shop"),
            Some(MetaCommand::Use {
                database: "shop".into()
            })
        );
        assert_eq!(
            meta("use shop;"),
            Some(MetaCommand::Use {
                database: "shop".into()
            })
        );
        assert_eq!(
            meta(r#"run "my scripts/seed.rhai""#),
            Some(MetaCommand::Run {
                path: PathBuf::from("my scripts/seed.rhai")
            })
        );
        assert!(check_meta_command("use").unwrap().is_err());
        assert!(check_meta_command("use a b").unwrap().is_err());
        assert!(check_meta_command("show tea").unwrap().is_err());
    }

    #[test]
    fn test_script_lines_are_not_meta() {
        assert_eq!(meta(r#"use("shop")"#), None);
        assert_eq!(meta(r#"use ("shop")"#), None);
        assert_eq!(meta("db.users.find()"), None);
        assert_eq!(meta("exit()"), None);
        assert_eq!(meta("let help = 1"), None);
        assert_eq!(meta(""), None);
    }

    #[test]
    fn test_flags_override_defaults() {
        let m = build_cli()
            .try_get_matches_from(["docshell", "--db", "shop", "--port", "27018"])
            .unwrap();
        let config = config_from_matches(&m).unwrap();
        assert_eq!(config.database, "shop");
        assert_eq!(config.port, 27018);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shell.toml");
        std::fs::write(&path, "host = \"db.local\"\ndatabase = \"archive\"\n").unwrap();

        let m = build_cli()
            .try_get_matches_from([
                "docshell",
                "--config",
                path.to_str().unwrap(),
                "--db",
                "shop",
            ])
            .unwrap();
        let config = config_from_matches(&m).unwrap();
        assert_eq!(config.host, "db.local");
        assert_eq!(config.database, "shop");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let m = build_cli()
            .try_get_matches_from(["docshell", "--config", "/definitely/not/here.toml"])
            .unwrap();
        assert!(config_from_matches(&m).is_err());
    }
}
