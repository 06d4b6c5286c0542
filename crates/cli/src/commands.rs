//! Clap command definition.

use clap::{value_parser, Arg, ArgAction, Command};

/// Build the CLI.
pub fn build_cli() -> Command {
    Command::new("docshell")
        .about("Scriptable shell for document databases")
        .arg(
            Arg::new("script")
                .value_name("FILE")
                .help("Run a script file and exit"),
        )
        .arg(
            Arg::new("eval")
                .long("eval")
                .short('e')
                .value_name("CODE")
                .help("Evaluate one script snippet, print its value and exit")
                .conflicts_with("script"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Server host (default: 127.0.0.1)"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .help("Server port (default: 27017)"),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .value_name("NAME")
                .help("Initial database (default: test)"),
        )
        .arg(
            Arg::new("timeout-ms")
                .long("timeout-ms")
                .value_name("MILLIS")
                .value_parser(value_parser!(u64))
                .help("Longest a single database call may block (default: 30000)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Configuration file (default: ./docshell.toml if present)"),
        )
        .arg(
            Arg::new("memory")
                .long("memory")
                .help("Use an ephemeral in-memory backend instead of a server")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Single-line JSON output")
                .action(ArgAction::SetTrue)
                .conflicts_with("raw"),
        )
        .arg(
            Arg::new("raw")
                .long("raw")
                .help("Raw output (strings unquoted)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("init-config")
                .long("init-config")
                .help("Write a commented docshell.toml to the current directory and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Log every database call to stderr")
                .action(ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_parses_connection_flags() {
        let m = build_cli()
            .try_get_matches_from([
                "docshell", "--host", "db.local", "--port", "27018", "--db", "shop",
                "--timeout-ms", "500",
            ])
            .unwrap();
        assert_eq!(m.get_one::<String>("host").unwrap(), "db.local");
        assert_eq!(*m.get_one::<u16>("port").unwrap(), 27018);
        assert_eq!(m.get_one::<String>("db").unwrap(), "shop");
        assert_eq!(*m.get_one::<u64>("timeout-ms").unwrap(), 500);
    }

    #[test]
    fn test_script_and_eval_conflict() {
        let err = build_cli().try_get_matches_from(["docshell", "a.rhai", "-e", "1"]);
        assert!(err.is_err());
    }

    #[test]
    fn test_bad_port_rejected() {
        let err = build_cli().try_get_matches_from(["docshell", "--port", "99999"]);
        assert!(err.is_err());
    }
}
