//! docshell: a scriptable shell for document databases.
//!
//! Modes:
//! - **Eval mode**: `docshell -e 'db.users.find()'` - one snippet, exit
//! - **Script mode**: `docshell seed.rhai` - run a file, exit
//! - **REPL mode**: `docshell [flags]` - interactive prompt (if stdin is TTY)
//! - **Pipe mode**: `echo 'db.users.find()' | docshell` - line-by-line from stdin

mod commands;
mod format;
mod parse;
mod repl;
mod state;

use std::io::IsTerminal;
use std::path::Path;
use std::process;
use std::sync::Arc;

use docshell_executor::{Backend, CancelToken, MemoryBackend, ShellConfig, CONFIG_FILE_NAME};
use docshell_script::StdioSink;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::build_cli;
use format::{format_error, OutputMode};
use parse::config_from_matches;
use repl::LineOutcome;
use state::SessionState;

fn main() {
    let matches = build_cli().get_matches();

    init_tracing(matches.get_flag("debug"));

    if matches.get_flag("init-config") {
        process::exit(init_config());
    }

    let output_mode = if matches.get_flag("json") {
        OutputMode::Json
    } else if matches.get_flag("raw") {
        OutputMode::Raw
    } else {
        OutputMode::Human
    };

    let config = match config_from_matches(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error(&e, output_mode));
            process::exit(1);
        }
    };

    let backend = match open_backend(matches.get_flag("memory")) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("(error) {}", e);
            process::exit(1);
        }
    };
    info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        backend = backend.name(),
        "starting shell"
    );

    let mut state = match SessionState::new(&config, backend, Arc::new(StdioSink)) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("{}", format_error(&e, output_mode));
            process::exit(1);
        }
    };

    install_interrupt_handler(state.cancel_handle());

    if let Some(code) = matches.get_one::<String>("eval") {
        let result = state.eval(code);
        process::exit(report(result, output_mode));
    } else if let Some(script) = matches.get_one::<String>("script") {
        let result = state.run_file(Path::new(script));
        process::exit(report(result, output_mode));
    } else if std::io::stdin().is_terminal() {
        repl::run_repl(&mut state, output_mode, config.history);
    } else {
        let exit_code = repl::run_pipe(&mut state, output_mode);
        process::exit(exit_code);
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // stderr keeps script output on stdout clean
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// First Ctrl-C cancels the call in flight, a second one before the next
/// evaluation exits. At the REPL prompt rustyline handles Ctrl-C itself.
fn install_interrupt_handler(cancel: CancelToken) {
    let result = ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            process::exit(130);
        }
        cancel.cancel();
    });
    if let Err(e) = result {
        warn!(error = %e, "cannot install Ctrl-C handler");
    }
}

fn open_backend(memory: bool) -> Result<Arc<dyn Backend>, String> {
    if memory {
        return Ok(Arc::new(MemoryBackend::new()));
    }

    #[cfg(feature = "mongo")]
    let backend: Result<Arc<dyn Backend>, String> =
        Ok(Arc::new(docshell_executor::MongoBackend::new()));

    #[cfg(not(feature = "mongo"))]
    let backend: Result<Arc<dyn Backend>, String> = Err(
        "built without MongoDB support; rerun with --memory or rebuild with --features mongo"
            .to_string(),
    );

    backend
}

fn init_config() -> i32 {
    let path = Path::new(CONFIG_FILE_NAME);
    if path.exists() {
        eprintln!("{} already exists", CONFIG_FILE_NAME);
        return 1;
    }
    match ShellConfig::write_default_if_missing(path) {
        Ok(()) => {
            println!("wrote {}", CONFIG_FILE_NAME);
            0
        }
        Err(e) => {
            eprintln!("(error) {}", e);
            1
        }
    }
}

fn report(result: docshell_executor::Result<Option<serde_json::Value>>, mode: OutputMode) -> i32 {
    match repl::print_result(result, mode) {
        LineOutcome::Failed => 1,
        _ => 0,
    }
}
