//! REPL loop with rustyline.
//!
//! Interactive mode: prompt, meta-commands, history, TAB completion.
//! Pipe mode: read lines from stdin, evaluate each in the same session.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::FileHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};
use tracing::{debug, warn};

use crate::format::{format_error, format_names, format_value, OutputMode};
use crate::parse::{check_meta_command, MetaCommand};
use crate::state::SessionState;

/// What the caller should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Done,
    Failed,
    Quit,
}

/// Run the interactive REPL.
pub fn run_repl(state: &mut SessionState, mode: OutputMode, keep_history: bool) {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let mut rl: Editor<DocshellHelper, FileHistory> = match Editor::with_config(config) {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("(error) cannot start line editor: {}", e);
            return;
        }
    };
    rl.set_helper(Some(DocshellHelper));

    let history_path = if keep_history { history_file() } else { None };
    if let Some(ref path) = history_path {
        if let Err(e) = rl.load_history(path) {
            debug!(path = %path.display(), error = %e, "no history loaded");
        }
    }

    let mut interrupted = false;
    loop {
        let prompt = state.prompt();
        match rl.readline(&prompt) {
            Ok(line) => {
                interrupted = false;
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                remember(&mut rl, trimmed, history_path.as_deref());

                if execute_line(state, trimmed, mode) == LineOutcome::Quit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C twice in a row exits
                if interrupted {
                    break;
                }
                interrupted = true;
                println!("(To exit, press Ctrl+C again or Ctrl+D or type exit)");
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                eprintln!("(error) {:?}", err);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        save_history(&mut rl, path);
    }
}

/// Add `line` to history and write the file right away, so a session that
/// is killed keeps what it ran.
fn remember(rl: &mut Editor<DocshellHelper, FileHistory>, line: &str, path: Option<&Path>) {
    let _ = rl.add_history_entry(line);
    if let Some(path) = path {
        save_history(rl, path);
    }
}

fn save_history(rl: &mut Editor<DocshellHelper, FileHistory>, path: &Path) {
    if let Err(e) = rl.save_history(path) {
        warn!(path = %path.display(), error = %e, "failed to save history");
    }
}

/// Run in pipe mode: read lines from stdin, evaluate each.
///
/// Returns 1 if any line failed.
pub fn run_pipe(state: &mut SessionState, mode: OutputMode) -> i32 {
    let stdin = io::stdin();
    let mut exit_code = 0;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }

        match execute_line(state, trimmed, mode) {
            LineOutcome::Done => {}
            LineOutcome::Failed => exit_code = 1,
            LineOutcome::Quit => break,
        }
    }

    exit_code
}

/// Handle one line: a meta-command or a script snippet.
pub fn execute_line(state: &mut SessionState, line: &str, mode: OutputMode) -> LineOutcome {
    let meta = match check_meta_command(line) {
        None => return print_result(state.eval(line), mode),
        Some(Ok(meta)) => meta,
        Some(Err(usage)) => {
            eprintln!("(error) {}", usage);
            return LineOutcome::Failed;
        }
    };

    match meta {
        MetaCommand::Quit => return LineOutcome::Quit,
        MetaCommand::Clear => print!("\x1B[2J\x1B[1;1H"),
        MetaCommand::Help => print_help(),
        MetaCommand::Use { database } => {
            state.use_database(&database);
            if mode == OutputMode::Human {
                println!("switched to db {}", state.database());
            }
        }
        MetaCommand::ShowCollections => return print_names(state.show_collections(), mode),
        MetaCommand::ShowDatabases => return print_names(state.show_databases(), mode),
        MetaCommand::Run { path } => return print_result(state.run_file(&path), mode),
    }
    LineOutcome::Done
}

/// Print an evaluation result the way the REPL does.
pub fn print_result(
    result: docshell_executor::Result<Option<serde_json::Value>>,
    mode: OutputMode,
) -> LineOutcome {
    match result {
        Ok(Some(value)) => {
            println!("{}", format_value(&value, mode));
            LineOutcome::Done
        }
        Ok(None) => LineOutcome::Done,
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            LineOutcome::Failed
        }
    }
}

fn print_names(
    result: docshell_executor::Result<serde_json::Value>,
    mode: OutputMode,
) -> LineOutcome {
    match result {
        Ok(names) => {
            let formatted = format_names(&names, mode);
            if !formatted.is_empty() {
                println!("{}", formatted);
            }
            LineOutcome::Done
        }
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            LineOutcome::Failed
        }
    }
}

fn history_file() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".docshell_history"))
}

fn print_help() {
    println!("Scripts are Rhai. Each line runs in the same session.");
    println!();
    println!("Globals:");
    println!("  db                         The selected database");
    println!("  db.<name> / db[\"<name>\"]   A collection (any name that isn't a db method)");
    println!("  use(\"<name>\")              Switch databases");
    println!("  ObjectId(\"<hex>\")          Identifier wrapper {{ \"$oid\": ... }}");
    println!("  console.log(..) / .error(..)  Print up to 6 values as JSON (pass an array for more)");
    println!("  assert.eq(a, b, msg) / assert.throws(|| ..)");
    println!();
    println!("Collection methods:");
    println!("  find([filter])  insertOne(doc)  insertMany([docs])");
    println!("  updateOne(filter, update)  updateMany(filter, update)");
    println!("  deleteOne(filter)  deleteMany(filter)  aggregate([stages])");
    println!("  drop()  save(doc)");
    println!();
    println!("Meta-commands:");
    println!("  use <db>              Switch databases");
    println!("  show collections      List collections in the current database");
    println!("  show databases        List databases");
    println!("  run <file>            Run a script file in this session");
    println!("  help                  Show this help");
    println!("  clear                 Clear screen");
    println!("  quit / exit           Exit REPL");
    println!();
    println!("Ctrl-C while a command waits on the database cancels that call.");
}

// =========================================================================
// TAB Completion
// =========================================================================

/// Meta-commands for TAB completion at the start of a line.
const META_COMMANDS: &[&str] = &[
    "use", "show", "run", "help", "clear", "quit", "exit", "db", "console", "assert",
    "ObjectId",
];

const SHOW_TARGETS: &[&str] = &["collections", "databases"];

const DATABASE_METHODS: &[&str] = &[
    "getName()",
    "getCollection(",
    "listCollections()",
    "listDatabases()",
    "name",
    "address",
    "port",
];

const COLLECTION_METHODS: &[&str] = &[
    "find(",
    "insertOne(",
    "insertMany(",
    "updateOne(",
    "updateMany(",
    "deleteOne(",
    "deleteMany(",
    "aggregate(",
    "drop()",
    "save(",
    "getName()",
    "name",
    "database",
];

/// Candidates for the word ending at `pos`, and where that word starts.
fn complete_word(line: &str, pos: usize) -> (usize, Vec<&'static str>) {
    let line_to_pos = &line[..pos];
    let start = line_to_pos
        .rfind(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
        .map(|i| i + 1)
        .unwrap_or(0);
    let word = &line_to_pos[start..];

    if let Some(rest) = line_to_pos.strip_prefix("show ") {
        if !rest.contains(' ') {
            return (pos - rest.len(), filter(SHOW_TARGETS, rest));
        }
    }

    let segments: Vec<&str> = word.split('.').collect();
    match segments.as_slice() {
        [only] if start == 0 => (start, filter(META_COMMANDS, only)),
        ["db", prefix] => (pos - prefix.len(), filter(DATABASE_METHODS, prefix)),
        ["db", _, prefix] => (pos - prefix.len(), filter(COLLECTION_METHODS, prefix)),
        _ => (pos, Vec::new()),
    }
}

fn filter(options: &[&'static str], prefix: &str) -> Vec<&'static str> {
    options
        .iter()
        .copied()
        .filter(|o| o.starts_with(prefix))
        .collect()
}

struct DocshellHelper;

impl Helper for DocshellHelper {}
impl Validator for DocshellHelper {}
impl Highlighter for DocshellHelper {}
impl Hinter for DocshellHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Completer for DocshellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, words) = complete_word(line, pos);
        let candidates = words
            .into_iter()
            .map(|w| Pair {
                display: w.to_string(),
                replacement: w.to_string(),
            })
            .collect();
        Ok((start, candidates))
    }
}
