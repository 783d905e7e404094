// SPDX-License-Identifier: MIT
//
// n-ex — batch ex-mode search and substitute.
//
// Loads one file into a rope buffer, runs every `-c` command against it in
// order, then writes the result back. The cursor and the pattern history
// carry over from one command to the next, so
//
//   n-ex notes.txt -c '/TODO' -c 's//DONE/' -c 'n' -c '&&'
//
// behaves like typing the same keys in Vim.
//
//   -c '/pat[/off]'  '?pat[?off]'   search, cursor moves to the hit
//   -c 'n' 'N' '3n'                 repeat the last search
//   -c '*' '#' 'g*' 'g#'            search for the word under the cursor
//   -c ':[range]s/pat/rep/[flags]'  substitute (also `&`, `~`)
//   -c ':set ic' ':5'               options, cursor to a line
//
// Confirm prompts (the `c` flag) are read from stdin and written to stderr,
// so `--dry-run` output on stdout stays clean.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use n_search::buffer::{Buffer, TextBuffer};
use n_search::command::{self, ExCommand};
use n_search::executor::{Confirm, ConfirmChoice, SubstituteEnv};
use n_search::jumplist::JumpList;
use n_search::options::{self, SearchOptions};
use n_search::search::{self, SearchEnv};
use n_search::substitute::substitute;
use n_search::{PatternState, Position, Range, SearchDirection, SearchError};

// ─── Arguments ──────────────────────────────────────────────────────────────

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "n-ex", version, about = "Vim-style search and substitute over a file")]
struct Args {
    /// File to edit.
    path: PathBuf,

    /// Command to run; repeat to run several in order.
    #[arg(short = 'c', long = "cmd", value_name = "CMD")]
    commands: Vec<String>,

    /// Write the result here instead of back to FILE.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Print the result to stdout and leave files alone.
    #[arg(long)]
    dry_run: bool,

    /// Stop at the first failing command and write nothing.
    #[arg(long)]
    strict: bool,

    /// Log filter, e.g. `debug` or `search.find=trace`. Overrides `RUST_LOG`.
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,

    /// Configuration file (overrides discovery of `n-ex.toml`).
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,
}

// ─── Steps ──────────────────────────────────────────────────────────────────

/// One `-c` command, classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step<'a> {
    /// `/text` or `?text`: `text` is everything after the delimiter.
    Search(SearchDirection, &'a str),
    /// `n`
    Next,
    /// `N`
    Previous,
    /// `*` `#` (whole word) and `g*` `g#`.
    Word { dir: SearchDirection, whole_word: bool },
    /// Anything else goes to the ex parser.
    Ex(&'a str),
}

/// Split a command into its count (1 when absent) and step. Counts only
/// apply to searches; a leading number before anything else is an ex
/// address.
fn parse_step(text: &str) -> (usize, Step<'_>) {
    let text = text.trim_start();
    let digits = text.len() - text.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let (count, rest) = text.split_at(digits);

    let step = if let Some(dir) = rest.chars().next().and_then(SearchDirection::from_delimiter) {
        Step::Search(dir, &rest[1..])
    } else {
        match rest.trim_end() {
            "n" => Step::Next,
            "N" => Step::Previous,
            "*" => Step::Word { dir: SearchDirection::Forward, whole_word: true },
            "#" => Step::Word { dir: SearchDirection::Backward, whole_word: true },
            "g*" => Step::Word { dir: SearchDirection::Forward, whole_word: false },
            "g#" => Step::Word { dir: SearchDirection::Backward, whole_word: false },
            _ => return (1, Step::Ex(text)),
        }
    };
    let count = count.parse().unwrap_or(1).max(1);
    (count, step)
}

// ─── Session ────────────────────────────────────────────────────────────────

/// The buffer plus everything that persists between commands.
struct Session {
    buf: Buffer,
    opts: SearchOptions,
    state: PatternState,
    cursor: Position,
    jumps: JumpList,
}

impl Session {
    fn new(buf: Buffer, opts: SearchOptions) -> Self {
        Self {
            buf,
            opts,
            state: PatternState::new(),
            cursor: Position::ZERO,
            jumps: JumpList::new(),
        }
    }

    /// Run one command. Returns the messages Vim would show for it.
    fn run(&mut self, text: &str, confirm: &mut dyn Confirm) -> Result<Vec<String>, SearchError> {
        let (count, step) = parse_step(text);
        debug!(target: "cli", command = text, ?step, count, "run");

        let env = SearchEnv::new(&self.buf, &self.opts);
        let (hit, dir) = match step {
            Step::Ex(line) => return self.ex(line, confirm),
            Step::Search(dir, command) => (
                search::search(&mut self.state, env, command, self.cursor, count, dir)?,
                dir,
            ),
            Step::Next => (
                search::search_next(&mut self.state, env, self.cursor, count)?,
                self.state.last_direction(),
            ),
            Step::Previous => (
                search::search_previous(&mut self.state, env, self.cursor, count)?,
                self.state.last_direction().opposite(),
            ),
            Step::Word { dir, whole_word } => (
                search::search_word(&mut self.state, env, self.cursor, count, whole_word, dir)?,
                dir,
            ),
        };

        self.jumps.push(self.cursor);
        self.cursor = hit.pos;

        let mut messages = Vec::new();
        if hit.wrapped {
            messages.push(wrap_message(dir).to_string());
        }
        Ok(messages)
    }

    fn ex(&mut self, text: &str, confirm: &mut dyn Confirm) -> Result<Vec<String>, SearchError> {
        match command::parse_ex(text)? {
            ExCommand::Set(args) => {
                let mut shown = Vec::new();
                for directive in options::parse_set(&args) {
                    if let Some(line) = self.opts.apply(&directive)? {
                        shown.push(line);
                    }
                }
                Ok(shown)
            }
            ExCommand::Goto(range) => {
                let lines = range.resolve(self.cursor.line, self.buf.line_count(), None)?;
                self.jumps.push(self.cursor);
                self.cursor = Position::new(lines.end, self.buf.first_non_blank(lines.end));
                Ok(Vec::new())
            }
            ExCommand::Substitute { range, excmd, arg } => {
                let lines = range.resolve(self.cursor.line, self.buf.line_count(), None)?;
                let mut env = SubstituteEnv {
                    buffer: &mut self.buf,
                    options: &self.opts,
                    confirm,
                    jumps: &mut self.jumps,
                };
                let outcome = substitute(&mut self.state, &mut env, excmd, &arg, lines, self.cursor)?;
                outcome.check_found()?;

                if let Some(cursor) = outcome.cursor {
                    self.cursor = cursor;
                }
                Ok(outcome.printed.iter().cloned().chain(outcome.report()).collect())
            }
        }
    }
}

const fn wrap_message(dir: SearchDirection) -> &'static str {
    match dir {
        SearchDirection::Forward => "search hit BOTTOM, continuing at TOP",
        SearchDirection::Backward => "search hit TOP, continuing at BOTTOM",
    }
}

// ─── Confirm prompt ─────────────────────────────────────────────────────────

/// Asks `replace with X (y/n/a/q/l)?` for each match of a `c`-flagged
/// substitute. End of input, or a read error, answers `q`.
struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Confirm for Prompt<R, W> {
    fn confirm_replace(&mut self, span: Range, replacement: &str) -> ConfirmChoice {
        loop {
            let asked = write!(self.output, "{} replace with {replacement} (y/n/a/q/l)? ", span.start)
                .and_then(|()| self.output.flush());
            if let Err(e) = asked {
                warn!(target: "cli", error = %e, "prompt_write_failed");
                return ConfirmChoice::Quit;
            }

            let mut answer = String::new();
            match self.input.read_line(&mut answer) {
                Ok(0) => return ConfirmChoice::Quit,
                Ok(_) => {}
                Err(e) => {
                    warn!(target: "cli", error = %e, "prompt_read_failed");
                    return ConfirmChoice::Quit;
                }
            }
            if let Some(choice) = answer.trim().chars().next().and_then(ConfirmChoice::from_key) {
                return choice;
            }
        }
    }
}

// ─── Startup ────────────────────────────────────────────────────────────────

/// Install the stderr log subscriber. `--log-level` wins over `RUST_LOG`;
/// with neither, only warnings are shown.
fn configure_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// `--config`, else `n-ex.toml` found by discovery, else the defaults.
fn load_options(explicit: Option<&Path>) -> Result<SearchOptions> {
    let path = explicit.map_or_else(options::discover, Path::to_path_buf);
    SearchOptions::load_from(&path).with_context(|| format!("loading config {}", path.display()))
}

/// Run every command; report messages on stdout and errors on stderr.
/// Returns false if any command failed. With `strict`, stops at the first
/// failure.
fn run_commands(
    session: &mut Session,
    commands: &[String],
    strict: bool,
    confirm: &mut dyn Confirm,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> io::Result<bool> {
    let mut ok = true;
    for text in commands {
        match session.run(text, confirm) {
            Ok(messages) => {
                for message in messages {
                    writeln!(out, "{message}")?;
                }
            }
            Err(e) => {
                debug!(target: "cli", command = %text, error = %e, "command_failed");
                writeln!(err, "{e}")?;
                ok = false;
                if strict {
                    break;
                }
            }
        }
    }
    Ok(ok)
}

/// Write the edited buffer: to stdout for a dry run, else to `output` or
/// back to the file it came from. An unmodified buffer is only written when
/// `output` names a different file.
fn write_result(
    buf: &mut Buffer,
    source: &Path,
    output: Option<&Path>,
    dry_run: bool,
    out: &mut dyn Write,
) -> Result<()> {
    if dry_run {
        out.write_all(buf.contents().as_bytes())
            .context("writing to stdout")?;
        return Ok(());
    }
    let target = output.unwrap_or(source);
    if !buf.is_modified() && output.is_none() {
        info!(target: "cli", path = %source.display(), "unchanged");
        return Ok(());
    }
    buf.save_as(target)
        .with_context(|| format!("writing {}", target.display()))?;
    info!(target: "cli", path = %target.display(), "written");
    Ok(())
}

fn run(args: &Args) -> Result<bool> {
    let opts = load_options(args.config.as_deref())?;
    let buf = Buffer::from_file(&args.path)
        .with_context(|| format!("reading {}", args.path.display()))?;
    info!(
        target: "cli",
        path = %args.path.display(),
        lines = buf.line_count(),
        commands = args.commands.len(),
        "loaded"
    );

    let mut session = Session::new(buf, opts);
    let mut confirm = Prompt { input: io::stdin().lock(), output: io::stderr() };
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr();

    let ok = run_commands(
        &mut session,
        &args.commands,
        args.strict,
        &mut confirm,
        &mut stdout,
        &mut stderr,
    )
    .context("writing messages")?;
    if !ok && args.strict {
        return Ok(false);
    }

    write_result(
        &mut session.buf,
        &args.path,
        args.output.as_deref(),
        args.dry_run,
        &mut stdout,
    )?;
    Ok(ok)
}

fn main() -> ExitCode {
    let args = Args::parse();
    configure_logging(args.log_level.as_deref());

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("n-ex: {e:#}");
            ExitCode::FAILURE
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
