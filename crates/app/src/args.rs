use std::fmt;
use std::path::PathBuf;

use ham_core::model::{LicenseClass, StudyMode};

const DEFAULT_DB_URL: &str = "sqlite://ham.sqlite3";
const DEFAULT_QUESTIONS: &str = "data/technician.json,data/general.json,data/extra.json";

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { command: &'static str, what: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidClass { raw: String },
    InvalidMode { raw: String },
    InvalidToggle { raw: String },
    InvalidClearTarget { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { command, what } => {
                write!(f, "{command} requires {what}")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidClass { raw } => write!(f, "invalid --class value: {raw}"),
            ArgsError::InvalidMode { raw } => write!(f, "invalid --mode value: {raw}"),
            ArgsError::InvalidToggle { raw } => write!(f, "expected on or off, got: {raw}"),
            ArgsError::InvalidClearTarget { raw } => write!(
                f,
                "invalid clear target: {raw} (wrong, notes, progress, answers, all)"
            ),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearTarget {
    Wrong,
    Notes,
    Progress,
    Answers,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Practice,
    Exam,
    Reseed,
    Wrong,
    Export(Option<PathBuf>),
    Import(PathBuf),
    NotesExport(Option<PathBuf>),
    NotesImport(String),
    Clear(ClearTarget),
    AutoAdvance(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub command: Command,
    pub db_url: String,
    pub questions: Vec<String>,
    pub class: LicenseClass,
    pub mode: StudyMode,
    pub merge: bool,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  ham-study [practice]            [--mode sequential|random|retry] [--class <class>]");
    eprintln!("  ham-study exam                  [--class Technician|General|Extra]");
    eprintln!("  ham-study reseed                # new practice and exam seeds");
    eprintln!("  ham-study wrong                 # list the wrong-answer set");
    eprintln!("  ham-study export [file]");
    eprintln!("  ham-study import <file> [--merge]");
    eprintln!("  ham-study notes-export [file]");
    eprintln!("  ham-study notes-import <file|url> [--merge]");
    eprintln!("  ham-study clear <wrong|notes|progress|answers|all>");
    eprintln!("  ham-study auto-advance <on|off>");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --db <sqlite_url>               default {DEFAULT_DB_URL}");
    eprintln!("  --questions <src>[,<src>...]    file paths or URLs; a|b lists mirrors");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  HAM_DB_URL, HAM_QUESTIONS, RUST_LOG");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn split_questions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

impl Args {
    /// Parse `argv` (without the program name), with `env` supplying
    /// defaults for `--db` and `--questions`.
    pub fn parse(
        argv: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("HAM_DB_URL")
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut questions =
            split_questions(&env("HAM_QUESTIONS").unwrap_or_else(|| DEFAULT_QUESTIONS.into()));
        let mut class = LicenseClass::Technician;
        let mut mode = StudyMode::Sequential;
        let mut merge = false;
        let mut positionals = Vec::new();

        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--questions" => {
                    questions = split_questions(&require_value(&mut args, "--questions")?);
                }
                "--class" => {
                    let value = require_value(&mut args, "--class")?;
                    class = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidClass { raw: value.clone() })?;
                }
                "--mode" => {
                    let value = require_value(&mut args, "--mode")?;
                    mode = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidMode { raw: value.clone() })?;
                    if mode == StudyMode::Exam {
                        return Err(ArgsError::InvalidMode { raw: value });
                    }
                }
                "--merge" => merge = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positionals.push(arg),
            }
        }

        let command = parse_command(positionals)?;
        Ok(Self {
            command,
            db_url,
            questions,
            class,
            mode,
            merge,
        })
    }
}

fn parse_command(positionals: Vec<String>) -> Result<Command, ArgsError> {
    let mut positionals = positionals.into_iter();
    let Some(name) = positionals.next() else {
        return Ok(Command::Practice);
    };
    let operand = positionals.next();
    if let Some(extra) = positionals.next() {
        return Err(ArgsError::UnknownArg(extra));
    }

    let command = match name.as_str() {
        "practice" => no_operand(Command::Practice, operand)?,
        "exam" => no_operand(Command::Exam, operand)?,
        "reseed" => no_operand(Command::Reseed, operand)?,
        "wrong" => no_operand(Command::Wrong, operand)?,
        "export" => Command::Export(operand.map(PathBuf::from)),
        "notes-export" => Command::NotesExport(operand.map(PathBuf::from)),
        "import" => Command::Import(PathBuf::from(operand.ok_or(ArgsError::MissingArgument {
            command: "import",
            what: "a file",
        })?)),
        "notes-import" => Command::NotesImport(operand.ok_or(ArgsError::MissingArgument {
            command: "notes-import",
            what: "a file or url",
        })?),
        "clear" => {
            let raw = operand.ok_or(ArgsError::MissingArgument {
                command: "clear",
                what: "a target",
            })?;
            Command::Clear(parse_clear_target(&raw)?)
        }
        "auto-advance" => {
            let raw = operand.ok_or(ArgsError::MissingArgument {
                command: "auto-advance",
                what: "on or off",
            })?;
            Command::AutoAdvance(parse_toggle(&raw)?)
        }
        _ => return Err(ArgsError::UnknownCommand(name)),
    };
    Ok(command)
}

fn no_operand(command: Command, operand: Option<String>) -> Result<Command, ArgsError> {
    match operand {
        Some(extra) => Err(ArgsError::UnknownArg(extra)),
        None => Ok(command),
    }
}

fn parse_clear_target(raw: &str) -> Result<ClearTarget, ArgsError> {
    match raw {
        "wrong" => Ok(ClearTarget::Wrong),
        "notes" => Ok(ClearTarget::Notes),
        "progress" => Ok(ClearTarget::Progress),
        "answers" => Ok(ClearTarget::Answers),
        "all" => Ok(ClearTarget::All),
        _ => Err(ArgsError::InvalidClearTarget {
            raw: raw.to_string(),
        }),
    }
}

fn parse_toggle(raw: &str) -> Result<bool, ArgsError> {
    match raw {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(ArgsError::InvalidToggle {
            raw: raw.to_string(),
        }),
    }
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file and its parent directories so `SQLite` can open it.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}
