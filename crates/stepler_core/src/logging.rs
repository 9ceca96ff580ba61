//! Process-wide file logging for Stepler hosts.
//!
//! # Responsibility
//! - Validate a level/directory pair and start one rolling file logger.
//! - Duplicate warnings to stderr so terminal users see dropped reminders and
//!   failed saves.
//! - Record panics as a single sanitized log line.
//!
//! # Invariants
//! - At most one logger per process; a second call with the same target is
//!   a no-op and a different target is an error.
//! - Nothing here panics.
//! - Log lines carry task IDs and counts, never task text.

use crate::config::CoreConfig;
use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, LogSpecification, Logger, LoggerHandle, Naming,
    WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::path::{Path, PathBuf};

const LOG_BASENAME: &str = "stepler";
const ROTATE_AT_BYTES: u64 = 10 << 20;
const KEEP_ROTATED: usize = 5;
const PANIC_EXCERPT_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    target: LogTarget,
    _handle: LoggerHandle,
}

/// Validated level and absolute log directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    level: LevelFilter,
    dir: PathBuf,
}

impl LogTarget {
    /// Accepts `trace|debug|info|warn|warning|error` in any case and an
    /// absolute directory.
    pub fn parse(level: &str, dir: &str) -> Result<Self, String> {
        Ok(Self {
            level: parse_level(level)?,
            dir: parse_dir(dir)?,
        })
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Starts logging to `log_dir` at `level`.
///
/// # Errors
/// - Unknown level, or a blank/relative directory.
/// - The directory cannot be created or the backend fails to start.
/// - A logger with a different level or directory is already running.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let target = LogTarget::parse(level, log_dir)?;
    let active = ACTIVE.get_or_try_init(|| start(target.clone()))?;
    if active.target != target {
        return Err(format!(
            "logging already runs at {} in `{}`; refusing to switch to {} in `{}`",
            active.target.level,
            active.target.dir.display(),
            target.level,
            target.dir.display()
        ));
    }
    Ok(())
}

/// Starts logging when `config.log_dir` is set. Returns whether it did.
pub fn init_from_config(config: &CoreConfig) -> Result<bool, String> {
    match config.log_dir.as_deref() {
        Some(dir) => init_logging(&config.log_level, dir).map(|()| true),
        None => Ok(false),
    }
}

/// Active `(level, directory)`, if a logger was started.
pub fn logging_status() -> Option<(LevelFilter, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.target.level, active.target.dir.clone()))
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start(target: LogTarget) -> Result<ActiveLogger, String> {
    std::fs::create_dir_all(&target.dir)
        .map_err(|err| format!("cannot create log directory `{}`: {err}", target.dir.display()))?;

    let handle = Logger::with(LogSpecification::builder().default(target.level).build())
        .log_to_file(FileSpec::default().directory(&target.dir).basename(LOG_BASENAME))
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED),
        )
        .duplicate_to_stderr(Duplicate::Warn)
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("cannot start logger: {err}"))?;

    install_panic_hook();
    info!(
        "event=app_start module=core status=ok platform={} version={}",
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION")
    );
    info!(
        "event=core_init module=core status=ok level={} log_dir={}",
        target.level,
        target.dir.display()
    );

    Ok(ActiveLogger {
        target,
        _handle: handle,
    })
}

fn parse_level(raw: &str) -> Result<LevelFilter, String> {
    let level = match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" | "warning" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => {
            return Err(format!(
                "unknown log level `{}` (use trace, debug, info, warn or error)",
                raw.trim()
            ))
        }
    };
    Ok(level)
}

fn parse_dir(raw: &str) -> Result<PathBuf, String> {
    let dir = Path::new(raw.trim());
    if dir.as_os_str().is_empty() {
        return Err("log directory is blank".to_string());
    }
    if !dir.is_absolute() {
        return Err(format!("log directory `{}` is not absolute", dir.display()));
    }
    Ok(dir.to_path_buf())
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }
    let chained = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map_or_else(
            || "unknown".to_string(),
            |at| format!("{}:{}", at.file(), at.line()),
        );
        error!(
            "event=panic_captured module=core status=error location={location} payload={}",
            panic_excerpt(info.payload())
        );
        chained(info);
    }));
}

/// Panic messages may quote task text; keep one capped line.
fn panic_excerpt(payload: &(dyn Any + Send)) -> String {
    let text = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");
    one_line(text, PANIC_EXCERPT_CHARS)
}

fn one_line(text: &str, max_chars: usize) -> String {
    let mut line: String = text
        .chars()
        .take(max_chars)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if text.chars().nth(max_chars).is_some() {
        line.push_str("...");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, one_line, panic_excerpt, LogTarget};
    use log::LevelFilter;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock after epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("stepler-log-{tag}-{}-{nanos}", std::process::id()))
    }

    #[test]
    fn target_parsing_normalizes_level() {
        let target = LogTarget::parse(" WARNING ", "/var/log/stepler").unwrap();
        assert_eq!(target.level(), LevelFilter::Warn);
        assert_eq!(target.dir(), PathBuf::from("/var/log/stepler"));

        assert!(LogTarget::parse("verbose", "/tmp").unwrap_err().contains("verbose"));
        assert!(LogTarget::parse("off", "/tmp").is_err());
    }

    #[test]
    fn target_parsing_rejects_blank_and_relative_dirs() {
        assert!(LogTarget::parse("info", "  ").unwrap_err().contains("blank"));
        assert!(LogTarget::parse("info", "logs").unwrap_err().contains("not absolute"));
    }

    #[test]
    fn panic_payloads_become_one_capped_line() {
        assert_eq!(one_line("a\nb\rc-long-tail", 5), "a b c...");
        assert_eq!(one_line("short", 5), "short");

        let owned: Box<dyn std::any::Any + Send> = Box::new("boom\nline".to_string());
        assert_eq!(panic_excerpt(owned.as_ref()), "boom line");
        let number: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_excerpt(number.as_ref()), "non-string panic payload");
    }

    #[test]
    fn second_init_must_match_the_first() {
        let dir = scratch_dir("active");
        let dir_str = dir.to_str().expect("utf-8 temp dir").to_string();
        let other = scratch_dir("other");
        let other_str = other.to_str().expect("utf-8 temp dir").to_string();

        init_logging("info", &dir_str).expect("first init");
        init_logging("INFO", &dir_str).expect("same target is a no-op");
        assert!(init_logging("debug", &dir_str).unwrap_err().contains("refusing"));
        assert!(init_logging("info", &other_str).unwrap_err().contains("refusing"));

        assert_eq!(logging_status(), Some((LevelFilter::Info, dir)));
    }
}
