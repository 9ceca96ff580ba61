//! Reminder delivery channels for the terminal host.

use std::io::Write;
use std::process::{Command, Stdio};
use stepler_core::Notifier;

/// Desktop notification through `notify-send`.
///
/// Unavailable when the binary is missing or exits non-zero.
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) -> bool {
        Command::new("notify-send")
            .arg(title)
            .arg(body)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

/// Bell plus a line on stdout.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, title: &str, body: &str) -> bool {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "\x07[{title}] {body}").is_ok() && stdout.flush().is_ok()
    }
}
