//! Tracing setup with a syslog or stderr sink.
//!
//! Events are formatted by `tracing-subscriber` and handed either to the
//! system log (one `syslog(3)` call per event, priority taken from the event
//! level) or to standard error. Standard output carries only metrics.

use std::ffi::CString;
use std::io;

use libc::c_int;
use once_cell::sync::OnceCell;
use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;

use crate::config::Settings;

static SYSLOG_IDENT: OnceCell<CString> = OnceCell::new();

/// Closes the system log when dropped.
#[must_use = "dropping the guard closes the system log"]
pub struct LoggingGuard {
    syslog: bool,
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        if self.syslog {
            // SAFETY: closelog has no preconditions.
            unsafe { libc::closelog() };
        }
    }
}

/// Maps a tracing level onto a syslog priority.
pub fn syslog_priority(level: &Level) -> c_int {
    match *level {
        Level::ERROR => libc::LOG_ERR,
        Level::WARN => libc::LOG_WARNING,
        Level::INFO => libc::LOG_INFO,
        Level::DEBUG | Level::TRACE => libc::LOG_DEBUG,
    }
}

/// Hands out one [`SyslogWriter`] per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyslogMakeWriter;

impl<'a> MakeWriter<'a> for SyslogMakeWriter {
    type Writer = SyslogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SyslogWriter::new(libc::LOG_INFO)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        SyslogWriter::new(syslog_priority(meta.level()))
    }
}

/// Buffers one formatted event and sends it to syslog on drop.
#[derive(Debug)]
pub struct SyslogWriter {
    priority: c_int,
    buf: Vec<u8>,
}

impl SyslogWriter {
    fn new(priority: c_int) -> Self {
        Self {
            priority,
            buf: Vec::new(),
        }
    }

    /// The message as it will be passed to syslog.
    fn message(&self) -> Option<CString> {
        let text: Vec<u8> = self
            .buf
            .iter()
            .map(|&b| if b == 0 { b' ' } else { b })
            .collect();
        let end = text.iter().rposition(|b| !b.is_ascii_whitespace())? + 1;
        CString::new(&text[..end]).ok()
    }
}

impl io::Write for SyslogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for SyslogWriter {
    fn drop(&mut self) {
        if let Some(msg) = self.message() {
            // SAFETY: both strings are NUL-terminated; "%s" keeps the message
            // from being interpreted as a format string.
            unsafe { libc::syslog(self.priority, c"%s".as_ptr(), msg.as_ptr()) };
        }
    }
}

/// Installs the global tracing subscriber for `settings`.
pub fn init(settings: &Settings) -> LoggingGuard {
    let level = settings.log_level.as_filter();

    let installed = if settings.syslog {
        let ident = SYSLOG_IDENT
            .get_or_init(|| CString::new(env!("CARGO_PKG_NAME")).unwrap_or_default());
        // SAFETY: ident lives in a static for the rest of the process.
        unsafe { libc::openlog(ident.as_ptr(), libc::LOG_PID, libc::LOG_USER) };

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(SyslogMakeWriter)
            .with_ansi(false)
            .without_time()
            .with_level(false)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(io::stderr)
            .with_ansi(false)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    if let Err(e) = installed {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    LoggingGuard {
        syslog: settings.syslog,
    }
}
