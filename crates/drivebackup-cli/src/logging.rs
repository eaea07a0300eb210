//! Tracing setup for the CLI
//!
//! Events go to stderr right away. A second, plain-text layer writes to the
//! backup log file, whose path is only known once the backup root has been
//! planned; until [`LogFile::open`] is called its output is buffered in
//! memory and flushed into the file on open.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Targets kept when `logging.crate_only` is set
const CRATE_TARGETS: &[&str] = &[
    "drive_backup",
    "drivebackup_core",
    "drivebackup_sync",
    "drivebackup_gdrive",
];

/// Cap on what is held in memory before the log file opens
const MAX_PENDING_BYTES: usize = 1024 * 1024;

enum Sink {
    Pending(Vec<u8>),
    Open(File),
    Closed,
}

/// Log file that can be opened after the subscriber is installed
#[derive(Clone)]
pub struct LogFile {
    sink: Arc<Mutex<Sink>>,
}

impl LogFile {
    fn new() -> Self {
        Self {
            sink: Arc::new(Mutex::new(Sink::Pending(Vec::new()))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sink> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens `path` for appending and writes the buffered events into it
    pub fn open(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        let mut sink = self.lock();
        if let Sink::Pending(buffer) = &*sink {
            file.write_all(buffer)
                .with_context(|| format!("Failed to write log file {}", path.display()))?;
        }
        *sink = Sink::Open(file);
        Ok(())
    }

    /// Drops buffered events; nothing more is kept for the file
    pub fn discard(&self) {
        *self.lock() = Sink::Closed;
    }
}

impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut *self.lock() {
            Sink::Pending(buffer) => {
                if buffer.len() + buf.len() <= MAX_PENDING_BYTES {
                    buffer.extend_from_slice(buf);
                }
                Ok(buf.len())
            }
            Sink::Open(file) => file.write(buf),
            Sink::Closed => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut *self.lock() {
            Sink::Open(file) => file.flush(),
            _ => Ok(()),
        }
    }
}

/// Builds the filter directives for `level`
///
/// `-v` raises the level to debug and `-vv` to trace. With `crate_only`
/// every other target is silenced.
pub fn filter_directives(level: &str, verbose: u8, crate_only: bool) -> String {
    let level = match verbose {
        0 => level,
        1 => "debug",
        _ => "trace",
    };
    if crate_only {
        let targets: Vec<String> = CRATE_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect();
        format!("off,{}", targets.join(","))
    } else {
        level.to_string()
    }
}

/// Installs the global subscriber and returns the deferred log file
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(level: &str, verbose: u8, crate_only: bool) -> Result<LogFile> {
    let directives = filter_directives(level, verbose, crate_only);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directives))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let log_file = LogFile::new();
    let writer = log_file.clone();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(move || writer.clone()),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(log_file)
}
