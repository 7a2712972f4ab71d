//! Output routing for reporters.
//!
//! Every byte a reporter produces goes through [`OutputChannel::write`],
//! which applies the quiet filter and then sends the bytes either to one
//! shared stream or, in split mode, to a fresh file per write.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use serde::Serialize;

use crate::core::error::{ReportError, Result};

/// Verbosity of a single write. `Debug` writes are dropped in quiet mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
}

/// Where the bytes of a report end up.
#[derive(Clone)]
pub enum Sink {
    Stdout,
    Stderr,
    /// Any writer shared by all reporters, e.g. an opened report file or an
    /// in-memory buffer.
    Shared(Arc<Mutex<dyn Write + Send>>),
    /// One new file `<prefix><index>` per write.
    Split { prefix: PathBuf },
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Stdout => f.write_str("Stdout"),
            Sink::Stderr => f.write_str("Stderr"),
            Sink::Shared(_) => f.write_str("Shared(..)"),
            Sink::Split { prefix } => f.debug_struct("Split").field("prefix", prefix).finish(),
        }
    }
}

/// The run-scoped output channel.
///
/// The only mutable state is the split-mode file index, which is advanced
/// with an atomic fetch-and-add so that concurrent writers never share or
/// skip an index.
#[derive(Debug)]
pub struct OutputChannel {
    quiet: bool,
    sink: Sink,
    next_index: AtomicU64,
}

impl OutputChannel {
    pub fn new(sink: Sink, quiet: bool) -> Self {
        Self {
            quiet,
            sink,
            next_index: AtomicU64::new(0),
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Number of files created so far in split mode.
    pub fn files_written(&self) -> u64 {
        self.next_index.load(Ordering::SeqCst)
    }

    /// Returns `true` if a write at `level` would produce output.
    pub fn enabled(&self, level: Level) -> bool {
        !(self.quiet && level < Level::Info)
    }

    /// Routes one message. `render` is called at most once, against the
    /// shared stream or a freshly created split file.
    pub fn write<F>(&self, level: Level, render: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        if !self.enabled(level) {
            return Ok(());
        }

        match &self.sink {
            Sink::Stdout => {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                render(&mut out)
                    .and_then(|_| out.flush())
                    .map_err(|e| ReportError::output("stdout", e))
            }
            Sink::Stderr => {
                let stderr = io::stderr();
                let mut out = stderr.lock();
                render(&mut out)
                    .and_then(|_| out.flush())
                    .map_err(|e| ReportError::output("stderr", e))
            }
            Sink::Shared(writer) => {
                let mut out = writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                render(&mut *out)
                    .and_then(|_| out.flush())
                    .map_err(|e| ReportError::output("shared stream", e))
            }
            Sink::Split { prefix } => {
                let index = self.next_index.fetch_add(1, Ordering::SeqCst);
                let path = split_path(prefix, index);
                log::trace!("writing report part {}", path.display());
                write_split_file(&path, render)
            }
        }
    }

    pub fn write_text(&self, level: Level, text: &str) -> Result<()> {
        self.write(level, |out| out.write_all(text.as_bytes()))
    }

    pub fn write_bytes(&self, level: Level, bytes: &[u8]) -> Result<()> {
        self.write(level, |out| out.write_all(bytes))
    }

    /// Encodes `value` as one JSON line.
    pub fn write_encoded<T: Serialize>(&self, level: Level, value: &T) -> Result<()> {
        let mut bytes = serde_json::to_vec(value)?;
        bytes.push(b'\n');
        self.write_bytes(level, &bytes)
    }
}

/// `<prefix><index>`, appended to the final path component.
pub fn split_path(prefix: &Path, index: u64) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(index.to_string());
    PathBuf::from(name)
}

fn write_split_file<F>(path: &Path, render: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let file = File::create(path).map_err(|source| ReportError::CreateFile {
        path: path.to_path_buf(),
        source,
    })?;

    // Dropping the writer closes the file on every path out of here.
    let mut out = BufWriter::new(file);
    render(&mut out)
        .and_then(|_| out.flush())
        .map_err(|e| ReportError::output(path.display().to_string(), e))
}
