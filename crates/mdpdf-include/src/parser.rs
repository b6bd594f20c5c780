//! Markdown parsers for included documents.

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};

use mdpdf_ast::{AstError, Block, Pandoc};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Parses markdown text into blocks.
///
/// Implementations must produce the same AST the host pipeline produces for
/// the root document, so spliced nodes look like native ones.
pub trait DocumentParser: Send + Sync {
    /// Parse `markdown`, read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the document cannot be parsed.
    fn parse(&self, markdown: &str, path: &Path) -> Result<Vec<Block>, ParseError>;
}

/// Failure to parse an included document.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to run '{program}': {message}")]
    Spawn { program: String, message: String },
    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("'{program}' timed out after {}s", .after.as_secs_f64())]
    Timeout { program: String, after: Duration },
    #[error("interrupted")]
    Cancelled,
    #[error(transparent)]
    Ast(#[from] AstError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Parses through `pandoc -f markdown -t json`.
///
/// The subprocess is killed when the deadline passes or the cancel flag is
/// raised.
#[derive(Debug, Clone)]
pub struct PandocParser {
    program: String,
    timeout: Duration,
    cancel: Arc<AtomicBool>,
}

impl PandocParser {
    /// Use `program` as the pandoc executable. Extra words are passed as
    /// leading arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_TIMEOUT,
            cancel: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Abort parsing once `cancel` is set.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    fn wait(&self, child: &mut Child, program: &str) -> Result<ExitStatus, ParseError> {
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(e) => {
                    kill_and_reap(child);
                    return Err(e.into());
                }
            }
            if self.cancel.load(Ordering::SeqCst) {
                kill_and_reap(child);
                return Err(ParseError::Cancelled);
            }
            if started.elapsed() >= self.timeout {
                kill_and_reap(child);
                return Err(ParseError::Timeout {
                    program: program.to_owned(),
                    after: self.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for PandocParser {
    fn default() -> Self {
        Self::new("pandoc")
    }
}

impl DocumentParser for PandocParser {
    fn parse(&self, markdown: &str, path: &Path) -> Result<Vec<Block>, ParseError> {
        if self.cancel.load(Ordering::SeqCst) {
            return Err(ParseError::Cancelled);
        }

        let mut words = self.program.split_whitespace();
        let program = words.next().ok_or_else(|| ParseError::Spawn {
            program: self.program.clone(),
            message: "empty program".to_owned(),
        })?;

        let mut command = Command::new(program);
        command
            .args(words)
            .args(["-f", "markdown", "-t", "json"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| ParseError::Spawn {
            program: program.to_owned(),
            message: e.to_string(),
        })?;
        let (Some(mut stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            kill_and_reap(&mut child);
            return Err(io::Error::other("pandoc pipes unavailable").into());
        };

        // Pipes are serviced by their own threads so neither side can block
        // the other while the child is polled.
        let (status, written, stdout, stderr) = thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(markdown.as_bytes()));
            let out = scope.spawn(move || read_all(stdout));
            let err = scope.spawn(move || read_all(stderr));
            let status = self.wait(&mut child, program);
            (status, join(writer), join(out), join(err))
        });
        let status = status?;

        if !status.success() {
            return Err(ParseError::Failed {
                program: program.to_owned(),
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr.unwrap_or_default())
                    .trim()
                    .to_owned(),
            });
        }
        written?;

        tracing::debug!(path = %path.display(), "parsed included document with pandoc");
        Ok(Pandoc::read(stdout?.as_slice())?.blocks)
    }
}

fn read_all(mut source: impl Read) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    source.read_to_end(&mut buf)?;
    Ok(buf)
}

fn join<T>(handle: ScopedJoinHandle<'_, io::Result<T>>) -> io::Result<T> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("pipe thread panicked")))
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
