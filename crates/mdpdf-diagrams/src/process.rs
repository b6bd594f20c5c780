//! External renderer processes.
//!
//! A renderer runs inside a scratch directory with stdin closed, stdout
//! discarded and stderr captured to a file, so a chatty renderer can never
//! block on a full pipe. The child is polled until it exits, the deadline
//! passes or the run is cancelled; in the last two cases its whole process
//! group is killed and the child reaped before returning.
//!
//! Renderers commonly spawn helpers of their own (`mmdc` starts a headless
//! browser, `plantuml` wrappers start a JVM), so on Unix every renderer
//! leads a fresh process group.

use std::fs::{self, File};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use mdpdf_config::RendererCommand;

use crate::cancel::CancelToken;
use crate::consts::POLL_INTERVAL;
use crate::error::RenderErrorKind;

const STDERR_FILE: &str = "renderer.stderr";

/// Paths and format substituted into a command template.
#[derive(Debug)]
pub(crate) struct Invocation<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub output_dir: &'a Path,
    pub format: &'a str,
}

/// Program and argument vector for one invocation.
///
/// Words after the first in `program` become leading arguments, so
/// `java -jar plantuml.jar` works as a program string.
pub(crate) fn build_argv(
    command: &RendererCommand,
    invocation: &Invocation<'_>,
) -> Option<(String, Vec<String>)> {
    let mut words = command.program.split_whitespace();
    let program = words.next()?.to_owned();
    let mut args: Vec<String> = words.map(str::to_owned).collect();
    args.extend(command.args.iter().map(|arg| substitute(arg, invocation)));
    Some((program, args))
}

fn substitute(arg: &str, invocation: &Invocation<'_>) -> String {
    arg.replace("{input}", &invocation.input.to_string_lossy())
        .replace("{output_dir}", &invocation.output_dir.to_string_lossy())
        .replace("{output}", &invocation.output.to_string_lossy())
        .replace("{format}", invocation.format)
}

/// Run a renderer to completion inside `workdir`.
///
/// Returns the captured stderr on a zero exit status.
pub(crate) fn run(
    program: &str,
    args: &[String],
    workdir: &Path,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<String, RenderErrorKind> {
    let stderr_path = workdir.join(STDERR_FILE);
    let stderr_file = File::create(&stderr_path).map_err(|e| RenderErrorKind::Io(e.to_string()))?;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(stderr_file));
    #[cfg(unix)]
    std::os::unix::process::CommandExt::process_group(&mut command, 0);

    let mut child = command
        .spawn()
        .map_err(|e| RenderErrorKind::Spawn {
            program: program.to_owned(),
            message: e.to_string(),
        })?;

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(RenderErrorKind::Io(e.to_string()));
            }
        }

        if cancel.is_cancelled() {
            kill_and_reap(&mut child);
            tracing::debug!(program, "renderer killed on cancellation");
            return Err(RenderErrorKind::Cancelled);
        }
        if started.elapsed() >= timeout {
            kill_and_reap(&mut child);
            tracing::warn!(program, timeout_secs = timeout.as_secs_f64(), "renderer timed out");
            return Err(RenderErrorKind::Timeout {
                after: timeout,
                stderr: read_stderr(&stderr_path),
            });
        }

        std::thread::sleep(POLL_INTERVAL);
    };

    let stderr = read_stderr(&stderr_path);
    if !status.success() {
        return Err(RenderErrorKind::NonZeroExit {
            status: status.to_string(),
            stderr,
        });
    }
    Ok(stderr)
}

fn kill_and_reap(child: &mut Child) {
    // The child may already have exited between the poll and the kill.
    #[cfg(unix)]
    kill_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

/// SIGKILL the process group led by `child`.
#[cfg(unix)]
fn kill_group(child: &Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(child.id()) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        tracing::debug!(pid, error = %e, "renderer process group already gone");
    }
}

fn read_stderr(path: &Path) -> String {
    fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn invocation<'a>(dir: &'a Path, input: &'a Path, output: &'a Path) -> Invocation<'a> {
        Invocation {
            input,
            output,
            output_dir: dir,
            format: "png",
        }
    }

    #[test]
    fn test_build_argv_substitutes_placeholders() {
        let command = RendererCommand::plantuml();
        let dir = Path::new("/tmp/r");
        let input = Path::new("/tmp/r/diagram.puml");
        let output = Path::new("/tmp/r/diagram.png");

        let (program, args) = build_argv(
            &RendererCommand {
                program: "plantuml".to_owned(),
                ..command
            },
            &invocation(dir, input, output),
        )
        .unwrap();

        assert_eq!(program, "plantuml");
        assert_eq!(args, vec!["-tpng", "-o", "/tmp/r", "/tmp/r/diagram.puml"]);
    }

    #[test]
    fn test_build_argv_program_with_leading_args() {
        let command = RendererCommand {
            program: "java  -jar /opt/plantuml.jar".to_owned(),
            args: vec!["{input}".to_owned(), "--out={output}".to_owned()],
        };
        let dir = Path::new("/w");

        let (program, args) =
            build_argv(&command, &invocation(dir, Path::new("/w/in"), Path::new("/w/out"))).unwrap();

        assert_eq!(program, "java");
        assert_eq!(args, vec!["-jar", "/opt/plantuml.jar", "/w/in", "--out=/w/out"]);
    }

    #[test]
    fn test_build_argv_empty_program() {
        let command = RendererCommand {
            program: "   ".to_owned(),
            args: vec!["{input}".to_owned()],
        };
        let dir = Path::new("/w");

        assert!(build_argv(&command, &invocation(dir, dir, dir)).is_none());
    }

    #[test]
    fn test_run_captures_stderr_on_failure() {
        let tmp = TempDir::new().unwrap();
        let args = vec!["-c".to_owned(), "echo 'bad syntax' >&2; exit 2".to_owned()];

        let err = run("sh", &args, tmp.path(), Duration::from_secs(10), &CancelToken::new())
            .unwrap_err();

        let RenderErrorKind::NonZeroExit { stderr, .. } = err else {
            panic!("expected non-zero exit, got {err:?}");
        };
        assert_eq!(stderr, "bad syntax");
    }

    #[test]
    fn test_run_success_returns_stderr() {
        let tmp = TempDir::new().unwrap();
        let args = vec!["-c".to_owned(), "echo warning >&2".to_owned()];

        let stderr =
            run("sh", &args, tmp.path(), Duration::from_secs(10), &CancelToken::new()).unwrap();

        assert_eq!(stderr, "warning");
    }

    #[test]
    fn test_run_timeout_kills_child() {
        let tmp = TempDir::new().unwrap();
        let args = vec!["-c".to_owned(), "exec sleep 10".to_owned()];
        let started = Instant::now();

        let err = run("sh", &args, tmp.path(), Duration::from_millis(200), &CancelToken::new())
            .unwrap_err();

        assert!(matches!(err, RenderErrorKind::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_run_cancelled() {
        let tmp = TempDir::new().unwrap();
        let args = vec!["-c".to_owned(), "exec sleep 10".to_owned()];
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });

        let err = run("sh", &args, tmp.path(), Duration::from_secs(30), &cancel).unwrap_err();
        handle.join().unwrap();

        assert!(matches!(err, RenderErrorKind::Cancelled));
    }

    #[test]
    fn test_run_spawn_failure() {
        let tmp = TempDir::new().unwrap();

        let err = run(
            "/nonexistent/mdpdf-renderer",
            &[],
            tmp.path(),
            Duration::from_secs(1),
            &CancelToken::new(),
        )
        .unwrap_err();

        assert!(matches!(err, RenderErrorKind::Spawn { .. }));
    }

    /// Shell renderer that forks a helper touching `marker` after a second.
    fn forking_script(marker: &Path) -> Vec<String> {
        vec![
            "-c".to_owned(),
            format!("(sleep 1; touch '{}') &\nwait", marker.display()),
        ]
    }

    #[test]
    fn test_run_timeout_kills_helpers() {
        let tmp = TempDir::new().unwrap();
        let marks = TempDir::new().unwrap();
        let marker = marks.path().join("helper-survived");

        let err = run(
            "sh",
            &forking_script(&marker),
            tmp.path(),
            Duration::from_millis(200),
            &CancelToken::new(),
        )
        .unwrap_err();
        std::thread::sleep(Duration::from_millis(1500));

        assert!(matches!(err, RenderErrorKind::Timeout { .. }));
        assert!(!marker.exists());
    }

    #[test]
    fn test_run_cancel_kills_helpers() {
        let tmp = TempDir::new().unwrap();
        let marks = TempDir::new().unwrap();
        let marker = marks.path().join("helper-survived");
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });

        let err = run("sh", &forking_script(&marker), tmp.path(), Duration::from_secs(30), &cancel)
            .unwrap_err();
        handle.join().unwrap();
        std::thread::sleep(Duration::from_millis(1500));

        assert!(matches!(err, RenderErrorKind::Cancelled));
        assert!(!marker.exists());
    }
}
