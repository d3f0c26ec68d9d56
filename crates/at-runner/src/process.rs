//! Child process supervision.
//!
//! The child is owned by a [`ChildGuard`] which reaps it on every exit
//! path, killing it first if it is still running. On unix the child leads
//! its own process group so a kill also reaches anything it started.
//! Standard input is closed; stdout and stderr are drained on their own
//! threads so a child that fills one pipe while we read the other cannot
//! deadlock.

use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use at_types::RunError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Launch options for one child process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    /// Kill the child and its descendants once this much wall-clock time
    /// has passed, whether or not the child itself has exited.
    pub kill_after: Option<Duration>,
}

/// Everything the child wrote, plus how it ended.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: ExitStatus,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

type Chunk = (Stream, io::Result<Vec<u8>>);

/// Spawn `argv`, wait for it to exit and collect its output.
///
/// With `kill_after` set, the deadline covers both the child's exit and
/// the end of its output: a background descendant holding the pipes open
/// past the deadline is killed along with the child.
pub fn execute(argv: &[String], options: &ProcessOptions) -> Result<CapturedOutput, RunError> {
    let (program, args) = argv.split_first().ok_or(RunError::EmptyCommand)?;

    let mut command = Command::new(program);
    command
        .args(args)
        .envs(&options.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &options.working_dir {
        command.current_dir(dir);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let started = Instant::now();
    let child = command.spawn().map_err(|source| RunError::Spawn {
        program: program.clone(),
        source,
    })?;
    let mut guard = ChildGuard::new(child);
    debug!(pid = guard.id(), "Spawned target algorithm");

    let (tx, rx) = unbounded();
    drain(Stream::Stdout, guard.child.stdout.take(), tx.clone());
    drain(Stream::Stderr, guard.child.stderr.take(), tx);

    let deadline = options.kill_after.map(|limit| (started + limit, limit));

    let exit_status = match deadline {
        None => guard.wait()?,
        Some((deadline, limit)) => match guard.wait_until(deadline)? {
            Some(status) => status,
            None => return hard_timeout(&mut guard, limit),
        },
    };

    let (stdout, stderr) = match collect(&rx, deadline.map(|(at, _)| at))? {
        Some(output) => output,
        None => return hard_timeout(&mut guard, options.kill_after.unwrap_or_default()),
    };

    Ok(CapturedOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_status,
        elapsed: started.elapsed(),
    })
}

fn hard_timeout(guard: &mut ChildGuard, limit: Duration) -> Result<CapturedOutput, RunError> {
    warn!(
        limit_seconds = limit.as_secs_f64(),
        "Target algorithm exceeded hard limit, killing its process group"
    );
    guard.kill_all()?;
    Err(RunError::HardTimeout {
        limit_seconds: limit.as_secs_f64(),
    })
}

/// Owns a child process and guarantees it is reaped.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    fn id(&self) -> u32 {
        self.child.id()
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait()?;
        self.reaped = true;
        Ok(status)
    }

    /// Wait until `deadline`; `None` if the child is still running then.
    fn wait_until(&mut self, deadline: Instant) -> io::Result<Option<ExitStatus>> {
        loop {
            if let Some(status) = self.child.try_wait()? {
                self.reaped = true;
                return Ok(Some(status));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Kill the child's whole process group, then reap the child if it
    /// has not been reaped yet.
    fn kill_all(&mut self) -> io::Result<()> {
        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            // The group outlives a reaped leader while descendants remain.
            match killpg(Pid::from_raw(self.child.id() as i32), Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => return Err(io::Error::from(e)),
            }
        }
        #[cfg(not(unix))]
        {
            if !self.reaped {
                if let Err(e) = self.child.kill() {
                    if e.kind() != io::ErrorKind::InvalidInput {
                        return Err(e);
                    }
                }
            }
        }

        if !self.reaped {
            self.wait()?;
        }
        Ok(())
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.kill_all();
        }
    }
}

fn drain<R>(stream: Stream, pipe: Option<R>, tx: Sender<Chunk>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = match pipe {
            Some(mut pipe) => pipe.read_to_end(&mut buf).map(|_| buf),
            None => Ok(buf),
        };
        // The receiver is gone once the run has been abandoned.
        let _ = tx.send((stream, result));
    });
}

/// Gather both streams; `None` if `deadline` passes first.
fn collect(
    rx: &Receiver<Chunk>,
    deadline: Option<Instant>,
) -> Result<Option<(Vec<u8>, Vec<u8>)>, RunError> {
    let mut stdout = None;
    let mut stderr = None;
    while stdout.is_none() || stderr.is_none() {
        let received = match deadline {
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(deadline) => rx.recv_deadline(deadline),
        };
        let (stream, result) = match received {
            Ok(chunk) => chunk,
            Err(RecvTimeoutError::Timeout) => return Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(RunError::Supervision(io::Error::new(
                    io::ErrorKind::Other,
                    "output reader thread exited without reporting",
                )))
            }
        };
        match stream {
            Stream::Stdout => stdout = Some(result?),
            Stream::Stderr => stderr = Some(result?),
        }
    }
    Ok(stdout.zip(stderr))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn captures_both_streams() {
        let output = execute(&sh("echo out; echo err >&2"), &ProcessOptions::default()).unwrap();
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert!(output.exit_status.success());
    }

    #[test]
    fn exit_code_is_reported_not_enforced() {
        let output = execute(&sh("echo partial; exit 3"), &ProcessOptions::default()).unwrap();
        assert_eq!(output.exit_status.code(), Some(3));
        assert_eq!(output.stdout, "partial\n");
    }

    #[test]
    fn stdin_is_closed() {
        let output = execute(&sh("cat; echo done"), &ProcessOptions::default()).unwrap();
        assert_eq!(output.stdout, "done\n");
    }

    #[test]
    fn large_output_on_both_pipes_does_not_block() {
        let script = "i=0; while [ $i -lt 20000 ]; do echo line$i; echo err$i >&2; i=$((i+1)); done";
        let output = execute(&sh(script), &ProcessOptions::default()).unwrap();
        assert_eq!(output.stdout.lines().count(), 20000);
        assert_eq!(output.stderr.lines().count(), 20000);
    }

    #[test]
    fn environment_and_working_dir_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = ProcessOptions {
            working_dir: Some(dir.path().to_path_buf()),
            ..ProcessOptions::default()
        };
        options.env.insert("AT_MARKER".into(), "present".into());

        let output = execute(&sh("echo $AT_MARKER; pwd"), &options).unwrap();
        let mut lines = output.stdout.lines();
        assert_eq!(lines.next(), Some("present"));
        let cwd = std::path::PathBuf::from(lines.next().unwrap());
        assert_eq!(
            cwd.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn missing_binary_is_spawn_error() {
        let argv = vec!["/nonexistent/target-algorithm".to_string()];
        match execute(&argv, &ProcessOptions::default()) {
            Err(RunError::Spawn { program, .. }) => {
                assert_eq!(program, "/nonexistent/target-algorithm")
            }
            other => panic!("Expected Spawn error, got {other:?}"),
        }
    }

    #[test]
    fn empty_argv_is_rejected() {
        assert!(matches!(
            execute(&[], &ProcessOptions::default()),
            Err(RunError::EmptyCommand)
        ));
    }

    #[test]
    fn hard_limit_kills_child() {
        let options = ProcessOptions {
            kill_after: Some(Duration::from_millis(200)),
            ..ProcessOptions::default()
        };
        let started = Instant::now();
        let result = execute(&sh("exec sleep 10"), &options);
        assert!(matches!(result, Err(RunError::HardTimeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn hard_limit_applies_without_exec() {
        let options = ProcessOptions {
            kill_after: Some(Duration::from_millis(200)),
            ..ProcessOptions::default()
        };
        let started = Instant::now();
        let result = execute(&sh("sleep 30; echo done"), &options);
        assert!(matches!(result, Err(RunError::HardTimeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn hard_limit_covers_descendants_holding_the_pipes() {
        let options = ProcessOptions {
            kill_after: Some(Duration::from_millis(300)),
            ..ProcessOptions::default()
        };
        let started = Instant::now();
        let result = execute(&sh("sleep 30 & echo started; exit 0"), &options);
        assert!(matches!(result, Err(RunError::HardTimeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn hard_limit_not_hit_by_fast_child() {
        let options = ProcessOptions {
            kill_after: Some(Duration::from_secs(10)),
            ..ProcessOptions::default()
        };
        let output = execute(&sh("echo quick"), &options).unwrap();
        assert_eq!(output.stdout, "quick\n");
    }
}
