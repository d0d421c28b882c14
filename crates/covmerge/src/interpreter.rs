//! Coverage interpreter adapter
//!
//! Runs `gcov` (or `llvm-cov gcov`) on one notes/counter pair and returns
//! its symbolic output. Every invocation gets its own scratch directory:
//! the pair is copied in, gcov runs with the scratch directory as its
//! working directory, and anything it leaves behind is removed when the
//! directory is dropped.

use crate::locator::ArtifactPair;
use crate::result::{CovError, CovResult};
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Poll interval while waiting on a child with a timeout
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Anything that can turn an artifact pair into gcov-style text
pub trait CoverageInterpreter: Send + Sync {
    /// Interpret one notes/counter pair
    ///
    /// # Errors
    ///
    /// Returns `InterpreterInvocationFailed` or `InterpreterTimeout`
    fn invoke(&self, artifacts: &ArtifactPair) -> CovResult<String>;
}

impl<F> CoverageInterpreter for F
where
    F: Fn(&ArtifactPair) -> CovResult<String> + Send + Sync,
{
    fn invoke(&self, artifacts: &ArtifactPair) -> CovResult<String> {
        self(artifacts)
    }
}

/// Subprocess-backed gcov interpreter
#[derive(Debug, Clone)]
pub struct GcovInterpreter {
    program: PathBuf,
    extra_args: Vec<String>,
    timeout: Option<Duration>,
    stdout_output: bool,
}

impl GcovInterpreter {
    /// Create an interpreter for the given executable
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            timeout: None,
            stdout_output: true,
        }
    }

    /// Arguments placed before the generated ones (e.g. `gcov` for `llvm-cov`)
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kill the interpreter after this long
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ask gcov to print to stdout (`-t`); disable for gcov releases
    /// that only write `.gcov` side files
    #[must_use]
    pub const fn with_stdout_output(mut self, enabled: bool) -> Self {
        self.stdout_output = enabled;
        self
    }

    /// Interpreter executable
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Build gcov arguments for a notes file already staged in `scratch`
    #[must_use]
    pub fn build_args(&self, staged_notes: &Path, scratch: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.extra_args.iter().map(OsString::from).collect();
        args.push("-i".into());
        if self.stdout_output {
            args.push("-t".into());
        }
        args.push("-o".into());
        args.push(scratch.as_os_str().to_owned());
        args.push(staged_notes.as_os_str().to_owned());
        args
    }

    fn stage(artifacts: &ArtifactPair, scratch: &Path) -> CovResult<PathBuf> {
        let notes_name = artifacts
            .notes
            .file_name()
            .ok_or_else(|| CovError::ArtifactMissing {
                notes: artifacts.entry.clone(),
                missing: artifacts.notes.clone(),
            })?;
        let counter_name = artifacts
            .counter
            .file_name()
            .ok_or_else(|| CovError::ArtifactMissing {
                notes: artifacts.entry.clone(),
                missing: artifacts.counter.clone(),
            })?;

        let staged_notes = scratch.join(notes_name);
        std::fs::copy(&artifacts.notes, &staged_notes)?;
        std::fs::copy(&artifacts.counter, scratch.join(counter_name))?;
        Ok(staged_notes)
    }

    fn wait(&self, child: &mut Child, artifacts: &ArtifactPair) -> CovResult<ExitStatus> {
        let Some(timeout) = self.timeout else {
            return Ok(child.wait()?);
        };

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if start.elapsed() >= timeout {
                warn!(notes = %artifacts.entry.display(), "killing interpreter after timeout");
                kill_process_group(child);
                return Err(CovError::InterpreterTimeout {
                    notes: artifacts.entry.clone(),
                    ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl CoverageInterpreter for GcovInterpreter {
    fn invoke(&self, artifacts: &ArtifactPair) -> CovResult<String> {
        let scratch = tempfile::Builder::new().prefix("covmerge-").tempdir()?;
        let staged_notes = Self::stage(artifacts, scratch.path())?;
        let args = self.build_args(&staged_notes, scratch.path());

        debug!(
            program = %self.program.display(),
            notes = %artifacts.entry.display(),
            scratch = %scratch.path().display(),
            "invoking coverage interpreter"
        );

        let mut command = Command::new(&self.program);
        // Own process group so a timeout also reaches wrapper-spawned gcov
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command
            .args(&args)
            .current_dir(scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CovError::InterpreterInvocationFailed {
                notes: artifacts.entry.clone(),
                exit_code: None,
                stderr: format!("failed to execute {}: {e}", self.program.display()),
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        // On timeout the readers are detached: a surviving grandchild may
        // still hold the pipes open
        let status = self.wait(&mut child, artifacts)?;
        let stdout = join(stdout);
        let stderr = join(stderr);

        if !status.success() {
            return Err(CovError::InterpreterInvocationFailed {
                notes: artifacts.entry.clone(),
                exit_code: status.code(),
                stderr: String::from_utf8_lossy(&stderr).trim_end().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        if !stdout.trim().is_empty() {
            return Ok(stdout);
        }
        collect_side_files(scratch.path())
    }
}

/// Kill the child's whole process group, then reap the child
#[cfg(unix)]
#[allow(unsafe_code)]
fn kill_process_group(child: &mut Child) {
    if let Ok(pid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: killpg only sends a signal; the group was created at spawn
        unsafe {
            libc::killpg(pid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Read a pipe to completion on its own thread so the child never blocks
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn join(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Concatenate `*.gcov` files gcov wrote into the scratch directory
fn collect_side_files(scratch: &Path) -> CovResult<String> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(scratch)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "gcov"))
        .collect();
    files.sort();

    let mut output = String::new();
    for file in &files {
        output.push_str(&std::fs::read_to_string(file)?);
        if !output.ends_with('\n') {
            output.push('\n');
        }
    }
    debug!(count = files.len(), "read gcov side files");
    Ok(output)
}
