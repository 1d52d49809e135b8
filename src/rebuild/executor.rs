//! Build invocation boundary.
//!
//! The coordinator only needs to know whether a build of a target set
//! succeeded. [`BuildExecutor`] is that contract; [`CommandExecutor`] runs
//! the configured build tool.

use std::io::{self, Read};
use std::process::{Child, ExitStatus, Output};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::config::BuildConfig;
use crate::core::{TargetSet, display_targets};
use crate::host::ProjectHost;
use crate::utils::exec::{BUILD_TOOL_FILTER, Cmd, format_error};

/// Options passed with every build invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Compiler warnings must not fail the build.
    pub warnings_non_fatal: bool,
}

impl BuildOptions {
    /// Policy used by the coordinator: a failed build leaves dependent
    /// sessions unusable, so warnings are always relaxed.
    pub const fn coordinated() -> Self {
        Self {
            warnings_non_fatal: true,
        }
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::coordinated()
    }
}

/// Exit status of a build invocation that did start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitResult {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl ExitResult {
    #[cfg(test)]
    pub const SUCCESS: Self = Self { code: Some(0) };

    #[cfg(test)]
    pub const fn failed(code: i32) -> Self {
        Self { code: Some(code) }
    }

    #[inline]
    pub fn is_success(self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ExitResult {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Runs the external build tool.
///
/// Called from a blocking thread; implementations may block for as long as
/// the build takes.
pub trait BuildExecutor: Send + Sync {
    /// `None` if the tool could not be launched at all.
    fn run_build(
        &self,
        project: &dyn ProjectHost,
        targets: &TargetSet,
        options: &BuildOptions,
    ) -> Option<ExitResult>;
}

/// How often a blocked build thread checks its child for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs `[build] command` for the merged target list in the project root.
#[derive(Debug)]
pub struct CommandExecutor {
    command: Vec<String>,
    args: Vec<String>,
    non_fatal_warnings: Vec<String>,
    /// Build tool processes in flight, by pid.
    running: Mutex<FxHashMap<u32, Child>>,
}

impl CommandExecutor {
    pub fn new(config: &BuildConfig) -> Self {
        Self::from_parts(
            config.command.clone(),
            config.args.clone(),
            config.non_fatal_warnings.clone(),
        )
    }

    fn from_parts(command: Vec<String>, args: Vec<String>, non_fatal_warnings: Vec<String>) -> Self {
        Self {
            command,
            args,
            non_fatal_warnings,
            running: Mutex::default(),
        }
    }

    /// Kill every build still in flight. Returns how many were signalled.
    ///
    /// The blocked `run_build` calls return within one poll interval with a
    /// signal exit.
    pub fn kill_running(&self) -> usize {
        let mut running = self.running.lock();
        for child in running.values_mut() {
            // Already exited is fine
            let _ = child.kill();
        }
        running.len()
    }

    /// Block until the child registered under `pid` exits, then forget it.
    fn wait(&self, pid: u32) -> io::Result<ExitStatus> {
        loop {
            {
                let mut running = self.running.lock();
                let Some(child) = running.get_mut(&pid) else {
                    return Err(io::Error::other("build process is no longer tracked"));
                };
                match child.try_wait() {
                    Ok(None) => {}
                    Ok(Some(status)) => {
                        running.remove(&pid);
                        return Ok(status);
                    }
                    Err(e) => {
                        running.remove(&pid);
                        return Err(e);
                    }
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Full argument vector for one invocation.
    pub fn argv(&self, targets: &TargetSet, options: &BuildOptions) -> Vec<String> {
        let mut argv = self.command.clone();
        argv.extend(self.args.iter().cloned());
        argv.extend(targets.iter().map(|c| c.target.clone()));
        if options.warnings_non_fatal {
            argv.extend(self.non_fatal_warnings.iter().cloned());
        }
        argv
    }
}

impl BuildExecutor for CommandExecutor {
    fn run_build(
        &self,
        project: &dyn ProjectHost,
        targets: &TargetSet,
        options: &BuildOptions,
    ) -> Option<ExitResult> {
        let argv = self.argv(targets, options);
        let cmd = Cmd::from_slice(&argv).cwd(project.root());
        crate::debug!("build"; "{}", cmd.display());

        let name = argv.first().cloned().unwrap_or_default();
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                crate::log!("error"; "build of {} not started: {:#}", display_targets(targets), e);
                return None;
            }
        };

        let pid = child.id();
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        self.running.lock().insert(pid, child);

        let status = match self.wait(pid) {
            Ok(status) => status,
            Err(e) => {
                crate::log!("error"; "build of {} lost: {}", display_targets(targets), e);
                return None;
            }
        };
        let output = Output {
            status,
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        };

        let result = ExitResult::from(output.status);
        if result.is_success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            crate::debug_do! {
                BUILD_TOOL_FILTER.log(&name, stderr.trim());
            }
        } else {
            crate::logger::status_error(
                &format!("build failed: {}", display_targets(targets)),
                &format_error(&name, &output, &BUILD_TOOL_FILTER),
            );
        }
        Some(result)
    }
}

/// Read a child pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;
    use crate::config::test_load_config;
    use crate::core::ComponentInfo;
    use crate::host::ManifestProject;

    fn executor() -> CommandExecutor {
        CommandExecutor::from_parts(
            vec!["stack".into(), "build".into()],
            vec!["--fast".into()],
            vec!["--ghc-options=-Wwarn".into()],
        )
    }

    fn targets() -> TargetSet {
        ["utils", "core"]
            .into_iter()
            .map(ComponentInfo::library)
            .collect()
    }

    #[test]
    fn test_argv_orders_targets_and_relaxes_warnings() {
        let argv = executor().argv(&targets(), &BuildOptions::coordinated());
        assert_eq!(
            argv,
            [
                "stack",
                "build",
                "--fast",
                "core:lib",
                "utils:lib",
                "--ghc-options=-Wwarn"
            ]
        );
    }

    #[test]
    fn test_argv_without_warning_policy() {
        let options = BuildOptions {
            warnings_non_fatal: false,
        };
        let argv = executor().argv(&targets(), &options);
        assert!(!argv.iter().any(|a| a.contains("Wwarn")));
    }

    #[test]
    fn test_exit_result() {
        assert!(ExitResult::SUCCESS.is_success());
        assert!(!ExitResult::failed(1).is_success());
        assert!(!ExitResult { code: None }.is_success());
    }

    #[test]
    fn test_kill_running_without_builds() {
        assert_eq!(executor().kill_running(), 0);
    }

    #[cfg(unix)]
    fn sleeping_build() -> (tempfile::TempDir, ManifestProject, Arc<CommandExecutor>) {
        let (dir, config) = test_load_config("[[package]]\nname = \"core\"\n");
        let project = ManifestProject::new(&config);
        let executor = CommandExecutor::from_parts(
            vec!["sleep".into(), "30".into()],
            Vec::new(),
            Vec::new(),
        );
        (dir, project, Arc::new(executor))
    }

    #[cfg(unix)]
    #[test]
    fn test_kill_running_ends_blocked_build() {
        let (_dir, project, executor) = sleeping_build();

        let worker = {
            let executor = Arc::clone(&executor);
            thread::spawn(move || {
                executor.run_build(&project, &TargetSet::new(), &BuildOptions::coordinated())
            })
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        while executor.running.lock().is_empty() {
            assert!(Instant::now() < deadline, "build never started");
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(executor.kill_running(), 1);
        let result = worker.join().unwrap();
        assert_eq!(result, Some(ExitResult { code: None }));
        assert!(executor.running.lock().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_finished_build_is_forgotten() {
        let (_dir, project, _) = sleeping_build();
        let executor = CommandExecutor::from_parts(vec!["true".into()], Vec::new(), Vec::new());

        let result = executor.run_build(&project, &TargetSet::new(), &BuildOptions::coordinated());
        assert_eq!(result, Some(ExitResult::SUCCESS));
        assert!(executor.running.lock().is_empty());
    }
}
