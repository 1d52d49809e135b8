//! Child-process interactive sessions.
//!
//! A session keeps its stdin open so REPL-style tools stay alive between
//! rebuilds. Restart is kill, reap, respawn.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};
use parking_lot::Mutex;

use super::Session;
use crate::config::SessionConfig;
use crate::core::ComponentInfo;

pub struct ProcessSession {
    id: String,
    component: ComponentInfo,
    argv: Vec<String>,
    cwd: PathBuf,
    child: Mutex<Option<Child>>,
}

impl ProcessSession {
    pub fn new(component: ComponentInfo, argv: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            id: component.target.clone(),
            component,
            argv,
            cwd: cwd.into(),
            child: Mutex::new(None),
        }
    }

    pub fn from_config(config: &SessionConfig, component: ComponentInfo, root: &Path) -> Self {
        Self::new(component, config.argv(), root)
    }

    /// Spawn the process unless it is already running.
    pub fn start(&self) -> Result<()> {
        let mut child = self.child.lock();
        if let Some(running) = child.as_mut()
            && matches!(running.try_wait(), Ok(None))
        {
            return Ok(());
        }
        *child = Some(self.spawn()?);
        Ok(())
    }

    /// Kill and reap the process if running.
    pub fn stop(&self) {
        if let Some(mut child) = self.child.lock().take() {
            Self::kill(&mut child);
        }
    }

    pub fn is_alive(&self) -> bool {
        self.child
            .lock()
            .as_mut()
            .is_some_and(|child| matches!(child.try_wait(), Ok(None)))
    }

    #[cfg(test)]
    pub fn pid(&self) -> Option<u32> {
        self.child.lock().as_ref().map(Child::id)
    }

    fn spawn(&self) -> Result<Child> {
        let (program, args) = self
            .argv
            .split_first()
            .with_context(|| format!("session {} has an empty command", self.id))?;

        let child = Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start `{}`", self.argv.join(" ")))?;

        crate::debug!("session"; "{} started (pid {})", self.id, child.id());
        Ok(child)
    }

    fn kill(child: &mut Child) {
        // Already exited is fine
        let _ = child.kill();
        let _ = child.wait();
    }
}

impl Session for ProcessSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn component(&self) -> &ComponentInfo {
        &self.component
    }

    fn restart(&self) -> Result<()> {
        let mut child = self.child.lock();
        if let Some(mut old) = child.take() {
            Self::kill(&mut old);
        }
        *child = Some(self.spawn()?);
        Ok(())
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.get_mut().take() {
            Self::kill(&mut child);
        }
    }
}
