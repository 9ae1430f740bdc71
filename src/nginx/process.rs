//! Starting or reloading the nginx process.

use tracing::{info, warn};

use super::layout::NginxLayout;
use super::manager::NginxManager;
use crate::error::DeployResult;
use crate::executor::SubprocessBuilder;

/// What `run` should do, judged from the install prefix alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunAction {
    /// A PID file exists: ask the running master to reload.
    Reload,
    /// No PID file: start a new master.
    Start,
}

impl RunAction {
    pub fn detect(layout: &NginxLayout) -> Self {
        if layout.pid_file().exists() {
            RunAction::Reload
        } else {
            RunAction::Start
        }
    }
}

/// What `run` actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Started,
    Reloaded,
    /// The PID file was stale (nginx killed externally), so reload failed
    /// and a fresh master was started instead.
    StartedAfterFailedReload,
}

impl NginxManager {
    /// Reload the running nginx, or start it.
    ///
    /// Any reload failure is treated as "not running" and followed by a
    /// fresh start. The process is not health-checked afterwards.
    pub fn run(&self) -> DeployResult<RunOutcome> {
        match RunAction::detect(self.layout()) {
            RunAction::Reload => {
                let reload = SubprocessBuilder::new(self.layout().binary())
                    .args(["-s", "reload"])
                    .run()?;
                if reload.success {
                    info!("nginx reloaded");
                    return Ok(RunOutcome::Reloaded);
                }

                warn!(
                    pid_file = %self.layout().pid_file().display(),
                    output = %reload.diagnostic(),
                    "nginx reload failed, starting a new instance"
                );
                self.start()?;
                Ok(RunOutcome::StartedAfterFailedReload)
            }
            RunAction::Start => {
                self.start()?;
                Ok(RunOutcome::Started)
            }
        }
    }

    fn start(&self) -> DeployResult<()> {
        // The master daemonizes; inherited stdio keeps us from waiting on
        // pipes it might hold open.
        SubprocessBuilder::new(self.layout().binary())
            .inherit_output()
            .run()?
            .check()?;
        info!("nginx started");
        Ok(())
    }
}
