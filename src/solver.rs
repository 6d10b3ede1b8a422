//! Launching the external MMD solver.

use std::process::Command;

use itertools::Itertools;

use crate::config::SolverCommand;
use crate::error::{MmdError, MmdResult};
use crate::games::GameKind;

/// Parameters of one solver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverRequest {
    pub game: GameKind,
    pub inverse_alpha: u32,
    pub iterations: usize,
    /// Track divergence against the reference solution.
    pub load_qre: bool,
    pub compute_gap: bool,
}

impl SolverRequest {
    pub fn flags(&self) -> Vec<String> {
        vec![
            format!("--game={}", self.game),
            format!("--inverse_alpha={}", self.inverse_alpha),
            format!("--iterations={}", self.iterations),
            format!("--load_qre={}", self.load_qre),
            format!("--compute_gap={}", self.compute_gap),
        ]
    }
}

/// Runs the solver for one request. On success the solver has written its
/// result record to the cache location for `(game, inverse_alpha)`.
pub trait SolverLauncher: Sync {
    fn launch(&self, request: &SolverRequest) -> MmdResult<()>;
}

/// Launches the solver as a child process and waits for it to exit.
#[derive(Debug, Clone)]
pub struct SubprocessLauncher {
    command: SolverCommand,
}

impl SubprocessLauncher {
    pub fn new(command: SolverCommand) -> Self {
        SubprocessLauncher { command }
    }

    pub fn args(&self, request: &SolverRequest) -> Vec<String> {
        let mut args = self.command.args.clone();
        args.extend(request.flags());
        args
    }

    /// Full command line, for logs and error messages.
    pub fn command_line(&self, request: &SolverRequest) -> String {
        std::iter::once(self.command.program.clone())
            .chain(self.args(request))
            .join(" ")
    }
}

impl SolverLauncher for SubprocessLauncher {
    fn launch(&self, request: &SolverRequest) -> MmdResult<()> {
        let command_line = self.command_line(request);
        log::info!("{}", command_line);

        let mut cmd = Command::new(&self.command.program);
        cmd.args(self.args(request));
        if let Some(dir) = &self.command.working_dir {
            cmd.current_dir(dir);
        }

        let status = cmd.status().map_err(|e| MmdError::ProducerFailure {
            command: command_line.clone(),
            reason: format!("could not start: {}", e),
        })?;
        if !status.success() {
            return Err(MmdError::ProducerFailure {
                command: command_line,
                reason: format!("exited with {}", status),
            });
        }
        Ok(())
    }
}
