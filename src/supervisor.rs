//! Single-active-task supervisor.
//!
//! The supervisor decides what the LEDs are doing. It holds the PWM sink
//! while idle or showing a static color, and lends it to exactly one
//! [`PatternTask`] while a pattern runs. Every dispatch first takes the sink
//! back (stop + join the running task), so a preempted pattern can never
//! write after the next command's first write.

use crate::command::{Command, PatternKind};
use crate::pattern::PatternTask;
use crate::pwm::PwmSink;
use std::fmt;
use tokio::task::JoinError;

/// Where the sink currently lives.
enum Slot<S> {
    /// Held by the supervisor; a static color (or nothing) is showing.
    Idle(S),
    /// Lent to a running pattern.
    Running(PatternTask<S>),
    /// A pattern task panicked and took the sink with it.
    Lost,
}

pub struct Supervisor<S> {
    slot: Slot<S>,
}

impl<S: PwmSink> Supervisor<S> {
    pub fn new(sink: S) -> Self {
        Self {
            slot: Slot::Idle(sink),
        }
    }

    /// Apply `command`, preempting whatever is running.
    ///
    /// The previous pattern (if any) has fully exited before this writes a
    /// static color or starts the next pattern.
    pub async fn dispatch(&mut self, command: Command) -> Result<(), SupervisorError> {
        let mut sink = self.preempt().await?;

        match command {
            Command::SetColor(color) => {
                tracing::debug!("Setting static color {}", color);
                sink.set_rgb(color.to_rgb());
                self.slot = Slot::Idle(sink);
            }
            Command::Pattern(pattern) => {
                self.slot = Slot::Running(PatternTask::spawn(pattern, sink));
            }
        }

        Ok(())
    }

    /// Kind of the pattern currently running, if any.
    pub fn current(&self) -> Option<PatternKind> {
        match &self.slot {
            Slot::Running(task) => Some(task.kind()),
            Slot::Idle(_) | Slot::Lost => None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.current().is_some()
    }

    /// Stop any pattern, switch the outputs off and return the sink.
    pub async fn shutdown(mut self) -> Result<S, SupervisorError> {
        let mut sink = self.preempt().await?;
        sink.off();
        Ok(sink)
    }

    /// Take the sink back, stopping and joining a running pattern first.
    ///
    /// Leaves the slot `Lost`; callers put the sink (or a new task) back.
    async fn preempt(&mut self) -> Result<S, SupervisorError> {
        match std::mem::replace(&mut self.slot, Slot::Lost) {
            Slot::Idle(sink) => Ok(sink),
            Slot::Running(task) => task.stop().await.map_err(SupervisorError::TaskFailed),
            Slot::Lost => Err(SupervisorError::SinkLost),
        }
    }
}

/// The supervisor can no longer drive the outputs.
#[derive(Debug)]
pub enum SupervisorError {
    /// The pattern task panicked or was aborted; the sink is gone.
    TaskFailed(JoinError),
    /// An earlier failure already lost the sink.
    SinkLost,
}

impl fmt::Display for SupervisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskFailed(e) => write!(f, "pattern task failed: {e}"),
            Self::SinkLost => f.write_str("PWM outputs were lost by an earlier failed pattern task"),
        }
    }
}

impl std::error::Error for SupervisorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TaskFailed(e) => Some(e),
            Self::SinkLost => None,
        }
    }
}
