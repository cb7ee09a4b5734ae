/// Status of an agent run. Every status but `Running` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    /// The model produced a final answer
    Succeeded,
    /// Backend error, unexpected response, or a tool result could not be produced
    Failed,
    /// The iteration ceiling was reached without a final answer
    Exhausted,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Iteration counter plus status.
///
/// One iteration is one backend call. The counter only moves forward and
/// never passes `max_iterations`; once terminal, the status is frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopState {
    pub iteration: u32,
    pub status: RunStatus,
}

impl Default for LoopState {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopState {
    pub fn new() -> Self {
        Self {
            iteration: 0,
            status: RunStatus::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    /// Moves to a terminal status. Returns false (and changes nothing) if
    /// the run already ended.
    pub fn finish(&mut self, status: RunStatus) -> bool {
        debug_assert!(status.is_terminal(), "finish() needs a terminal status");
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }

    /// Counts the iteration about to call the backend. No-op once terminal.
    pub fn begin(&mut self) {
        if self.is_running() {
            self.iteration += 1;
        }
    }

    /// Ends a still-running loop as `Exhausted` once `max_iterations`
    /// iterations have begun.
    pub fn advance(&mut self, max_iterations: u32) {
        if self.is_running() && self.iteration >= max_iterations {
            self.status = RunStatus::Exhausted;
        }
    }
}
