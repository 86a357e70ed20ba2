//! Two-step confirmation gate for destructive bulk runs.
//!
//! ```text
//! Idle ─open─▶ AwaitFirstConfirm ─"DELETE"─▶ AwaitFinalConfirm ─"YES"─▶ Running ─▶ Done
//!   │                 │ other                      │ other
//!   │                 ▼                            ▼
//!   │              Aborted                      Aborted
//!   └─open (not required)─▶ Running
//! ```
//!
//! The first keyword must match exactly. The final keyword is compared after
//! upper-casing, so `yes` also passes. Closed input aborts.

/// Keyword required at the first confirmation step.
pub const FIRST_KEYWORD: &str = "DELETE";

/// Keyword required at the final confirmation step.
pub const FINAL_KEYWORD: &str = "YES";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    AwaitFirstConfirm,
    AwaitFinalConfirm,
    Running,
    Done,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmStep {
    First,
    Final,
}

/// What the caller should ask the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub step: ConfirmStep,
    pub keyword: &'static str,
    /// Number of repositories the run would touch.
    pub count: usize,
}

/// Supplies confirmation input. `None` means the input is closed.
pub trait ConfirmationSource {
    fn confirm(&mut self, prompt: &ConfirmPrompt) -> Option<String>;
}

impl<F> ConfirmationSource for F
where
    F: FnMut(&ConfirmPrompt) -> Option<String>,
{
    fn confirm(&mut self, prompt: &ConfirmPrompt) -> Option<String> {
        self(prompt)
    }
}

#[derive(Debug)]
pub struct ConfirmationGate {
    state: GateState,
    required: bool,
}

impl ConfirmationGate {
    pub fn new(required: bool) -> Self {
        Self {
            state: GateState::Idle,
            required,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Leave `Idle`: go straight to `Running` when no confirmation is required.
    pub fn open(&mut self) -> GateState {
        if self.state == GateState::Idle {
            self.state = if self.required {
                GateState::AwaitFirstConfirm
            } else {
                GateState::Running
            };
        }
        self.state
    }

    /// Prompt for the current step, if the gate is waiting for input.
    pub fn prompt(&self, count: usize) -> Option<ConfirmPrompt> {
        let (step, keyword) = match self.state {
            GateState::AwaitFirstConfirm => (ConfirmStep::First, FIRST_KEYWORD),
            GateState::AwaitFinalConfirm => (ConfirmStep::Final, FINAL_KEYWORD),
            _ => return None,
        };
        Some(ConfirmPrompt {
            step,
            keyword,
            count,
        })
    }

    /// Feed one line of input. Ignored outside the waiting states.
    pub fn submit(&mut self, input: Option<&str>) -> GateState {
        self.state = match (self.state, input.map(str::trim)) {
            (GateState::AwaitFirstConfirm, Some(FIRST_KEYWORD)) => GateState::AwaitFinalConfirm,
            (GateState::AwaitFinalConfirm, Some(line))
                if line.to_uppercase() == FINAL_KEYWORD =>
            {
                GateState::Running
            }
            (GateState::AwaitFirstConfirm | GateState::AwaitFinalConfirm, _) => {
                GateState::Aborted
            }
            (state, _) => state,
        };
        self.state
    }

    /// Open the gate and ask `source` until it is running or aborted.
    pub fn resolve(&mut self, source: &mut dyn ConfirmationSource, count: usize) -> GateState {
        self.open();
        while let Some(prompt) = self.prompt(count) {
            let input = source.confirm(&prompt);
            self.submit(input.as_deref());
        }
        self.state
    }

    /// Mark a running gate as finished.
    pub fn finish(&mut self) {
        if self.state == GateState::Running {
            self.state = GateState::Done;
        }
    }
}
