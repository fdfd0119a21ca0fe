//! Run context - the variables a when-clause can reference

use std::fmt;

/// Identifier the orchestrating CI server exposes as `server`
pub const SERVER_NAME: &str = "estafette";

/// The fixed set of variables available to when-clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextVariable {
    Branch,
    Trigger,
    Status,
    Action,
    Server,
}

impl ContextVariable {
    /// Look up a variable by the name used in expressions
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "branch" => Some(ContextVariable::Branch),
            "trigger" => Some(ContextVariable::Trigger),
            "status" => Some(ContextVariable::Status),
            "action" => Some(ContextVariable::Action),
            "server" => Some(ContextVariable::Server),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContextVariable::Branch => "branch",
            ContextVariable::Trigger => "trigger",
            ContextVariable::Status => "status",
            ContextVariable::Action => "action",
            ContextVariable::Server => "server",
        }
    }
}

impl fmt::Display for ContextVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Context of the current pipeline run
///
/// Values are empty strings when the CI server did not provide them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunContext {
    /// Git branch being built
    pub branch: String,

    /// What triggered the run (push, manual, pipeline, ...)
    pub trigger: String,

    /// Build status so far (succeeded, failed)
    pub status: String,

    /// Release action, for release runs
    pub action: String,
}

impl RunContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = trigger.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    /// Get the value of a variable
    pub fn get(&self, variable: ContextVariable) -> &str {
        match variable {
            ContextVariable::Branch => &self.branch,
            ContextVariable::Trigger => &self.trigger,
            ContextVariable::Status => &self.status,
            ContextVariable::Action => &self.action,
            ContextVariable::Server => SERVER_NAME,
        }
    }
}
