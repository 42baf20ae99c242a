//! Access to the external resource manager.
//!
//! Entities only ever see [`ResourceGateway`]: a command name and arguments
//! in, report text out, or a `CommandFailed` error.

pub mod scripted;
pub mod vboxmanage;

use crate::core::Result;
use std::fmt;

pub use scripted::ScriptedGateway;
pub use vboxmanage::VBoxManageGateway;

pub trait ResourceGateway {
    /// Runs `command` and returns its text output.
    ///
    /// Non-success is reported as `ModelError::CommandFailed`; callers never
    /// see exit codes.
    fn invoke(&self, command: &str, args: &[String]) -> Result<String>;
}

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(command: &str, args: &[String]) -> Self {
        Self {
            command: command.to_string(),
            args: args.to_vec(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
