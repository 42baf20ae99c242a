use super::{Invocation, ResourceGateway};
use crate::core::{ModelError, Result};
use std::cell::RefCell;

#[derive(Debug, Clone)]
enum Outcome {
    Output(String),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Rule {
    /// `None` matches every command.
    command: Option<String>,
    /// `None` matches any arguments.
    args: Option<Vec<String>>,
    outcome: Outcome,
}

impl Rule {
    fn matches(&self, command: &str, args: &[String]) -> bool {
        self.command.as_deref().is_none_or(|c| c == command)
            && self.args.as_deref().is_none_or(|a| a == args)
    }
}

/// A gateway answering from canned responses and recording every call.
///
/// The most recently added matching rule wins, so a test can override the
/// setup script (e.g. make everything fail) after entities were built.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    rules: RefCell<Vec<Rule>>,
    calls: RefCell<Vec<Invocation>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `command` with `output`, whatever the arguments.
    pub fn respond(&self, command: &str, output: impl Into<String>) -> &Self {
        self.push(Some(command), None, Outcome::Output(output.into()))
    }

    /// Answers `command` with `output` only for exactly `args`.
    pub fn respond_to(&self, command: &str, args: &[&str], output: impl Into<String>) -> &Self {
        let args = args.iter().map(|a| a.to_string()).collect();
        self.push(Some(command), Some(args), Outcome::Output(output.into()))
    }

    /// Makes `command` fail.
    pub fn fail(&self, command: &str, message: impl Into<String>) -> &Self {
        self.push(Some(command), None, Outcome::Fail(message.into()))
    }

    /// Makes every command fail.
    pub fn fail_all(&self, message: impl Into<String>) -> &Self {
        self.push(None, None, Outcome::Fail(message.into()))
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn was_called(&self, command: &str) -> bool {
        self.calls.borrow().iter().any(|call| call.command == command)
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn push(&self, command: Option<&str>, args: Option<Vec<String>>, outcome: Outcome) -> &Self {
        self.rules.borrow_mut().push(Rule {
            command: command.map(str::to_string),
            args,
            outcome,
        });
        self
    }
}

impl ResourceGateway for ScriptedGateway {
    fn invoke(&self, command: &str, args: &[String]) -> Result<String> {
        self.calls.borrow_mut().push(Invocation::new(command, args));

        let rules = self.rules.borrow();
        let rule = rules.iter().rev().find(|rule| rule.matches(command, args));
        match rule.map(|rule| &rule.outcome) {
            Some(Outcome::Output(text)) => Ok(text.clone()),
            Some(Outcome::Fail(message)) => {
                Err(ModelError::command_failed(command, args, message.clone()))
            }
            None => Err(ModelError::command_failed(command, args, "no scripted response")),
        }
    }
}
