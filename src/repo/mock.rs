//! Scripted command runner for testing without real processes.

use crate::error::{ReleaseError, Result};
use crate::exec::CommandRunner;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// One canned response: invocations whose argv starts with `prefix`
/// succeed with `output`, or fail with it when `fail` is set.
struct Rule {
    prefix: Vec<String>,
    output: String,
    fail: bool,
}

/// Runner that answers from a script and records every invocation.
///
/// Unscripted commands succeed with empty output, so tests only describe
/// the calls they care about. Later rules win, letting a test layer a
/// failure over a default.
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    calls: Rc<RefCell<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        ScriptedRunner {
            rules: Vec::new(),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Succeed with `output` for invocations starting with `prefix`.
    pub fn on(mut self, prefix: &[&str], output: &str) -> Self {
        self.rules.push(Rule {
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            output: output.to_string(),
            fail: false,
        });
        self
    }

    /// Fail with `message` for invocations starting with `prefix`.
    pub fn fail_on(mut self, prefix: &[&str], message: &str) -> Self {
        self.rules.push(Rule {
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            output: message.to_string(),
            fail: true,
        });
        self
    }

    /// Shared handle on the invocation log, one joined line per call.
    pub fn calls_handle(&self) -> Rc<RefCell<Vec<String>>> {
        self.calls.clone()
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[String], _dir: &Path) -> Result<String> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().cloned());
        self.calls.borrow_mut().push(call.join(" "));

        for rule in self.rules.iter().rev() {
            if call.len() >= rule.prefix.len() && call[..rule.prefix.len()] == rule.prefix[..] {
                return if rule.fail {
                    Err(ReleaseError::execution(rule.output.clone()))
                } else {
                    Ok(rule.output.clone())
                };
            }
        }
        Ok(String::new())
    }
}
