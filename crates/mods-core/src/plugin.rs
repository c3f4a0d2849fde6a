//! Plugin capability interface.
//!
//! A plugin is an id plus a fixed set of hook slots. Each slot is either
//! [`Hook::Absent`] or holds a closure; the resolver skips absent slots.
//!
//! | Hook             | Called                                             |
//! |------------------|----------------------------------------------------|
//! | `generate_rules` | every cycle, after built-in rules for new options  |
//! | `before_solve`   | every cycle, right before solving                  |
//! | `on_unsat`       | with the blame chain when solving fails            |
//! | `finish`         | once after success; may return a result payload    |
//! | `on_result`      | once with the final, immutable result              |

use std::fmt;

use crate::context::{RuleContext, UnsatContext};
use crate::result::ModSolveResult;

/// A hook slot.
pub enum Hook<F: ?Sized> {
    Absent,
    Present(Box<F>),
}

impl<F: ?Sized> Hook<F> {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn get_mut(&mut self) -> Option<&mut F> {
        match self {
            Self::Present(f) => Some(f),
            Self::Absent => None,
        }
    }
}

impl<F: ?Sized> Default for Hook<F> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<F: ?Sized> fmt::Debug for Hook<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absent => "Absent",
            Self::Present(_) => "Present",
        })
    }
}

/// Error returned by a plugin hook. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PluginError(pub String);

impl PluginError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// How a plugin answered an unsatisfiable rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsatResponse {
    /// Nothing this plugin can fix.
    Declined,
    /// The plugin removed or added something; solve again.
    Handled,
}

pub type RulesHook = dyn FnMut(&mut RuleContext<'_>) -> Result<(), PluginError> + Send;
pub type UnsatHook = dyn FnMut(&mut UnsatContext<'_>) -> UnsatResponse + Send;
pub type FinishHook =
    dyn FnMut(&ModSolveResult) -> Result<Option<serde_json::Value>, PluginError> + Send;
pub type ResultHook = dyn FnMut(&ModSolveResult) + Send;

#[derive(Debug, Default)]
pub struct PluginHooks {
    pub generate_rules: Hook<RulesHook>,
    pub before_solve: Hook<RulesHook>,
    pub on_unsat: Hook<UnsatHook>,
    pub finish: Hook<FinishHook>,
    pub on_result: Hook<ResultHook>,
}

#[derive(Debug)]
pub struct Plugin {
    id: String,
    hooks: PluginHooks,
}

impl Plugin {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            hooks: PluginHooks::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn hooks(&self) -> &PluginHooks {
        &self.hooks
    }

    pub(crate) fn hooks_mut(&mut self) -> &mut PluginHooks {
        &mut self.hooks
    }

    pub fn on_generate_rules<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut RuleContext<'_>) -> Result<(), PluginError> + Send + 'static,
    {
        self.hooks.generate_rules = Hook::Present(Box::new(hook));
        self
    }

    pub fn on_before_solve<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut RuleContext<'_>) -> Result<(), PluginError> + Send + 'static,
    {
        self.hooks.before_solve = Hook::Present(Box::new(hook));
        self
    }

    pub fn on_unsat<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut UnsatContext<'_>) -> UnsatResponse + Send + 'static,
    {
        self.hooks.on_unsat = Hook::Present(Box::new(hook));
        self
    }

    pub fn on_finish<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&ModSolveResult) -> Result<Option<serde_json::Value>, PluginError>
            + Send
            + 'static,
    {
        self.hooks.finish = Hook::Present(Box::new(hook));
        self
    }

    pub fn on_result<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&ModSolveResult) + Send + 'static,
    {
        self.hooks.on_result = Hook::Present(Box::new(hook));
        self
    }
}
