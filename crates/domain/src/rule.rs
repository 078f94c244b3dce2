//! Rule: a predicate over a snapshot paired with the action it emits.
//!
//! Rules are declared once at startup and evaluated in declaration order.
//! A rule always produces a [`Verdict`], so every tick yields one decision
//! per rule.

use std::collections::HashSet;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::action::ActionTag;
use crate::error::{RuleError, ValidationError};
use crate::snapshot::SystemSnapshot;

/// Pure function deciding whether a rule holds for a snapshot.
pub type Predicate = Arc<dyn Fn(&SystemSnapshot) -> Result<bool, RuleError> + Send + Sync>;

/// Outcome of evaluating one rule against one snapshot, before any action
/// is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The rule asks for `action` to be performed.
    Triggered(ActionTag),
    /// The rule does not apply; `action` is the one it would have emitted.
    Skipped(ActionTag),
    /// The predicate could not be evaluated.
    Failed { action: ActionTag, error: RuleError },
}

impl Verdict {
    /// The action tag recorded for this verdict.
    #[must_use]
    pub fn action(&self) -> &ActionTag {
        match self {
            Self::Triggered(action) | Self::Skipped(action) | Self::Failed { action, .. } => {
                action
            }
        }
    }
}

/// A named operational rule.
#[derive(Clone)]
pub struct Rule {
    id: String,
    predicate: Predicate,
    action: ActionTag,
    otherwise: Option<ActionTag>,
}

impl Rule {
    /// Create a builder for constructing a [`Rule`].
    #[must_use]
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Action emitted when the predicate holds.
    #[must_use]
    pub fn action(&self) -> &ActionTag {
        &self.action
    }

    /// Action emitted when the predicate does not hold, if any.
    #[must_use]
    pub fn otherwise(&self) -> Option<&ActionTag> {
        self.otherwise.as_ref()
    }

    /// Evaluate the predicate against `snapshot`.
    ///
    /// Deterministic: the same snapshot always yields the same verdict.
    /// A false predicate triggers the `otherwise` action when one is
    /// declared, and is skipped otherwise. A predicate that panics yields
    /// [`Verdict::Failed`] with [`RuleError::Panicked`].
    #[must_use]
    pub fn verdict(&self, snapshot: &SystemSnapshot) -> Verdict {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.predicate)(snapshot)))
            .unwrap_or_else(|payload| Err(RuleError::Panicked(panic_message(&*payload))));
        match outcome {
            Ok(true) => Verdict::Triggered(self.action.clone()),
            Ok(false) => match &self.otherwise {
                Some(fallback) => Verdict::Triggered(fallback.clone()),
                None => Verdict::Skipped(self.action.clone()),
            },
            Err(error) => Verdict::Failed {
                action: self.action.clone(),
                error,
            },
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("action", &self.action)
            .field("otherwise", &self.otherwise)
            .finish_non_exhaustive()
    }
}

/// Step-by-step builder for [`Rule`].
#[derive(Default)]
pub struct RuleBuilder {
    id: Option<String>,
    predicate: Option<Predicate>,
    action: Option<ActionTag>,
    otherwise: Option<ActionTag>,
}

impl RuleBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&SystemSnapshot) -> Result<bool, RuleError> + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    #[must_use]
    pub fn action(mut self, action: ActionTag) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn otherwise(mut self, action: ActionTag) -> Self {
        self.otherwise = Some(action);
        self
    }

    /// Consume the builder, validate, and return a [`Rule`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyRuleId`] when no id was given, or
    /// [`ValidationError::MissingPredicate`] / [`ValidationError::MissingAction`]
    /// when the rule is incomplete.
    pub fn build(self) -> Result<Rule, ValidationError> {
        let id = self.id.unwrap_or_default();
        if id.is_empty() {
            return Err(ValidationError::EmptyRuleId);
        }
        let Some(predicate) = self.predicate else {
            return Err(ValidationError::MissingPredicate(id));
        };
        let Some(action) = self.action else {
            return Err(ValidationError::MissingAction(id));
        };
        Ok(Rule {
            id,
            predicate,
            action,
            otherwise: self.otherwise,
        })
    }
}

/// Ordered collection of rules with unique ids.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule set, keeping declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateRuleId`] if two rules share an id.
    pub fn new(rules: Vec<Rule>) -> Result<Self, ValidationError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(ValidationError::DuplicateRuleId(rule.id.clone()));
            }
        }
        Ok(Self { rules })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
