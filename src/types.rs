use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::condition::Expr;
use crate::errors::PolicyError;

/// Attribute bag describing an actor or a subject. Contents are opaque to
/// the engine; only rule conditions interpret them.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Caller-supplied predicate over (actor, subject).
pub type PredicateFn = Arc<dyn Fn(&Attributes, &Attributes) -> bool + Send + Sync>;

/// Condition attached to a rule declaration. Compiled into a [`Condition`]
/// by `compile_rules`.
#[derive(Clone)]
pub enum ConditionDecl {
    /// Arbitrary predicate code.
    Predicate(PredicateFn),
    /// Expression source like `actor.id == subject.id`, parsed at compile time.
    Expr(String),
}

impl fmt::Debug for ConditionDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionDecl::Predicate(_) => f.write_str("Predicate(..)"),
            ConditionDecl::Expr(source) => f.debug_tuple("Expr").field(source).finish(),
        }
    }
}

/// Compiled form of a rule condition.
#[derive(Clone)]
pub enum Condition {
    /// Applies unconditionally. The default for declarations with no condition.
    Always,
    Predicate(PredicateFn),
    Expr(Expr),
}

impl Condition {
    /// Evaluate against normalized attribute bags. Predicates are infallible
    /// by type; expression conditions can fail with a type error, which
    /// propagates to the caller unmodified.
    pub fn evaluate(&self, actor: &Attributes, subject: &Attributes) -> Result<bool, PolicyError> {
        match self {
            Condition::Always => Ok(true),
            Condition::Predicate(predicate) => Ok(predicate(actor, subject)),
            Condition::Expr(expr) => crate::condition::evaluate(expr, actor, subject),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Always => f.write_str("Always"),
            Condition::Predicate(_) => f.write_str("Predicate(..)"),
            Condition::Expr(expr) => f.debug_tuple("Expr").field(expr).finish(),
        }
    }
}

/// One declared authorization grant, the builder's input unit.
#[derive(Debug, Clone)]
pub struct RuleDecl {
    pub role: String,
    pub resource: String,
    pub action: String,
    /// Field names the grant permits; interpretation is caller-defined.
    pub fields: Vec<String>,
    /// Absent means the rule applies unconditionally.
    pub condition: Option<ConditionDecl>,
}

impl RuleDecl {
    pub fn new(role: &str, resource: &str, action: &str) -> Self {
        Self {
            role: role.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
            fields: Vec::new(),
            condition: None,
        }
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_predicate(
        mut self,
        predicate: impl Fn(&Attributes, &Attributes) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.condition = Some(ConditionDecl::Predicate(Arc::new(predicate)));
        self
    }

    pub fn with_expr(mut self, source: &str) -> Self {
        self.condition = Some(ConditionDecl::Expr(source.to_string()));
        self
    }
}

/// Compiled rule: the permitted fields plus the gating condition.
#[derive(Debug, Clone)]
pub struct Rule {
    pub fields: Vec<String>,
    pub condition: Condition,
}

/// Immutable compiled rule index, keyed by (role, resource, action).
/// Built once by `compile_rules` and shared read-only across evaluations.
#[derive(Debug, Clone, Default)]
pub struct PolicyIndex {
    /// (role, resource, action) -> rules in declaration order
    by_triple: HashMap<(String, String, String), Vec<Rule>>,
    /// (role, resource) -> action names in first-declaration order
    by_pair: HashMap<(String, String), Vec<String>>,
}

impl PolicyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: &str, resource: &str, action: &str, rule: Rule) {
        self.by_triple
            .entry((role.to_string(), resource.to_string(), action.to_string()))
            .or_default()
            .push(rule);

        let actions = self
            .by_pair
            .entry((role.to_string(), resource.to_string()))
            .or_default();
        if !actions.iter().any(|a| a == action) {
            actions.push(action.to_string());
        }
    }

    /// Rules declared for the triple, in declaration order. Empty for
    /// triples no rule was declared for, never an error.
    pub fn rules_for(&self, role: &str, resource: &str, action: &str) -> &[Rule] {
        self.by_triple
            .get(&(role.to_string(), resource.to_string(), action.to_string()))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Actions declared for the (role, resource) pair, in the order each
    /// action first appeared.
    pub fn actions_for(&self, role: &str, resource: &str) -> &[String] {
        self.by_pair
            .get(&(role.to_string(), resource.to_string()))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn rule_count(&self) -> usize {
        self.by_triple.values().map(|v| v.len()).sum()
    }
}

// ---------- API request/response types ----------

/// Single-action authorization question.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    pub role: String,
    /// Optional attribute bag; absent or null means an empty bag.
    #[serde(default)]
    pub actor: Option<Attributes>,
    pub resource: String,
    #[serde(default)]
    pub subject: Option<Attributes>,
    pub action: String,
}

/// Action-enumeration question: which actions at all for this (role, resource)?
#[derive(Debug, Clone, Deserialize)]
pub struct ActionsRequest {
    pub role: String,
    #[serde(default)]
    pub actor: Option<Attributes>,
    pub resource: String,
    #[serde(default)]
    pub subject: Option<Attributes>,
}

impl From<&CheckRequest> for ActionsRequest {
    fn from(req: &CheckRequest) -> Self {
        Self {
            role: req.role.clone(),
            actor: req.actor.clone(),
            resource: req.resource.clone(),
            subject: req.subject.clone(),
        }
    }
}

/// Outcome of a single-action check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub is_allowed: bool,
    /// Fields permitted by the matched rule; empty when denied.
    pub fields: Vec<String>,
}
