use crate::condition;
use crate::errors::PolicyError;
use crate::types::{Condition, ConditionDecl, PolicyIndex, Rule, RuleDecl};

/// Compile an ordered list of rule declarations into an immutable
/// [`PolicyIndex`].
///
/// Declaration order is load-bearing: per-(role, resource, action) rule
/// lists append in input order, and evaluation returns the first match.
/// Defaults are applied here: no `fields` means an empty list, no
/// `condition` means the rule applies unconditionally. Expression
/// conditions are parsed once, at this point; the compiled AST is stored
/// in the rule. No deduplication and no shadowed-rule detection.
///
/// A declaration with an empty `role`, `resource`, or `action` identifier
/// rejects the whole set, as does an expression that fails to parse.
pub fn compile_rules(decls: Vec<RuleDecl>) -> Result<PolicyIndex, PolicyError> {
    let mut index = PolicyIndex::new();

    for decl in decls {
        validate_identifier("role", &decl.role)?;
        validate_identifier("resource", &decl.resource)?;
        validate_identifier("action", &decl.action)?;

        let compiled = match decl.condition {
            None => Condition::Always,
            Some(ConditionDecl::Predicate(predicate)) => Condition::Predicate(predicate),
            Some(ConditionDecl::Expr(source)) => Condition::Expr(condition::parse(&source)?),
        };

        let rule = Rule {
            fields: decl.fields,
            condition: compiled,
        };
        index.insert(&decl.role, &decl.resource, &decl.action, rule);
    }

    tracing::debug!(rules = index.rule_count(), "Compiled authorization rules");

    Ok(index)
}

fn validate_identifier(kind: &str, value: &str) -> Result<(), PolicyError> {
    if value.is_empty() {
        return Err(PolicyError::InvalidRule(format!(
            "empty `{kind}` identifier"
        )));
    }
    Ok(())
}
