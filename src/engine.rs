use crate::errors::PolicyError;
use crate::types::{ActionsRequest, Attributes, CheckRequest, Decision, PolicyIndex};

/// Check whether the request's actor may perform `action` on the subject.
///
/// Rules for the (role, resource, action) triple are scanned in declaration
/// order and the first rule whose condition holds decides the outcome; its
/// `fields` list rides along on the decision. No matching rule, including a
/// triple no rule was ever declared for, yields a denial with empty fields.
pub fn check(index: &PolicyIndex, req: &CheckRequest) -> Result<Decision, PolicyError> {
    let empty = Attributes::new();
    let actor = req.actor.as_ref().unwrap_or(&empty);
    let subject = req.subject.as_ref().unwrap_or(&empty);

    for rule in index.rules_for(&req.role, &req.resource, &req.action) {
        if rule.condition.evaluate(actor, subject)? {
            return Ok(Decision {
                is_allowed: true,
                fields: rule.fields.clone(),
            });
        }
    }

    Ok(Decision {
        is_allowed: false,
        fields: Vec::new(),
    })
}

/// List every action the actor may perform on the subject under the
/// request's (role, resource) pair, in the order actions were first
/// declared.
///
/// An action is included when at least one of its rules' conditions holds.
/// This is an existence test over the whole rule list, not the first-match
/// scan of [`check`], and the result carries no fields.
pub fn allowed_actions(
    index: &PolicyIndex,
    req: &ActionsRequest,
) -> Result<Vec<String>, PolicyError> {
    let empty = Attributes::new();
    let actor = req.actor.as_ref().unwrap_or(&empty);
    let subject = req.subject.as_ref().unwrap_or(&empty);

    let mut allowed = Vec::new();
    for action in index.actions_for(&req.role, &req.resource) {
        for rule in index.rules_for(&req.role, &req.resource, action) {
            if rule.condition.evaluate(actor, subject)? {
                allowed.push(action.clone());
                break;
            }
        }
    }

    Ok(allowed)
}

/// Whether `req.action` appears in [`allowed_actions`] for the request.
///
/// Recomputes the full action set for the (role, resource) pair. For a
/// single-action answer with fields, [`check`] is the cheaper entry point;
/// both are part of the public contract.
pub fn is_allowed(index: &PolicyIndex, req: &CheckRequest) -> Result<bool, PolicyError> {
    let actions = allowed_actions(index, &ActionsRequest::from(req))?;
    Ok(actions.iter().any(|a| a == &req.action))
}
