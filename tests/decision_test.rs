use serde_json::json;

use warden::compile::compile_rules;
use warden::engine;
use warden::types::{ActionsRequest, CheckRequest, PolicyIndex, RuleDecl};

/// Admin grants over the "user" resource: unconditional create and read,
/// delete for anyone but yourself, full-field update on yourself and
/// name-only update on anyone else.
fn admin_user_policy() -> PolicyIndex {
    compile_rules(vec![
        RuleDecl::new("admin", "user", "create"),
        RuleDecl::new("admin", "user", "delete")
            .with_predicate(|actor, subject| actor.get("id") != subject.get("id")),
        RuleDecl::new("admin", "user", "read"),
        RuleDecl::new("admin", "user", "update")
            .with_fields(&["name", "email", "password"])
            .with_predicate(|actor, subject| actor.get("id") == subject.get("id")),
        RuleDecl::new("admin", "user", "update")
            .with_fields(&["name"])
            .with_predicate(|actor, subject| actor.get("id") != subject.get("id")),
    ])
    .expect("policy should compile")
}

#[test]
fn check_scenarios() {
    let policy = admin_user_policy();

    // (description, request JSON, expected allowed, expected fields)
    let scenarios: Vec<(&str, serde_json::Value, bool, Vec<&str>)> = vec![
        (
            "admin can create a user",
            json!({"role": "admin", "actor": {"id": 1}, "resource": "user", "action": "create"}),
            true,
            vec![],
        ),
        (
            "actor may be omitted",
            json!({"role": "admin", "resource": "user", "action": "create"}),
            true,
            vec![],
        ),
        (
            "actor may be null",
            json!({"role": "admin", "actor": null, "resource": "user", "action": "create"}),
            true,
            vec![],
        ),
        (
            "actor may be an empty object",
            json!({"role": "admin", "actor": {}, "resource": "user", "action": "create"}),
            true,
            vec![],
        ),
        (
            "subject may be null",
            json!({"role": "admin", "subject": null, "resource": "user", "action": "create"}),
            true,
            vec![],
        ),
        (
            "subject may be an empty object",
            json!({"role": "admin", "subject": {}, "resource": "user", "action": "create"}),
            true,
            vec![],
        ),
        (
            "admin can read any user",
            json!({"role": "admin", "actor": {"id": 1}, "resource": "user", "action": "read"}),
            true,
            vec![],
        ),
        (
            "admin can fully update itself",
            json!({"role": "admin", "actor": {"id": 1}, "resource": "user",
                   "subject": {"id": 1}, "action": "update"}),
            true,
            vec!["name", "email", "password"],
        ),
        (
            "admin can update only the name of another user",
            json!({"role": "admin", "actor": {"id": 1}, "resource": "user",
                   "subject": {"id": 2}, "action": "update"}),
            true,
            vec!["name"],
        ),
        (
            "admin cannot delete itself",
            json!({"role": "admin", "actor": {"id": 1}, "resource": "user",
                   "subject": {"id": 1}, "action": "delete"}),
            false,
            vec![],
        ),
        (
            "admin can delete another user",
            json!({"role": "admin", "actor": {"id": 1}, "resource": "user",
                   "subject": {"id": 2}, "action": "delete"}),
            true,
            vec![],
        ),
        (
            "unknown action is denied",
            json!({"role": "admin", "actor": {"id": 1}, "resource": "user", "action": "export"}),
            false,
            vec![],
        ),
        (
            "unknown role is denied",
            json!({"role": "viewer", "actor": {"id": 1}, "resource": "user", "action": "read"}),
            false,
            vec![],
        ),
    ];

    for (description, request, expect_allowed, expect_fields) in scenarios {
        let req: CheckRequest =
            serde_json::from_value(request).expect("request should deserialize");
        let decision = engine::check(&policy, &req).expect("check should not fail");
        assert_eq!(decision.is_allowed, expect_allowed, "{description}");
        assert_eq!(decision.fields, expect_fields, "{description}");
    }
}

#[test]
fn action_enumeration_scenarios() {
    let policy = admin_user_policy();

    // Against another user every action is available.
    let req: ActionsRequest = serde_json::from_value(json!({
        "role": "admin", "actor": {"id": 1}, "resource": "user", "subject": {"id": 2}
    }))
    .unwrap();
    assert_eq!(
        engine::allowed_actions(&policy, &req).unwrap(),
        ["create", "delete", "read", "update"]
    );

    // Against itself the delete grant's condition fails for every rule.
    let req: ActionsRequest = serde_json::from_value(json!({
        "role": "admin", "actor": {"id": 1}, "resource": "user", "subject": {"id": 1}
    }))
    .unwrap();
    assert_eq!(
        engine::allowed_actions(&policy, &req).unwrap(),
        ["create", "read", "update"]
    );

    // A (role, resource) pair with no declarations enumerates nothing.
    let req: ActionsRequest = serde_json::from_value(json!({
        "role": "admin", "actor": {"id": 1}, "resource": "invoice"
    }))
    .unwrap();
    assert!(engine::allowed_actions(&policy, &req).unwrap().is_empty());
}

#[test]
fn membership_entry_point_agrees_with_enumeration() {
    let policy = admin_user_policy();

    for action in ["create", "read", "update", "delete", "export"] {
        for subject_id in [1, 2] {
            let req: CheckRequest = serde_json::from_value(json!({
                "role": "admin", "actor": {"id": 1}, "resource": "user",
                "subject": {"id": subject_id}, "action": action
            }))
            .unwrap();

            let allowed = engine::is_allowed(&policy, &req).unwrap();
            let actions = engine::allowed_actions(&policy, &ActionsRequest::from(&req)).unwrap();
            assert_eq!(allowed, actions.iter().any(|a| a == action));
            assert_eq!(allowed, engine::check(&policy, &req).unwrap().is_allowed);
        }
    }
}

#[test]
fn expression_rules_mirror_predicate_rules() {
    let predicate_policy = admin_user_policy();
    let expr_policy = compile_rules(vec![
        RuleDecl::new("admin", "user", "create"),
        RuleDecl::new("admin", "user", "delete").with_expr("actor.id != subject.id"),
        RuleDecl::new("admin", "user", "read"),
        RuleDecl::new("admin", "user", "update")
            .with_fields(&["name", "email", "password"])
            .with_expr("actor.id == subject.id"),
        RuleDecl::new("admin", "user", "update")
            .with_fields(&["name"])
            .with_expr("actor.id != subject.id"),
    ])
    .expect("expression policy should compile");

    for action in ["create", "read", "update", "delete"] {
        for subject_id in [1, 2] {
            let req: CheckRequest = serde_json::from_value(json!({
                "role": "admin", "actor": {"id": 1}, "resource": "user",
                "subject": {"id": subject_id}, "action": action
            }))
            .unwrap();
            assert_eq!(
                engine::check(&expr_policy, &req).unwrap(),
                engine::check(&predicate_policy, &req).unwrap(),
                "policies diverge for `{action}` with subject id {subject_id}"
            );
        }
    }
}
