use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PolicyError {
    #[error("Invalid rule declaration: {0}")]
    #[diagnostic(
        code(warden::invalid_rule),
        help("Every rule must declare non-empty `role`, `resource`, and `action` identifiers")
    )]
    InvalidRule(String),

    #[error("Invalid condition expression: {0}")]
    #[diagnostic(
        code(warden::invalid_condition),
        help("Supported operators: ==, !=, >, <, >=, <=, &&, ||, !, in. Paths are rooted at `actor` or `subject` (e.g. actor.id)")
    )]
    InvalidCondition(String),
}
