//! Warden - attribute-aware authorization decision core.
//!
//! A rule set binds (role, resource, action) triples to optional conditions
//! over an actor and a subject, plus an optional list of permitted fields.
//! [`compile::compile_rules`] folds the declarations into an immutable
//! [`types::PolicyIndex`] once; the [`engine`] then answers two questions
//! against it: "may this actor perform this action on this subject?" and
//! "which actions may this actor perform on this subject at all?".
//!
//! The index is never mutated after compilation, so it can be shared
//! read-only across threads. The crate is a decision core only: it does not
//! manage roles, load policy from storage, authenticate anyone, or enforce
//! its answers.

pub mod compile;
pub mod condition;
pub mod engine;
pub mod errors;
pub mod types;
