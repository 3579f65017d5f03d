//! Rule derivation and evaluation.

mod builder;
mod messages;
mod rules;
mod validator;

pub use builder::{RuleSources, attribute_rules, pre_validation_value};
pub use messages::MessageBag;
pub use rules::Rule;
pub use validator::Validator;
