//! Validation state for a single operation: a boolean verdict plus the
//! messages explaining it.

use regex::Regex;
use switchyard_core::{RequestData, RequestValue};

/// The contract every operation validator satisfies.
///
/// After `reset` the verdict is `true` and there are no messages. Rules only
/// ever move the verdict to `false`, so a validator that is reset and run
/// again over the same input reaches the same verdict and messages.
///
/// Implementors supply the state; the `check_*` rules are provided on top of
/// [`check`](Self::check). Each rule evaluates one condition over
/// [`input`](Self::input), records a message when it fails and returns
/// whether it passed.
pub trait Validator: Send + Sync {
    fn reset(&mut self);

    fn bool_result(&self) -> bool;

    fn messages(&self) -> &[String];

    /// The merged request parameters the rules read.
    fn input(&self) -> &RequestData;

    /// Records `message` unless `condition` holds.
    fn check(&mut self, condition: bool, message: &str) -> bool;

    /// `key` is present, whatever its value.
    fn check_required(&mut self, key: &str) -> bool {
        let present = self.input().get(key).is_some();
        self.check(present, &format!("{key} is required"))
    }

    /// `key` is a string that is not blank.
    fn check_non_empty_string(&mut self, key: &str) -> bool {
        let ok = self
            .input()
            .get_str(key)
            .is_some_and(|value| !value.trim().is_empty());
        self.check(ok, &format!("{key} must be a non-empty string"))
    }

    /// `key` is a string matched in full by `pattern`.
    ///
    /// `pattern` is tested anchored at both ends, so any alternative that
    /// spans the whole value counts.
    fn check_matches(&mut self, key: &str, pattern: &Regex) -> bool {
        let anchored = Regex::new(&format!("^(?:{})$", pattern.as_str()));
        let ok = match (anchored, self.input().get_str(key)) {
            (Ok(anchored), Some(value)) => anchored.is_match(value),
            _ => false,
        };
        self.check(ok, &format!("{key} has an invalid format"))
    }

    /// `key` is one of `allowed`.
    fn check_one_of(&mut self, key: &str, allowed: &[&str]) -> bool {
        let ok = self
            .input()
            .get_str(key)
            .is_some_and(|value| allowed.contains(&value));
        self.check(ok, &format!("{key} must be one of: {}", allowed.join(", ")))
    }

    /// `key` parses as an integer within `min..=max`.
    fn check_int_range(&mut self, key: &str, min: i64, max: i64) -> bool {
        let ok = self
            .input()
            .get_str(key)
            .and_then(|value| value.trim().parse::<i64>().ok())
            .is_some_and(|n| (min..=max).contains(&n));
        self.check(ok, &format!("{key} must be an integer between {min} and {max}"))
    }

    /// `key` holds a list of values.
    fn check_list(&mut self, key: &str) -> bool {
        let ok = matches!(self.input().get(key), Some(RequestValue::List(_)));
        self.check(ok, &format!("{key} must be a list"))
    }
}

/// Default validator: collects every failed rule's message in order.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    input: RequestData,
    messages: Vec<String>,
    valid: bool,
}

impl RequestValidator {
    #[must_use]
    pub fn new(input: RequestData) -> Self {
        Self {
            input,
            messages: Vec::new(),
            valid: true,
        }
    }
}

impl Validator for RequestValidator {
    fn reset(&mut self) {
        self.valid = true;
        self.messages.clear();
    }

    fn bool_result(&self) -> bool {
        self.valid
    }

    fn messages(&self) -> &[String] {
        &self.messages
    }

    fn input(&self) -> &RequestData {
        &self.input
    }

    fn check(&mut self, condition: bool, message: &str) -> bool {
        if !condition {
            self.valid = false;
            self.messages.push(message.to_string());
        }
        condition
    }
}
