//! Per-request command/query lifecycle: authorize, validate, execute, respond.

use std::fmt;

use switchyard_core::{RequestContext, RequestData};
use tracing::{debug, warn};

use super::domain::{DomainCommand, DomainQuery, Validatable};
use super::responder::{Responder, ResponseScope};
use super::response::{Outcome, Response};
use super::validator::Validator;

/// Where an operation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Created,
    Authorized,
    Forbidden,
    Validated,
    Invalid,
    Executed,
}

/// One command or query bound to this request's validator and responder.
///
/// The business action runs at most once, and only after authorization and
/// validation passed. The responder answers exactly once on every path;
/// errors raised by the business action propagate to the dispatcher
/// instead.
pub struct Operation<O: ?Sized> {
    inner: Box<O>,
    validator: Box<dyn Validator>,
    responder: Responder,
    state: OperationState,
}

impl<O: ?Sized + Validatable> Operation<O> {
    /// Wraps `inner`, validating `input` with the validator `inner` supplies
    /// and answering on `channel`.
    #[must_use]
    pub fn new(inner: Box<O>, input: RequestData, channel: impl Into<String>) -> Self {
        let validator = inner.validator(input);
        Self {
            inner,
            validator,
            responder: Responder::new(channel),
            state: OperationState::Created,
        }
    }

    #[must_use]
    pub fn state(&self) -> OperationState {
        self.state
    }

    #[must_use]
    pub fn inner(&self) -> &O {
        &self.inner
    }

    /// Resets the validator and applies every rule of the operation.
    ///
    /// Calling this again without changing the input gives the same verdict
    /// and messages.
    pub fn is_valid(&mut self) -> bool {
        self.validator.reset();
        self.inner.validate(self.validator.as_mut());
        self.validator.bool_result()
    }

    /// Messages from the most recent `is_valid` run.
    #[must_use]
    pub fn validation_messages(&self) -> &[String] {
        self.validator.messages()
    }

    pub fn responder_mut(&mut self) -> &mut Responder {
        &mut self.responder
    }

    fn authorize(&mut self, allowed: bool) -> bool {
        self.state = if allowed {
            OperationState::Authorized
        } else {
            OperationState::Forbidden
        };
        allowed
    }

    /// Runs validation and stages a bad request when it fails.
    fn validate_or_reject(&mut self) -> bool {
        if self.is_valid() {
            self.state = OperationState::Validated;
            return true;
        }
        self.state = OperationState::Invalid;
        debug!(messages = ?self.validator.messages(), "validation failed");
        self.responder.add_bad_request(self.validator.messages());
        false
    }

    fn reject_forbidden(&mut self) {
        self.responder.add(ResponseScope::All, Response::forbidden());
    }

    fn finish(self, outcome: Outcome) -> Response {
        let Self { responder, .. } = self;
        responder.respond().with_outcome(outcome)
    }
}

impl Operation<dyn DomainCommand> {
    /// Runs the command lifecycle and returns the single terminal response.
    ///
    /// # Errors
    ///
    /// Returns whatever error the command's `execute` raised.
    pub async fn run_command(mut self, context: &RequestContext) -> anyhow::Result<Response> {
        let allowed = (!self.inner.needs_logged_in_user() || context.is_authenticated())
            && self.inner.is_executable(context);

        if !self.authorize(allowed) {
            warn!(request_id = %context.request_id, "command not executable");
            self.reject_forbidden();
            return Ok(self.finish(Outcome::Forbidden));
        }
        if !self.validate_or_reject() {
            return Ok(self.finish(Outcome::Invalid));
        }

        self.inner.execute(&mut self.responder).await?;
        self.state = OperationState::Executed;
        Ok(self.finish(Outcome::Executed))
    }
}

impl Operation<dyn DomainQuery> {
    /// Runs the query lifecycle and returns the single terminal response.
    ///
    /// # Errors
    ///
    /// Returns whatever error the query's `query` raised.
    pub async fn run_query(mut self, context: &RequestContext) -> anyhow::Result<Response> {
        let allowed = !self.inner.needs_logged_in_user() || context.is_authenticated();

        if !self.authorize(allowed) {
            warn!(request_id = %context.request_id, "query needs a logged-in user");
            self.reject_forbidden();
            return Ok(self.finish(Outcome::Forbidden));
        }
        if !self.validate_or_reject() {
            return Ok(self.finish(Outcome::Invalid));
        }

        self.inner.query(&mut self.responder).await?;
        self.state = OperationState::Executed;
        Ok(self.finish(Outcome::Executed))
    }
}

impl<O: ?Sized> fmt::Debug for Operation<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("state", &self.state)
            .field("valid", &self.validator.bool_result())
            .field("messages", &self.validator.messages())
            .field("responder", &self.responder)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use http::StatusCode;
    use serde_json::json;
    use switchyard_core::Principal;

    use super::*;

    /// Command that records how often it ran.
    struct RenameCommand {
        executions: Arc<AtomicUsize>,
        needs_login: bool,
        executable: bool,
    }

    impl RenameCommand {
        fn new(executions: Arc<AtomicUsize>) -> Self {
            Self {
                executions,
                needs_login: false,
                executable: true,
            }
        }
    }

    impl Validatable for RenameCommand {
        fn validate(&self, validator: &mut dyn Validator) {
            validator.check_non_empty_string("name");
            validator.check_int_range("id", 1, 1000);
        }
    }

    #[async_trait]
    impl DomainCommand for RenameCommand {
        fn needs_logged_in_user(&self) -> bool {
            self.needs_login
        }

        fn is_executable(&self, _context: &RequestContext) -> bool {
            self.executable
        }

        async fn execute(&mut self, responder: &mut Responder) -> anyhow::Result<()> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            responder.add(ResponseScope::All, Response::ok_json(&json!({"renamed": true})));
            Ok(())
        }
    }

    struct ListQuery;

    impl Validatable for ListQuery {
        fn validate(&self, _validator: &mut dyn Validator) {}
    }

    #[async_trait]
    impl DomainQuery for ListQuery {
        fn needs_logged_in_user(&self) -> bool {
            true
        }

        async fn query(&mut self, responder: &mut Responder) -> anyhow::Result<()> {
            responder.add(ResponseScope::channel("json"), Response::ok_json(&json!([1, 2])));
            Ok(())
        }
    }

    fn command(
        command: RenameCommand,
        pairs: &[(&str, &str)],
    ) -> Operation<dyn DomainCommand> {
        Operation::new(
            Box::new(command) as Box<dyn DomainCommand>,
            RequestData::from_pairs(pairs.iter().copied()),
            "json",
        )
    }

    #[tokio::test]
    async fn valid_command_executes_once() {
        let executions = Arc::new(AtomicUsize::new(0));
        let op = command(
            RenameCommand::new(Arc::clone(&executions)),
            &[("name", "new"), ("id", "7")],
        );

        let resp = op.run_command(&RequestContext::default()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.outcome(), Outcome::Executed);
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_command_never_executes() {
        let executions = Arc::new(AtomicUsize::new(0));
        let mut op = command(RenameCommand::new(Arc::clone(&executions)), &[("id", "0")]);

        assert!(!op.is_valid());
        let expected = op.validation_messages().to_vec();

        let resp = op.run_command(&RequestContext::default()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.outcome(), Outcome::Invalid);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body, json!({ "messages": expected }));
        assert_eq!(executions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_executable_command_is_forbidden() {
        let executions = Arc::new(AtomicUsize::new(0));
        let mut inner = RenameCommand::new(Arc::clone(&executions));
        inner.executable = false;
        let op = command(inner, &[("name", "new"), ("id", "7")]);

        let resp = op.run_command(&RequestContext::default()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(resp.outcome(), Outcome::Forbidden);
        assert_eq!(executions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn login_requirement_checks_principal() {
        let executions = Arc::new(AtomicUsize::new(0));
        let mut inner = RenameCommand::new(Arc::clone(&executions));
        inner.needs_login = true;
        let anonymous = command(inner, &[("name", "new"), ("id", "7")]);
        let resp = anonymous
            .run_command(&RequestContext::default())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let mut inner = RenameCommand::new(Arc::clone(&executions));
        inner.needs_login = true;
        let logged_in = command(inner, &[("name", "new"), ("id", "7")]);
        let context = RequestContext::new("req-1", "json").with_principal(Principal {
            id: "user-1".to_string(),
            roles: Vec::new(),
        });
        let resp = logged_in.run_command(&context).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn revalidation_gives_identical_results() {
        let mut op = command(
            RenameCommand::new(Arc::new(AtomicUsize::new(0))),
            &[("name", ""), ("id", "abc")],
        );

        let first = op.is_valid();
        let first_messages = op.validation_messages().to_vec();
        let second = op.is_valid();

        assert!(!first);
        assert_eq!(first, second);
        assert_eq!(first_messages, op.validation_messages());
        assert_eq!(first_messages.len(), 2);
        assert_eq!(op.state(), OperationState::Created);
    }

    #[tokio::test]
    async fn business_error_propagates() {
        struct Exploding;

        impl Validatable for Exploding {
            fn validate(&self, _validator: &mut dyn Validator) {}
        }

        #[async_trait]
        impl DomainCommand for Exploding {
            fn needs_logged_in_user(&self) -> bool {
                false
            }

            async fn execute(&mut self, _responder: &mut Responder) -> anyhow::Result<()> {
                anyhow::bail!("ledger unavailable")
            }
        }

        let op: Operation<dyn DomainCommand> =
            Operation::new(Box::new(Exploding) as Box<dyn DomainCommand>, RequestData::new(), "json");
        let err = op.run_command(&RequestContext::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "ledger unavailable");
    }

    #[tokio::test]
    async fn query_answers_on_its_channel() {
        let context = RequestContext::new("req-2", "json").with_principal(Principal {
            id: "user-2".to_string(),
            roles: Vec::new(),
        });
        let op: Operation<dyn DomainQuery> =
            Operation::new(Box::new(ListQuery) as Box<dyn DomainQuery>, RequestData::new(), "json");
        let resp = op.run_query(&context).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let op: Operation<dyn DomainQuery> =
            Operation::new(Box::new(ListQuery) as Box<dyn DomainQuery>, RequestData::new(), "html");
        let resp = op.run_query(&context).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.outcome(), Outcome::Executed);
    }

    /// Validator that tags each message with the operation name.
    struct TaggedValidator {
        input: RequestData,
        messages: Vec<String>,
    }

    impl Validator for TaggedValidator {
        fn reset(&mut self) {
            self.messages.clear();
        }

        fn bool_result(&self) -> bool {
            self.messages.is_empty()
        }

        fn messages(&self) -> &[String] {
            &self.messages
        }

        fn input(&self) -> &RequestData {
            &self.input
        }

        fn check(&mut self, condition: bool, message: &str) -> bool {
            if !condition {
                self.messages.push(format!("rename: {message}"));
            }
            condition
        }
    }

    struct TaggedRename(RenameCommand);

    impl Validatable for TaggedRename {
        fn validator(&self, input: RequestData) -> Box<dyn Validator> {
            Box::new(TaggedValidator {
                input,
                messages: Vec::new(),
            })
        }

        fn validate(&self, validator: &mut dyn Validator) {
            self.0.validate(validator);
        }
    }

    #[async_trait]
    impl DomainCommand for TaggedRename {
        fn needs_logged_in_user(&self) -> bool {
            false
        }

        async fn execute(&mut self, responder: &mut Responder) -> anyhow::Result<()> {
            self.0.execute(responder).await
        }
    }

    #[tokio::test]
    async fn operation_runs_rules_through_supplied_validator() {
        let executions = Arc::new(AtomicUsize::new(0));
        let inner = TaggedRename(RenameCommand::new(Arc::clone(&executions)));
        let op: Operation<dyn DomainCommand> = Operation::new(
            Box::new(inner) as Box<dyn DomainCommand>,
            RequestData::from_pairs([("name", ""), ("id", "7")]),
            "json",
        );

        let resp = op.run_command(&RequestContext::default()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(
            body,
            json!({ "messages": ["rename: name must be a non-empty string"] })
        );
        assert_eq!(executions.load(Ordering::SeqCst), 0);

        let inner = TaggedRename(RenameCommand::new(Arc::clone(&executions)));
        let op: Operation<dyn DomainCommand> = Operation::new(
            Box::new(inner) as Box<dyn DomainCommand>,
            RequestData::from_pairs([("name", "new"), ("id", "7")]),
            "json",
        );
        let resp = op.run_command(&RequestContext::default()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }
}
