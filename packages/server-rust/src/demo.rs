//! Example operations and routes served by the `switchyard-demo` binary.
//!
//! Routes:
//! - `GET /` -- lists registered operations
//! - `GET /notes/{id}` -- one note by index
//! - `{GET,POST} /{domain}/{operation}` -- any registered query or command

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::json;
use switchyard_core::{Pattern, PatternError, RequestContext, Route, RouteGroup, RouteTable};

use crate::service::{
    read_fn, CommandHandler, DomainCommand, DomainQuery, OperationKey, OperationRegistry,
    QueryHandler, ReadHandler, RequestRouter, Responder, Response, ResponseScope, Validatable,
    Validator, WriteHandler,
};

const OPERATION_URI: &str = "/(?P<domain>[a-z_]+)/(?P<operation>[a-z_]+)";

/// Role allowed to clear the note list.
pub const ADMIN_ROLE: &str = "admin";

/// In-memory note list shared by the note operations.
pub type NoteStore = Arc<RwLock<Vec<String>>>;

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// `demo/echo`: returns `message`; open to anonymous callers.
struct EchoCommand {
    message: String,
}

impl Validatable for EchoCommand {
    fn validate(&self, validator: &mut dyn Validator) {
        validator.check_non_empty_string("message");
    }
}

#[async_trait]
impl DomainCommand for EchoCommand {
    fn needs_logged_in_user(&self) -> bool {
        false
    }

    async fn execute(&mut self, responder: &mut Responder) -> anyhow::Result<()> {
        responder.add(
            ResponseScope::All,
            Response::ok_json(&json!({ "message": self.message })),
        );
        Ok(())
    }
}

/// `notes/add`: appends a note; needs a logged-in caller.
struct AddNoteCommand {
    store: NoteStore,
    text: String,
}

impl Validatable for AddNoteCommand {
    fn validate(&self, validator: &mut dyn Validator) {
        if validator.check_non_empty_string("text") {
            let short = validator
                .input()
                .get_str("text")
                .is_some_and(|text| text.chars().count() <= 280);
            validator.check(short, "text must be at most 280 characters");
        }
    }
}

#[async_trait]
impl DomainCommand for AddNoteCommand {
    async fn execute(&mut self, responder: &mut Responder) -> anyhow::Result<()> {
        let id = {
            let mut notes = self.store.write();
            notes.push(std::mem::take(&mut self.text));
            notes.len() - 1
        };
        responder.add(ResponseScope::All, Response::ok_json(&json!({ "id": id })));
        Ok(())
    }
}

/// `notes/clear`: empties the list; admins only.
struct ClearNotesCommand {
    store: NoteStore,
}

impl Validatable for ClearNotesCommand {
    fn validate(&self, _validator: &mut dyn Validator) {}
}

#[async_trait]
impl DomainCommand for ClearNotesCommand {
    fn is_executable(&self, context: &RequestContext) -> bool {
        context
            .principal
            .as_ref()
            .is_some_and(|principal| principal.has_role(ADMIN_ROLE))
    }

    async fn execute(&mut self, _responder: &mut Responder) -> anyhow::Result<()> {
        self.store.write().clear();
        Ok(())
    }
}

/// `notes/list`: every note, optionally the first `limit`.
struct ListNotesQuery {
    store: NoteStore,
    limit: Option<usize>,
}

impl Validatable for ListNotesQuery {
    fn validate(&self, validator: &mut dyn Validator) {
        if validator.input().get("limit").is_some() {
            validator.check_int_range("limit", 1, 100);
        }
    }
}

#[async_trait]
impl DomainQuery for ListNotesQuery {
    async fn query(&mut self, responder: &mut Responder) -> anyhow::Result<()> {
        let page: Vec<String> = {
            let notes = self.store.read();
            notes.iter().take(self.limit.unwrap_or(notes.len())).cloned().collect()
        };
        responder.add(
            ResponseScope::channel("text"),
            Response::text(http::StatusCode::OK, page.join("\n")),
        );
        responder.add(ResponseScope::All, Response::ok_json(&json!({ "notes": page })));
        Ok(())
    }
}

/// `system/ping`.
struct PingQuery;

impl Validatable for PingQuery {
    fn validate(&self, _validator: &mut dyn Validator) {}
}

#[async_trait]
impl DomainQuery for PingQuery {
    async fn query(&mut self, responder: &mut Responder) -> anyhow::Result<()> {
        responder.add(ResponseScope::All, Response::ok_json(&json!({ "pong": true })));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Registers the demo operations against `store`.
#[must_use]
pub fn registry(store: &NoteStore) -> Arc<OperationRegistry> {
    let registry = Arc::new(OperationRegistry::new());

    registry.register_query(OperationKey::new("system", "ping"), |_request| Ok(PingQuery));
    registry.register_command(OperationKey::new("demo", "echo"), |request| {
        Ok(EchoCommand {
            message: request.get_str("message").unwrap_or_default().to_string(),
        })
    });

    let add_store = Arc::clone(store);
    registry.register_command(OperationKey::new("notes", "add"), move |request| {
        Ok(AddNoteCommand {
            store: Arc::clone(&add_store),
            text: request.get_str("text").unwrap_or_default().to_string(),
        })
    });
    let clear_store = Arc::clone(store);
    registry.register_command(OperationKey::new("notes", "clear"), move |_request| {
        Ok(ClearNotesCommand {
            store: Arc::clone(&clear_store),
        })
    });
    let list_store = Arc::clone(store);
    registry.register_query(OperationKey::new("notes", "list"), move |request| {
        Ok(ListNotesQuery {
            store: Arc::clone(&list_store),
            limit: request.get_str("limit").and_then(|limit| limit.parse().ok()),
        })
    });

    registry
}

/// Builds the demo request router.
///
/// # Errors
///
/// Returns an error if a route pattern fails to compile.
pub fn router(
    registry: &Arc<OperationRegistry>,
    store: &NoteStore,
) -> Result<RequestRouter, PatternError> {
    let index_registry = Arc::clone(registry);
    let index: ReadHandler = read_fn(move |_request| {
        let operations: Vec<String> = index_registry
            .registered()
            .into_iter()
            .map(|(side, key)| format!("{} {key}", side.as_str()))
            .collect();
        async move {
            Ok::<_, anyhow::Error>(Response::ok_json(&json!({ "operations": operations })))
        }
    });

    let note_store = Arc::clone(store);
    let note_by_id: ReadHandler = read_fn(move |request| {
        let note = request
            .uri_params()
            .get("id")
            .and_then(|id| id.parse::<usize>().ok())
            .and_then(|id| note_store.read().get(id).cloned());
        async move {
            Ok::<_, anyhow::Error>(match note {
                Some(text) => Response::ok_json(&json!({ "text": text })),
                None => Response::not_found(),
            })
        }
    });

    let queries = QueryHandler::from_uri(Arc::clone(registry));
    let notes = RouteGroup::new(Pattern::named_regex("/notes(/.*)?")?)
        .add_route(Route::new(Pattern::named_regex(r"/notes/(?P<id>\d+)")?, note_by_id))
        .add_route(queries.clone().route(Pattern::named_regex(OPERATION_URI)?));

    let read_routes = RouteTable::new()
        .route(Route::new(Pattern::literal("/"), index))
        .route(notes)
        .route(queries.route(Pattern::named_regex(OPERATION_URI)?));

    let write_routes: RouteTable<WriteHandler> = RouteTable::new().route(
        CommandHandler::from_uri(Arc::clone(registry)).route(Pattern::named_regex(OPERATION_URI)?),
    );

    Ok(RequestRouter::builder()
        .read_routes(read_routes)
        .write_routes(write_routes)
        .build())
}
