//! Resolution-and-dispatch: from a pid value in the URL to a response.
//!
//! ```text
//! resolve ─┬─ does not exist / unregistered ──> 404
//!          ├─ deleted ───────────────────────> tombstone, 410
//!          ├─ missing object ────────────────> 500 (logged)
//!          ├─ redirected ──> endpoint named after the target type?
//!          │                   ├─ yes ──> 302
//!          │                   └─ no ───> 500 (logged)
//!          └─ registered ──> permission rule?
//!                              ├─ none / granted ──> view
//!                              ├─ denied, anonymous ──> 302 to login
//!                              └─ denied, logged in ──> 403
//! ```

use crate::core::registry::Endpoint;
use crate::core::routing::RouteParams;
use crate::core::ui::RecordsUi;
use crate::domain::model::{PersistentIdentifier, Record, RecordViewed, Request, Response};
use crate::domain::ports::UrlBuilder;
use crate::utils::error::{ErrorKind, PidError, RecordsUiError, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// What a view gets once the pid has resolved and access was granted.
pub struct ViewContext<'a> {
    pub endpoint: &'a str,
    pub pid: &'a PersistentIdentifier,
    pub record: &'a Record,
    pub template: &'a str,
    /// URL parameters other than `pid_value` (e.g. `format`, `filename`).
    pub params: &'a RouteParams,
    pub request: &'a Request,
}

#[async_trait]
pub trait RecordView: Send + Sync {
    async fn render(&self, ui: &RecordsUi, ctx: ViewContext<'_>) -> Result<Response>;
}

/// Sends `record-viewed`, then renders the endpoint template with `pid` and `record`.
pub struct DefaultView;

#[async_trait]
impl RecordView for DefaultView {
    async fn render(&self, ui: &RecordsUi, ctx: ViewContext<'_>) -> Result<Response> {
        ui.record_viewed().send(&RecordViewed {
            endpoint: ctx.endpoint.to_string(),
            pid: ctx.pid.clone(),
            record: ctx.record.clone(),
            viewed_at: chrono::Utc::now(),
        });

        let context = template_context(ctx.pid, ctx.record)?;
        let body = ui.templates().render(ctx.template, &Value::Object(context))?;
        Ok(Response::ok(body))
    }
}

/// `{"pid": {...}, "record": {...record data...}}`
pub fn template_context(
    pid: &PersistentIdentifier,
    record: &Record,
) -> Result<Map<String, Value>> {
    let mut context = Map::new();
    context.insert("pid".to_string(), serde_json::to_value(pid)?);
    context.insert("record".to_string(), serde_json::to_value(&record.data)?);
    Ok(context)
}

pub fn abort(kind: ErrorKind) -> Response {
    Response::status(kind.status_code())
}

pub async fn record_view(
    ui: &RecordsUi,
    endpoint: &Endpoint,
    request: &Request,
    params: &RouteParams,
) -> Result<Response> {
    let Some(pid_value) = params.get("pid_value") else {
        return Ok(abort(ErrorKind::NotFound));
    };

    let (pid, record) = match endpoint.resolver.resolve(pid_value).await {
        Ok(resolved) => resolved,
        Err(PidError::Deleted { pid, record }) => {
            return ui.tombstone(&pid, record.as_ref());
        }
        Err(PidError::Redirected { pid, destination }) => {
            return Ok(redirect(ui, &pid, &destination));
        }
        Err(PidError::Backend(e)) => return Err(e),
        Err(err) => {
            let kind = err.kind().unwrap_or(ErrorKind::NotFound);
            if kind.is_integrity_error() {
                tracing::error!(endpoint = %endpoint.name, pid_value = %pid_value, "{}", err);
            } else {
                tracing::debug!(endpoint = %endpoint.name, pid_value = %pid_value, "{}", err);
            }
            return Ok(abort(kind));
        }
    };

    match authorize(ui, endpoint, &record, request) {
        None => {}
        Some(ErrorKind::AuthRequired) => {
            let next = request.url();
            let login = ui
                .router()
                .build(ui.login_endpoint(), &[("next", next.as_str())])?;
            tracing::debug!(pid = %pid, login = %login, "login required");
            return Ok(Response::redirect(login));
        }
        Some(kind) => {
            tracing::debug!(pid = %pid, user = ?request.caller.user_id, "access denied");
            return Ok(abort(kind));
        }
    }

    endpoint
        .view
        .render(
            ui,
            ViewContext {
                endpoint: &endpoint.name,
                pid: &pid,
                record: &record,
                template: &endpoint.template,
                params,
                request,
            },
        )
        .await
}

/// Redirects go to the endpoint named exactly like the target's pid type.
fn redirect(
    ui: &RecordsUi,
    pid: &PersistentIdentifier,
    destination: &PersistentIdentifier,
) -> Response {
    let target = match ui.endpoint(&destination.pid_type) {
        Some(endpoint) => endpoint
            .route
            .build(&endpoint.name, &[("pid_value", destination.pid_value.as_str())]),
        None => Err(RecordsUiError::BuildError {
            endpoint: destination.pid_type.clone(),
            reason: "no records endpoint with this name".to_string(),
        }),
    };

    match target {
        Ok(location) => {
            tracing::debug!(pid = %pid, destination = %destination, "redirecting");
            Response::redirect(location)
        }
        Err(e) => {
            tracing::error!(
                pid = %pid,
                destination = %destination,
                error = %e,
                "Invalid redirect - pid_type '{}' endpoint missing.",
                destination.pid_type
            );
            abort(ErrorKind::ImpossibleRedirect)
        }
    }
}

/// `None` when the caller may see the record.
fn authorize(
    ui: &RecordsUi,
    endpoint: &Endpoint,
    record: &Record,
    request: &Request,
) -> Option<ErrorKind> {
    let Some(rule) = endpoint.permission.as_ref().or(ui.default_permission()) else {
        return None;
    };

    if rule(record, &request.caller) {
        None
    } else if request.caller.is_authenticated() {
        Some(ErrorKind::Forbidden)
    } else {
        Some(ErrorKind::AuthRequired)
    }
}
