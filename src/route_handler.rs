use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::admin::{AdminAction, AdminError};
use crate::domain::booking::BookingError;
use crate::i18n::Language;
use crate::state::{ApplicationState, Session};
use crate::wizard::{WizardAction, WizardError};

#[derive(Debug, Deserialize)]
pub struct OpenSession {
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FareChange {
    pub amount: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogOp {
    Add,
    Edit,
    Delete,
}

/// Body of `POST /admin/routes` and `POST /admin/buses`.
#[derive(Debug, Deserialize)]
pub struct CatalogRequest {
    pub op: CatalogOp,
    #[serde(default)]
    pub id: Option<String>,
}

impl CatalogRequest {
    fn id(&self) -> Result<String, String> {
        self.id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| "an id is required to edit or delete".to_string())
    }

    fn route_action(&self) -> Result<AdminAction, String> {
        let route_id = || -> Result<u32, String> {
            let id = self.id()?;
            id.trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid route id `{id}`"))
        };
        Ok(match self.op {
            CatalogOp::Add => AdminAction::AddRoute,
            CatalogOp::Edit => AdminAction::EditRoute(route_id()?),
            CatalogOp::Delete => AdminAction::DeleteRoute(route_id()?),
        })
    }

    fn bus_action(&self) -> Result<AdminAction, String> {
        Ok(match self.op {
            CatalogOp::Add => AdminAction::AddBus,
            CatalogOp::Edit => AdminAction::EditBus(self.id()?),
            CatalogOp::Delete => AdminAction::DeleteBus(self.id()?),
        })
    }
}

pub async fn list_routes(State(state): State<ApplicationState>) -> Response {
    (StatusCode::OK, Json(state.catalog.routes().to_vec())).into_response()
}

// Breakdown of the fare currently on the admin fare board.
pub async fn breakdown_handler(
    Path(route_id): Path<u32>,
    State(state): State<ApplicationState>,
) -> Response {
    let board = state.fare_board.lock().await;
    match board.breakdown(route_id) {
        Ok(figures) => (StatusCode::OK, Json(figures)).into_response(),
        Err(err) => (StatusCode::NOT_FOUND, err.to_string()).into_response(),
    }
}

pub async fn update_fare_handler(
    Path(route_id): Path<u32>,
    State(state): State<ApplicationState>,
    Json(change): Json<FareChange>,
) -> Response {
    let mut board = state.fare_board.lock().await;
    let saved = board
        .edit_fare(route_id, change.amount)
        .and_then(|()| board.save(route_id));
    match saved {
        Ok(notification) => (StatusCode::OK, Json(notification)).into_response(),
        Err(err @ AdminError::UnknownRoute(_)) => {
            (StatusCode::NOT_FOUND, err.to_string()).into_response()
        }
        Err(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()).into_response(),
    }
}

pub async fn route_catalog_handler(
    State(state): State<ApplicationState>,
    Json(request): Json<CatalogRequest>,
) -> Response {
    catalog_response(&state, request.route_action()).await
}

pub async fn bus_catalog_handler(
    State(state): State<ApplicationState>,
    Json(request): Json<CatalogRequest>,
) -> Response {
    catalog_response(&state, request.bus_action()).await
}

// Route and bus maintenance is announced but not built: every well-formed
// request gets 501 and the "coming soon" notice.
async fn catalog_response(
    state: &ApplicationState,
    action: Result<AdminAction, String>,
) -> Response {
    let action = match action {
        Ok(action) => action,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };
    let board = state.fare_board.lock().await;
    match board.request(action) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => (
            StatusCode::NOT_IMPLEMENTED,
            Json(json!({
                "error": err.to_string(),
                "notification": board.coming_soon(),
            })),
        )
            .into_response(),
    }
}

pub async fn open_session_handler(
    State(state): State<ApplicationState>,
    Query(params): Query<OpenSession>,
) -> Response {
    let language = match params.language.as_deref().map(str::parse::<Language>) {
        Some(Ok(language)) => Some(language),
        Some(Err(err)) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        None => None,
    };

    match state.open_session(language).await {
        Ok((session_id, session)) => match session.wizard.view().await {
            Ok(view) => (
                StatusCode::CREATED,
                Json(json!({ "sessionId": session_id, "booking": view })),
            )
                .into_response(),
            Err(err) => error_response(&err),
        },
        Err(err) => error_response(&err),
    }
}

// Serves as our query endpoint to respond with the materialized `BookingView`
// for the requested session.
pub async fn query_handler(
    Path(session_id): Path<String>,
    State(state): State<ApplicationState>,
) -> Response {
    let session = match find_session(&state, &session_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };
    match session.wizard.view().await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(&err),
    }
}

// Serves as our command endpoint to move a session through the wizard.
pub async fn command_handler(
    Path(session_id): Path<String>,
    State(state): State<ApplicationState>,
    Json(action): Json<WizardAction>,
) -> Response {
    let session = match find_session(&state, &session_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };
    let result = session.wizard.dispatch(action).await;
    match result {
        Ok(()) => match session.wizard.view().await {
            Ok(view) => (StatusCode::OK, Json(view)).into_response(),
            Err(err) => error_response(&err),
        },
        Err(err) => error_response(&err),
    }
}

pub async fn close_session_handler(
    Path(session_id): Path<String>,
    State(state): State<ApplicationState>,
) -> Response {
    let Ok(uuid) = Uuid::parse_str(&session_id) else {
        return (StatusCode::BAD_REQUEST, "Invalid session ID format").into_response();
    };
    match state.close_session(&uuid).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}

pub async fn notifications_handler(
    Path(session_id): Path<String>,
    State(state): State<ApplicationState>,
) -> Response {
    match find_session(&state, &session_id).await {
        Ok(session) => (StatusCode::OK, Json(session.drain_notifications().await)).into_response(),
        Err(response) => response,
    }
}

pub async fn receipt_handler(
    Path(session_id): Path<String>,
    State(state): State<ApplicationState>,
) -> Response {
    let session = match find_session(&state, &session_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };
    match session.wizard.receipt().await {
        Ok(Some(receipt)) => (
            StatusCode::OK,
            Json(json!({
                "scanCode": receipt.scan_code(),
                "text": receipt.to_string(),
                "receipt": receipt,
            })),
        )
            .into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Booking has not been paid for").into_response(),
        Err(err) => error_response(&err),
    }
}

async fn find_session(
    state: &ApplicationState,
    session_id: &str,
) -> Result<Arc<Session>, Response> {
    // Parse the session_id as UUID
    let Ok(uuid) = Uuid::parse_str(session_id) else {
        return Err((StatusCode::BAD_REQUEST, "Invalid session ID format").into_response());
    };
    state
        .session(&uuid)
        .await
        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())
}

fn error_response(err: &WizardError) -> Response {
    let status = match err {
        WizardError::Busy => StatusCode::CONFLICT,
        WizardError::SessionMissing | WizardError::Booking(BookingError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        WizardError::Booking(BookingError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        WizardError::Booking(BookingError::Settlement(_) | BookingError::RefundFailed(_)) => {
            StatusCode::BAD_GATEWAY
        }
        WizardError::Booking(_) => StatusCode::BAD_REQUEST,
        WizardError::Store(_) => {
            tracing::error!(error = %err, "event store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::Settings;
    use crate::domain::payment::ValidationError;
    use crate::services::payment_gateway::GatewayError;
    use crate::state::new_application_state;

    fn state() -> ApplicationState {
        new_application_state(&Settings {
            settle_delay: Duration::ZERO,
            refund_delay: Duration::ZERO,
            ..Settings::default()
        })
        .unwrap()
    }

    fn catalog_request(op: CatalogOp, id: Option<&str>) -> CatalogRequest {
        CatalogRequest {
            op,
            id: id.map(str::to_string),
        }
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn catalog_requests_name_an_admin_action() {
        assert_eq!(
            catalog_request(CatalogOp::Add, None).route_action(),
            Ok(AdminAction::AddRoute)
        );
        assert_eq!(
            catalog_request(CatalogOp::Delete, Some(" 3 ")).route_action(),
            Ok(AdminAction::DeleteRoute(3))
        );
        assert_eq!(
            catalog_request(CatalogOp::Edit, Some("RJ-14")).bus_action(),
            Ok(AdminAction::EditBus("RJ-14".to_string()))
        );
        assert!(catalog_request(CatalogOp::Edit, Some("abc")).route_action().is_err());
        assert!(catalog_request(CatalogOp::Delete, Some("  ")).bus_action().is_err());
    }

    #[tokio::test]
    async fn catalog_maintenance_answers_not_implemented() {
        let state = state();
        let response = route_catalog_handler(
            State(state.clone()),
            Json(catalog_request(CatalogOp::Edit, Some("2"))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        let body = body_text(response).await;
        assert!(body.contains("Feature Coming Soon"));
        assert!(body.contains("edit route 2 is not implemented"));

        let response =
            bus_catalog_handler(State(state.clone()), Json(catalog_request(CatalogOp::Add, None)))
                .await;
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);

        let response = bus_catalog_handler(
            State(state),
            Json(catalog_request(CatalogOp::Delete, None)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn closed_sessions_are_gone() {
        let state = state();
        let (session_id, _) = state.open_session(None).await.unwrap();
        let id = session_id.to_string();

        let closed = close_session_handler(Path(id.clone()), State(state.clone())).await;
        assert_eq!(closed.status(), StatusCode::NO_CONTENT);

        let read = query_handler(Path(id.clone()), State(state.clone())).await;
        assert_eq!(read.status(), StatusCode::NOT_FOUND);
        let again = close_session_handler(Path(id), State(state.clone())).await;
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
        let malformed = close_session_handler(Path("nope".to_string()), State(state)).await;
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn errors_map_to_statuses() {
        let cases = [
            (WizardError::Busy, StatusCode::CONFLICT),
            (WizardError::SessionMissing, StatusCode::NOT_FOUND),
            (
                WizardError::Booking(BookingError::Validation(ValidationError::UnknownBank(
                    "xyz".to_string(),
                ))),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                WizardError::Booking(BookingError::Settlement(GatewayError::Timeout)),
                StatusCode::BAD_GATEWAY,
            ),
            (
                WizardError::Booking(BookingError::NotPaid),
                StatusCode::BAD_REQUEST,
            ),
            (
                WizardError::Store("lost".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(error_response(&err).status(), status);
        }
    }
}
