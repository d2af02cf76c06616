use std::sync::Arc;

use axum::{
    async_trait,
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::attachments::AttachmentUpload;
use super::domain::{ApplicationId, ApplicationStatus, UserId};
use super::repository::{BlobStore, RegistryStore};
use super::service::{NewApplication, NewUser, RegistryService, ServiceError, StatusUpdate};
use super::sms::SmsGateway;
use crate::error::AppError;

pub const USER_HEADER: &str = "x-registry-user";
pub const ROLE_HEADER: &str = "x-registry-role";
pub const STAFF_ROLE: &str = "staff";

type SharedService<R, B, S> = Arc<RegistryService<R, B, S>>;

/// Router exposing registration, applications, tracking and notifications.
pub fn registry_router<R, B, S>(service: SharedService<R, B, S>) -> Router
where
    R: RegistryStore + 'static,
    B: BlobStore + 'static,
    S: SmsGateway + 'static,
{
    let upload_limit = usize::try_from(service.settings().max_upload_bytes).unwrap_or(usize::MAX);

    Router::new()
        .route("/api/v1/users", post(register_handler::<R, B, S>))
        .route("/api/v1/users/me/sms", patch(sms_preference_handler::<R, B, S>))
        .route(
            "/api/v1/applications",
            post(create_handler::<R, B, S>).get(list_handler::<R, B, S>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            patch(update_status_handler::<R, B, S>),
        )
        .route(
            "/api/v1/applications/:application_id/qr",
            post(qr_handler::<R, B, S>),
        )
        .route(
            "/api/v1/applications/:application_id/attachments",
            post(attachment_handler::<R, B, S>).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/track", get(track_handler::<R, B, S>))
        .route("/api/v1/notifications", get(notifications_handler::<R, B, S>))
        .with_state(service)
}

/// Caller identity forwarded by the upstream auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user: UserId,
    pub is_staff: bool,
}

impl Identity {
    fn require_staff(&self) -> Result<(), Response> {
        if self.is_staff {
            Ok(())
        } else {
            Err(error_response(StatusCode::FORBIDDEN, "staff access required"))
        }
    }
}

#[async_trait]
impl<St> FromRequestParts<St> for Identity
where
    St: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(UserId)
            .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "authentication required"))?;

        let is_staff = parts
            .headers
            .get(ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|role| role.trim().eq_ignore_ascii_case(STAFF_ROLE));

        Ok(Self { user, is_staff })
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn service_failure(error: ServiceError) -> Response {
    AppError::from(error).into_response()
}

fn parse_status(raw: &str) -> Result<ApplicationStatus, Response> {
    raw.parse::<ApplicationStatus>()
        .map_err(|err| error_response(StatusCode::UNPROCESSABLE_ENTITY, &err.to_string()))
}

pub(crate) async fn register_handler<R, B, S>(
    State(service): State<SharedService<R, B, S>>,
    Json(request): Json<NewUser>,
) -> Response
where
    R: RegistryStore + 'static,
    B: BlobStore + 'static,
    S: SmsGateway + 'static,
{
    match service.register_user(request).await {
        Ok(registration) => (StatusCode::CREATED, Json(registration)).into_response(),
        Err(err) => service_failure(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SmsPreference {
    enabled: bool,
}

pub(crate) async fn sms_preference_handler<R, B, S>(
    State(service): State<SharedService<R, B, S>>,
    identity: Identity,
    Json(preference): Json<SmsPreference>,
) -> Response
where
    R: RegistryStore + 'static,
    B: BlobStore + 'static,
    S: SmsGateway + 'static,
{
    match service.set_sms_notifications(&identity.user, preference.enabled) {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(err) => service_failure(err),
    }
}

pub(crate) async fn create_handler<R, B, S>(
    State(service): State<SharedService<R, B, S>>,
    identity: Identity,
    Json(request): Json<NewApplication>,
) -> Response
where
    R: RegistryStore + 'static,
    B: BlobStore + 'static,
    S: SmsGateway + 'static,
{
    match service.create_application(&identity.user, request).await {
        Ok(submission) => (StatusCode::CREATED, Json(submission)).into_response(),
        Err(err) => service_failure(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    status: Option<String>,
}

pub(crate) async fn list_handler<R, B, S>(
    State(service): State<SharedService<R, B, S>>,
    identity: Identity,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: RegistryStore + 'static,
    B: BlobStore + 'static,
    S: SmsGateway + 'static,
{
    let status = match query.status.as_deref().map(parse_status).transpose() {
        Ok(status) => status,
        Err(rejection) => return rejection,
    };

    let listed = if identity.is_staff {
        service.applications(status)
    } else {
        service.applications_for(&identity.user).map(|applications| {
            applications
                .into_iter()
                .filter(|application| status.map_or(true, |wanted| application.status == wanted))
                .collect()
        })
    };

    match listed {
        Ok(applications) => (StatusCode::OK, Json(applications)).into_response(),
        Err(err) => service_failure(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusBody {
    status: String,
    #[serde(default)]
    rejection_reason: Option<String>,
}

pub(crate) async fn update_status_handler<R, B, S>(
    State(service): State<SharedService<R, B, S>>,
    identity: Identity,
    Path(application_id): Path<Uuid>,
    Json(body): Json<StatusBody>,
) -> Response
where
    R: RegistryStore + 'static,
    B: BlobStore + 'static,
    S: SmsGateway + 'static,
{
    if let Err(rejection) = identity.require_staff() {
        return rejection;
    }
    let status = match parse_status(&body.status) {
        Ok(status) => status,
        Err(rejection) => return rejection,
    };

    let update = StatusUpdate {
        status,
        rejection_reason: body.rejection_reason,
    };
    match service
        .update_status(&ApplicationId(application_id), update)
        .await
    {
        Ok(change) => (StatusCode::OK, Json(change)).into_response(),
        Err(err) => service_failure(err),
    }
}

pub(crate) async fn qr_handler<R, B, S>(
    State(service): State<SharedService<R, B, S>>,
    identity: Identity,
    Path(application_id): Path<Uuid>,
) -> Response
where
    R: RegistryStore + 'static,
    B: BlobStore + 'static,
    S: SmsGateway + 'static,
{
    if let Err(rejection) = identity.require_staff() {
        return rejection;
    }
    match service.ensure_qr_code(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => service_failure(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttachmentQuery {
    file_name: String,
    #[serde(default)]
    description: String,
}

pub(crate) async fn attachment_handler<R, B, S>(
    State(service): State<SharedService<R, B, S>>,
    identity: Identity,
    Path(application_id): Path<Uuid>,
    Query(query): Query<AttachmentQuery>,
    body: Bytes,
) -> Response
where
    R: RegistryStore + 'static,
    B: BlobStore + 'static,
    S: SmsGateway + 'static,
{
    let id = ApplicationId(application_id);
    let application = match service.application(&id) {
        Ok(application) => application,
        Err(err) => return service_failure(err),
    };
    if !identity.is_staff && application.applicant != identity.user {
        return error_response(StatusCode::FORBIDDEN, "not your application");
    }

    let upload = AttachmentUpload {
        file_name: query.file_name,
        description: query.description,
        bytes: body.to_vec(),
    };
    match service.add_attachment(&id, upload) {
        Ok(attachment) => (StatusCode::CREATED, Json(attachment)).into_response(),
        Err(err) => service_failure(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackQuery {
    #[serde(rename = "ref", default)]
    reference: String,
}

pub(crate) async fn track_handler<R, B, S>(
    State(service): State<SharedService<R, B, S>>,
    Query(query): Query<TrackQuery>,
) -> Response
where
    R: RegistryStore + 'static,
    B: BlobStore + 'static,
    S: SmsGateway + 'static,
{
    match service.track(&query.reference) {
        Ok(Some(view)) => (StatusCode::OK, Json(view)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Application not found." })),
        )
            .into_response(),
        Err(ServiceError::Validation(message)) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "detail": message }))).into_response()
        }
        Err(err) => service_failure(err),
    }
}

pub(crate) async fn notifications_handler<R, B, S>(
    State(service): State<SharedService<R, B, S>>,
    identity: Identity,
) -> Response
where
    R: RegistryStore + 'static,
    B: BlobStore + 'static,
    S: SmsGateway + 'static,
{
    match service.list_notifications(&identity.user) {
        Ok(notifications) => (StatusCode::OK, Json(notifications)).into_response(),
        Err(err) => service_failure(err),
    }
}
