//! # API REST
//!
//! REST API implementation for Koderstore.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, multipart uploads, CORS, request tracing)
//!
//! Uses `api-shared` for common types and session verification. Every handler is a thin wrapper
//! over [`StorageService`]; authorization and path validation happen there.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod session;

use api_shared::{
    DeleteFileRes, ErrorRes, HealthRes, HealthService, ListFilesRes, NamespaceSummaryRes,
    PrincipalRes, SaveFileReq, SessionVerifier, UsageRes, WriteFileRes,
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path as AxumPath, Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use koderstore_core::{FileDownload, NamespaceAccess, PrincipalId, StorageError, StorageService};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;
pub use session::Session;

/// Largest request body accepted by the upload endpoint (the contents API refuses files above
/// 100 MB anyway).
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Application state for the REST API server
///
/// Holds the storage service and the session verifier shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StorageService>,
    pub sessions: Arc<SessionVerifier>,
}

impl AppState {
    pub fn new(service: StorageService, sessions: SessionVerifier) -> Self {
        Self {
            service: Arc::new(service),
            sessions: Arc::new(sessions),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        current_user,
        list_files,
        upload_file,
        save_file,
        delete_file,
        download_file,
        preview_file,
        storage_usage,
        admin_users,
        admin_user_files,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        PrincipalRes,
        ListFilesRes,
        api_shared::FileItemRes,
        SaveFileReq,
        WriteFileRes,
        DeleteFileRes,
        UsageRes,
        NamespaceSummaryRes,
        UploadForm,
    ))
)]
pub struct ApiDoc;

/// Builds the full router: API routes, Swagger UI, CORS and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/user", get(current_user))
        .route("/api/files", get(list_files))
        .route("/api/files", delete(delete_file))
        .route(
            "/api/files/upload",
            post(upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/files/save", post(save_file))
        .route("/api/files/download", get(download_file))
        .route("/api/files/preview", get(preview_file))
        .route("/api/storage/usage", get(storage_usage))
        .route("/api/admin/users", get(admin_users))
        .route("/api/admin/user/:id/files", get(admin_user_files))
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DirQuery {
    /// Directory relative to the namespace root; omit for the root.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FileQuery {
    /// File path relative to the namespace root.
    pub file: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteQuery {
    /// File path relative to the namespace root.
    pub file: String,
    /// Version token from the listing; omit to delete whatever is current.
    pub sha: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PreviewQuery {
    /// File path relative to the namespace root.
    pub file: String,
    /// Set to `true` to read another principal's namespace as an administrator.
    #[serde(default)]
    pub admin: bool,
    /// Target principal for an administrator read.
    pub user: Option<String>,
}

/// Multipart body of an upload (documentation only).
#[derive(Deserialize, ToSchema)]
#[allow(dead_code)]
#[serde(rename_all = "camelCase")]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    /// Destination path inside the namespace; defaults to the uploaded file's name.
    relative_path: Option<String>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler(state = AppState)]
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/api/auth/user",
    responses(
        (status = 200, description = "Signed-in principal", body = PrincipalRes),
        (status = 401, description = "No valid session", body = ErrorRes)
    )
)]
/// Returns the principal of the current session.
#[axum::debug_handler(state = AppState)]
async fn current_user(session: Session) -> Result<Json<PrincipalRes>, ApiError> {
    let principal = session.principal().ok_or(StorageError::Unauthenticated)?;
    Ok(Json(PrincipalRes::from(principal)))
}

#[utoipa::path(
    get,
    path = "/api/files",
    params(DirQuery),
    responses(
        (status = 200, description = "One directory level of the caller's namespace", body = ListFilesRes),
        (status = 400, description = "Invalid directory", body = ErrorRes),
        (status = 401, description = "No valid session", body = ErrorRes),
        (status = 502, description = "Contents API unavailable", body = ErrorRes)
    )
)]
/// Lists the caller's files.
///
/// A namespace that has never been written lists as empty.
#[axum::debug_handler]
async fn list_files(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<DirQuery>,
) -> Result<Json<ListFilesRes>, ApiError> {
    let items = state
        .service
        .list_namespace(
            session.principal(),
            &NamespaceAccess::own(),
            query.path.as_deref(),
        )
        .await?;
    Ok(Json(items.into()))
}

#[utoipa::path(
    post,
    path = "/api/files/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored", body = WriteFileRes),
        (status = 400, description = "Missing file or invalid path", body = ErrorRes),
        (status = 401, description = "No valid session", body = ErrorRes),
        (status = 409, description = "File changed concurrently", body = ErrorRes),
        (status = 502, description = "Contents API unavailable", body = ErrorRes)
    )
)]
/// Uploads a file into the caller's namespace.
///
/// # Arguments
/// * `file` - multipart part holding the bytes; its filename is used when `relativePath` is absent
/// * `relativePath` - optional destination path, which lets folder uploads keep their structure
///
/// # Errors
/// Returns `400 Bad Request` if the body has no `file` part or the multipart stream is invalid.
#[axum::debug_handler]
async fn upload_file(
    State(state): State<AppState>,
    session: Session,
    mut multipart: Multipart,
) -> Result<Json<WriteFileRes>, ApiError> {
    // Reject anonymous callers before reading the body.
    if session.principal().is_none() {
        return Err(StorageError::Unauthenticated.into());
    }

    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut relative_path: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let field_name = field.name().map(str::to_owned);
        match field_name.as_deref() {
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                upload = Some((name, bytes.to_vec()));
            }
            Some("relativePath") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                relative_path = Some(text).filter(|t| !t.trim().is_empty());
            }
            _ => {}
        }
    }

    let (file_name, bytes) = upload.ok_or_else(|| ApiError::BadRequest("No file provided".into()))?;
    let name = relative_path.unwrap_or(file_name);

    let receipt = state
        .service
        .write_file(session.principal(), &name, &bytes, None)
        .await?;
    Ok(Json(receipt.into()))
}

#[utoipa::path(
    post,
    path = "/api/files/save",
    request_body = SaveFileReq,
    responses(
        (status = 200, description = "File saved", body = WriteFileRes),
        (status = 400, description = "Invalid path", body = ErrorRes),
        (status = 401, description = "No valid session", body = ErrorRes),
        (status = 409, description = "Version token is stale", body = ErrorRes),
        (status = 502, description = "Contents API unavailable", body = ErrorRes)
    )
)]
/// Saves edited text content over a file in the caller's namespace.
///
/// With `sha` the save only succeeds if the file is still at that version.
#[axum::debug_handler]
async fn save_file(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<SaveFileReq>,
) -> Result<Json<WriteFileRes>, ApiError> {
    let receipt = state
        .service
        .write_file(
            session.principal(),
            &req.file_name,
            req.content.as_bytes(),
            req.sha.as_deref(),
        )
        .await?;
    Ok(Json(receipt.into()))
}

#[utoipa::path(
    delete,
    path = "/api/files",
    params(DeleteQuery),
    responses(
        (status = 200, description = "File deleted", body = DeleteFileRes),
        (status = 401, description = "No valid session", body = ErrorRes),
        (status = 404, description = "No such file", body = ErrorRes),
        (status = 409, description = "Version token is stale", body = ErrorRes)
    )
)]
/// Deletes a file from the caller's namespace.
#[axum::debug_handler]
async fn delete_file(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<DeleteFileRes>, ApiError> {
    state
        .service
        .delete_file(session.principal(), &query.file, query.sha.as_deref())
        .await?;
    Ok(Json(DeleteFileRes { success: true }))
}

#[utoipa::path(
    get,
    path = "/api/files/download",
    params(FileQuery),
    responses(
        (status = 200, description = "File bytes as an attachment"),
        (status = 401, description = "No valid session", body = ErrorRes),
        (status = 404, description = "No such file", body = ErrorRes)
    )
)]
/// Downloads a file from the caller's namespace as an attachment.
#[axum::debug_handler]
async fn download_file(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<FileQuery>,
) -> Result<Response, ApiError> {
    let download = state
        .service
        .read_file(session.principal(), &NamespaceAccess::own(), &query.file)
        .await?;
    Ok(file_response(download, Disposition::Attachment))
}

#[utoipa::path(
    get,
    path = "/api/files/preview",
    params(PreviewQuery),
    responses(
        (status = 200, description = "File bytes inline, with the content type resolved from the extension"),
        (status = 401, description = "No valid session", body = ErrorRes),
        (status = 403, description = "Cross-namespace read without administrator rights", body = ErrorRes),
        (status = 404, description = "No such file", body = ErrorRes)
    )
)]
/// Serves a file inline for in-browser preview.
///
/// Administrators may pass `admin=true&user=<id>` to preview another principal's file.
#[axum::debug_handler]
async fn preview_file(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<PreviewQuery>,
) -> Result<Response, ApiError> {
    let access = NamespaceAccess {
        requested: query.user.as_deref().map(PrincipalId::new).transpose()?,
        admin_request: query.admin,
    };
    let download = state
        .service
        .read_file(session.principal(), &access, &query.file)
        .await?;
    Ok(file_response(download, Disposition::Inline))
}

#[utoipa::path(
    get,
    path = "/api/storage/usage",
    responses(
        (status = 200, description = "Usage of the caller's namespace", body = UsageRes),
        (status = 401, description = "No valid session", body = ErrorRes)
    )
)]
/// Reports how much of the quota the caller's namespace uses.
#[axum::debug_handler]
async fn storage_usage(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<UsageRes>, ApiError> {
    let usage = state
        .service
        .get_usage(session.principal(), &NamespaceAccess::own())
        .await?;
    Ok(Json(usage.into()))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "Totals for every namespace, sorted by id", body = [NamespaceSummaryRes]),
        (status = 401, description = "No valid session", body = ErrorRes),
        (status = 403, description = "Caller is not an administrator", body = ErrorRes)
    )
)]
/// Lists every namespace with its file count and size. Administrators only.
#[axum::debug_handler]
async fn admin_users(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<NamespaceSummaryRes>>, ApiError> {
    let summaries = state
        .service
        .list_all_namespaces(session.principal())
        .await?;
    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/admin/user/{id}/files",
    params(
        ("id" = String, Path, description = "Principal whose namespace to list"),
        DirQuery
    ),
    responses(
        (status = 200, description = "One directory level of the principal's namespace", body = ListFilesRes),
        (status = 401, description = "No valid session", body = ErrorRes),
        (status = 403, description = "Caller is not an administrator", body = ErrorRes)
    )
)]
/// Lists another principal's files. Administrators only.
#[axum::debug_handler]
async fn admin_user_files(
    State(state): State<AppState>,
    session: Session,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<DirQuery>,
) -> Result<Json<ListFilesRes>, ApiError> {
    state.service.gate().require_admin(session.principal())?;
    let access = NamespaceAccess::admin(PrincipalId::new(&id)?);
    let items = state
        .service
        .list_namespace(session.principal(), &access, query.path.as_deref())
        .await?;
    Ok(Json(items.into()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Attachment,
    Inline,
}

fn file_response(download: FileDownload, disposition: Disposition) -> Response {
    let (kind, content_type) = match disposition {
        Disposition::Attachment => ("attachment", "application/octet-stream"),
        Disposition::Inline => ("inline", download.content_type),
    };
    let disposition = format!(
        "{kind}; filename=\"{}\"",
        header_safe_file_name(&download.file_name)
    );
    (
        [
            (header::CONTENT_TYPE, content_type.to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::ETAG, format!("\"{}\"", download.content_hash)),
        ],
        download.bytes,
    )
        .into_response()
}

/// Replaces characters that cannot appear inside a quoted header parameter.
fn header_safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}
