use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tracing::warn;

use crate::auth::{AuthError, AuthService, User};
use crate::gallery::{Gallery, GeneratedImage};
use crate::gemini::{self, GenerateError, ImageModel, ImagePayload};
use crate::media;
use crate::trends::{self, Trend, TrendCategory};

pub struct AppState {
    pub model: Arc<dyn ImageModel>,
    pub auth: AuthService,
    pub gallery: Gallery,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub fn router(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let mut router = Router::new()
        .route("/api/trends", get(list_trends))
        .route("/api/generate", post(generate))
        .route("/api/upload", post(upload_image))
        .route("/api/auth/login", post(login))
        .route("/api/auth/signup", post(sign_up))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(session))
        .route("/api/gallery", get(list_gallery).post(save_to_gallery))
        .route("/api/gallery/{id}", delete(delete_from_gallery))
        .with_state(state);
    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }
    router
}

#[derive(Deserialize)]
struct TrendsQuery {
    category: Option<TrendCategory>,
}

async fn list_trends(Query(query): Query<TrendsQuery>) -> Json<Vec<Trend>> {
    let trends = trends::catalog()
        .iter()
        .filter(|trend| query.category.is_none_or(|category| trend.category == category))
        .cloned()
        .collect();
    Json(trends)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    image: String,
    mime_type: String,
    trend_id: Option<String>,
    prompt: Option<String>,
    count: Option<usize>,
}

#[derive(Serialize)]
struct GenerateResponse {
    variations: Vec<ImagePayload>,
}

async fn generate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    let prompt = match resolve_prompt(&request) {
        Ok(prompt) => prompt,
        Err(response) => return response,
    };
    let source = ImagePayload {
        data: request.image,
        mime_type: request.mime_type,
    };
    let count = request.count.unwrap_or(gemini::DEFAULT_VARIATION_COUNT);
    match gemini::generate_variations(state.model.as_ref(), &source, &prompt, count).await {
        Ok(variations) => Json(GenerateResponse { variations }).into_response(),
        Err(err) => {
            let status = match &err {
                GenerateError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                GenerateError::SafetyBlocked => StatusCode::UNPROCESSABLE_ENTITY,
                GenerateError::NoCandidates
                | GenerateError::NoImage
                | GenerateError::Provider(_) => StatusCode::BAD_GATEWAY,
            };
            warn!(error = %err, "image generation failed");
            json_error(status, &err.to_string())
        }
    }
}

fn resolve_prompt(request: &GenerateRequest) -> Result<String, Response> {
    if let Some(prompt) = request.prompt.as_deref() {
        if !prompt.trim().is_empty() {
            return Ok(prompt.to_string());
        }
    }
    match request.trend_id.as_deref() {
        Some(id) => match trends::find(id) {
            Some(trend) => Ok(trend.prompt.clone()),
            None => Err(json_error(
                StatusCode::BAD_REQUEST,
                &format!("unknown trend '{id}'"),
            )),
        },
        None => Err(json_error(
            StatusCode::BAD_REQUEST,
            "either a prompt or a trendId is required",
        )),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    data: String,
    mime_type: String,
    width: u32,
    height: u32,
}

async fn upload_image(mut multipart: Multipart) -> Response {
    let mut content_type = None;
    let mut bytes = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some("file") {
                    content_type = field.content_type().map(|value| value.to_string());
                    match field.bytes().await {
                        Ok(data) => bytes = Some(data),
                        Err(err) => {
                            return json_error(
                                StatusCode::BAD_REQUEST,
                                &format!("could not read uploaded file: {err}"),
                            );
                        }
                    }
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    &format!("could not read upload form: {err}"),
                );
            }
        }
    }

    let Some(bytes) = bytes else {
        return json_error(StatusCode::BAD_REQUEST, "no file field in upload");
    };
    if bytes.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "uploaded file is empty");
    }

    // Trust the bytes over the declared content type.
    let mime_type = match media::detect_mime_type(&bytes).map(str::to_string).or(content_type) {
        Some(mime) => mime,
        None => return json_error(StatusCode::BAD_REQUEST, "unrecognized file type"),
    };
    if !media::is_supported_image(&mime_type) {
        return json_error(
            StatusCode::BAD_REQUEST,
            &format!("unsupported image type '{mime_type}'"),
        );
    }
    let (width, height) = media::get_dimensions(&bytes, &mime_type).unwrap_or((0, 0));

    let data = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Json(UploadResponse {
        data,
        mime_type,
        width,
        height,
    })
    .into_response()
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

fn auth_failure(err: AuthError) -> Response {
    let status = match &err {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::DuplicateUser => StatusCode::CONFLICT,
        AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, &err.to_string())
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> Response {
    match state.auth.login(&credentials.email, &credentials.password).await {
        Ok(user) => Json(user).into_response(),
        Err(err) => auth_failure(err),
    }
}

async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> Response {
    match state.auth.sign_up(&credentials.email, &credentials.password).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(err) => auth_failure(err),
    }
}

async fn logout(State(state): State<Arc<AppState>>) -> StatusCode {
    state.auth.logout();
    StatusCode::NO_CONTENT
}

async fn session(State(state): State<Arc<AppState>>) -> Json<Option<User>> {
    Json(state.auth.current_user())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GalleryEntry {
    #[serde(flatten)]
    image: GeneratedImage,
    trend_name: &'static str,
}

async fn list_gallery(State(state): State<Arc<AppState>>) -> Json<Vec<GalleryEntry>> {
    let entries = state
        .gallery
        .list()
        .into_iter()
        .map(|image| GalleryEntry {
            trend_name: trends::display_name(&image.trend_id),
            image,
        })
        .collect();
    Json(entries)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveImageRequest {
    source_image: ImagePayload,
    generated_image: ImagePayload,
    trend_id: String,
    prompt: String,
}

async fn save_to_gallery(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SaveImageRequest>,
) -> Response {
    let image = GeneratedImage::new(
        request.source_image,
        request.generated_image,
        request.trend_id,
        request.prompt,
    );
    match state.gallery.save(image.clone()) {
        Ok(()) => (StatusCode::CREATED, Json(image)).into_response(),
        Err(err) => {
            warn!(error = %err, "could not save gallery record");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "could not save image")
        }
    }
}

async fn delete_from_gallery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.gallery.delete(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            warn!(error = %err, id, "could not delete gallery record");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "could not delete image")
        }
    }
}
