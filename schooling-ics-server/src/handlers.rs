use std::{env, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Local;
use schooling_ics_core::prelude::*;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// アプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub term: Arc<TermConfig>,
    pub catalog: Option<Arc<CourseCatalog>>,
    pub ics_options: Arc<IcsOptions>,
}

impl AppState {
    pub fn new(term: TermConfig, catalog: Option<CourseCatalog>) -> Self {
        Self {
            term: Arc::new(term),
            catalog: catalog.map(Arc::new),
            ics_options: Arc::new(IcsOptions::default()),
        }
    }

    /// TERM_CONFIG_PATH / HOLIDAY_ICS_PATH / COURSE_CATALOG_PATH から組み立てる
    pub fn from_env() -> schooling_ics_core::Result<Self> {
        let mut term = match non_empty_env("TERM_CONFIG_PATH") {
            Some(path) => {
                tracing::info!("学期設定を読み込み: {}", path);
                TermConfig::from_path(&path)?
            }
            None => TermConfig::default(),
        };

        if let Some(path) = non_empty_env("HOLIDAY_ICS_PATH") {
            tracing::info!("休講日ICSを読み込み: {}", path);
            let holidays = ExclusionCalendar::from_ics_path(&path)?;
            term.exclusions.extend(holidays.ranges().iter().cloned());
        }

        let catalog = match non_empty_env("COURSE_CATALOG_PATH") {
            Some(path) => {
                tracing::info!("科目カタログを読み込み: {}", path);
                Some(CourseCatalog::from_path(&path)?)
            }
            None => None,
        };

        Ok(Self::new(term, catalog))
    }

    /// リクエストの科目とコード指定をまとめる
    fn resolve(&self, request: SelectionRequest) -> Result<Vec<Course>, AppError> {
        let mut courses = request.courses;
        if !request.codes.is_empty() {
            let catalog = self.catalog.as_ref().ok_or_else(|| {
                schooling_ics_core::Error::Config(
                    "course codes given but no catalog is loaded".to_string(),
                )
            })?;
            courses.extend(catalog.select(&request.codes)?);
        }
        Ok(courses)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// ヘルスチェックの応答
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// エラーレスポンス
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

/// 科目の指定。科目そのものとカタログのコードのどちらでも指定できる
#[derive(Deserialize, Default)]
pub struct SelectionRequest {
    #[serde(default)]
    courses: Vec<Course>,
    #[serde(default)]
    codes: Vec<String>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/term", get(term_handler))
        .route("/courses", get(list_courses_handler))
        .route("/sessions", post(sessions_handler))
        .route("/summary", post(summary_handler))
        .route("/calendar", post(calendar_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// ルート
async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Schooling ICS Calendar Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Generates schooling sessions and exports them as iCalendar",
        "endpoints": {
            "health": "/health",
            "term": "/term",
            "courses": "/courses",
            "sessions": "/sessions",
            "summary": "/summary",
            "calendar": "/calendar"
        }
    }))
}

/// ヘルスチェック
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn term_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.term.as_ref().clone())
}

async fn list_courses_handler(State(state): State<AppState>) -> impl IntoResponse {
    let courses = state
        .catalog
        .as_ref()
        .map(|catalog| catalog.courses().to_vec())
        .unwrap_or_default();
    Json(courses)
}

async fn sessions_handler(
    State(state): State<AppState>,
    Json(request): Json<SelectionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let courses = state.resolve(request)?;
    let sessions = generate_sessions(&courses, &state.term);
    tracing::info!("{} 科目から {} セッションを生成", courses.len(), sessions.len());
    Ok(Json(sessions))
}

async fn summary_handler(
    State(state): State<AppState>,
    Json(request): Json<SelectionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let courses = state.resolve(request)?;
    let sessions = generate_sessions(&courses, &state.term);
    let summary = summarize(&sessions);
    let message = summary.confirmation_message();
    Ok(Json(serde_json::json!({
        "summary": summary,
        "message": message,
    })))
}

async fn calendar_handler(
    State(state): State<AppState>,
    Json(request): Json<SelectionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let courses = state.resolve(request)?;
    let sessions = generate_sessions(&courses, &state.term);

    let generator = IcsGenerator::new(state.ics_options.as_ref().clone());
    let ics_content = generator.render(&sessions);
    let filename = export_filename(Local::now().date_naive());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, ICS_MIME_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        ics_content,
    ))
}

/// アプリケーションエラー
#[derive(Debug)]
pub struct AppError(schooling_ics_core::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self.0 {
            schooling_ics_core::Error::Config(_) => (StatusCode::BAD_REQUEST, "invalid request"),
            schooling_ics_core::Error::Json(_) => (StatusCode::BAD_REQUEST, "invalid JSON"),
            schooling_ics_core::Error::Yaml(_) => (StatusCode::BAD_REQUEST, "invalid YAML"),
        };

        tracing::warn!("request failed: {}", self.0);

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
            message: self.0.to_string(),
        });

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<schooling_ics_core::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
