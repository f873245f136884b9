#![cfg(feature = "web")]

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::config::{GraphConfig, GraphType};
use crate::figure::build_figure;
use crate::render::RenderResponse;
use crate::settings::Settings;
use crate::table::{DataTable, TableError};
use crate::upload::{UploadResponse, check_extension};

lazy_static! {
    static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_.-]").unwrap();
}

pub struct AppState {
    settings: Settings,
}

impl AppState {
    /// Creates the state and makes sure the upload directory exists.
    pub fn new(settings: Settings) -> std::io::Result<Self> {
        std::fs::create_dir_all(&settings.upload_dir)?;
        Ok(AppState { settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn stored_path(&self, filename: &str) -> PathBuf {
        self.settings.upload_dir.join(filename)
    }
}

#[derive(Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    graph_type: Option<String>,
    #[serde(default)]
    config: serde_json::Value,
}

/// Reduces a client-supplied name to a safe file name.
///
/// Path separators and whitespace become `_`, anything outside ASCII
/// letters, digits, `_`, `-` and `.` is dropped, and leading or trailing
/// dots and underscores are trimmed.
///
/// # Examples
/// ```
/// use graphing_tool::app::secure_filename;
///
/// assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
/// assert_eq!(secure_filename("my data.csv"), "my_data.csv");
/// ```
pub fn secure_filename(name: &str) -> String {
    let joined = name
        .replace(['/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    UNSAFE_FILENAME_CHARS
        .replace_all(&joined, "")
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.settings.max_upload_bytes();

    Router::new()
        .route("/upload", post(upload_file))
        .route("/generate_graph", post(generate_graph))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Starts the chart server and serves until the process ends.
///
/// # Arguments
/// * `settings` - Bind address, upload directory and body limit
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Only returns on a bind or serve failure
pub async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(settings)?);
    let address = state.settings.bind_address();
    let app = router(state);

    let listener = TcpListener::bind(&address).await?;
    log::info!("Listening on http://{}", address);
    axum::serve(listener, app).await?;

    Ok(())
}

fn upload_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(UploadResponse::failure(message)),
    )
        .into_response()
}

fn render_error(message: impl Into<String>) -> Response {
    let message = message.into();
    log::warn!("graph generation failed: {}", message);
    (StatusCode::BAD_REQUEST, Json(RenderResponse::failure(message))).into_response()
}

async fn upload_file(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut stored: Option<(String, String, u64)> = None;

    loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return upload_error(format!("Error reading file: {}", e)),
        };
        if field.name() != Some("file") {
            continue;
        }

        let client_name = field.file_name().unwrap_or_default().to_string();
        if client_name.is_empty() {
            return upload_error("No selected file");
        }
        let filename = secure_filename(&client_name);
        let extension = match (check_extension(&client_name), check_extension(&filename)) {
            (Ok(_), Ok(extension)) => extension,
            _ => return upload_error("Invalid file type"),
        };

        let path = state.stored_path(&filename);
        let mut file = match tokio::fs::File::create(&path).await {
            Ok(file) => file,
            Err(e) => return upload_error(format!("Error reading file: {}", e)),
        };
        let mut size = 0u64;
        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => {
                    size += chunk.len() as u64;
                    if let Err(e) = file.write_all(&chunk).await {
                        return upload_error(format!("Error reading file: {}", e));
                    }
                }
                Ok(None) => break,
                Err(e) => return upload_error(format!("Error reading file: {}", e)),
            }
        }
        if let Err(e) = file.flush().await {
            return upload_error(format!("Error reading file: {}", e));
        }

        stored = Some((filename, extension, size));
        break;
    }

    let Some((filename, file_type, size)) = stored else {
        return upload_error("No file part");
    };
    log::info!("stored upload {} ({} bytes, {})", filename, size, file_type);

    let path = state.stored_path(&filename);
    if !matches!(file_type.as_str(), "csv" | "zip") {
        let response = UploadResponse {
            success: true,
            filename: Some(filename),
            filepath: Some(path.to_string_lossy().into_owned()),
            file_type: Some(file_type),
            ..UploadResponse::default()
        };
        return Json(response).into_response();
    }

    let table = match tokio::task::spawn_blocking(move || DataTable::load(&path)).await {
        Ok(Ok(table)) => table,
        Ok(Err(TableError::NoCsvInArchive)) => {
            return upload_error(TableError::NoCsvInArchive.to_string());
        }
        Ok(Err(e)) => return upload_error(format!("Error reading file: {}", e)),
        Err(e) => return upload_error(format!("Error reading file: {}", e)),
    };

    Json(UploadResponse {
        success: true,
        filename: Some(filename),
        file_type: Some(file_type),
        row_count: Some(table.row_count()),
        columns: Some(table.column_names()),
        numeric_columns: Some(table.numeric_column_names()),
        ..UploadResponse::default()
    })
    .into_response()
}

async fn generate_graph(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(e) => return render_error(format!("Error generating graph: {}", e.body_text())),
    };

    let Some(graph_type) = request.graph_type.as_deref().and_then(GraphType::from_tag) else {
        return render_error("Invalid graph type");
    };
    let filename = request
        .filename
        .as_deref()
        .map(secure_filename)
        .unwrap_or_default();
    if filename.is_empty() {
        return render_error("Error generating graph: no file has been uploaded");
    }
    let config = match GraphConfig::from_value(graph_type, request.config) {
        Ok(config) => config,
        Err(e) => return render_error(format!("Error generating graph: {}", e)),
    };

    log::info!("generating {} graph from {}", graph_type, filename);
    let path = state.stored_path(&filename);
    let built = tokio::task::spawn_blocking(move || -> Result<String, String> {
        let table = DataTable::load(&path).map_err(|e| e.to_string())?;
        let chart = build_figure(&table, &config).map_err(|e| e.to_string())?;
        chart.to_json().map_err(|e| e.to_string())
    })
    .await;

    match built {
        Ok(Ok(graph)) => Json(RenderResponse::with_graph(graph)).into_response(),
        Ok(Err(e)) => render_error(format!("Error generating graph: {}", e)),
        Err(e) => render_error(format!("Error generating graph: {}", e)),
    }
}
