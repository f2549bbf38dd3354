//! HTTP server for the mixmatch API.
//!
//! Provides REST endpoints for CSV upload and pair analysis.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | POST   | `/api/upload`     | Upload CSV, get scored match pairs   |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |

use axum::{
    extract::Multipart,
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{error_response, upload_response, UploadResponse};
use crate::pipeline::{analyze_bytes, AnalyzeOptions};

/// Tolerance ceiling applied at this surface (the engine itself only
/// requires non-negative).
const MAX_TOLERANCE_BPM: f64 = 50.0;

/// Start the HTTP server.
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let app = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload_csv))
        .route("/api/logs", get(sse_logs))
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("mixmatch server running on http://localhost:{}", port);
    println!("   POST /api/upload - Upload playlist CSV");
    println!("   GET  /api/logs   - SSE log stream");
    println!("   GET  /health     - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "mixmatch",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming.
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload CSV endpoint.
///
/// Multipart form: a `file` part with the CSV bytes, plus optional text
/// parts `tolerance`, `relative_key`, `mood`, `energy`, `texture`.
async fn upload_csv(mut multipart: Multipart) -> Result<Json<UploadResponse>, (StatusCode, Json<Value>)> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut options = AnalyzeOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (StatusCode::BAD_REQUEST, Json(error_response(&format!("Multipart error: {}", e))))
    })? {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| {
                        (StatusCode::BAD_REQUEST, Json(error_response(&format!("Read error: {}", e))))
                    })?
                    .to_vec(),
            );
            continue;
        }

        let text = field.text().await.unwrap_or_default();
        match name.as_str() {
            "tolerance" => {
                if let Ok(value) = text.trim().parse::<f64>() {
                    options.tolerance_bpm = value.clamp(0.0, MAX_TOLERANCE_BPM);
                }
            }
            "relative_key" => options.allow_relative_key = parse_flag(&text),
            "mood" => options.toggles.mood = parse_flag(&text),
            "energy" => options.toggles.energy = parse_flag(&text),
            "texture" => options.toggles.texture = parse_flag(&text),
            _ => {}
        }
    }

    let bytes = file_data
        .ok_or_else(|| (StatusCode::BAD_REQUEST, Json(error_response("No file provided"))))?;

    let result = analyze_bytes(&bytes, options).map_err(|e| {
        log_error(format!("Analysis failed: {}", e));
        (StatusCode::UNPROCESSABLE_ENTITY, Json(error_response(&e.to_string())))
    })?;

    Ok(Json(upload_response(result, options)))
}

/// Checkbox-style boolean: "1", "true" and "on" are set.
fn parse_flag(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "1" | "true" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(parse_flag("On"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }
}
