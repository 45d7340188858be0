use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use roomtalk_common::{
    DescribeRequest, DescribeResponse, ErrorDetail, GatewayConfig, HealthStatus, SensorReading,
};

use crate::{
    describe::Describer,
    inference::{OllamaClient, TextGenerator},
    weather::{OpenMeteoClient, WeatherSource},
};

struct AppState<W, G> {
    describer: Arc<Describer<W, G>>,
}

impl<W, G> Clone for AppState<W, G> {
    fn clone(&self) -> Self {
        Self {
            describer: Arc::clone(&self.describer),
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = GatewayConfig::from_env();
    match config.weather_location {
        Some(location) => info!(
            "outside weather enabled for {},{} (cache {}s)",
            location.latitude, location.longitude, config.weather_cache_secs
        ),
        None => info!("OPENMETEO_LAT/OPENMETEO_LON not set; outside weather disabled"),
    }
    info!(
        "using model {} at {}",
        config.ollama_model, config.ollama_base_url
    );

    let describer = Describer::new(
        OpenMeteoClient::new(&config)?,
        OllamaClient::new(&config)?,
        config.weather_location,
    );
    let app = router(describer);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind gateway server at {addr}"))?;

    info!("gateway listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("gateway stopped");
    Ok(())
}

fn router<W, G>(describer: Describer<W, G>) -> Router
where
    W: WeatherSource + 'static,
    G: TextGenerator + 'static,
{
    let state = AppState {
        describer: Arc::new(describer),
    };
    Router::new()
        .route("/health", get(handle_health))
        .route("/describe", post(handle_describe::<W, G>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn handle_health() -> Json<HealthStatus> {
    Json(HealthStatus::ok())
}

async fn handle_describe<W, G>(
    State(state): State<AppState<W, G>>,
    payload: Result<Json<DescribeRequest>, JsonRejection>,
) -> Response
where
    W: WeatherSource + 'static,
    G: TextGenerator + 'static,
{
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, &rejection.body_text())
        }
    };
    let reading = match SensorReading::try_from(request) {
        Ok(reading) => reading,
        Err(err) => return error_response(StatusCode::UNPROCESSABLE_ENTITY, &err.to_string()),
    };

    match state.describer.describe(reading).await {
        Ok(description) => Json(DescribeResponse { description }).into_response(),
        Err(err) => error_response(err.status(), &err.to_string()),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorDetail {
            detail: message.to_string(),
        }),
    )
        .into_response()
}
