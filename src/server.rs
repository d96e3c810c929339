//! HTTP server - the plotting web UI
//!
//! Endpoints:
//! - GET /          → landing page (form + any pending flash message)
//! - GET /plot      → render a curve, cache it, return the page with the image inline
//! - GET /download  → the cached PNG as a file attachment
//!
//! Every failure recovers here: the error becomes a flash message and a
//! redirect back to the index, never a 5xx.

use axum::{
    body::Body,
    extract::{Query, State},
    http::header::{self, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use tower_http::trace::TraceLayer;

use crate::page;
use crate::plot::{self, PlotError, PlotParams, PlotRequest};
use crate::state::AppState;
use crate::{log_error, log_request};

/// Start the HTTP server
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    tracing::info!("Initializing HTTP server on port {}", port);

    let addr = format!("{}:{}", state.config.host, port);
    let router = app(state);

    tracing::info!("Starting server on http://localhost:{}/", port);
    tracing::info!("  Plot:     http://localhost:{}/plot", port);
    tracing::info!("  Download: http://localhost:{}/download", port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server bound to {}", addr);
    axum::serve(listener, router).await?;

    Ok(())
}

/// Build the router. Separate from `serve` so tests can drive it directly.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/plot", get(render_plot))
        .route("/download", get(download))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET / - landing page, consuming any pending flash message
async fn index(State(state): State<AppState>) -> Html<String> {
    log_request!("GET", "/");
    let flash = state.take_flash().await;
    Html(page::index(flash.as_deref(), None))
}

/// GET /plot - validate, sample, render, cache and return inline
async fn render_plot(
    State(state): State<AppState>,
    Query(params): Query<PlotParams>,
) -> Response {
    log_request!("GET", "/plot", mode = ?params.mode);

    let request = match PlotRequest::from_params(&params) {
        Ok(request) => request,
        Err(PlotError::InvalidMode) => {
            tracing::warn!("Rejected plot request: invalid mode {:?}", params.mode);
            state.set_flash("Invalid mode selected.").await;
            return Redirect::to("/").into_response();
        }
        Err(err) => {
            log_error!(err, stage = "params");
            state
                .set_flash(format!("Error in expression: {}", err))
                .await;
            return Redirect::to("/").into_response();
        }
    };

    tracing::debug!(
        "Plotting mode={} xmin={} xmax={} points={}",
        request.mode.name(),
        request.xmin,
        request.xmax,
        request.points
    );

    match plot::render_request(&request) {
        Ok(png) => {
            tracing::info!("Rendered {} plot ({} bytes)", request.mode.name(), png.len());
            let encoded = general_purpose::STANDARD.encode(&png);
            state.store_plot(png).await;
            // A success render is still a page render: it consumes any
            // flash message queued by an earlier failed request.
            let flash = state.take_flash().await;
            Html(page::index(flash.as_deref(), Some(&encoded))).into_response()
        }
        Err(err) => {
            // The previous cached image stays untouched on failure
            log_error!(err, mode = %request.mode.name());
            state
                .set_flash(format!("Error in expression: {}", err))
                .await;
            Redirect::to("/").into_response()
        }
    }
}

/// GET /download - the cached PNG as a file attachment
async fn download(State(state): State<AppState>) -> Response {
    log_request!("GET", "/download");

    let png = match state.last_plot().await {
        Some(png) => png,
        None => {
            tracing::debug!("No cached plot to download");
            state.set_flash("No plot available to download.").await;
            return Redirect::to("/").into_response();
        }
    };

    tracing::info!("Serving cached plot ({} bytes)", png.len());
    let mut response = Response::new(Body::from(png));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"plot.png\""),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::plot::PlotMode;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app() -> Router {
        app(AppState::new(Config::default()))
    }

    async fn send_get(app: &Router, uri: &str) -> Response {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    async fn body_string(response: Response) -> String {
        String::from_utf8(body_bytes(response).await).unwrap()
    }

    fn assert_redirects_home(response: &Response) {
        assert!(response.status().is_redirection());
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    }

    #[tokio::test]
    async fn test_index_serves_form() {
        let app = test_app();
        let response = send_get(&app, "/").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_string(response).await;
        assert!(body.contains("<form action=\"/plot\""));
        assert!(!body.contains("data:image/png"));
    }

    #[tokio::test]
    async fn test_plot_function_embeds_image() {
        let app = test_app();
        let response = send_get(&app, "/plot?mode=function&expr_x=x").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_string(response).await;
        assert!(body.contains("data:image/png;base64,"));
        assert!(body.contains("href=\"/download\""));
    }

    #[tokio::test]
    async fn test_empty_bounds_fall_back_to_defaults() {
        let app = test_app();
        let response =
            send_get(&app, "/plot?mode=function&expr_x=x&xmin=&xmax=&points=").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_polar_plot_succeeds_with_nonsense_bounds() {
        let app = test_app();
        let response = send_get(&app, "/plot?mode=polar&expr_r=1&xmin=5&xmax=6").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_invalid_mode_redirects_with_flash() {
        let app = test_app();
        let response = send_get(&app, "/plot?mode=wizard&expr_x=x").await;
        assert_redirects_home(&response);

        // The flash shows on the next page render
        let index = send_get(&app, "/").await;
        assert!(body_string(index).await.contains("Invalid mode selected."));

        // Nothing was cached
        let download = send_get(&app, "/download").await;
        assert_redirects_home(&download);
    }

    #[tokio::test]
    async fn test_missing_mode_redirects() {
        let app = test_app();
        let response = send_get(&app, "/plot").await;
        assert_redirects_home(&response);
    }

    #[tokio::test]
    async fn test_flash_is_consumed_by_one_page_render() {
        let app = test_app();
        send_get(&app, "/plot?mode=wizard").await;

        let first = body_string(send_get(&app, "/").await).await;
        assert!(first.contains("class=\"flash\""));

        let second = body_string(send_get(&app, "/").await).await;
        assert!(!second.contains("class=\"flash\""));
    }

    #[tokio::test]
    async fn test_expression_error_redirects_and_preserves_cache() {
        let app = test_app();

        let ok = send_get(&app, "/plot?mode=function&expr_x=x").await;
        assert_eq!(ok.status(), StatusCode::OK);
        let cached = body_bytes(send_get(&app, "/download").await).await;

        let failed = send_get(&app, "/plot?mode=function&expr_x=1/0").await;
        assert_redirects_home(&failed);

        let index = body_string(send_get(&app, "/").await).await;
        assert!(index.contains("Error in expression: division by zero"));

        // The earlier image is still the one served
        let after = body_bytes(send_get(&app, "/download").await).await;
        assert_eq!(after, cached);
    }

    #[tokio::test]
    async fn test_oversized_expression_redirects_with_flash() {
        let app = test_app();
        let nested = format!("{}x{}", "(".repeat(3000), ")".repeat(3000));
        let response =
            send_get(&app, &format!("/plot?mode=function&expr_x={}", nested)).await;
        assert_redirects_home(&response);

        let index = body_string(send_get(&app, "/").await).await;
        assert!(index.contains("Error in expression: expression too long"));

        // The handler still serves normal plots afterwards
        let ok = send_get(&app, "/plot?mode=function&expr_x=x").await;
        assert_eq!(ok.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unparsable_points_reports_through_error_path() {
        let app = test_app();
        let response = send_get(&app, "/plot?mode=function&expr_x=x&points=abc").await;
        assert_redirects_home(&response);

        let index = body_string(send_get(&app, "/").await).await;
        assert!(index.contains("Error in expression:"));
    }

    #[tokio::test]
    async fn test_download_without_plot_flashes() {
        let app = test_app();
        let response = send_get(&app, "/download").await;
        assert_redirects_home(&response);

        let index = body_string(send_get(&app, "/").await).await;
        assert!(index.contains("No plot available to download."));
    }

    #[tokio::test]
    async fn test_download_headers_and_idempotence() {
        let app = test_app();
        send_get(&app, "/plot?mode=function&expr_x=sin(x)").await;

        let response = send_get(&app, "/download").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"plot.png\""
        );

        let first = body_bytes(response).await;
        let second = body_bytes(send_get(&app, "/download").await).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let app = test_app();
        send_get(&app, "/plot?mode=function&expr_x=x").await;
        send_get(&app, "/plot?mode=function&expr_x=x*x").await;

        let expected = plot::render_request(&PlotRequest {
            mode: PlotMode::Function {
                expr_x: "x*x".to_string(),
            },
            xmin: plot::DEFAULT_XMIN,
            xmax: plot::DEFAULT_XMAX,
            points: plot::DEFAULT_POINTS,
        })
        .unwrap();

        let downloaded = body_bytes(send_get(&app, "/download").await).await;
        assert_eq!(downloaded, expected);
    }
}
