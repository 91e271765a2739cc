//! Web dashboard with server-rendered views and JSON API endpoints

use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use base64::Engine as _;
use tower_http::cors::CorsLayer;

use crate::models::{Session, SosAlert};
use crate::state::StateHandle;

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub state: StateHandle,
}

/// Build the dashboard axum router
pub fn build_router(state: StateHandle) -> Router {
    let dashboard_state = DashboardState { state };

    Router::new()
        .route("/", get(index_handler))
        .route("/admin", get(admin_handler))
        .route("/api/sessions", get(sessions_handler))
        .route("/api/alerts", get(alerts_handler))
        .route("/api/feed", get(feed_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(dashboard_state)
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta http-equiv="refresh" content="5">
    <title>{title}</title>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem;">
    <h1>{title}</h1>
{body}
</body>
</html>"#,
    ))
}

/// Escape gateway-supplied text before interpolating it into markup
fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn session_rows(sessions: &[Session]) -> String {
    sessions
        .iter()
        .map(|s| {
            let (color, bg) = if s.status == "Active" {
                ("#155724", "#d4edda")
            } else {
                ("#721c24", "#f8d7da")
            };
            format!(
                r#"<tr style="border-bottom: 1px solid #dee2e6;">
                    <td style="padding: 0.5rem;">{} {}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">
                        <span style="display: inline-block; padding: 0.25em 0.6em; border-radius: 0.25rem; font-size: 0.85em; font-weight: 600; color: {}; background-color: {};">{}</span>
                    </td>
                </tr>"#,
                escape_html(&s.first_name),
                escape_html(&s.last_name),
                escape_html(&s.taxi_number),
                escape_html(&s.start_time),
                escape_html(s.end_time.as_deref().unwrap_or("-")),
                color,
                bg,
                escape_html(&s.status)
            )
        })
        .collect()
}

fn alert_rows(alerts: &[SosAlert]) -> String {
    alerts
        .iter()
        .map(|a| {
            format!(
                r#"<tr style="border-bottom: 1px solid #dee2e6;">
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                </tr>"#,
                escape_html(&a.id),
                escape_html(&a.driver_id),
                escape_html(&a.taxi_id),
                escape_html(&a.details),
                escape_html(&a.status),
                escape_html(&a.created_time),
                escape_html(a.actioned_time.as_deref().unwrap_or("-"))
            )
        })
        .collect()
}

const SESSION_HEADER: &str = r#"<tr style="border-bottom: 2px solid #dee2e6;">
    <th style="padding: 0.5rem; text-align: left;">Driver</th>
    <th style="padding: 0.5rem; text-align: left;">Taxi</th>
    <th style="padding: 0.5rem; text-align: left;">Start</th>
    <th style="padding: 0.5rem; text-align: left;">End</th>
    <th style="padding: 0.5rem; text-align: left;">Status</th>
</tr>"#;

const ALERT_HEADER: &str = r#"<tr style="border-bottom: 2px solid #dee2e6;">
    <th style="padding: 0.5rem; text-align: left;">Alert ID</th>
    <th style="padding: 0.5rem; text-align: left;">Driver ID</th>
    <th style="padding: 0.5rem; text-align: left;">Taxi ID</th>
    <th style="padding: 0.5rem; text-align: left;">Details</th>
    <th style="padding: 0.5rem; text-align: left;">Status</th>
    <th style="padding: 0.5rem; text-align: left;">Created</th>
    <th style="padding: 0.5rem; text-align: left;">Actioned</th>
</tr>"#;

const LOADING: &str = r#"<p style="color: #6c757d;">Loading...</p>"#;

async fn index_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;

    let feed_section = match state.feed.frame() {
        Some(frame) => format!(
            r#"<p>Detection status: <strong>{}</strong> ({})</p>
            <img alt="live feed" style="max-width: 100%;" src="data:image/jpeg;base64,{}">"#,
            escape_html(&frame.status),
            state.feed.conn,
            base64::engine::general_purpose::STANDARD.encode(&frame.jpeg)
        ),
        None => format!(r#"<p>No frame received yet ({})</p>"#, state.feed.conn),
    };

    let alerts_section = if state.alerts.loaded() {
        if state.alerts.items().is_empty() {
            r#"<p style="color: #6c757d;">No active alerts</p>"#.to_string()
        } else {
            format!(
                r#"<table style="width: 100%; border-collapse: collapse;">
                <thead>{}</thead><tbody>{}</tbody></table>"#,
                ALERT_HEADER,
                alert_rows(state.alerts.items())
            )
        }
    } else {
        LOADING.to_string()
    };

    let sessions_section = if state.sessions.loaded() {
        if state.sessions.items().is_empty() {
            r#"<p style="color: #6c757d;">No active sessions</p>"#.to_string()
        } else {
            format!(
                r#"<table style="width: 100%; border-collapse: collapse;">
                <thead>{}</thead><tbody>{}</tbody></table>"#,
                SESSION_HEADER,
                session_rows(state.sessions.items())
            )
        }
    } else {
        LOADING.to_string()
    };

    let body = format!(
        r#"    <section>
        <h2>Live Feed</h2>
        {feed_section}
    </section>
    <section>
        <h2>SOS Alerts</h2>
        {alerts_section}
    </section>
    <section>
        <h2>Active Sessions</h2>
        {sessions_section}
    </section>"#,
    );

    page("Driver Monitoring System", &body)
}

async fn admin_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;

    if !state.admin.loaded() {
        return page("Admin Dashboard", LOADING);
    }

    // the banner replaces the whole view until the next successful refresh
    if let Some(error) = state.admin.error() {
        let body = format!(
            r#"    <div style="color: #721c24; background-color: #f8d7da; padding: 1rem; border-radius: 0.25rem;">{}</div>"#,
            escape_html(error)
        );
        return page("Admin Dashboard", &body);
    }

    let body = format!(
        r#"    <section>
        <h2>Active SOS Alerts</h2>
        <table style="width: 100%; border-collapse: collapse;">
        <thead>{}</thead><tbody>{}</tbody></table>
    </section>
    <section>
        <h2>Active Sessions</h2>
        <table style="width: 100%; border-collapse: collapse;">
        <thead>{}</thead><tbody>{}</tbody></table>
    </section>"#,
        ALERT_HEADER,
        alert_rows(state.admin.alerts()),
        SESSION_HEADER,
        session_rows(state.admin.sessions()),
    );

    page("Admin Dashboard", &body)
}

async fn sessions_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;
    axum::Json(state.sessions.items().to_vec())
}

async fn alerts_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;
    axum::Json(state.alerts.items().to_vec())
}

async fn feed_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;

    let (status, frame, received) = match state.feed.frame() {
        Some(frame) => (
            Some(frame.status.clone()),
            Some(format!(
                "data:image/jpeg;base64,{}",
                base64::engine::general_purpose::STANDARD.encode(&frame.jpeg)
            )),
            Some(frame.received_epoch_ms),
        ),
        None => (None, None, None),
    };

    axum::Json(serde_json::json!({
        "connection": state.feed.conn.to_string(),
        "detection_status": status,
        "frame": frame,
        "received_epoch_ms": received,
    }))
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
