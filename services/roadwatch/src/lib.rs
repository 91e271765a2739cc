//! Roadwatch - driver monitoring console
//!
//! Client for a driver-monitoring gateway: polls session and SOS alert
//! snapshots over REST, consumes the live camera feed over a websocket, and
//! serves the combined view on a local web dashboard.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod io;
pub mod models;
pub mod poller;
pub mod state;

pub use config::{load_config, Config};
pub use error::{Result, RoadwatchError};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::feed::{FeedClient, WsFeedConnector};
use crate::gateway::{ApiGateway, LoginOutcome};
use crate::io::ReqwestHttpClient;
use crate::models::LoginForm;
use crate::poller::{poll_loop, AdminPoll, AlertsPoll, PollTarget, SessionsPoll};

/// Check driver credentials against the gateway, then run the console.
/// A rejected login returns an error carrying the gateway's message, so the
/// caller always has something to show.
pub async fn login_and_run(config: Config, form: LoginForm) -> Result<()> {
    let http: Arc<dyn io::HttpClient> = Arc::new(ReqwestHttpClient::default());
    let gateway = ApiGateway::new(&config.gateway, Arc::clone(&http));

    match gateway.login(&form.pid, &form.taxi, &form.password).await? {
        LoginOutcome::Success => {
            tracing::info!("Driver {} logged in", form.pid);
            run(config).await
        }
        LoginOutcome::Failure(message) => Err(RoadwatchError::Gateway(message)),
    }
}

/// Check administrator credentials against the gateway, then run the
/// console. Same contract as `login_and_run`: a rejected login returns an
/// error carrying the gateway's message.
pub async fn admin_login_and_run(config: Config, pid: &str, password: &str) -> Result<()> {
    let http: Arc<dyn io::HttpClient> = Arc::new(ReqwestHttpClient::default());
    let gateway = ApiGateway::new(&config.gateway, Arc::clone(&http));

    match gateway.admin_login(pid, password).await? {
        LoginOutcome::Success => {
            tracing::info!("Administrator {} logged in", pid);
            run(config).await
        }
        LoginOutcome::Failure(message) => Err(RoadwatchError::Gateway(message)),
    }
}

/// Run the console with the given configuration: start the pollers, the
/// feed client, and the dashboard, and block until shutdown.
pub async fn run(config: Config) -> Result<()> {
    let http: Arc<dyn io::HttpClient> = Arc::new(ReqwestHttpClient::default());
    let gateway = Arc::new(ApiGateway::new(&config.gateway, http));
    let state = state::new_state_handle();
    let cancel = CancellationToken::new();

    // Build the polling targets
    let targets: Vec<Arc<dyn PollTarget>> = vec![
        Arc::new(AlertsPoll::new(
            Arc::clone(&gateway),
            Duration::from_secs(config.gateway.alerts_interval_seconds),
        )),
        Arc::new(SessionsPoll::new(
            Arc::clone(&gateway),
            Duration::from_secs(config.gateway.sessions_interval_seconds),
        )),
        Arc::new(AdminPoll::new(
            Arc::clone(&gateway),
            Duration::from_secs(config.gateway.admin_interval_seconds),
        )),
    ];

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    // Start dashboard if enabled
    if config.dashboard.enabled {
        let dashboard_port = config.dashboard.port;
        let dashboard_state = Arc::clone(&state);
        let cancel_for_dashboard = cancel.clone();

        tokio::spawn(async move {
            let router = dashboard::build_router(dashboard_state);
            let addr = SocketAddr::from(([0, 0, 0, 0], dashboard_port));
            tracing::info!("Dashboard listening on http://{}", addr);

            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!(
                        "Failed to bind dashboard to port {}: {}. Continuing without dashboard.",
                        dashboard_port,
                        e
                    );
                    return;
                }
            };

            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    cancel_for_dashboard.cancelled().await;
                })
                .await
                .ok();

            tracing::debug!("Dashboard stopped");
        });
    }

    let mut handles = Vec::new();

    for target in targets {
        handles.push(tokio::spawn(poll_loop(
            target,
            Arc::clone(&state),
            cancel.clone(),
        )));
    }

    let feed_client = FeedClient::new(&config.feed, Arc::new(WsFeedConnector));
    let feed_state = Arc::clone(&state);
    let feed_cancel = cancel.clone();
    handles.push(tokio::spawn(async move {
        feed_client.run(feed_state, feed_cancel).await;
    }));

    tracing::info!("Roadwatch console started");

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!("Task terminated abnormally: {}", e);
        }
    }

    tracing::info!("Roadwatch console stopped");
    Ok(())
}
