//! ghwatcher informational HTTP endpoint.
//!
//! ghwatcher does its work as a one-shot job; this server only answers
//! `GET /` with a static page pointing visitors at the workflow. It exists so
//! the repository can be deployed to platforms that expect a listening
//! process.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** No domain logic; binds a socket and serves one page.

use std::net::SocketAddr;

use axum::response::Html;
use axum::routing::get;
use axum::Router;
use thiserror::Error;
use tracing::info;

/// Environment variable holding the port.
pub const PORT_VAR: &str = "PORT";
/// Port used when [`PORT_VAR`] is unset.
pub const DEFAULT_PORT: u16 = 3000;

const LANDING_PAGE: &str = r#"
  <html>
    <center>
    This repository is made to be executed by a GitHub Actions workflow. <br />
    See README.md for more details.
    </center>
  </html>
"#;

/// Failures of the landing-page server.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// `PORT` is not a valid port number.
    #[error("PORT must be a valid u16, got '{value}'")]
    InvalidPort {
        /// The rejected value.
        value: String,
    },

    /// The socket could not be bound or the server failed.
    #[error("Landing page server failed on {addr}: {source}")]
    Io {
        /// Address the server was bound to.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Parses the port from an optional raw value.
pub fn port_from(raw: Option<String>) -> Result<u16, ListenerError> {
    match raw {
        None => Ok(DEFAULT_PORT),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ListenerError::InvalidPort { value }),
    }
}

async fn landing_page() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

/// Routes served by the landing-page server.
pub fn router() -> Router {
    Router::new().route("/", get(landing_page))
}

/// Serves the landing page on `port` until Ctrl-C.
pub async fn serve(port: u16) -> Result<(), ListenerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Io { addr, source })?;
    info!("Listening on http://127.0.0.1:{port}");

    axum::serve(listener, router())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(|source| ListenerError::Io { addr, source })
}
