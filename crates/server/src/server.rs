//! Bootstrap and shutdown around a single client connection.
//!
//! The client sees `Selectors` and `Playwright` announced under the root as
//! soon as the transport starts. When the client goes away, open contexts get
//! a bounded grace period to close before the connection is dropped.

use std::sync::Arc;

use anyhow::Result;
use pw_dispatch_runtime::{Connection, Dispatcher, PipeTransport};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::ServerConfig;
use crate::dispatchers::{playwright, selectors};
use crate::domain::Playwright;

/// Domain objects and dispatchers attached at startup.
pub struct Bootstrap {
    pub playwright: Arc<Playwright>,
    pub playwright_dispatcher: Arc<Dispatcher>,
    pub selectors_dispatcher: Arc<Dispatcher>,
}

/// Attaches the top-level dispatchers to the connection's root.
pub fn bootstrap(connection: &Arc<Connection>) -> Result<Bootstrap> {
    let root = connection.root()?;
    let playwright = Arc::new(Playwright::new());
    let selectors_dispatcher = selectors::create(&root, Arc::clone(playwright.selectors()));
    let playwright_dispatcher =
        playwright::create(&root, Arc::clone(&playwright), &selectors_dispatcher);
    Ok(Bootstrap {
        playwright,
        playwright_dispatcher,
        selectors_dispatcher,
    })
}

/// Serves one client over `writer`/`reader` until the client disconnects,
/// then shuts down gracefully within the configured grace period.
pub async fn serve<W, R>(config: ServerConfig, writer: W, reader: R) -> Result<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
    R: AsyncRead + Unpin + Send + 'static,
{
    let connection = Connection::new(config.schema);
    let Bootstrap { playwright, .. } = bootstrap(&connection)?;
    tracing::info!(
        dispatchers = connection.dispatcher_count(),
        "server ready"
    );

    let (transport, message_rx) = PipeTransport::new(writer, reader);
    connection
        .run(transport.into_transport_parts(message_rx))
        .await;

    tracing::info!("client disconnected, closing contexts");
    match tokio::time::timeout(config.grace_period, playwright.close_all()).await {
        Ok(closed) => tracing::info!(closed, "graceful shutdown complete"),
        Err(_) => tracing::warn!(
            grace_period = ?config.grace_period,
            "graceful shutdown timed out"
        ),
    }
    connection.close();
    Ok(())
}

/// [`serve`] over the process's stdout and stdin.
pub async fn serve_stdio(config: ServerConfig) -> Result<()> {
    serve(config, tokio::io::stdout(), tokio::io::stdin()).await
}
