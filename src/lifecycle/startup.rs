//! Startup orchestration.
//!
//! # Order
//! ```text
//! open engine → bind listener → spawn engine initialization → accept
//! ```
//!
//! The listener accepts before the engine is ready; connections that finish
//! their preamble early wait on the readiness signal. A failed initialization
//! triggers shutdown and is returned to the caller.

use std::sync::Arc;
use thiserror::Error;

use crate::config::{Mode, ServerConfig};
use crate::engine::{EmbeddedEngine, Engine, EngineError, NegotiationGuard};
use crate::lifecycle::Shutdown;
use crate::net::listener::{Listener, ListenerError};
use crate::net::{Frontend, Server};
use crate::preamble::Preamble;
use crate::session::RawSession;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("engine initialization failed: {0}")]
    Engine(#[from] EngineError),
}

/// Bind, start the engine and serve until `shutdown` fires.
pub async fn run(config: ServerConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let engine = Arc::new(EmbeddedEngine::open(&config.engine));
    let listener = Listener::bind(&config.listener).await?;
    serve(&config, engine, listener, shutdown).await
}

/// Serve on an already bound listener.
pub async fn serve(
    config: &ServerConfig,
    engine: Arc<EmbeddedEngine>,
    listener: Listener,
    shutdown: Shutdown,
) -> Result<(), StartupError> {
    // Subscribe before initialization can trigger shutdown.
    let shutdown_rx = shutdown.subscribe();

    let init = {
        let engine = Arc::clone(&engine);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let result = engine.initialize().await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "Engine initialization failed");
                shutdown.trigger();
            }
            result
        })
    };

    let drain_timeout = config.listener.drain_timeout();
    match config.mode {
        Mode::Socket => {
            let handler = Arc::new(RawSession::new(Arc::clone(&engine)));
            let preamble = Preamble::new(handler, engine.ready().clone())
                .with_timeout(config.preamble.timeout());
            Server::new(listener, Frontend::Socket(Arc::new(preamble)))
                .with_drain_timeout(drain_timeout)
                .serve(shutdown_rx)
                .await?;
        }
        Mode::Call => {
            if config.preamble.timeout_secs.is_some() {
                tracing::warn!("preamble.timeout_secs has no effect in call mode");
            }
            let handler = Arc::new(RawSession::new(NegotiationGuard::new(Arc::clone(&engine))));
            Server::new(listener, Frontend::Call(handler))
                .with_drain_timeout(drain_timeout)
                .serve(shutdown_rx)
                .await?;
        }
    }

    if init.is_finished() {
        if let Ok(Err(e)) = init.await {
            return Err(e.into());
        }
    } else {
        init.abort();
    }
    Ok(())
}
