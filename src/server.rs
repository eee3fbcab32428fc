use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use axum::{Extension, Router, routing::get};
use tokio::{
    net::TcpListener,
    sync::watch,
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{api, error::AuthError, types::CallbackOutcome};

/// How long in-flight responses get to finish once the listener is closed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Short-lived HTTP listener that receives the OAuth redirect.
///
/// The port is bound in [`CallbackListener::bind`] so the redirect can never
/// arrive before anyone listens. For a loopback address the other loopback
/// family is bound on the same port too, so a `localhost` redirect URI lands
/// here whichever address the browser resolves first.
///
/// [`CallbackListener::await_outcome`] consumes the listener and always closes
/// it before returning; dropping it on any other path aborts the server task,
/// which releases the port as well.
pub struct CallbackListener {
    addr: SocketAddr,
    outcome: watch::Receiver<CallbackOutcome>,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl CallbackListener {
    pub async fn bind(addr: SocketAddr) -> Result<Self, AuthError> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let sibling = bind_sibling_loopback(addr).await;

        let (outcome_tx, outcome_rx) = watch::channel(CallbackOutcome::Pending);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let app = Router::new()
            .route("/callback", get(api::callback))
            .layer(Extension(Arc::new(outcome_tx)));

        let primary = serve(listener, app.clone(), shutdown_rx.clone());
        let task = tokio::spawn(async move {
            match sibling {
                Some(sibling) => {
                    tokio::join!(primary, serve(sibling, app, shutdown_rx));
                }
                None => primary.await,
            }
        });

        debug!("Callback listener bound to {}", addr);

        Ok(Self {
            addr,
            outcome: outcome_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Waits until the redirect settles the attempt or `timeout` elapses.
    ///
    /// Returns the terminal outcome, never [`CallbackOutcome::Pending`]. On
    /// timeout the result is [`AuthError::Timeout`]. The port is released
    /// before this returns, whichever way it went.
    pub async fn await_outcome(mut self, timeout: Duration) -> Result<CallbackOutcome, AuthError> {
        let outcome = &mut self.outcome;
        let waited = tokio::time::timeout(timeout, async move {
            outcome
                .wait_for(|o| !o.is_pending())
                .await
                .map(|o| o.clone())
        })
        .await;

        let result = match waited {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => Err(AuthError::Listener(std::io::Error::other(
                "callback listener stopped before a redirect arrived",
            ))),
            Err(_) => Err(AuthError::Timeout),
        };

        self.close().await;
        result
    }

    async fn close(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }

        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                task.abort();
                let _ = task.await;
            }
        }

        debug!("Callback listener on {} closed", self.addr);
    }
}

async fn serve(listener: TcpListener, app: Router, mut shutdown: watch::Receiver<bool>) {
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            // a dropped sender also means shut down
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await;
    if let Err(e) = result {
        warn!("Callback listener stopped with error: {}", e);
    }
}

/// Binds `127.0.0.1` next to `::1` (or the reverse) on the same port. Hosts
/// without the other family just get the primary listener.
async fn bind_sibling_loopback(addr: SocketAddr) -> Option<TcpListener> {
    let other: IpAddr = match addr.ip() {
        IpAddr::V4(ip) if ip.is_loopback() => Ipv6Addr::LOCALHOST.into(),
        IpAddr::V6(ip) if ip.is_loopback() => Ipv4Addr::LOCALHOST.into(),
        _ => return None,
    };

    match TcpListener::bind(SocketAddr::new(other, addr.port())).await {
        Ok(listener) => Some(listener),
        Err(e) => {
            debug!("Not listening on {}:{}: {}", other, addr.port(), e);
            None
        }
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
