//! # Watch Loop
//!
//! Watches ManagedCertificate resources, feeds the work queue and drives
//! the periodic resync until a shutdown signal arrives.

use crate::config::ControllerConfig;
use crate::controller::dispatcher::{Dispatcher, Reconcile};
use crate::controller::server::ServerState;
use crate::crd::ManagedCertificate;
use crate::runtime::error_policy::handle_watch_stream_error;
use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use kube::api::Api;
use kube_runtime::reflector::store::Writer;
use kube_runtime::{watcher, WatchStreamExt};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Why [`watch_until`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    /// A shutdown signal arrived, carrying its name
    Signal(&'static str),
    /// The event stream ended on its own
    StreamEnded,
}

/// Run the controller until SIGINT/SIGTERM
///
/// Every object the watch touches is enqueued, and every resync interval
/// all cached objects are. On shutdown the queue stops handing out keys and
/// the workers finish their in-flight reconciliation.
///
/// # Errors
///
/// Returns an error if the signal handlers cannot be installed or a worker
/// task panicked.
pub async fn run_watch_loop<R: Reconcile + 'static>(
    mcrts: Api<ManagedCertificate>,
    writer: Writer<ManagedCertificate>,
    dispatcher: Arc<Dispatcher<R>>,
    config: &ControllerConfig,
    server_state: Arc<ServerState>,
) -> Result<()> {
    let shutdown = shutdown_signal().context("Failed to install shutdown signal handlers")?;

    let reader = writer.as_reader();
    let readiness = {
        let server_state = Arc::clone(&server_state);
        tokio::spawn(async move {
            if reader.wait_until_ready().await.is_ok() {
                info!("ManagedCertificate cache synced");
                server_state.set_ready(true);
            }
        })
    };

    info!(workers = config.workers, "Starting workers");
    let workers = tokio::spawn(Arc::clone(&dispatcher).run_workers(config.workers));
    let resync = tokio::spawn(resync_loop(
        Arc::clone(&dispatcher),
        config.resync_interval(),
    ));

    info!("Starting controller watch loop...");
    let events = watcher(mcrts, watcher::Config::default())
        .reflect(writer)
        .touched_objects();

    match watch_until(events, &dispatcher, config.watch_restart_delay(), shutdown).await {
        WatchExit::Signal(signal) => {
            info!("Received {}, initiating graceful shutdown...", signal);
        }
        WatchExit::StreamEnded => warn!("Controller watch stream ended, shutting down"),
    }

    server_state.set_ready(false);
    readiness.abort();
    resync.abort();
    drain(&dispatcher, workers).await?;

    info!("Controller stopped gracefully");
    Ok(())
}

/// Resolves with the name of the first SIGINT or SIGTERM received
///
/// The SIGTERM handler is installed before this returns, so a SIGTERM sent
/// afterwards no longer terminates the process even if the future has not
/// been polled yet.
///
/// # Errors
///
/// Returns an error if the SIGTERM handler cannot be installed.
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = &'static str>> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    Ok(async move {
        let interrupt = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for SIGINT: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async move {
            terminate.recv().await;
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = interrupt => "SIGINT",
            () = terminate => "SIGTERM",
        }
    })
}

/// Enqueue every object `events` yields until `shutdown` resolves or the stream ends
///
/// Stream errors pause the loop for the delay chosen by the error policy;
/// the pause itself is cut short by `shutdown`.
pub async fn watch_until<R, S, E, F>(
    events: S,
    dispatcher: &Dispatcher<R>,
    restart_delay: Duration,
    shutdown: F,
) -> WatchExit
where
    R: Reconcile + 'static,
    S: Stream<Item = Result<ManagedCertificate, E>>,
    E: Display,
    F: Future<Output = &'static str>,
{
    let mut events = std::pin::pin!(events);
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        let event = tokio::select! {
            signal = &mut shutdown => return WatchExit::Signal(signal),
            event = events.next() => event,
        };

        match event {
            Some(Ok(mcrt)) => dispatcher.enqueue_resource(&mcrt),
            Some(Err(e)) => {
                let delay = handle_watch_stream_error(&e.to_string(), restart_delay);
                if !delay.is_zero() {
                    tokio::select! {
                        signal = &mut shutdown => return WatchExit::Signal(signal),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
            None => return WatchExit::StreamEnded,
        }
    }
}

/// Shut the queue down and wait for the workers to finish their in-flight keys
///
/// # Errors
///
/// Returns an error if the worker pool task panicked.
pub async fn drain<R: Reconcile + 'static>(
    dispatcher: &Dispatcher<R>,
    workers: JoinHandle<()>,
) -> Result<()> {
    dispatcher.shutdown();

    info!("Waiting for in-flight reconciliations to complete...");
    workers.await.context("Worker pool failed")
}

/// Enqueue every resource once per `period`, starting immediately
async fn resync_loop<R: Reconcile + 'static>(dispatcher: Arc<Dispatcher<R>>, period: Duration) {
    let mut interval = tokio::time::interval(period.max(Duration::from_secs(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if let Err(e) = dispatcher.enqueue_all().await {
            error!("Resync of ManagedCertificates failed: {}", e);
        }
    }
}
