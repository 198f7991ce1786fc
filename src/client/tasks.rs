//! Periodic background senders.
//!
//! Each sender runs as its own task with a cancellation token. Stopping a
//! task cancels the token and waits for the task to finish, so once
//! [`BackgroundTask::stop`] returns the task no longer touches the
//! connection.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::auth::{Session, SessionService};
use crate::error::Error;
use crate::protocol::message;
use crate::protocol::transport::PacketSink;
use crate::state::SharedPlayer;

/// Outbound half shared by the receive loop, the position sender and caller
/// operations. Each lock covers exactly one packet.
pub type SharedSink<W = OwnedWriteHalf> = Arc<tokio::sync::Mutex<PacketSink<W>>>;

/// Handle to a spawned background sender
pub struct BackgroundTask {
    name: &'static str,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    pub fn spawn<F, Fut>(name: &'static str, task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let handle = tokio::spawn(task(token.clone()));
        debug!("started {}", name);
        Self { name, token, handle }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signal the task without waiting for it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Signal the task and wait until it has exited
    pub async fn stop(self) {
        debug!("stopping {}", self.name);
        self.token.cancel();
        if let Err(e) = self.handle.await {
            warn!("{} ended abnormally: {}", self.name, e);
        }
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Send the player's position and look every `period`.
///
/// The first failed write is reported and ends the task; the connection is
/// not retried.
pub async fn run_position_sender<W>(
    sink: SharedSink<W>,
    player: SharedPlayer,
    period: Duration,
    errors: UnboundedSender<Error>,
    token: CancellationToken,
) where
    W: AsyncWrite + Unpin + Send,
{
    let mut ticker = ticker(period);
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let packet = message::position_look(&player.lock());
                if let Err(e) = sink.lock().await.send(&packet).await {
                    warn!("position sender stopped: {}", e);
                    let _ = errors.send(e);
                    break;
                }
            }
        }
    }
}

/// Refresh the web session every `period`
pub async fn run_keep_alive(
    service: Arc<dyn SessionService>,
    session: Session,
    period: Duration,
    errors: UnboundedSender<Error>,
    token: CancellationToken,
) {
    let mut ticker = ticker(period);
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let service = service.clone();
                let session = session.clone();
                let result = tokio::task::spawn_blocking(move || service.keep_alive(&session)).await;
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        let _ = errors.send(e);
                    }
                    Err(e) => {
                        let _ = errors.send(Error::Auth(e.to_string()));
                    }
                }
            }
        }
    }
}
