use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::client::auth::{HttpSessionService, OfflineSessionService, Session, SessionService};
use crate::client::dispatch::{Dispatcher, Flow};
use crate::client::events::{DisconnectReason, EventHandler, GameEvent};
use crate::client::handshake::{self, ConnectionState, JoinParams};
use crate::client::tasks::{self, BackgroundTask, SharedSink};
use crate::error::{Error, Result};
use crate::protocol::message;
use crate::protocol::packet::split_address;
use crate::protocol::transport::PacketSource;
use crate::state::{Block, Chunk, LoginInfo, PlayerState, ServerStatus, SharedPlayer, World};

/// Pause between the disconnect packet and closing the socket
const LEAVE_GRACE: Duration = Duration::from_millis(100);

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Keep decoded chunk data in memory
    pub retain_world: bool,
    /// Trace every packet id and sent field list
    pub log_packets: bool,
    pub position_interval: Duration,
    pub keep_alive_interval: Duration,
    pub connect_timeout: Duration,
    /// Sent to the server by [`Client::leave`]
    pub leave_message: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retain_world: false,
            log_packets: false,
            position_interval: Duration::from_millis(50),
            keep_alive_interval: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
            leave_message: "Quitting".to_string(),
        }
    }
}

/// Builder for creating clients
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    service: Option<Arc<dyn SessionService>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retain_world(mut self, retain: bool) -> Self {
        self.config.retain_world = retain;
        self
    }

    pub fn log_packets(mut self, log: bool) -> Self {
        self.config.log_packets = log;
        self
    }

    pub fn position_interval(mut self, interval: Duration) -> Self {
        self.config.position_interval = interval;
        self
    }

    pub fn keep_alive_interval(mut self, interval: Duration) -> Self {
        self.config.keep_alive_interval = interval;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn leave_message(mut self, message: impl Into<String>) -> Self {
        self.config.leave_message = message.into();
        self
    }

    pub fn session_service(mut self, service: impl SessionService + 'static) -> Self {
        self.service = Some(Arc::new(service));
        self
    }

    /// Authenticate against the session service and create a client
    pub async fn login(self, username: &str, password: &str) -> Result<Client> {
        let service = self
            .service
            .unwrap_or_else(|| Arc::new(HttpSessionService::new()));
        info!("logging in as {}", username);
        let session = {
            let service = service.clone();
            let username = username.to_string();
            let password = password.to_string();
            tokio::task::spawn_blocking(move || service.login(&username, &password))
                .await
                .map_err(|e| Error::Auth(e.to_string()))??
        };
        Ok(Client::with_session(self.config, session, service))
    }

    /// Create a client with an empty session token.
    ///
    /// Must be called inside a Tokio runtime; starts the session keep-alive.
    pub fn offline(self, username: impl Into<String>) -> Client {
        let service = self.service.unwrap_or_else(|| Arc::new(OfflineSessionService));
        Client::with_session(self.config, Session::offline(username), service)
    }
}

/// Cloneable handle for sending chat while the receive loop runs
#[derive(Clone)]
pub struct ChatSender {
    sink: SharedSink,
}

impl ChatSender {
    pub async fn chat(&self, text: &str) -> Result<()> {
        self.sink.lock().await.send(&message::chat(text)).await
    }
}

/// Live connection to a server
struct Connection {
    source: PacketSource,
    sink: SharedSink,
    position_sender: BackgroundTask,
}

/// A game client.
///
/// Created by logging in (or offline), then [`join`](Client::join)ed to a
/// server. [`run`](Client::run) drives the receive loop until the session
/// ends.
pub struct Client {
    config: ClientConfig,
    session: Session,
    service: Arc<dyn SessionService>,
    state: ConnectionState,
    connection: Option<Connection>,
    player: SharedPlayer,
    dispatcher: Dispatcher,
    errors_tx: UnboundedSender<Error>,
    errors_rx: Option<UnboundedReceiver<Error>>,
    keep_alive: Option<BackgroundTask>,
    disconnect_reason: Option<DisconnectReason>,
}

impl Client {
    pub async fn login(username: &str, password: &str) -> Result<Self> {
        ClientBuilder::new().login(username, password).await
    }

    /// Must be called inside a Tokio runtime; starts the session keep-alive.
    pub fn offline(username: impl Into<String>) -> Self {
        ClientBuilder::new().offline(username)
    }

    /// Must be called inside a Tokio runtime; starts the session keep-alive.
    pub fn with_session(config: ClientConfig, session: Session, service: Arc<dyn SessionService>) -> Self {
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let player: SharedPlayer = Arc::new(parking_lot::Mutex::new(PlayerState::default()));

        let keep_alive = {
            let service = service.clone();
            let session = session.clone();
            let errors = errors_tx.clone();
            let period = config.keep_alive_interval;
            BackgroundTask::spawn("session keep-alive", move |token| {
                tasks::run_keep_alive(service, session, period, errors, token)
            })
        };

        Self {
            dispatcher: Dispatcher::new(player.clone(), config.retain_world, config.log_packets),
            config,
            session,
            service,
            state: ConnectionState::Disconnected,
            connection: None,
            player,
            errors_tx,
            errors_rx: Some(errors_rx),
            keep_alive: Some(keep_alive),
            disconnect_reason: None,
        }
    }

    /// Connect to `addr` (`host` or `host:port`) and log in.
    ///
    /// On success the position sender is running and the caller is expected
    /// to drive [`run`](Client::run). Any failure leaves the client in
    /// [`ConnectionState::Left`].
    pub async fn join(&mut self, addr: &str) -> Result<()> {
        if self.connection.is_some() {
            if let Err(e) = self.leave().await {
                debug!("leaving previous server failed: {}", e);
            }
        }
        info!("joining server {}", addr);
        let (host, port) = split_address(addr)?;
        self.state = ConnectionState::Disconnected;
        self.disconnect_reason = None;

        let params = JoinParams {
            session: &self.session,
            service: self.service.clone(),
            connect_timeout: self.config.connect_timeout,
            log_packets: self.config.log_packets,
        };
        let established = match handshake::establish(params, &host, port, &mut self.state).await {
            Ok(established) => established,
            Err(e) => {
                warn!("join failed in state {:?}: {}", self.state, e);
                self.state = ConnectionState::Left;
                self.disconnect_reason = Some(match &e {
                    Error::Kicked(reason) => DisconnectReason::Kicked(reason.clone()),
                    other => DisconnectReason::Error(other.to_string()),
                });
                return Err(e);
            }
        };

        self.dispatcher.begin_session(established.login);
        let sink: SharedSink = Arc::new(tokio::sync::Mutex::new(established.sink));
        let position_sender = {
            let sink = sink.clone();
            let player = self.player.clone();
            let errors = self.errors_tx.clone();
            let period = self.config.position_interval;
            BackgroundTask::spawn("position sender", move |token| {
                tasks::run_position_sender(sink, player, period, errors, token)
            })
        };

        self.connection = Some(Connection {
            source: established.source,
            sink,
            position_sender,
        });
        self.state = ConnectionState::Playing;
        info!("joined {}", addr);
        Ok(())
    }

    /// Run the receive loop until the server kicks us or the connection fails.
    ///
    /// Returns the kick message. Fatal errors are also sent to the error
    /// sink. Either way the connection is torn down before returning.
    pub async fn run(&mut self) -> Result<String> {
        let result = loop {
            let Some(connection) = self.connection.as_mut() else {
                break Err(Error::NotConnected);
            };
            match self
                .dispatcher
                .dispatch_next(&mut connection.source, &connection.sink)
                .await
            {
                Ok(Flow::Continue) => {}
                Ok(Flow::Kicked(reason)) => break Ok(reason),
                Err(e) => break Err(e),
            }
        };

        match &result {
            Ok(reason) => {
                self.teardown().await;
                self.disconnect_reason = Some(DisconnectReason::Kicked(reason.clone()));
            }
            Err(Error::NotConnected) => {}
            Err(e) => {
                let _ = self.errors_tx.send(e.clone());
                self.teardown().await;
                self.disconnect_reason = Some(DisconnectReason::Error(e.to_string()));
                self.dispatcher.emit(GameEvent::Disconnected {
                    reason: DisconnectReason::Error(e.to_string()),
                });
            }
        }
        result
    }

    /// Send a chat line
    pub async fn chat(&self, text: &str) -> Result<()> {
        let connection = self.connection.as_ref().ok_or(Error::NotConnected)?;
        connection.sink.lock().await.send(&message::chat(text)).await
    }

    pub fn chat_sender(&self) -> Option<ChatSender> {
        self.connection.as_ref().map(|c| ChatSender { sink: c.sink.clone() })
    }

    /// Notify the server, wait briefly, then disconnect
    pub async fn leave(&mut self) -> Result<()> {
        let Some(connection) = self.connection.as_ref() else {
            return Err(Error::NotConnected);
        };
        info!("disconnecting");
        let packet = message::disconnect(&self.config.leave_message);
        let sent = connection.sink.lock().await.send(&packet).await;
        tokio::time::sleep(LEAVE_GRACE).await;
        self.leave_no_kick().await?;
        sent
    }

    /// Disconnect without telling the server
    pub async fn leave_no_kick(&mut self) -> Result<()> {
        if self.connection.is_none() {
            return Err(Error::NotConnected);
        }
        self.teardown().await;
        if self.disconnect_reason.is_none() {
            self.disconnect_reason = Some(DisconnectReason::UserRequested);
        }
        Ok(())
    }

    /// Leave any server and stop the session keep-alive
    pub async fn logout(mut self) {
        if self.connection.is_some() {
            if let Err(e) = self.leave().await {
                debug!("leave during logout failed: {}", e);
            }
        }
        if let Some(task) = self.keep_alive.take() {
            task.stop().await;
        }
    }

    /// Stop the position sender, then close the socket
    async fn teardown(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.position_sender.stop().await;
            if let Err(e) = connection.sink.lock().await.shutdown().await {
                debug!("socket shutdown: {}", e);
            }
            drop(connection.source);
        }
        self.state = ConnectionState::Left;
    }

    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Option<Block> {
        self.dispatcher.world().get_block(x, y, z)
    }

    pub fn get_chunk(&self, cx: i32, cy: i32, cz: i32) -> Option<&Chunk> {
        self.dispatcher.world().get_chunk(cx, cy, cz)
    }

    pub fn world(&self) -> &World {
        self.dispatcher.world()
    }

    /// Shared player record; changes are picked up by the position sender
    pub fn player(&self) -> SharedPlayer {
        self.player.clone()
    }

    pub fn login_info(&self) -> Option<&LoginInfo> {
        self.dispatcher.login()
    }

    pub fn status(&self) -> &ServerStatus {
        self.dispatcher.status()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn disconnect_reason(&self) -> Option<&DisconnectReason> {
        self.disconnect_reason.as_ref()
    }

    /// Receiver for background and receive-loop errors. Only available once.
    pub fn take_errors(&mut self) -> Option<UnboundedReceiver<Error>> {
        self.errors_rx.take()
    }

    pub fn set_event_handler(&mut self, handler: impl EventHandler + 'static) {
        self.dispatcher.set_handler(Box::new(handler));
    }

    pub fn is_keep_alive_running(&self) -> bool {
        self.keep_alive.as_ref().is_some_and(BackgroundTask::is_running)
    }

    pub fn is_position_sender_running(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|c| c.position_sender.is_running())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(task) = &self.keep_alive {
            task.cancel();
        }
        if let Some(connection) = &self.connection {
            connection.position_sender.cancel();
        }
    }
}
