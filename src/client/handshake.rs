//! Join sequence: connect, handshake, key exchange, join registration,
//! encryption upgrade and login.

use std::sync::Arc;
use std::time::Duration;

use rsa::RsaPublicKey;
use tracing::debug;

use crate::client::auth::{Session, SessionService};
use crate::error::{Error, Result};
use crate::protocol::crypto::{self, SharedSecret};
use crate::protocol::message::{self, EncryptionRequest};
use crate::protocol::packet::{ids, OFFLINE_SERVER_ID};
use crate::protocol::transport::{expect_packet, PacketSink, PacketSource, PlainTransport};
use crate::state::LoginInfo;

/// Connection lifecycle. Steps only move forward; any failure or
/// disconnect lands in `Left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    TcpConnected,
    HandshakeSent,
    KeysExchanged,
    JoinRegistered,
    EncryptionActive,
    LoggedIn,
    Playing,
    Left,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        !matches!(self, Self::Disconnected | Self::Left)
    }
}

/// Key material derived from the server's encryption request
pub struct KeyExchange {
    pub server_id: String,
    pub public_key_der: Vec<u8>,
    pub public_key: RsaPublicKey,
    pub shared_secret: SharedSecret,
    pub encrypted_secret: Vec<u8>,
    pub encrypted_token: Vec<u8>,
}

impl KeyExchange {
    pub fn new(request: EncryptionRequest) -> Result<Self> {
        let public_key = crypto::parse_public_key(&request.public_key)?;
        let shared_secret = crypto::generate_shared_secret();
        let encrypted_secret = crypto::encrypt_pkcs1(&public_key, &shared_secret)?;
        let encrypted_token = crypto::encrypt_pkcs1(&public_key, &request.verify_token)?;
        Ok(Self {
            server_id: request.server_id,
            public_key_der: request.public_key,
            public_key,
            shared_secret,
            encrypted_secret,
            encrypted_token,
        })
    }

    /// Whether the server wants the join registered with the session service
    pub fn is_online(&self) -> bool {
        self.server_id != OFFLINE_SERVER_ID
    }

    pub fn server_hash(&self) -> String {
        crypto::server_hash(&self.server_id, &self.shared_secret, &self.public_key_der)
    }
}

pub(crate) struct JoinParams<'a> {
    pub session: &'a Session,
    pub service: Arc<dyn SessionService>,
    pub connect_timeout: Duration,
    pub log_packets: bool,
}

/// Live connection produced by a successful join
pub(crate) struct Established {
    pub source: PacketSource,
    pub sink: PacketSink,
    pub login: LoginInfo,
}

/// Run the full join sequence, recording progress in `state`
pub(crate) async fn establish(
    params: JoinParams<'_>,
    host: &str,
    port: u16,
    state: &mut ConnectionState,
) -> Result<Established> {
    let mut transport =
        PlainTransport::connect(host, port, params.connect_timeout, params.log_packets).await?;
    *state = ConnectionState::TcpConnected;

    debug!("sending handshake");
    transport
        .send(&message::handshake(&params.session.username, host, port))
        .await?;
    *state = ConnectionState::HandshakeSent;
    transport.expect(&[ids::ENCRYPTION_REQUEST]).await?;
    let request = EncryptionRequest::read(transport.reader()).await?;

    let keys = KeyExchange::new(request)?;
    *state = ConnectionState::KeysExchanged;

    register_join(&params, &keys).await?;
    *state = ConnectionState::JoinRegistered;

    debug!("sending encryption response");
    transport
        .send(&message::encryption_response(
            keys.encrypted_secret.clone(),
            keys.encrypted_token.clone(),
        ))
        .await?;
    transport.expect(&[ids::ENCRYPTION_RESPONSE]).await?;
    transport.reader().read_byte_array().await?;
    transport.reader().read_byte_array().await?;

    debug!("switching to encrypted transport");
    let (mut source, mut sink) = transport.upgrade(&keys.shared_secret)?;
    *state = ConnectionState::EncryptionActive;

    debug!("sending login intent");
    sink.send(&message::login_intent()).await?;
    expect_packet(&mut source, &[ids::LOGIN], params.log_packets).await?;
    let login = message::read_login(&mut source).await?;
    *state = ConnectionState::LoggedIn;

    Ok(Established { source, sink, login })
}

async fn register_join(params: &JoinParams<'_>, keys: &KeyExchange) -> Result<()> {
    if !keys.is_online() {
        debug!("server is in offline mode, skipping join registration");
        return Ok(());
    }
    debug!("registering join with session service");
    let hash = keys.server_hash();
    let service = params.service.clone();
    let session = params.session.clone();
    tokio::task::spawn_blocking(move || service.join_server(&session, &hash))
        .await
        .map_err(|e| Error::Auth(e.to_string()))?
}
