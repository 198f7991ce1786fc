//! End-to-end join against a scripted server on a loopback socket.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mcclient::codec::{BinaryWriter, PacketReader};
use mcclient::protocol::crypto::{DecryptingReader, StreamEncryptor};
use mcclient::protocol::ids;
use mcclient::{Client, ClientBuilder, ConnectionState, DisconnectReason, Error, GameEvent};
use rand::rngs::OsRng;
use rsa::pkcs8::EncodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const VERIFY_TOKEN: [u8; 4] = [9, 8, 7, 6];

/// Body length of a serverbound position and look packet
const POSITION_LOOK_BODY: u64 = 8 * 4 + 4 * 2 + 1;

struct PlainServer {
    reader: PacketReader<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl PlainServer {
    async fn accept(listener: &TcpListener) -> Self {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, writer) = stream.into_split();
        Self {
            reader: PacketReader::new(BufReader::new(read_half)),
            writer,
        }
    }

    async fn send(&mut self, w: BinaryWriter) {
        self.writer.write_all(&w.into_vec()).await.unwrap();
    }

    /// Returns the username from the handshake
    async fn read_handshake(&mut self) -> String {
        assert_eq!(self.reader.read_u8().await.unwrap(), ids::HANDSHAKE);
        assert_eq!(self.reader.read_u8().await.unwrap(), 39);
        let username = self.reader.read_string().await.unwrap();
        let _host = self.reader.read_string().await.unwrap();
        let _port = self.reader.read_i32().await.unwrap();
        username
    }

    async fn kick(&mut self, reason: &str) {
        let mut w = BinaryWriter::new();
        w.write_u8(ids::KICK);
        w.write_string(reason);
        self.send(w).await;
    }

    /// Run the key exchange and switch to the cipher
    async fn exchange_keys(mut self, key: &RsaPrivateKey) -> EncryptedServer {
        let der = key.to_public_key().to_public_key_der().unwrap();
        let mut w = BinaryWriter::new();
        w.write_u8(ids::ENCRYPTION_REQUEST);
        w.write_string("-");
        w.write_byte_array(der.as_bytes());
        w.write_byte_array(&VERIFY_TOKEN);
        self.send(w).await;

        assert_eq!(self.reader.read_u8().await.unwrap(), ids::ENCRYPTION_RESPONSE);
        let encrypted_secret = self.reader.read_byte_array().await.unwrap();
        let encrypted_token = self.reader.read_byte_array().await.unwrap();
        let secret = key.decrypt(Pkcs1v15Encrypt, &encrypted_secret).unwrap();
        let token = key.decrypt(Pkcs1v15Encrypt, &encrypted_token).unwrap();
        assert_eq!(secret.len(), 16);
        assert_eq!(token, VERIFY_TOKEN);

        let mut w = BinaryWriter::new();
        w.write_u8(ids::ENCRYPTION_RESPONSE);
        w.write_byte_array(&[]);
        w.write_byte_array(&[]);
        self.send(w).await;

        let reader = DecryptingReader::new(self.reader.into_inner(), &secret).unwrap();
        let mut server = EncryptedServer {
            reader: PacketReader::new(reader),
            writer: self.writer,
            cipher: StreamEncryptor::new(&secret).unwrap(),
        };
        assert_eq!(server.reader.read_u8().await.unwrap(), ids::CLIENT_STATUSES);
        assert_eq!(server.reader.read_u8().await.unwrap(), 0);
        server
    }
}

struct EncryptedServer {
    reader: PacketReader<DecryptingReader<BufReader<OwnedReadHalf>>>,
    writer: OwnedWriteHalf,
    cipher: StreamEncryptor,
}

impl EncryptedServer {
    async fn send(&mut self, w: BinaryWriter) {
        let mut data = w.into_vec();
        self.cipher.apply(&mut data);
        self.writer.write_all(&data).await.unwrap();
    }

    async fn login_success(&mut self) {
        let mut w = BinaryWriter::new();
        w.write_u8(ids::LOGIN);
        w.write_i32(42);
        w.write_string("default");
        w.write_i8(0);
        w.write_i8(0);
        w.write_i8(1);
        w.write_u8(0);
        w.write_u8(20);
        self.send(w).await;
    }

    async fn kick(&mut self, reason: &str) {
        let mut w = BinaryWriter::new();
        w.write_u8(ids::KICK);
        w.write_string(reason);
        self.send(w).await;
    }

    /// Next packet id that is not a periodic position report
    async fn next_id(&mut self) -> u8 {
        loop {
            let id = self.reader.read_u8().await.unwrap();
            if id != ids::PLAYER_POSITION_LOOK {
                return id;
            }
            self.reader.skip(POSITION_LOOK_BODY).await.unwrap();
        }
    }
}

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (listener, addr)
}

fn server_key() -> RsaPrivateKey {
    RsaPrivateKey::new(&mut OsRng, 1024).unwrap()
}

fn test_client() -> Client {
    ClientBuilder::new()
        .retain_world(true)
        .position_interval(Duration::from_millis(10))
        .leave_message("bye now")
        .offline("steve")
}

#[tokio::test]
async fn test_join_and_run_until_kicked() {
    let (listener, addr) = listen().await;
    let server: JoinHandle<()> = tokio::spawn(async move {
        let key = server_key();
        let mut plain = PlainServer::accept(&listener).await;
        assert_eq!(plain.read_handshake().await, "steve");
        let mut server = plain.exchange_keys(&key).await;
        server.login_success().await;

        let mut w = BinaryWriter::new();
        w.write_u8(ids::SPAWN_POSITION);
        w.write_i32(100);
        w.write_i32(64);
        w.write_i32(-100);
        w.write_u8(ids::CHAT);
        w.write_string("§ehello");
        w.write_u8(ids::KEEP_ALIVE);
        w.write_i32(77);
        server.send(w).await;

        assert_eq!(server.next_id().await, ids::KEEP_ALIVE);
        assert_eq!(server.reader.read_i32().await.unwrap(), 77);

        let mut w = BinaryWriter::new();
        w.write_u8(ids::MAP_COLUMN_ALLOCATION);
        w.write_i32(6);
        w.write_i32(-7);
        w.write_bool(true);
        server.send(w).await;
        server.kick("Server closed").await;
    });

    let mut client = test_client();
    let chats = Arc::new(Mutex::new(Vec::new()));
    let seen = chats.clone();
    client.set_event_handler(move |event: GameEvent| {
        if let GameEvent::Chat { message } = event {
            seen.lock().unwrap().push(message);
        }
    });

    client.join(&addr).await.unwrap();
    assert_eq!(client.state(), ConnectionState::Playing);
    assert!(client.is_keep_alive_running());
    assert!(client.is_position_sender_running());
    let login = client.login_info().unwrap();
    assert_eq!(login.entity_id, 42);
    assert_eq!(login.level_type, "default");
    assert_eq!(login.max_players, 20);

    let reason = client.run().await.unwrap();
    assert_eq!(reason, "Server closed");
    assert_eq!(client.state(), ConnectionState::Left);
    assert_eq!(
        client.disconnect_reason(),
        Some(&DisconnectReason::Kicked("Server closed".into()))
    );
    assert!(!client.is_position_sender_running());

    assert_eq!(*chats.lock().unwrap(), vec!["§ehello".to_string()]);
    assert_eq!(client.status().spawn, Some((100, 64, -100)));
    assert_eq!(client.player().lock().x, 100.0);
    assert_eq!(client.world().len(), 1);

    server.await.unwrap();
    client.logout().await;
}

#[tokio::test]
async fn test_kick_before_key_exchange() {
    let (listener, addr) = listen().await;
    let server = tokio::spawn(async move {
        let mut plain = PlainServer::accept(&listener).await;
        plain.read_handshake().await;
        plain.kick("Outdated client!").await;
    });

    let mut client = test_client();
    let err = client.join(&addr).await.unwrap_err();
    assert!(matches!(err, Error::Kicked(ref reason) if reason == "Outdated client!"));
    assert!(err.is_kick());
    assert_eq!(client.state(), ConnectionState::Left);
    assert_eq!(
        client.disconnect_reason(),
        Some(&DisconnectReason::Kicked("Outdated client!".into()))
    );
    assert!(!client.is_position_sender_running());

    server.await.unwrap();
}

#[tokio::test]
async fn test_kick_instead_of_login() {
    let (listener, addr) = listen().await;
    let server = tokio::spawn(async move {
        let key = server_key();
        let mut plain = PlainServer::accept(&listener).await;
        plain.read_handshake().await;
        let mut server = plain.exchange_keys(&key).await;
        server.kick("The server is full!").await;
    });

    let mut client = test_client();
    let err = client.join(&addr).await.unwrap_err();
    assert!(matches!(err, Error::Kicked(ref reason) if reason == "The server is full!"));
    assert_eq!(client.state(), ConnectionState::Left);

    server.await.unwrap();
}

#[tokio::test]
async fn test_leave_sends_disconnect() {
    let (listener, addr) = listen().await;
    let server = tokio::spawn(async move {
        let key = server_key();
        let mut plain = PlainServer::accept(&listener).await;
        plain.read_handshake().await;
        let mut server = plain.exchange_keys(&key).await;
        server.login_success().await;

        assert_eq!(server.next_id().await, ids::CHAT);
        assert_eq!(server.reader.read_string().await.unwrap(), "hello world");
        assert_eq!(server.next_id().await, ids::KICK);
        server.reader.read_string().await.unwrap()
    });

    let mut client = test_client();
    client.join(&addr).await.unwrap();
    client.chat("hello world").await.unwrap();
    client.leave().await.unwrap();

    assert_eq!(client.state(), ConnectionState::Left);
    assert_eq!(client.disconnect_reason(), Some(&DisconnectReason::UserRequested));
    assert!(!client.is_connected());
    assert_eq!(server.await.unwrap(), "bye now");
}

#[tokio::test]
async fn test_connection_error_reported_to_sink() {
    let (listener, addr) = listen().await;
    let server = tokio::spawn(async move {
        let key = server_key();
        let mut plain = PlainServer::accept(&listener).await;
        plain.read_handshake().await;
        let mut server = plain.exchange_keys(&key).await;
        server.login_success().await;
        // Hang up without a kick
    });

    let mut client = test_client();
    let mut errors = client.take_errors().unwrap();
    client.join(&addr).await.unwrap();
    server.await.unwrap();

    let err = client.run().await.unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(client.state(), ConnectionState::Left);
    let reported = errors.recv().await.unwrap();
    assert!(matches!(reported, Error::Io(_)));
}
