use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

use crate::codec::{encode_packet, Packet, PacketReader};
use crate::error::{Error, Result};
use crate::protocol::crypto::{DecryptingReader, StreamEncryptor};
use crate::protocol::packet::ids;

pub type RawReader = BufReader<OwnedReadHalf>;

/// Packet source after the encryption upgrade. Owned by the receive loop.
pub type PacketSource = PacketReader<DecryptingReader<RawReader>>;

/// TCP transport before encryption is enabled.
///
/// Consumed by [`PlainTransport::upgrade`]; there is no way to reach the
/// plaintext halves afterwards.
pub struct PlainTransport {
    reader: PacketReader<RawReader>,
    writer: OwnedWriteHalf,
    log_packets: bool,
}

impl PlainTransport {
    /// Open a TCP connection. A first attempt that times out is retried once.
    pub async fn connect(host: &str, port: u16, timeout: Duration, log_packets: bool) -> Result<Self> {
        let stream = match Self::dial(host, port, timeout).await {
            Err(Error::ConnectionTimeout) => {
                warn!("connection to {}:{} timed out, retrying once", host, port);
                Self::dial(host, port, timeout).await?
            }
            other => other?,
        };
        stream.set_nodelay(true)?;
        Ok(Self::from_stream(stream, log_packets))
    }

    async fn dial(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
        debug!("connecting to {}:{} via TCP", host, port);
        match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(stream) => Ok(stream?),
            Err(_) => Err(Error::ConnectionTimeout),
        }
    }

    pub fn from_stream(stream: TcpStream, log_packets: bool) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: PacketReader::new(BufReader::new(read_half)),
            writer: write_half,
            log_packets,
        }
    }

    pub fn reader(&mut self) -> &mut PacketReader<RawReader> {
        &mut self.reader
    }

    pub async fn send(&mut self, packet: &Packet) -> Result<()> {
        let data = encode_packet(packet)?;
        if self.log_packets {
            trace!("-> 0x{:02X} {:?}", packet.id, packet.fields);
        }
        self.writer.write_all(&data).await?;
        Ok(())
    }

    /// Read a packet id that must be one of `accept`. A kick is surfaced as
    /// [`Error::Kicked`].
    pub async fn expect(&mut self, accept: &[u8]) -> Result<u8> {
        expect_packet(&mut self.reader, accept, self.log_packets).await
    }

    /// Switch both directions to the stream cipher
    pub fn upgrade(self, secret: &[u8]) -> Result<(PacketSource, PacketSink)> {
        let reader = DecryptingReader::new(self.reader.into_inner(), secret)?;
        let sink = PacketSink::new(self.writer, StreamEncryptor::new(secret)?, self.log_packets);
        Ok((PacketReader::new(reader), sink))
    }
}

pub async fn read_packet_id<R: AsyncRead + Unpin>(reader: &mut PacketReader<R>, log_packets: bool) -> Result<u8> {
    let id = reader.read_u8().await?;
    if log_packets {
        trace!("<- 0x{:02X}", id);
    }
    Ok(id)
}

/// Read a packet id and check it against the accepted set
pub async fn expect_packet<R: AsyncRead + Unpin>(
    reader: &mut PacketReader<R>,
    accept: &[u8],
    log_packets: bool,
) -> Result<u8> {
    let id = read_packet_id(reader, log_packets).await?;
    if accept.contains(&id) {
        return Ok(id);
    }
    if id == ids::KICK {
        let reason = reader.read_string().await?;
        return Err(Error::Kicked(reason));
    }
    Err(Error::UnexpectedPacket { expected: accept.to_vec(), got: id })
}

/// Encrypted outbound half of the connection.
///
/// Each packet is encoded, enciphered and written with one `write_all`.
pub struct PacketSink<W = OwnedWriteHalf> {
    writer: W,
    cipher: StreamEncryptor,
    log_packets: bool,
}

impl<W: AsyncWrite + Unpin> PacketSink<W> {
    pub fn new(writer: W, cipher: StreamEncryptor, log_packets: bool) -> Self {
        Self { writer, cipher, log_packets }
    }

    pub async fn send(&mut self, packet: &Packet) -> Result<()> {
        let mut data = encode_packet(packet)?;
        if self.log_packets {
            trace!("-> 0x{:02X} {:?}", packet.id, packet.fields);
        }
        self.cipher.apply(&mut data);
        self.writer.write_all(&data).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
