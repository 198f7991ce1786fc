//! Server list ping.
//!
//! The client sends a lone 0xFE byte; the server answers with a kick packet
//! whose reason is `motd§online§max`.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use crate::codec::PacketReader;
use crate::error::{Error, Result};
use crate::protocol::packet::{ids, split_address};
use crate::protocol::transport::expect_packet;

/// Summary a server advertises in its list entry. The 1.3 format carries
/// no protocol version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerListing {
    pub motd: String,
    pub players_online: u32,
    pub players_max: u32,
}

impl ServerListing {
    pub fn parse(response: &str) -> Result<Self> {
        let bad = || Error::Protocol(format!("malformed server list response: {response:?}"));
        let mut parts = response.rsplitn(3, '§');
        let max = parts.next().ok_or_else(bad)?;
        let online = parts.next().ok_or_else(bad)?;
        let motd = parts.next().ok_or_else(bad)?;
        Ok(Self {
            motd: motd.to_string(),
            players_online: online.parse().map_err(|_| bad())?,
            players_max: max.parse().map_err(|_| bad())?,
        })
    }
}

/// Query a server's list entry without logging in
pub async fn ping(addr: &str, timeout: Duration) -> Result<ServerListing> {
    let (host, port) = split_address(addr)?;
    debug!("pinging {}:{}", host, port);
    let mut stream = tokio::time::timeout(timeout, TcpStream::connect((host.as_str(), port)))
        .await
        .map_err(|_| Error::ConnectionTimeout)??;
    stream.write_all(&[ids::SERVER_LIST_PING]).await?;
    let (read_half, _write_half) = stream.into_split();
    let mut reader = PacketReader::new(BufReader::new(read_half));
    read_listing(&mut reader).await
}

pub async fn read_listing<R: AsyncRead + Unpin>(reader: &mut PacketReader<R>) -> Result<ServerListing> {
    // The listing arrives as a kick, so accept nothing and take the reason
    match expect_packet(reader, &[], false).await {
        Err(Error::Kicked(response)) => ServerListing::parse(&response),
        Err(e) => Err(e),
        Ok(id) => Err(Error::UnexpectedPacket { expected: vec![ids::KICK], got: id }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BinaryWriter;

    #[test]
    fn test_parse_listing() {
        let listing = ServerListing::parse("A Minecraft Server§3§20").unwrap();
        assert_eq!(
            listing,
            ServerListing {
                motd: "A Minecraft Server".into(),
                players_online: 3,
                players_max: 20,
            }
        );
    }

    #[test]
    fn test_parse_listing_motd_with_escapes() {
        let listing = ServerListing::parse("§aGreen§0§10").unwrap();
        assert_eq!(listing.motd, "§aGreen");
        assert_eq!(listing.players_max, 10);
    }

    #[test]
    fn test_parse_listing_rejects_garbage() {
        assert!(matches!(ServerListing::parse("no separators"), Err(Error::Protocol(_))));
        assert!(matches!(ServerListing::parse("motd§x§20"), Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_read_listing() {
        let mut w = BinaryWriter::new();
        w.write_u8(ids::KICK);
        w.write_string("hi§1§8");
        let data = w.into_vec();
        let mut reader = PacketReader::new(data.as_slice());
        let listing = read_listing(&mut reader).await.unwrap();
        assert_eq!(listing.players_online, 1);
    }
}
