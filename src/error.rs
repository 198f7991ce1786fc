#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("connection timeout")]
    ConnectionTimeout,

    #[error("unexpected packet 0x{got:02X} (expected one of {expected:02X?})")]
    UnexpectedPacket { expected: Vec<u8>, got: u8 },

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("kicked: {0}")]
    Kicked(String),

    #[error("unsupported field type for encoding: {0}")]
    UnsupportedFieldType(&'static str),

    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("session service error: {0}")]
    Auth(String),

    #[error("not connected")]
    NotConnected,

    #[error("io error: {0}")]
    Io(String),
}

impl Error {
    /// True when the peer ended the session with a kick message.
    pub fn is_kick(&self) -> bool {
        matches!(self, Error::Kicked(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
