//! Key exchange and transport encryption.
//!
//! The server sends an RSA public key as a DER `SubjectPublicKeyInfo`. The
//! client answers with a random 16-byte shared secret and the server's verify
//! token, each encrypted with PKCS#1 v1.5. From then on both directions run
//! AES-128/CFB8 keyed (and IV'd) with the shared secret.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use aes::Aes128;
use cfb8::cipher::generic_array::GenericArray;
use cfb8::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use num_bigint::BigInt;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::{Error, Result};

pub const SHARED_SECRET_LEN: usize = 16;

pub type SharedSecret = [u8; SHARED_SECRET_LEN];

/// Parse a DER-encoded `SubjectPublicKeyInfo` blob
pub fn parse_public_key(der: &[u8]) -> Result<RsaPublicKey> {
    RsaPublicKey::from_public_key_der(der)
        .map_err(|e| Error::Protocol(format!("invalid server public key: {e}")))
}

/// Fresh random shared secret for one session
pub fn generate_shared_secret() -> SharedSecret {
    let mut secret = [0u8; SHARED_SECRET_LEN];
    OsRng.fill_bytes(&mut secret);
    secret
}

pub fn encrypt_pkcs1(key: &RsaPublicKey, data: &[u8]) -> Result<Vec<u8>> {
    key.encrypt(&mut OsRng, Pkcs1v15Encrypt, data)
        .map_err(|e| Error::Crypto(e.to_string()))
}

/// Session hash used to register a join with the session service.
///
/// SHA-1 over server id, shared secret and public key, rendered as a signed
/// two's-complement hex number without leading zeros.
pub fn server_hash(server_id: &str, secret: &[u8], public_key: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(server_id.as_bytes());
    hasher.update(secret);
    hasher.update(public_key);
    signed_hex_digest(&hasher.finalize())
}

pub fn signed_hex_digest(digest: &[u8]) -> String {
    BigInt::from_signed_bytes_be(digest).to_str_radix(16)
}

/// Outbound half of the transport cipher
pub struct StreamEncryptor {
    cipher: cfb8::Encryptor<Aes128>,
}

impl StreamEncryptor {
    pub fn new(secret: &[u8]) -> Result<Self> {
        let cipher = cfb8::Encryptor::<Aes128>::new_from_slices(secret, secret)
            .map_err(|e| Error::Crypto(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Encrypt in place, continuing the stream state
    pub fn apply(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            let mut block = GenericArray::clone_from_slice(std::slice::from_ref(byte));
            self.cipher.encrypt_block_mut(&mut block);
            *byte = block[0];
        }
    }
}

/// Inbound half of the transport cipher
pub struct StreamDecryptor {
    cipher: cfb8::Decryptor<Aes128>,
}

impl StreamDecryptor {
    pub fn new(secret: &[u8]) -> Result<Self> {
        let cipher = cfb8::Decryptor::<Aes128>::new_from_slices(secret, secret)
            .map_err(|e| Error::Crypto(e.to_string()))?;
        Ok(Self { cipher })
    }

    pub fn apply(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            let mut block = GenericArray::clone_from_slice(std::slice::from_ref(byte));
            self.cipher.decrypt_block_mut(&mut block);
            *byte = block[0];
        }
    }
}

/// Reader that deciphers every byte pulled through it
pub struct DecryptingReader<R> {
    inner: R,
    cipher: StreamDecryptor,
}

impl<R> DecryptingReader<R> {
    pub fn new(inner: R, secret: &[u8]) -> Result<Self> {
        Ok(Self {
            inner,
            cipher: StreamDecryptor::new(secret)?,
        })
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for DecryptingReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let start = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        this.cipher.apply(&mut buf.filled_mut()[start..]);
        Poll::Ready(Ok(()))
    }
}
