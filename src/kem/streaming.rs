//! Segmented streaming encryption for X25519 keys.
//!
//! Wire format:
//!
//! ```text
//! header:  [ephemeral_public: 32][nonce_prefix: 7][segment_size: u32 BE]
//! segment: [last: u8][ciphertext_len: u32 BE][ciphertext + tag]
//! ```
//!
//! Segment nonce is `nonce_prefix ‖ counter (u32 BE) ‖ last`, and the header is
//! the associated data of every segment. Reordering, truncating, extending or
//! splicing segments therefore fails authentication.

use std::io::{self, Read, Write};

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use x25519_dalek::{EphemeralSecret, PublicKey};

use super::x25519_chacha::{X25519HkdfChaCha20Poly1305Decrypt, X25519HkdfChaCha20Poly1305Encrypt};
use super::{contributory, hkdf_key, parse_public_key, TAG_BYTES, X25519_KEY_BYTES};
use crate::error::{HybridError, Result};
use crate::primitive::{EncryptingWrite, StreamingHybridDecrypt, StreamingHybridEncrypt};

/// Plaintext bytes per segment unless configured otherwise.
pub const DEFAULT_SEGMENT_SIZE: usize = 64 * 1024;
/// Largest segment a reader accepts.
pub const MAX_SEGMENT_SIZE: usize = 1024 * 1024;

const NONCE_PREFIX_BYTES: usize = 7;
pub const HEADER_BYTES: usize = X25519_KEY_BYTES + NONCE_PREFIX_BYTES + 4;
const STREAM_INFO_LABEL: &[u8] = b"hybrid-keyset stream v1";

fn segment_nonce(prefix: &[u8; NONCE_PREFIX_BYTES], counter: u32, last: bool) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce[..NONCE_PREFIX_BYTES].copy_from_slice(prefix);
    nonce[NONCE_PREFIX_BYTES..11].copy_from_slice(&counter.to_be_bytes());
    nonce[11] = last as u8;
    nonce
}

fn stream_cipher(shared: &[u8], ephemeral_public: &[u8], context_info: &[u8]) -> Result<ChaCha20Poly1305> {
    let key = hkdf_key(shared, ephemeral_public, &[STREAM_INFO_LABEL, context_info])?;
    ChaCha20Poly1305::new_from_slice(&key[..]).map_err(|_| HybridError::InvalidKeyLength)
}

fn invalid_data(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn truncated(err: io::Error) -> io::Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        io::Error::new(io::ErrorKind::UnexpectedEof, "truncated stream")
    } else {
        err
    }
}

/// Buffers plaintext and emits one authenticated segment per `segment_size`
/// bytes. The final segment is written by [`EncryptingWrite::finish`].
pub struct EncryptingWriter<W: Write> {
    sink: W,
    cipher: ChaCha20Poly1305,
    header: [u8; HEADER_BYTES],
    nonce_prefix: [u8; NONCE_PREFIX_BYTES],
    segment_size: usize,
    buffer: Vec<u8>,
    counter: u32,
    header_written: bool,
}

impl<W: Write> EncryptingWriter<W> {
    fn emit_segment(&mut self, plaintext: &[u8], last: bool) -> io::Result<()> {
        if !self.header_written {
            self.sink.write_all(&self.header)?;
            self.header_written = true;
        }

        let nonce = segment_nonce(&self.nonce_prefix, self.counter, last);
        let sealed = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &self.header,
                },
            )
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "segment encryption failed"))?;
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "too many segments"))?;

        self.sink.write_all(&[last as u8])?;
        self.sink.write_all(&(sealed.len() as u32).to_be_bytes())?;
        self.sink.write_all(&sealed)
    }
}

impl<W: Write> Write for EncryptingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        // Hold back a full segment: only `finish` knows which one is last.
        while self.buffer.len() > self.segment_size {
            let rest = self.buffer.split_off(self.segment_size);
            let segment = std::mem::replace(&mut self.buffer, rest);
            self.emit_segment(&segment, false)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

impl<W: Write + Send> EncryptingWrite for EncryptingWriter<W> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let mut this = *self;
        let last = std::mem::take(&mut this.buffer);
        this.emit_segment(&last, true)?;
        this.sink.flush()
    }
}

/// Reads segments from `source` and yields their plaintext.
pub struct DecryptingReader<R: Read> {
    source: R,
    cipher: ChaCha20Poly1305,
    header: [u8; HEADER_BYTES],
    nonce_prefix: [u8; NONCE_PREFIX_BYTES],
    max_ciphertext_len: usize,
    plaintext: Vec<u8>,
    pos: usize,
    counter: u32,
    finished: bool,
    failed: bool,
}

impl<R: Read> DecryptingReader<R> {
    fn new(
        mut source: R,
        decrypt: &X25519HkdfChaCha20Poly1305Decrypt,
        context_info: &[u8],
    ) -> Result<Self> {
        let mut header = [0u8; HEADER_BYTES];
        source.read_exact(&mut header).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => HybridError::DecryptionFailed,
            _ => HybridError::StreamInitFailed(e.to_string()),
        })?;

        let (ephemeral, rest) = header.split_at(X25519_KEY_BYTES);
        let (prefix, size) = rest.split_at(NONCE_PREFIX_BYTES);
        let mut nonce_prefix = [0u8; NONCE_PREFIX_BYTES];
        nonce_prefix.copy_from_slice(prefix);
        let mut size_bytes = [0u8; 4];
        size_bytes.copy_from_slice(size);
        let segment_size = u32::from_be_bytes(size_bytes) as usize;
        if segment_size == 0 || segment_size > MAX_SEGMENT_SIZE {
            return Err(HybridError::DecryptionFailed);
        }

        let ephemeral_public = parse_public_key(ephemeral).ok_or(HybridError::DecryptionFailed)?;
        let shared = contributory(decrypt.secret.diffie_hellman(&ephemeral_public))
            .ok_or(HybridError::DecryptionFailed)?;
        let cipher = stream_cipher(shared.as_bytes(), ephemeral, context_info)?;

        Ok(Self {
            source,
            cipher,
            header,
            nonce_prefix,
            max_ciphertext_len: segment_size + TAG_BYTES,
            plaintext: Vec::new(),
            pos: 0,
            counter: 0,
            finished: false,
            failed: false,
        })
    }

    fn next_segment(&mut self) -> io::Result<()> {
        let mut flag = [0u8; 1];
        self.source.read_exact(&mut flag).map_err(truncated)?;
        let last = match flag[0] {
            0 => false,
            1 => true,
            _ => return Err(invalid_data("invalid segment flag")),
        };

        let mut len = [0u8; 4];
        self.source.read_exact(&mut len).map_err(truncated)?;
        let len = u32::from_be_bytes(len) as usize;
        if len < TAG_BYTES || len > self.max_ciphertext_len {
            return Err(invalid_data("segment length out of range"));
        }

        let mut sealed = vec![0u8; len];
        self.source.read_exact(&mut sealed).map_err(truncated)?;

        let nonce = segment_nonce(&self.nonce_prefix, self.counter, last);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &sealed,
                    aad: &self.header,
                },
            )
            .map_err(|_| invalid_data("segment authentication failed"))?;
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or_else(|| invalid_data("too many segments"))?;

        if last {
            self.finished = true;
            self.ensure_exhausted()?;
        }
        self.plaintext = plaintext;
        self.pos = 0;
        Ok(())
    }

    fn ensure_exhausted(&mut self) -> io::Result<()> {
        let mut next_byte = [0u8; 1];
        loop {
            match self.source.read(&mut next_byte) {
                Ok(0) => return Ok(()),
                Ok(_) => return Err(invalid_data("trailing data after final segment")),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> Read for DecryptingReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.failed {
            return Err(invalid_data("stream previously failed"));
        }
        if out.is_empty() {
            return Ok(0);
        }

        while self.pos == self.plaintext.len() {
            if self.finished {
                return Ok(0);
            }
            if let Err(e) = self.next_segment() {
                self.failed = true;
                self.plaintext.clear();
                self.pos = 0;
                return Err(e);
            }
        }

        let n = out.len().min(self.plaintext.len() - self.pos);
        out[..n].copy_from_slice(&self.plaintext[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl StreamingHybridDecrypt for X25519HkdfChaCha20Poly1305Decrypt {
    fn new_decrypting_reader<'a>(
        &self,
        source: Box<dyn Read + Send + 'a>,
        context_info: &[u8],
    ) -> Result<Box<dyn Read + Send + 'a>> {
        Ok(Box::new(DecryptingReader::new(source, self, context_info)?))
    }
}

impl StreamingHybridEncrypt for X25519HkdfChaCha20Poly1305Encrypt {
    fn new_encrypting_writer<'a>(
        &self,
        sink: Box<dyn Write + Send + 'a>,
        context_info: &[u8],
    ) -> Result<Box<dyn EncryptingWrite + 'a>> {
        let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public = PublicKey::from(&ephemeral_secret).to_bytes();
        let shared = contributory(ephemeral_secret.diffie_hellman(&self.recipient))
            .ok_or(HybridError::EncryptionFailed)?;
        let cipher = stream_cipher(shared.as_bytes(), &ephemeral_public, context_info)?;

        let mut nonce_prefix = [0u8; NONCE_PREFIX_BYTES];
        OsRng.fill_bytes(&mut nonce_prefix);

        let mut header = [0u8; HEADER_BYTES];
        header[..X25519_KEY_BYTES].copy_from_slice(&ephemeral_public);
        header[X25519_KEY_BYTES..X25519_KEY_BYTES + NONCE_PREFIX_BYTES].copy_from_slice(&nonce_prefix);
        header[X25519_KEY_BYTES + NONCE_PREFIX_BYTES..]
            .copy_from_slice(&(self.segment_size as u32).to_be_bytes());

        Ok(Box::new(EncryptingWriter {
            sink,
            cipher,
            header,
            nonce_prefix,
            segment_size: self.segment_size,
            buffer: Vec::with_capacity(self.segment_size),
            counter: 0,
            header_written: false,
        }))
    }
}
