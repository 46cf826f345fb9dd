use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha512};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Read buffer size used when hashing files.
pub const CHUNK_SIZE: usize = 8192;

/// Length in bytes of a SHA-512 digest.
pub const SHA512_LEN: usize = 64;

/// A finished SHA-512 digest.
///
/// npm lockfiles carry digests in base64 while Nexus reports them in hex,
/// so both encodings are available.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha512Digest([u8; SHA512_LEN]);

impl Sha512Digest {
    /// Standard (padded) base64 encoding, as used in `integrity` fields.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode a base64 digest. Returns `None` unless it decodes to exactly 64 bytes.
    #[must_use]
    pub fn from_base64(encoded: &str) -> Option<Self> {
        let bytes = STANDARD.decode(encoded.trim()).ok()?;
        Self::from_slice(&bytes)
    }

    /// Decode a hex digest (either case).
    #[must_use]
    pub fn from_hex(encoded: &str) -> Option<Self> {
        let bytes = hex::decode(encoded.trim()).ok()?;
        Self::from_slice(&bytes)
    }

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; SHA512_LEN] = bytes.try_into().ok()?;
        Some(Self(array))
    }
}

impl fmt::Debug for Sha512Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha512Digest({})", self.to_hex())
    }
}

impl fmt::Display for Sha512Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Incremental SHA-512 over data that arrives in chunks.
#[derive(Clone, Default)]
pub struct Sha512Stream {
    hasher: Sha512,
}

impl Sha512Stream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the next chunk into the running digest.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    #[must_use]
    pub fn finalize(self) -> Sha512Digest {
        let mut out = [0u8; SHA512_LEN];
        out.copy_from_slice(&self.hasher.finalize());
        Sha512Digest(out)
    }
}

/// Compute the SHA-512 digest of a file.
///
/// Streams the file content in `CHUNK_SIZE` reads to bound memory usage.
///
/// # Errors
/// Returns an error if the file cannot be opened or read.
pub fn sha512_file(path: &Path) -> io::Result<Sha512Digest> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha512Stream::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize())
}

/// Compute the SHA-512 digest of a byte slice.
#[must_use]
pub fn sha512_bytes(data: &[u8]) -> Sha512Digest {
    let mut hasher = Sha512Stream::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HELLO_HEX: &str = "309ecc489c12d6eb4cc40f50c902f2b4d0ed77ee511a7c7a9bcd3ca86d4cd86f989dd35bc5ff499670da34255b45b0cfd830e81f605dcf7dc5542e93ae9cd76f";
    const HELLO_B64: &str =
        "MJ7MSJwS1utMxA9QyQLytNDtd+5RGnx6m808qG1M2G+YndNbxf9JlnDaNCVbRbDP2DDoH2Bdz33FVC6TrpzXbw==";

    #[test]
    fn test_sha512_bytes_encodings() {
        let digest = sha512_bytes(b"hello world");
        assert_eq!(digest.to_hex(), HELLO_HEX);
        assert_eq!(digest.to_base64(), HELLO_B64);
    }

    #[test]
    fn test_sha512_file_matches_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        let digest = sha512_file(file.path()).unwrap();
        assert_eq!(digest, sha512_bytes(b"hello world"));
    }

    #[test]
    fn test_chunked_updates_match_single_update() {
        let data = vec![7u8; CHUNK_SIZE * 3 + 17];
        let mut stream = Sha512Stream::new();
        for chunk in data.chunks(1000) {
            stream.update(chunk);
        }
        assert_eq!(stream.finalize(), sha512_bytes(&data));
    }

    #[test]
    fn test_base64_and_hex_name_the_same_digest() {
        let from_b64 = Sha512Digest::from_base64(HELLO_B64).unwrap();
        let from_hex = Sha512Digest::from_hex(&HELLO_HEX.to_uppercase()).unwrap();
        assert_eq!(from_b64, from_hex);
    }

    #[test]
    fn test_from_base64_rejects_wrong_length() {
        // sha1-sized payload
        assert!(Sha512Digest::from_base64("qUqP5cyxm6YcTAhz05Hph5gvu9M=").is_none());
        assert!(Sha512Digest::from_base64("not base64!").is_none());
    }

    #[test]
    fn test_sha512_file_not_found() {
        let result = sha512_file(Path::new("/nonexistent/file"));
        assert!(result.is_err());
    }
}
