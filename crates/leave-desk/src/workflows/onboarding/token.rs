use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

/// Raw entropy per invitation token, before encoding.
pub const TOKEN_BYTES: usize = 32;

/// Producer of random bytes for invitation tokens.
pub trait TokenSource: Send + Sync {
    fn random_bytes(&self, len: usize) -> Vec<u8>;
}

/// Operating-system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsTokenSource;

impl TokenSource for OsTokenSource {
    fn random_bytes(&self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        OsRng.fill_bytes(&mut bytes);
        bytes
    }
}

/// URL-safe base64 without padding, so the token can sit in a link path segment.
pub fn encode_token(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}
