use anyhow::Result;

/// Seam for the credential storage capability. The pipeline only ever sees
/// plaintext tokens; deployments with encrypted credential storage plug in
/// their own implementation.
pub trait TokenCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str, identity: &str) -> Result<String>;
    fn decrypt(&self, blob: &str, identity: &str) -> Result<String>;
}

/// Pass-through cipher for configurations that supply tokens unencrypted.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextTokenCipher;

impl TokenCipher for PlaintextTokenCipher {
    fn encrypt(&self, plaintext: &str, _identity: &str) -> Result<String> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, blob: &str, _identity: &str) -> Result<String> {
        Ok(blob.to_string())
    }
}
