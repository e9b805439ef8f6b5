//! Raw key material held by a keypair

use super::{IdentityError, SignatureScheme};
use crate::crypto::expect_len;
use std::fmt;
use zeroize::Zeroizing;

/// Public key plus optional private key for one scheme.
///
/// Lengths are checked on construction. The private key is wiped on drop.
#[derive(Clone)]
pub struct KeyMaterial {
    public_key: Vec<u8>,
    private_key: Option<Zeroizing<Vec<u8>>>,
    scheme: SignatureScheme,
}

impl KeyMaterial {
    pub fn new(
        scheme: SignatureScheme,
        public_key: Vec<u8>,
        private_key: Option<Vec<u8>>,
    ) -> Result<Self, IdentityError> {
        let private_key = private_key.map(Zeroizing::new);

        expect_len("public key", &public_key, scheme.public_key_len())?;
        if let Some(private_key) = &private_key {
            expect_len("private key", private_key, scheme.private_key_len())?;
        }

        Ok(Self {
            public_key,
            private_key,
            scheme,
        })
    }

    /// Get the public key bytes (the 20-byte address for ECDSA)
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Get the secret key bytes
    pub fn private_key(&self) -> Option<&[u8]> {
        self.private_key.as_ref().map(|k| k.as_slice())
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    /// No private key: can verify, cannot sign
    pub fn is_verify_only(&self) -> bool {
        self.private_key.is_none()
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, IdentityError> {
        self.scheme.sign(self, message)
    }

    pub fn verify(&self, signature: &[u8], message: &[u8]) -> bool {
        self.scheme.verify(signature, message, &self.public_key)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("scheme", &self.scheme)
            .field("public_key", &hex::encode(&self.public_key))
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
