//! Identity Module - multi-scheme keypair management
//!
//! A [`Keypair`] is built once (seed, mnemonic, secret URI or raw keys, see
//! [`KeypairBuilder`]) and is immutable afterwards. It signs and verifies
//! with the scheme it was built for and carries its own address.

pub mod address;
mod builder;
pub mod derivation;
mod keys;
mod messaging;
mod payload;
mod scheme;
mod seed;

pub use builder::KeypairBuilder;
pub use derivation::{DeriveJunction, SecretUri, DEV_PHRASE};
pub use keys::KeyMaterial;
pub use messaging::MessageNonce;
pub use payload::{BytesInput, Payload, ScaleBytes, SignedMessage};
pub use scheme::SignatureScheme;
pub use seed::{MnemonicLanguage, SeedPhrase};

use crate::crypto::{self, ecdsa};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Invalid seed phrase: {0}")]
    InvalidSeedPhrase(String),

    #[error("No public key or address could be resolved")]
    MissingKeyMaterial,

    #[error("No private key available")]
    NoPrivateKey,

    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Unsupported derivation: {0}")]
    UnsupportedDerivation(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Public key does not match private key")]
    KeyMismatch,

    #[error("Unknown signature scheme: {0}")]
    UnknownScheme(String),

    #[error("Malformed encrypted export: {0}")]
    MalformedExport(String),

    #[error("Cryptographic error: {0}")]
    Crypto(#[from] crypto::CryptoError),
}

const BYTES_PREFIX: &[u8] = b"<Bytes>";
const BYTES_SUFFIX: &[u8] = b"</Bytes>";

/// Signing identity for one scheme, with its address and provenance
#[derive(Clone)]
pub struct Keypair {
    material: KeyMaterial,
    address: String,
    network_format: u16,
    mnemonic: Option<Zeroizing<String>>,
    seed: Option<Zeroizing<Vec<u8>>>,
    derive_path: Option<String>,
    storage_path: Option<String>,
}

impl Keypair {
    pub fn builder() -> KeypairBuilder {
        KeypairBuilder::new()
    }

    /// Fresh keypair from a newly generated 12-word mnemonic
    pub fn generate(scheme: SignatureScheme) -> Result<Self, IdentityError> {
        Self::builder().scheme(scheme).build()
    }

    pub fn from_seed(seed: &[u8], scheme: SignatureScheme, network_format: u16) -> Result<Self, IdentityError> {
        Self::builder()
            .scheme(scheme)
            .network_format(network_format)
            .seed(seed)
            .build()
    }

    pub fn from_mnemonic(phrase: &str, scheme: SignatureScheme) -> Result<Self, IdentityError> {
        Self::builder().scheme(scheme).mnemonic(phrase).build()
    }

    pub fn from_uri(uri: &str, scheme: SignatureScheme) -> Result<Self, IdentityError> {
        Self::builder().scheme(scheme).uri(uri).build()
    }

    pub fn from_private_key(
        private_key: impl Into<BytesInput>,
        scheme: SignatureScheme,
    ) -> Result<Self, IdentityError> {
        Self::builder().scheme(scheme).private_key(private_key).build()
    }

    /// Verify-only keypair
    pub fn from_public_key(
        public_key: impl Into<BytesInput>,
        scheme: SignatureScheme,
    ) -> Result<Self, IdentityError> {
        Self::builder().scheme(scheme).public_key(public_key).build()
    }

    /// Verify-only keypair from an SS58 (or, for ECDSA, hex) address
    pub fn from_address(address: &str, scheme: SignatureScheme) -> Result<Self, IdentityError> {
        Self::builder().scheme(scheme).address(address).build()
    }

    /// Generate a mnemonic phrase without building a keypair
    pub fn generate_mnemonic(words: usize, language: MnemonicLanguage) -> Result<String, IdentityError> {
        Ok(SeedPhrase::generate(words, language)?.phrase())
    }

    pub fn validate_mnemonic(phrase: &str, language: MnemonicLanguage) -> bool {
        SeedPhrase::validate(phrase, language)
    }

    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    pub fn public_key(&self) -> &[u8] {
        self.material.public_key()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.material.public_key())
    }

    pub fn private_key(&self) -> Option<&[u8]> {
        self.material.private_key()
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.material.scheme()
    }

    /// SS58 address, or the EIP-55 checksum address for ECDSA
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn network_format(&self) -> u16 {
        self.network_format
    }

    pub fn mnemonic(&self) -> Option<&str> {
        self.mnemonic.as_ref().map(|m| m.as_str())
    }

    pub fn seed(&self) -> Option<&[u8]> {
        self.seed.as_ref().map(|s| s.as_slice())
    }

    pub fn derive_path(&self) -> Option<&str> {
        self.derive_path.as_deref()
    }

    /// Keystore name this keypair was loaded from, if any
    pub fn storage_path(&self) -> Option<&str> {
        self.storage_path.as_deref()
    }

    pub fn is_verify_only(&self) -> bool {
        self.material.is_verify_only()
    }

    /// Sign data with this keypair's scheme
    pub fn sign(&self, data: impl Into<Payload>) -> Result<Vec<u8>, IdentityError> {
        let data = data.into().into_bytes()?;
        self.material.sign(&data)
    }

    /// Sign and package data, signature and signer together
    pub fn sign_record(&self, data: impl Into<Payload>) -> Result<SignedMessage, IdentityError> {
        let data = data.into().into_bytes()?;
        let signature = self.material.sign(&data)?;

        Ok(SignedMessage {
            data: SignedMessage::encode_data(&data),
            signature: hex::encode(signature),
            public_key: self.public_key_hex(),
            address: self.address.clone(),
        })
    }

    /// Verify against this keypair's public key.
    ///
    /// Bad signatures of any length give `Ok(false)`; only undecodable
    /// input (for instance invalid hex) is an error.
    pub fn verify(
        &self,
        data: impl Into<Payload>,
        signature: impl Into<BytesInput>,
    ) -> Result<bool, IdentityError> {
        let data = data.into().into_bytes()?;
        let signature = signature.into().into_bytes()?;
        Ok(verify_with_fallback(self.scheme(), &signature, &data, self.public_key()))
    }

    /// Verify against an explicitly supplied public key of this scheme
    pub fn verify_with_key(
        &self,
        data: impl Into<Payload>,
        signature: impl Into<BytesInput>,
        public_key: impl Into<BytesInput>,
    ) -> Result<bool, IdentityError> {
        let data = data.into().into_bytes()?;
        let signature = signature.into().into_bytes()?;
        let public_key = public_key.into().into_bytes()?;
        Ok(verify_with_fallback(self.scheme(), &signature, &data, &public_key))
    }

    /// Verify a [`SignedMessage`] against the signer it names
    pub fn verify_record(&self, record: &SignedMessage) -> Result<bool, IdentityError> {
        self.verify_with_key(
            record.data.as_str(),
            record.signature.as_str(),
            record.public_key.as_str(),
        )
    }

    /// Derive a child keypair along `path` (`/soft` and `//hard` junctions).
    ///
    /// Only Sr25519 supports this. A verify-only parent can follow soft
    /// junctions.
    pub fn derive(&self, path: &str) -> Result<Self, IdentityError> {
        if !self.scheme().supports_derivation() {
            return Err(IdentityError::UnsupportedDerivation(format!(
                "derivation paths are not supported for {}",
                self.scheme()
            )));
        }

        let junctions = derivation::parse_path(path)?;
        let material = derivation::derive_sr25519(&self.material, &junctions)?;

        let mut child = Self::from_material(material, self.network_format)?;
        child.mnemonic = self.mnemonic.clone();
        child.derive_path = Some(format!("{}{}", self.derive_path.as_deref().unwrap_or(""), path));
        Ok(child)
    }

    /// Assemble a keypair around finished key material
    pub(crate) fn from_material(material: KeyMaterial, network_format: u16) -> Result<Self, IdentityError> {
        let address = if material.scheme().uses_ss58() {
            address::encode(material.public_key(), network_format)?
        } else {
            ecdsa::to_checksum_address(material.public_key())
        };

        Ok(Self {
            material,
            address,
            network_format,
            mnemonic: None,
            seed: None,
            derive_path: None,
            storage_path: None,
        })
    }

    /// Reattach provenance recorded in a stored snapshot
    pub(crate) fn with_provenance(
        mut self,
        mnemonic: Option<Zeroizing<String>>,
        seed: Option<Zeroizing<Vec<u8>>>,
        derive_path: Option<String>,
    ) -> Self {
        self.mnemonic = mnemonic;
        self.seed = seed;
        self.derive_path = derive_path;
        self
    }

    pub(crate) fn with_storage_path(mut self, path: impl Into<String>) -> Self {
        self.storage_path = Some(path.into());
        self
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Keypair (address={})>", self.address)
    }
}

/// Direct check first, then the `<Bytes>`-wrapped form some signers use
fn verify_with_fallback(scheme: SignatureScheme, signature: &[u8], data: &[u8], public_key: &[u8]) -> bool {
    if scheme.verify(signature, data, public_key) {
        return true;
    }

    let mut wrapped = Vec::with_capacity(BYTES_PREFIX.len() + data.len() + BYTES_SUFFIX.len());
    wrapped.extend_from_slice(BYTES_PREFIX);
    wrapped.extend_from_slice(data);
    wrapped.extend_from_slice(BYTES_SUFFIX);
    scheme.verify(signature, &wrapped, public_key)
}
