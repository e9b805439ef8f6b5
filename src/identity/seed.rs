//! BIP39 Seed Phrase Implementation
//!
//! Generates and validates mnemonic phrases and turns them into seeds, either
//! the standard 64-byte BIP39 seed or the 32-byte substrate mini secret.

use super::IdentityError;
use bip39::{Language, Mnemonic};
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use zeroize::Zeroizing;

const MINI_SECRET_LENGTH: usize = 32;
const PBKDF2_ROUNDS: u32 = 2048;

/// Mnemonic word list language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MnemonicLanguage {
    #[default]
    English,
    ChineseSimplified,
    ChineseTraditional,
    Czech,
    French,
    Italian,
    Japanese,
    Korean,
    Portuguese,
    Spanish,
}

impl MnemonicLanguage {
    /// Parse a language code such as `en` or `zh-hans`
    pub fn from_code(code: &str) -> Option<Self> {
        let language = match code.to_ascii_lowercase().as_str() {
            "en" => Self::English,
            "zh-hans" => Self::ChineseSimplified,
            "zh-hant" => Self::ChineseTraditional,
            "cs" => Self::Czech,
            "fr" => Self::French,
            "it" => Self::Italian,
            "ja" => Self::Japanese,
            "ko" => Self::Korean,
            "pt" => Self::Portuguese,
            "es" => Self::Spanish,
            _ => return None,
        };
        Some(language)
    }

    fn to_bip39(self) -> Language {
        match self {
            Self::English => Language::English,
            Self::ChineseSimplified => Language::SimplifiedChinese,
            Self::ChineseTraditional => Language::TraditionalChinese,
            Self::Czech => Language::Czech,
            Self::French => Language::French,
            Self::Italian => Language::Italian,
            Self::Japanese => Language::Japanese,
            Self::Korean => Language::Korean,
            Self::Portuguese => Language::Portuguese,
            Self::Spanish => Language::Spanish,
        }
    }
}

/// Wrapper around BIP39 mnemonic
pub struct SeedPhrase {
    mnemonic: Mnemonic,
}

impl SeedPhrase {
    /// Generate a new random seed phrase with specified word count
    pub fn generate(word_count: usize, language: MnemonicLanguage) -> Result<Self, IdentityError> {
        let entropy_bits = match word_count {
            12 => 128,
            15 => 160,
            18 => 192,
            21 => 224,
            24 => 256,
            _ => {
                return Err(IdentityError::InvalidSeedPhrase(
                    "Word count must be 12, 15, 18, 21, or 24".to_string(),
                ))
            }
        };

        // Generate entropy
        let mut entropy = Zeroizing::new(vec![0u8; entropy_bits / 8]);
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut entropy);

        // Create mnemonic from entropy
        let mnemonic = Mnemonic::from_entropy_in(language.to_bip39(), &entropy)
            .map_err(|e| IdentityError::InvalidSeedPhrase(e.to_string()))?;

        Ok(Self { mnemonic })
    }

    /// Parse an existing seed phrase
    pub fn from_phrase(phrase: &str, language: MnemonicLanguage) -> Result<Self, IdentityError> {
        // Normalize whitespace
        let normalized: Vec<&str> = phrase.split_whitespace().collect();
        let normalized_phrase = normalized.join(" ");

        let mnemonic = Mnemonic::parse_in(language.to_bip39(), normalized_phrase.as_str())
            .map_err(|e| IdentityError::InvalidSeedPhrase(e.to_string()))?;

        Ok(Self { mnemonic })
    }

    /// Standard BIP39 seed (512 bits) using optional passphrase
    pub fn to_seed(&self, passphrase: &str) -> Zeroizing<[u8; 64]> {
        Zeroizing::new(self.mnemonic.to_seed(passphrase))
    }

    /// Substrate-style 32-byte mini secret.
    ///
    /// PBKDF2-HMAC-SHA512 over the mnemonic entropy (not the phrase) with
    /// salt `"mnemonic" || password`, truncated to 32 bytes.
    pub fn to_mini_secret(&self, password: &str) -> Zeroizing<[u8; MINI_SECRET_LENGTH]> {
        let entropy = Zeroizing::new(self.mnemonic.to_entropy());
        let salt = Zeroizing::new(format!("mnemonic{}", password));

        let mut seed = Zeroizing::new([0u8; 64]);
        pbkdf2::pbkdf2_hmac::<Sha512>(&entropy, salt.as_bytes(), PBKDF2_ROUNDS, &mut seed[..]);

        let mut mini = Zeroizing::new([0u8; MINI_SECRET_LENGTH]);
        mini.copy_from_slice(&seed[..MINI_SECRET_LENGTH]);
        mini
    }

    /// Get the mnemonic words as a string
    pub fn phrase(&self) -> String {
        self.mnemonic.to_string()
    }

    /// Get individual words
    pub fn words(&self) -> Vec<&str> {
        self.mnemonic.word_iter().collect()
    }

    /// Validate a seed phrase without creating an instance
    pub fn validate(phrase: &str, language: MnemonicLanguage) -> bool {
        Self::from_phrase(phrase, language).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_seed_phrase() {
        let seed = SeedPhrase::generate(12, MnemonicLanguage::English).unwrap();
        let words = seed.words();

        assert_eq!(words.len(), 12);

        // All words should be from BIP39 wordlist
        let wordlist = Language::English.word_list();
        for word in words {
            assert!(wordlist.contains(&word));
        }
    }

    #[test]
    fn test_generate_other_sizes_and_languages() {
        assert_eq!(SeedPhrase::generate(24, MnemonicLanguage::English).unwrap().words().len(), 24);
        let french = SeedPhrase::generate(15, MnemonicLanguage::French).unwrap();
        assert!(SeedPhrase::validate(&french.phrase(), MnemonicLanguage::French));
        assert!(SeedPhrase::generate(10, MnemonicLanguage::English).is_err());
    }

    #[test]
    fn test_seed_phrase_recovery() {
        let seed1 = SeedPhrase::generate(12, MnemonicLanguage::English).unwrap();
        let phrase = seed1.phrase();

        let seed2 = SeedPhrase::from_phrase(&phrase, MnemonicLanguage::English).unwrap();

        // Same phrase should produce same seed
        assert_eq!(*seed1.to_seed("password"), *seed2.to_seed("password"));
        assert_eq!(*seed1.to_mini_secret(""), *seed2.to_mini_secret(""));
    }

    #[test]
    fn test_passphrase_affects_seed() {
        let seed = SeedPhrase::generate(12, MnemonicLanguage::English).unwrap();

        assert_ne!(*seed.to_seed(""), *seed.to_seed("my_password"));
        assert_ne!(*seed.to_mini_secret(""), *seed.to_mini_secret("my_password"));
    }

    #[test]
    fn test_mini_secret_differs_from_bip39_seed() {
        let seed = SeedPhrase::from_phrase(
            "bottom drive obey lake curtain smoke basket hold race lonely fit walk",
            MnemonicLanguage::English,
        )
        .unwrap();
        assert_ne!(&seed.to_seed("")[..32], &seed.to_mini_secret("")[..]);
    }

    #[test]
    fn test_validate_phrase() {
        assert!(SeedPhrase::validate(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
            MnemonicLanguage::English,
        ));
        // Extra whitespace is tolerated
        assert!(SeedPhrase::validate(
            "  abandon abandon abandon abandon abandon abandon\tabandon abandon abandon abandon abandon about ",
            MnemonicLanguage::English,
        ));

        assert!(!SeedPhrase::validate("invalid phrase here", MnemonicLanguage::English));
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(MnemonicLanguage::from_code("en"), Some(MnemonicLanguage::English));
        assert_eq!(MnemonicLanguage::from_code("zh-hans"), Some(MnemonicLanguage::ChineseSimplified));
        assert_eq!(MnemonicLanguage::from_code("xx"), None);
    }
}
