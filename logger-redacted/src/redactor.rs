use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
    static ref PHONE_REGEX: Regex =
        Regex::new(r"\b(?:\+\d{1,3}[-.\s]?)?\(?\d{2,3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap();
    static ref MRN_REGEX: Regex = Regex::new(r"\bMRN[-\s]?\d{5,10}\b").unwrap();
    static ref PPSN_REGEX: Regex = Regex::new(r"\b\d{7}[A-Z]{1,2}\b").unwrap();
}

/// PHI redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_mrns: bool,
    pub redact_ppsns: bool,
    /// Replace values with a short stable hash instead of a fixed mask,
    /// so log lines about the same patient remain correlatable.
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_mrns: true,
            redact_ppsns: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

/// Scrubs protected health information from free text bound for logs.
pub struct PhiRedactor {
    config: RedactionConfig,
}

impl PhiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_emails {
            result = self.replace(&EMAIL_REGEX, &result, "EMAIL", "***@***");
        }
        if self.config.redact_phones {
            result = self.replace(&PHONE_REGEX, &result, "PHONE", "***-****");
        }
        if self.config.redact_mrns {
            result = self.replace(&MRN_REGEX, &result, "MRN", "MRN******");
        }
        if self.config.redact_ppsns {
            result = self.replace(&PPSN_REGEX, &result, "PPSN", "*******X");
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    fn replace(&self, pattern: &Regex, text: &str, label: &str, mask: &str) -> String {
        pattern
            .replace_all(text, |caps: &regex::Captures| {
                if self.config.hash_for_correlation {
                    format!("{}[{}]", label, Self::hash_value(&caps[0]))
                } else {
                    mask.to_string()
                }
            })
            .to_string()
    }

    fn hash_value(value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        let digest = hasher.finalize();
        // first 8 bytes keep the token short while staying collision-safe for logs
        general_purpose::STANDARD_NO_PAD.encode(&digest[..8])
    }
}

impl Default for PhiRedactor {
    fn default() -> Self {
        Self::new(RedactionConfig::default())
    }
}
