use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
    static ref PHONE_REGEX: Regex = Regex::new(r"(?:\+1[-.\s]?)?\(?\b[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b").unwrap();
    static ref SSN_REGEX: Regex = Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap();
    static ref MRN_REGEX: Regex = Regex::new(r"\bMRN[-:]?\s?\d{4,}\b").unwrap();
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub enabled: bool,
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_ssn: bool,
    pub redact_mrn: bool,
    /// Replace values with a short stable hash so log lines can still be correlated
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redact_emails: true,
            redact_phones: true,
            redact_ssn: true,
            redact_mrn: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

impl RedactionConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Scrubs PII/PHI out of free text and identifier fields before logging
#[derive(Debug, Clone, Default)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Redact every recognised pattern in `text`
    pub fn redact(&self, text: &str) -> String {
        if !self.config.enabled {
            return text.to_string();
        }

        let mut result = text.to_string();

        if self.config.redact_emails {
            result = EMAIL_REGEX
                .replace_all(&result, |caps: &regex::Captures| self.mask_email(&caps[0]))
                .into_owned();
        }

        if self.config.redact_ssn {
            result = SSN_REGEX
                .replace_all(&result, |caps: &regex::Captures| self.mask("SSN", &caps[0], "***-**-****"))
                .into_owned();
        }

        if self.config.redact_phones {
            result = PHONE_REGEX
                .replace_all(&result, |caps: &regex::Captures| self.mask("PHONE", &caps[0], "(***) ***-****"))
                .into_owned();
        }

        if self.config.redact_mrn {
            result = MRN_REGEX
                .replace_all(&result, |caps: &regex::Captures| self.mask("MRN", &caps[0], "MRN******"))
                .into_owned();
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).into_owned();
        }

        result
    }

    /// Redact a value known to be an email address, e.g. a structured field
    pub fn redact_email(&self, email: &str) -> String {
        if !self.config.enabled {
            return email.to_string();
        }
        self.mask_email(email)
    }

    fn mask_email(&self, email: &str) -> String {
        if self.config.hash_for_correlation {
            return format!("EMAIL[{}]", correlation_hash(email));
        }

        match email.split_once('@') {
            Some((local, domain)) => {
                let first_local = local.chars().next().unwrap_or('*');
                let first_domain = domain.chars().next().unwrap_or('*');
                format!("{first_local}***@{first_domain}***")
            }
            None => "***@***".to_string(),
        }
    }

    fn mask(&self, label: &str, value: &str, fallback: &str) -> String {
        if self.config.hash_for_correlation {
            format!("{label}[{}]", correlation_hash(value))
        } else {
            fallback.to_string()
        }
    }
}

/// Short, stable, non-reversible tag for a sensitive value
pub fn correlation_hash(value: &str) -> String {
    let digest = Sha256::digest(value.trim().to_lowercase().as_bytes());
    general_purpose::URL_SAFE_NO_PAD.encode(&digest[..8])
}
