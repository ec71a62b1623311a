//! Field codec: reversible encryption and deterministic hashing for PII, plus
//! type coercion of request payload fields.
//!
//! Ciphertext format is `base64(nonce || aes-256-gcm ciphertext)`. Hashes are
//! SHA-256 over the salt and the plaintext, hex encoded, so they are stable for
//! as long as the salt (the key epoch) is unchanged.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

use crate::config::FieldProtectionConfig;
use crate::error::{AppError, AppResult};
use crate::models::FieldType;
use crate::models::document::{ApplicationDocument, ENCRYPTED_NESTED_FIELDS, ENCRYPTED_ROOT_FIELDS};

/// AES-GCM nonce length in bytes.
const NONCE_LENGTH: usize = 12;

/// Date formats accepted from the portal, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

pub struct FieldCodec {
    cipher: Aes256Gcm,
    hash_salt: SecretString,
}

impl std::fmt::Debug for FieldCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCodec").finish_non_exhaustive()
    }
}

impl FieldCodec {
    /// Build a codec from configuration. The AES key is SHA-256 of the passphrase.
    pub fn new(config: &FieldProtectionConfig) -> AppResult<Self> {
        let key = Sha256::digest(config.encryption_key.expose_secret().as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| AppError::Crypto(format!("Invalid encryption key: {}", e)))?;

        Ok(Self {
            cipher,
            hash_salt: config.hash_salt.clone(),
        })
    }

    /// Encrypt a field value. Every call uses a fresh nonce, so equal
    /// plaintexts produce different ciphertexts.
    pub fn encrypt_field(&self, plaintext: &str) -> AppResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| AppError::Crypto(format!("Failed to encrypt field: {}", e)))?;

        let mut payload = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(payload))
    }

    /// Decrypt a value produced by [`FieldCodec::encrypt_field`].
    pub fn decrypt_field(&self, ciphertext: &str) -> AppResult<String> {
        let payload = STANDARD
            .decode(ciphertext.trim())
            .map_err(|e| AppError::Crypto(format!("Ciphertext is not valid base64: {}", e)))?;

        if payload.len() <= NONCE_LENGTH {
            return Err(AppError::Crypto("Ciphertext is truncated".to_string()));
        }

        let (nonce, body) = payload.split_at(NONCE_LENGTH);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| AppError::Crypto("Failed to decrypt field".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| AppError::Crypto("Decrypted field is not valid UTF-8".to_string()))
    }

    pub fn encrypt_optional(&self, plaintext: Option<&str>) -> AppResult<Option<String>> {
        plaintext.map(|p| self.encrypt_field(p)).transpose()
    }

    pub fn decrypt_optional(&self, ciphertext: Option<&str>) -> AppResult<Option<String>> {
        ciphertext.map(|c| self.decrypt_field(c)).transpose()
    }

    /// Deterministic search hash. Case and surrounding whitespace are ignored.
    pub fn hash_field(&self, plaintext: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.hash_salt.expose_secret().as_bytes());
        hasher.update(b":");
        hasher.update(plaintext.trim().to_lowercase().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Coerce declared fields to their semantic type. Undeclared keys pass
    /// through unchanged.
    pub fn coerce_fields(
        &self,
        fields: &Map<String, Value>,
        types: &[(&str, FieldType)],
    ) -> AppResult<Map<String, Value>> {
        coerce_fields(fields, types)
    }

    /// Decrypted view of a stored document. Any undecryptable tagged field
    /// fails the whole view.
    pub fn decrypt_document(&self, document: &ApplicationDocument) -> AppResult<ApplicationDocument> {
        let mut fields = document.fields().clone();

        for key in ENCRYPTED_ROOT_FIELDS {
            if let Some(Value::String(ciphertext)) = fields.get(*key) {
                let plaintext = self.decrypt_field(ciphertext)?;
                fields.insert(key.to_string(), Value::String(plaintext));
            }
        }

        for (array_key, nested) in ENCRYPTED_NESTED_FIELDS {
            if let Some(Value::Array(items)) = fields.get_mut(*array_key) {
                for item in items.iter_mut().filter_map(Value::as_object_mut) {
                    for key in *nested {
                        if let Some(Value::String(ciphertext)) = item.get(*key) {
                            let plaintext = self.decrypt_field(ciphertext)?;
                            item.insert(key.to_string(), Value::String(plaintext));
                        }
                    }
                }
            }
        }

        Ok(ApplicationDocument::new(fields))
    }
}

/// Coerce declared fields of `fields` to their semantic type.
pub fn coerce_fields(
    fields: &Map<String, Value>,
    types: &[(&str, FieldType)],
) -> AppResult<Map<String, Value>> {
    let mut coerced = fields.clone();
    for (name, field_type) in types {
        if let Some(value) = fields.get(*name) {
            coerced.insert(name.to_string(), coerce_value(name, value, *field_type)?);
        }
    }
    Ok(coerced)
}

/// `f` as an integer when it is whole and inside the `i64` range.
fn whole_to_i64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}

/// Coerce one value. `"0"` is a real zero and `""` a real empty string for
/// text; for numbers and dates an empty string is an explicit null.
pub fn coerce_value(name: &str, value: &Value, field_type: FieldType) -> AppResult<Value> {
    let invalid = |expected: &str| {
        AppError::Validation(format!("{} must be {}, got {}", name, expected, value))
    };

    match field_type {
        FieldType::Text => match value {
            Value::Null => Ok(Value::Null),
            Value::String(s) => Ok(Value::String(s.trim().to_string())),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(invalid("text")),
        },
        FieldType::Integer => match value {
            Value::Null => Ok(Value::Null),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(whole_to_i64))
                .map(Value::from)
                .ok_or_else(|| invalid("an integer")),
            Value::String(s) => {
                let cleaned = clean_number(s);
                if cleaned.is_empty() {
                    return Ok(Value::Null);
                }
                cleaned
                    .parse::<i64>()
                    .ok()
                    .or_else(|| {
                        cleaned
                            .parse::<f64>()
                            .ok()
                            .and_then(whole_to_i64)
                    })
                    .map(Value::from)
                    .ok_or_else(|| invalid("an integer"))
            }
            _ => Err(invalid("an integer")),
        },
        FieldType::Float => match value {
            Value::Null => Ok(Value::Null),
            Value::Number(n) => n
                .as_f64()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| invalid("a number")),
            Value::String(s) => {
                let cleaned = clean_number(s);
                if cleaned.is_empty() {
                    return Ok(Value::Null);
                }
                cleaned
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| invalid("a number"))
            }
            _ => Err(invalid("a number")),
        },
        FieldType::Date => match value {
            Value::Null => Ok(Value::Null),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => parse_date(s.trim())
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .ok_or_else(|| invalid("a date")),
            _ => Err(invalid("a date")),
        },
        FieldType::Bool => match value {
            Value::Null => Ok(Value::Bool(false)),
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err(invalid("a boolean")),
            },
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "y" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "n" | "" => Ok(Value::Bool(false)),
                _ => Err(invalid("a boolean")),
            },
            _ => Err(invalid("a boolean")),
        },
    }
}

fn clean_number(s: &str) -> String {
    s.trim().chars().filter(|c| *c != ',' && *c != '$').collect()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}
