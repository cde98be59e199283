//! Token Codec
//!
//! Turns a session map into the string stored in the cookie and back. Tokens
//! are compact HS256 JWS strings, `header.payload.signature`, each segment
//! base64url without padding. In [`TokenMode::Encrypted`] the payload is a
//! JSON string carrying the AES-256-GCM ciphertext of the map; in
//! [`TokenMode::Signed`] it is the map itself. The signature covers both
//! shapes, and decoding accepts either regardless of the configured mode.
//!
//! Decoding never fails on a bad cookie. Tampered or malformed input comes
//! back as [`Decoded::Invalid`]; only failures unrelated to the input (MAC
//! key setup, for instance) are returned as `Err`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{InvalidToken, SessionError};
use crate::secret::SecretKeyBase;
use crate::utils::crypto::{
    decrypt_data, derive_encryption_key, encrypt_data, hs256_header, sign_hmac_sha256,
    verify_hmac_sha256, ENCRYPTION_KEY_SIZE,
};

/// Decoded session state: a flat string-keyed JSON object
pub type SessionData = serde_json::Map<String, Value>;

/// How the payload is protected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenMode {
    /// Signed JSON; readable by the client but tamper-evident
    Signed,
    /// JSON encrypted with AES-256-GCM, then signed
    #[default]
    Encrypted,
}

/// Cookie-ready token string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken(String);

impl SignedToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of decoding a cookie value
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// No cookie, or an empty value
    Absent,
    /// Verified session data
    Valid(SessionData),
    /// Token rejected; treated as "no session"
    Invalid(InvalidToken),
}

impl Decoded {
    /// The session map, or an empty map for absent and invalid tokens
    #[must_use]
    pub fn into_data(self) -> SessionData {
        match self {
            Decoded::Valid(data) => data,
            Decoded::Absent | Decoded::Invalid(_) => SessionData::new(),
        }
    }

    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self, Decoded::Invalid(_))
    }
}

/// Signs, encrypts and verifies session tokens for one secret
#[derive(Clone)]
pub struct TokenCodec {
    signing_key: Vec<u8>,
    encryption_key: [u8; ENCRYPTION_KEY_SIZE],
    mode: TokenMode,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    #[must_use]
    pub fn new(secret: &SecretKeyBase, mode: TokenMode) -> Self {
        Self {
            signing_key: secret.as_bytes().to_vec(),
            encryption_key: derive_encryption_key(secret.as_bytes()),
            mode,
        }
    }

    #[must_use]
    pub fn mode(&self) -> TokenMode {
        self.mode
    }

    /// Serialize, optionally encrypt, and sign a session map
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, encryption or signing fails
    pub fn encode(&self, data: &SessionData) -> Result<SignedToken, SessionError> {
        let payload = match self.mode {
            TokenMode::Signed => Value::Object(data.clone()),
            TokenMode::Encrypted => Value::String(encrypt_data(data, &self.encryption_key)?),
        };

        let header_json = serde_json::to_vec(&hs256_header()).map_err(SessionError::Serialize)?;
        let payload_json = serde_json::to_vec(&payload).map_err(SessionError::Serialize)?;

        let message = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(payload_json)
        );
        let signature = sign_hmac_sha256(message.as_bytes(), &self.signing_key)?;

        Ok(SignedToken(format!(
            "{message}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        )))
    }

    /// Verify and decode a cookie value
    ///
    /// # Errors
    ///
    /// Only for failures unrelated to the token contents. Tampered, foreign
    /// or malformed tokens yield `Ok(Decoded::Invalid(_))`.
    pub fn decode(&self, token: Option<&str>) -> Result<Decoded, SessionError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(Decoded::Absent);
        };

        let mut parts = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Ok(rejected(InvalidToken::Malformed));
        };

        let Some(header) = decode_segment::<Value>(header_b64) else {
            return Ok(rejected(InvalidToken::Malformed));
        };
        if header.get("alg").and_then(Value::as_str) != Some("HS256") {
            return Ok(rejected(InvalidToken::UnsupportedAlgorithm));
        }

        let Ok(signature) = URL_SAFE_NO_PAD.decode(signature_b64) else {
            return Ok(rejected(InvalidToken::Malformed));
        };
        let message = &token[..header_b64.len() + 1 + payload_b64.len()];
        if !verify_hmac_sha256(message.as_bytes(), &self.signing_key, &signature)? {
            return Ok(rejected(InvalidToken::BadSignature));
        }

        let Some(payload) = decode_segment::<Value>(payload_b64) else {
            return Ok(rejected(InvalidToken::Malformed));
        };

        let data = match payload {
            Value::Object(map) => map,
            Value::String(encrypted) => {
                match decrypt_data::<Value>(&encrypted, &self.encryption_key) {
                    Ok(Value::Object(map)) => map,
                    Ok(_) => return Ok(rejected(InvalidToken::NotAnObject)),
                    Err(e) => {
                        log::debug!("Session payload decryption failed: {e}");
                        return Ok(rejected(InvalidToken::Undecryptable));
                    }
                }
            }
            _ => return Ok(rejected(InvalidToken::NotAnObject)),
        };

        Ok(Decoded::Valid(data))
    }

    /// Decode, collapsing absent and invalid tokens to an empty map
    ///
    /// # Errors
    ///
    /// Same as [`TokenCodec::decode`]
    pub fn decode_or_empty(&self, token: Option<&str>) -> Result<SessionData, SessionError> {
        self.decode(token).map(Decoded::into_data)
    }
}

/// Encode with the default (encrypted) mode
///
/// # Errors
///
/// Same as [`TokenCodec::encode`]
pub fn encode(data: &SessionData, secret: &SecretKeyBase) -> Result<SignedToken, SessionError> {
    TokenCodec::new(secret, TokenMode::default()).encode(data)
}

/// Decode a token produced by either mode
///
/// # Errors
///
/// Same as [`TokenCodec::decode_or_empty`]
pub fn decode(token: Option<&str>, secret: &SecretKeyBase) -> Result<SessionData, SessionError> {
    TokenCodec::new(secret, TokenMode::default()).decode_or_empty(token)
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn rejected(reason: InvalidToken) -> Decoded {
    log::debug!("Discarding session token: {reason}");
    Decoded::Invalid(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{sample_data, secret, OTHER_SECRET, TEST_SECRET};
    use serde_json::json;

    fn forge(header: &Value, payload: &Value, key: &[u8]) -> String {
        let message = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(header).unwrap()),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap())
        );
        let signature = sign_hmac_sha256(message.as_bytes(), key).unwrap();
        format!("{message}.{}", URL_SAFE_NO_PAD.encode(signature))
    }

    #[test]
    fn test_roundtrip_both_modes() {
        for mode in [TokenMode::Signed, TokenMode::Encrypted] {
            let codec = TokenCodec::new(&secret(TEST_SECRET), mode);
            let data = sample_data();
            let token = codec.encode(&data).unwrap();

            assert_eq!(token.as_str().split('.').count(), 3);
            assert_eq!(
                codec.decode(Some(token.as_str())).unwrap(),
                Decoded::Valid(data)
            );
        }
    }

    #[test]
    fn test_free_functions_roundtrip() {
        let key = secret(TEST_SECRET);
        let data = sample_data();
        let token = encode(&data, &key).unwrap();
        assert_eq!(decode(Some(token.as_str()), &key).unwrap(), data);
    }

    #[test]
    fn test_foreign_secret_yields_empty_map() {
        for mode in [TokenMode::Signed, TokenMode::Encrypted] {
            let token = TokenCodec::new(&secret(TEST_SECRET), mode)
                .encode(&sample_data())
                .unwrap();
            let other = TokenCodec::new(&secret(OTHER_SECRET), mode);

            assert_eq!(
                other.decode(Some(token.as_str())).unwrap(),
                Decoded::Invalid(InvalidToken::BadSignature)
            );
            assert!(other.decode_or_empty(Some(token.as_str())).unwrap().is_empty());
        }
    }

    #[test]
    fn test_tampered_payload_detected() {
        let codec = TokenCodec::new(&secret(TEST_SECRET), TokenMode::Signed);
        let token = codec.encode(&sample_data()).unwrap().into_string();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&json!({"user": "mallory"})).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(codec.decode(Some(&forged)).unwrap().is_invalid());
    }

    #[test]
    fn test_tampered_signature_detected() {
        let codec = TokenCodec::new(&secret(TEST_SECRET), TokenMode::Encrypted);
        let token = codec.encode(&sample_data()).unwrap().into_string();
        // flip a character in the middle of the signature so every bit decodes
        let at = token.rfind('.').unwrap() + 10;
        let original = &token[at..=at];
        let replacement = if original == "A" { "B" } else { "A" };
        let tampered = format!("{}{replacement}{}", &token[..at], &token[at + 1..]);

        assert_eq!(
            codec.decode(Some(&tampered)).unwrap(),
            Decoded::Invalid(InvalidToken::BadSignature)
        );
    }

    #[test]
    fn test_absent_and_empty_tokens() {
        let codec = TokenCodec::new(&secret(TEST_SECRET), TokenMode::Encrypted);
        assert_eq!(codec.decode(None).unwrap(), Decoded::Absent);
        assert_eq!(codec.decode(Some("")).unwrap(), Decoded::Absent);
        assert!(codec.decode_or_empty(None).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_tokens() {
        let codec = TokenCodec::new(&secret(TEST_SECRET), TokenMode::Encrypted);
        let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&hs256_header()).unwrap());
        let bad_signature = format!("{header}.e30.%%%");
        for token in ["garbage", "a.b", "a.b.c.d", "!!.??.**", bad_signature.as_str()] {
            assert_eq!(
                codec.decode(Some(token)).unwrap(),
                Decoded::Invalid(InvalidToken::Malformed),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn test_unsupported_algorithm_rejected() {
        let codec = TokenCodec::new(&secret(TEST_SECRET), TokenMode::Signed);
        let forged = forge(
            &json!({"alg": "none", "typ": "JWT"}),
            &json!({"user": "mallory"}),
            TEST_SECRET.as_bytes(),
        );
        assert_eq!(
            codec.decode(Some(&forged)).unwrap(),
            Decoded::Invalid(InvalidToken::UnsupportedAlgorithm)
        );
    }

    #[test]
    fn test_signed_non_object_payload_rejected() {
        let codec = TokenCodec::new(&secret(TEST_SECRET), TokenMode::Signed);
        let forged = forge(&hs256_header(), &json!([1, 2, 3]), TEST_SECRET.as_bytes());
        assert_eq!(
            codec.decode(Some(&forged)).unwrap(),
            Decoded::Invalid(InvalidToken::NotAnObject)
        );
    }

    #[test]
    fn test_signed_undecryptable_string_payload_rejected() {
        let codec = TokenCodec::new(&secret(TEST_SECRET), TokenMode::Encrypted);
        let forged = forge(
            &hs256_header(),
            &json!("definitely-not-ciphertext"),
            TEST_SECRET.as_bytes(),
        );
        assert_eq!(
            codec.decode(Some(&forged)).unwrap(),
            Decoded::Invalid(InvalidToken::Undecryptable)
        );
    }

    #[test]
    fn test_empty_object_is_valid_empty_map() {
        let codec = TokenCodec::new(&secret(TEST_SECRET), TokenMode::Signed);
        let token = codec.encode(&SessionData::new()).unwrap();
        assert_eq!(
            codec.decode(Some(token.as_str())).unwrap(),
            Decoded::Valid(SessionData::new())
        );
    }

    #[test]
    fn test_decode_accepts_either_payload_shape() {
        let key = secret(TEST_SECRET);
        let signed = TokenCodec::new(&key, TokenMode::Signed);
        let encrypted = TokenCodec::new(&key, TokenMode::Encrypted);
        let data = sample_data();

        let from_signed = signed.encode(&data).unwrap();
        let from_encrypted = encrypted.encode(&data).unwrap();

        assert_eq!(
            encrypted.decode_or_empty(Some(from_signed.as_str())).unwrap(),
            data
        );
        assert_eq!(
            signed.decode_or_empty(Some(from_encrypted.as_str())).unwrap(),
            data
        );
    }

    #[test]
    fn test_encrypted_token_hides_keys_and_values() {
        let codec = TokenCodec::new(&secret(TEST_SECRET), TokenMode::Encrypted);
        let mut data = SessionData::new();
        data.insert("secret".into(), json!("topsecret"));
        let token = codec.encode(&data).unwrap();

        assert!(!token.as_str().contains("secret"));
        assert!(!token.as_str().contains("topsecret"));
    }

    #[test]
    fn test_signed_mode_is_deterministic() {
        let codec = TokenCodec::new(&secret(TEST_SECRET), TokenMode::Signed);
        let data = sample_data();
        assert_eq!(codec.encode(&data).unwrap(), codec.encode(&data).unwrap());
    }

    #[test]
    fn test_debug_does_not_leak_keys() {
        let codec = TokenCodec::new(&secret(TEST_SECRET), TokenMode::Signed);
        let debug = format!("{codec:?}");
        assert!(debug.contains("Signed"));
        assert!(!debug.contains(TEST_SECRET));
    }
}
