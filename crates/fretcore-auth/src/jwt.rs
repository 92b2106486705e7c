//! JWT session tokens: `{sub: username, sid: session_id, exp}`, HS256.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use fretcore_domain::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub sid: String,
    pub exp: i64,
}

pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn encode(&self, username: &str, session_id: &str, expires_at: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: username.to_string(),
            sid: session_id.to_string(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("jwt encode: {e}")))
    }

    /// Decode and validate signature/expiry only — callers must separately
    /// resolve and validate the session referenced by `sid`.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| Error::AuthFailed(format!("invalid token: {e}")))
    }

    /// Same decode, but classifies the failure so callers (the `/ws` upgrade
    /// handler) can pick between close codes 4001 (expired) and 4002 (invalid).
    pub fn decode_status(&self, token: &str) -> TokenStatus {
        match decode::<Claims>(token, &self.decoding_key, &Validation::default()) {
            Ok(data) => TokenStatus::Valid(data.claims),
            Err(e) if *e.kind() == jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                TokenStatus::Expired
            }
            Err(_) => TokenStatus::Invalid,
        }
    }
}

pub enum TokenStatus {
    Valid(Claims),
    Expired,
    Invalid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn encode_then_decode_round_trips() {
        let codec = JwtCodec::new("0123456789abcdef0123456789abcdef");
        let exp = Utc::now() + Duration::hours(8);
        let token = codec.encode("JDOE", "sess-1", exp).unwrap();
        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.sub, "JDOE");
        assert_eq!(claims.sid, "sess-1");
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = JwtCodec::new("0123456789abcdef0123456789abcdef");
        let exp = Utc::now() - Duration::hours(1);
        let token = codec.encode("JDOE", "sess-1", exp).unwrap();
        assert!(codec.decode(&token).is_err());
    }

    #[test]
    fn decode_status_distinguishes_expired_from_invalid() {
        let codec = JwtCodec::new("0123456789abcdef0123456789abcdef");
        let expired = codec
            .encode("JDOE", "sess-1", Utc::now() - Duration::hours(1))
            .unwrap();
        assert!(matches!(codec.decode_status(&expired), TokenStatus::Expired));
        assert!(matches!(codec.decode_status("not-a-jwt"), TokenStatus::Invalid));
        let valid = codec
            .encode("JDOE", "sess-1", Utc::now() + Duration::hours(1))
            .unwrap();
        assert!(matches!(codec.decode_status(&valid), TokenStatus::Valid(_)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let codec_a = JwtCodec::new("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        let codec_b = JwtCodec::new("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
        let token = codec_a
            .encode("JDOE", "sess-1", Utc::now() + Duration::hours(1))
            .unwrap();
        assert!(codec_b.decode(&token).is_err());
    }
}
