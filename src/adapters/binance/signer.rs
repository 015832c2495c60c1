//! HMAC-SHA256 request signing for authenticated endpoints.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::domain::error::SpotTraderError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct RequestSigner {
    api_key: String,
    secret_key: String,
}

impl RequestSigner {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Hex-encoded signature of `payload`.
    pub fn sign(&self, payload: &str) -> Result<String, SpotTraderError> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes()).map_err(|e| {
            SpotTraderError::ConfigInvalid {
                section: "exchange".to_string(),
                key: "BINANCE_SECRET_KEY".to_string(),
                reason: e.to_string(),
            }
        })?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// `params` plus `timestamp`, followed by the signature of everything
    /// before it.
    pub fn signed_query(&self, params: &[(&str, String)], timestamp_ms: i64) -> Result<String, SpotTraderError> {
        let mut query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>();
        query.push(format!("timestamp={}", timestamp_ms));
        let query = query.join("&");
        let signature = self.sign(&query)?;
        Ok(format!("{}&signature={}", query, signature))
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}
