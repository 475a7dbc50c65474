//! Internal signed tokens.
//!
//! A token binds an identifier to the shared secret for a bounded time:
//! `{id}:{expiry_unix}:{hex hmac-sha256("id:expiry")}`. Tokens authorize
//! the system-initiated account cascade without the user's password, and
//! double as the short-lived blob access token attached to post views.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct TokenMinter {
    secret: Vec<u8>,
    ttl_secs: i64,
}

impl TokenMinter {
    pub fn new(secret: impl Into<Vec<u8>>, ttl_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }

    pub fn mint(&self, id: &str) -> String {
        let expiry = Utc::now().timestamp() + self.ttl_secs;
        format!("{id}:{expiry}:{}", self.tag(id, expiry))
    }

    pub fn is_valid(&self, token: &str, id: &str) -> bool {
        // The bound id may itself contain ':', so parse from the right.
        let mut parts = token.rsplitn(3, ':');
        let (Some(tag), Some(expiry), Some(bound_id)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        if bound_id != id {
            return false;
        }
        let Ok(expiry) = expiry.parse::<i64>() else {
            return false;
        };
        if expiry < Utc::now().timestamp() {
            return false;
        }
        let Ok(tag) = hex::decode(tag) else {
            return false;
        };
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(format!("{bound_id}:{expiry}").as_bytes());
        mac.verify_slice(&tag).is_ok()
    }

    fn tag(&self, id: &str, expiry: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(format!("{id}:{expiry}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
