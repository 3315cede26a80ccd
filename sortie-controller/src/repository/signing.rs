//! Download link signing
//!
//! Links have the form `<public-url>/objects/<bucket>/<key>?expires=<unix>&signature=<hex>`
//! where the signature is HMAC-SHA256 over bucket, key and expiry.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Characters escaped inside a key path; `/` is kept so keys read naturally
const KEY_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'?')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'+')
    .add(b'&');

/// Signs and verifies time-limited download links
#[derive(Clone)]
pub struct LinkSigner {
    public_url: String,
    secret: Vec<u8>,
}

impl LinkSigner {
    pub fn new(public_url: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        let public_url = public_url.into();
        Self {
            public_url: public_url.trim_end_matches('/').to_string(),
            secret: secret.into(),
        }
    }

    /// Builds a link to `bucket/key` valid for `expires_in` from `now`
    pub fn sign(&self, bucket: &str, key: &str, expires_in: Duration, now: DateTime<Utc>) -> String {
        let expires = now.timestamp() + expires_in.as_secs() as i64;
        let signature = self.signature(bucket, key, expires);

        format!(
            "{}/objects/{}/{}?expires={}&signature={}",
            self.public_url,
            utf8_percent_encode(bucket, KEY_PATH),
            utf8_percent_encode(key, KEY_PATH),
            expires,
            signature
        )
    }

    /// Checks a presented signature and expiry
    pub fn verify(
        &self,
        bucket: &str,
        key: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> bool {
        if now.timestamp() > expires {
            return false;
        }

        let Ok(presented) = hex::decode(signature) else {
            return false;
        };

        self.mac(bucket, key, expires)
            .verify_slice(&presented)
            .is_ok()
    }

    fn signature(&self, bucket: &str, key: &str, expires: i64) -> String {
        hex::encode(self.mac(bucket, key, expires).finalize().into_bytes())
    }

    fn mac(&self, bucket: &str, key: &str, expires: i64) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(bucket.as_bytes());
        mac.update(b"\n");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }
}

impl std::fmt::Debug for LinkSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkSigner")
            .field("public_url", &self.public_url)
            .finish_non_exhaustive()
    }
}
