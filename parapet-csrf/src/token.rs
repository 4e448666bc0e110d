//! Signed, stateless CSRF tokens.
//!
//! A token is `base64url(ts:nonce:binding:signature)` where `ts` is the
//! issue time in epoch milliseconds, `nonce` is 32 random bytes
//! (base64url), `binding` is the session id or `anonymous`, and `signature`
//! is `HMAC-SHA256(secret, "ts:nonce:binding")` (base64url). Every field is
//! recovered from the token itself; nothing is stored server-side.

use crate::config::CsrfConfig;
use crate::error::{CsrfError, Result};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Binding used when a token is issued outside any session.
pub const ANONYMOUS: &str = "anonymous";

/// Random bytes per token.
pub const NONCE_LEN: usize = 32;

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A decoded token. Obtained from [`TokenAuthority::decode`], so the
/// signature has already been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    pub issued_at_ms: i64,
    /// base64url nonce
    pub nonce: String,
    pub binding: String,
    /// base64url HMAC
    pub signature: String,
}

impl CsrfToken {
    pub fn is_anonymous(&self) -> bool {
        self.binding == ANONYMOUS
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.issued_at_ms)
    }

    /// A session-bound token only verifies against its own session. Anonymous
    /// tokens, and requests without a session, skip the check.
    pub fn check_binding(&self, session_id: Option<&str>) -> Result<()> {
        match session_id.filter(|id| !id.is_empty()) {
            Some(id) if !self.is_anonymous() && self.binding != id => {
                Err(CsrfError::SessionMismatch)
            }
            _ => Ok(()),
        }
    }

    /// Fails once more than `max_age` has passed since issue.
    pub fn check_age(&self, now_ms: i64, max_age: Duration) -> Result<()> {
        let age_ms = now_ms.saturating_sub(self.issued_at_ms);
        if age_ms > max_age.as_millis() as i64 {
            return Err(CsrfError::Expired);
        }
        Ok(())
    }

    /// Wire form of the token.
    pub fn encode(&self) -> String {
        let raw = format!(
            "{}:{}",
            signing_input(self.issued_at_ms, &self.nonce, &self.binding),
            self.signature
        );
        URL_SAFE_NO_PAD.encode(raw)
    }

    /// Split a wire token into its fields without checking the signature.
    fn parse(encoded: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|_| CsrfError::MalformedToken)?;
        let raw = String::from_utf8(bytes).map_err(|_| CsrfError::MalformedToken)?;

        // Bindings may contain ':', the other fields cannot.
        let (signed, signature) = raw.rsplit_once(':').ok_or(CsrfError::MalformedToken)?;
        let mut parts = signed.splitn(3, ':');
        let (Some(ts), Some(nonce), Some(binding)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CsrfError::MalformedToken);
        };

        if nonce.is_empty() || binding.is_empty() || signature.is_empty() {
            return Err(CsrfError::MalformedToken);
        }
        let issued_at_ms = ts.parse::<i64>().map_err(|_| CsrfError::MalformedToken)?;

        Ok(Self {
            issued_at_ms,
            nonce: nonce.to_string(),
            binding: binding.to_string(),
            signature: signature.to_string(),
        })
    }
}

impl fmt::Display for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn signing_input(issued_at_ms: i64, nonce: &str, binding: &str) -> String {
    format!("{}:{}:{}", issued_at_ms, nonce, binding)
}

/// Issues and verifies tokens with one secret.
///
/// Cheap to clone; clones share the configuration and clock.
#[derive(Clone)]
pub struct TokenAuthority {
    config: Arc<CsrfConfig>,
    mac: HmacSha256,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TokenAuthority {
    pub fn new(config: CsrfConfig) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(&config.secret)
            .map_err(|e| CsrfError::Config(e.to_string()))?;
        Ok(Self {
            config: Arc::new(config),
            mac,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock, e.g. with a fixed one in tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Mint a token bound to `session_binding`, or to [`ANONYMOUS`].
    pub fn issue(&self, session_binding: Option<&str>) -> String {
        self.issue_token(session_binding).encode()
    }

    pub fn issue_token(&self, session_binding: Option<&str>) -> CsrfToken {
        let binding = session_binding
            .filter(|b| !b.is_empty())
            .unwrap_or(ANONYMOUS)
            .to_string();
        let nonce_bytes: [u8; NONCE_LEN] = rand::thread_rng().r#gen();
        let nonce = URL_SAFE_NO_PAD.encode(nonce_bytes);
        let issued_at_ms = self.clock.now_millis();

        let signature =
            URL_SAFE_NO_PAD.encode(self.sign(&signing_input(issued_at_ms, &nonce, &binding)));

        CsrfToken {
            issued_at_ms,
            nonce,
            binding,
            signature,
        }
    }

    /// Decode a wire token and check its signature in constant time.
    pub fn decode(&self, encoded: &str) -> Result<CsrfToken> {
        let token = CsrfToken::parse(encoded)?;
        let signature = URL_SAFE_NO_PAD
            .decode(&token.signature)
            .map_err(|_| CsrfError::MalformedToken)?;

        let mut mac = self.mac.clone();
        mac.update(signing_input(token.issued_at_ms, &token.nonce, &token.binding).as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| CsrfError::InvalidSignature)?;

        Ok(token)
    }

    /// Full check: presence, format, signature, session binding, then age.
    pub fn verify(&self, token: Option<&str>, session_id: Option<&str>) -> Result<CsrfToken> {
        let encoded = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(CsrfError::MissingToken)?;

        let token = self.decode(encoded)?;
        token.check_binding(session_id)?;
        token.check_age(self.clock.now_millis(), self.config.max_age)?;
        Ok(token)
    }

    fn sign(&self, input: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(input.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    const SECRET: &[u8] = b"test_secret_key_32_bytes_long!!!";

    struct FixedClock(AtomicI64);

    impl Clock for FixedClock {
        fn now_millis(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn authority() -> TokenAuthority {
        TokenAuthority::new(CsrfConfig::new(SECRET).unwrap()).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let authority = authority();
        let encoded = authority.issue(Some("session-1"));
        let token = authority.verify(Some(&encoded), Some("session-1")).unwrap();

        assert_eq!(token.binding, "session-1");
        assert_eq!(URL_SAFE_NO_PAD.decode(&token.nonce).unwrap().len(), NONCE_LEN);
        assert_eq!(token.encode(), encoded);
    }

    #[test]
    fn test_binding_with_colons() {
        let authority = authority();
        let encoded = authority.issue(Some("tenant:42:user"));
        let token = authority.verify(Some(&encoded), Some("tenant:42:user")).unwrap();
        assert_eq!(token.binding, "tenant:42:user");
    }

    #[test]
    fn test_empty_binding_is_anonymous() {
        let authority = authority();
        let token = authority.issue_token(Some(""));
        assert!(token.is_anonymous());
    }

    #[test]
    fn test_tokens_are_unique() {
        let authority = authority();
        assert_ne!(authority.issue(None), authority.issue(None));
    }

    #[test]
    fn test_missing_and_malformed() {
        let authority = authority();
        assert_eq!(authority.verify(None, None), Err(CsrfError::MissingToken));
        assert_eq!(authority.verify(Some("  "), None), Err(CsrfError::MissingToken));
        assert_eq!(
            authority.verify(Some("not base64!"), None),
            Err(CsrfError::MalformedToken)
        );

        let no_fields = URL_SAFE_NO_PAD.encode("just-one-field");
        assert_eq!(
            authority.verify(Some(&no_fields), None),
            Err(CsrfError::MalformedToken)
        );

        let bad_ts = URL_SAFE_NO_PAD.encode("soon:bm9uY2U:anonymous:c2ln");
        assert_eq!(
            authority.verify(Some(&bad_ts), None),
            Err(CsrfError::MalformedToken)
        );
    }

    #[test]
    fn test_other_secret_fails_signature() {
        let encoded = authority().issue(None);
        let other = TokenAuthority::new(
            CsrfConfig::new(b"another_secret_key_of_32_bytes!!".to_vec()).unwrap(),
        )
        .unwrap();
        assert_eq!(
            other.verify(Some(&encoded), None),
            Err(CsrfError::InvalidSignature)
        );
    }

    #[test]
    fn test_check_binding() {
        let authority = authority();
        let bound = authority.issue_token(Some("A"));
        assert_eq!(bound.check_binding(Some("B")), Err(CsrfError::SessionMismatch));
        assert!(bound.check_binding(Some("A")).is_ok());
        assert!(bound.check_binding(None).is_ok());

        let anonymous = authority.issue_token(None);
        assert!(anonymous.check_binding(Some("B")).is_ok());
    }

    #[test]
    fn test_check_age_boundary() {
        let clock = Arc::new(FixedClock(AtomicI64::new(1_000_000)));
        let authority = authority().with_clock(clock.clone());
        let token = authority.issue_token(None);
        let max_age = Duration::from_secs(3600);

        assert!(token.check_age(1_000_000 + 3_600_000, max_age).is_ok());
        assert_eq!(
            token.check_age(1_000_000 + 3_600_001, max_age),
            Err(CsrfError::Expired)
        );
    }

    #[test]
    fn test_verify_order_signature_before_expiry() {
        let clock = Arc::new(FixedClock(AtomicI64::new(0)));
        let authority = authority().with_clock(clock.clone());
        let encoded = authority.issue(Some("A"));

        clock.0.store(10 * 3_600_000, Ordering::SeqCst);
        assert_eq!(
            authority.verify(Some(&encoded), Some("B")),
            Err(CsrfError::SessionMismatch)
        );
        assert_eq!(
            authority.verify(Some(&encoded), Some("A")),
            Err(CsrfError::Expired)
        );
    }

    #[test]
    fn test_issued_at() {
        let clock = Arc::new(FixedClock(AtomicI64::new(1_700_000_000_000)));
        let token = authority().with_clock(clock).issue_token(None);
        assert_eq!(token.issued_at().unwrap().timestamp(), 1_700_000_000);
    }
}
