//! Stateless XSRF token minting and verification.
//!
//! token = base64url(HMAC-SHA256(secret, "xsrf-v1" ‖ window ‖ binding))
//!
//! Nothing is stored: verification recomputes the expected token for the
//! current window and the configured number of preceding windows.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::clock::now_unix;
use crate::origin::{push_field, OriginKey};

type HmacSha256 = Hmac<Sha256>;

const VERSION: &[u8] = b"xsrf-v1";

/// What a token is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XsrfBinding {
    /// Authenticated request: the login session.
    Session(String),
    /// Pre-login request: the classified origin.
    Anonymous(OriginKey),
}

impl XsrfBinding {
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            XsrfBinding::Session(id) => {
                out.push(b'S');
                push_field(&mut out, id.as_bytes());
            }
            XsrfBinding::Anonymous(origin) => {
                out.push(b'O');
                push_field(&mut out, &origin.encode());
            }
        }
        out
    }
}

/// Mints and verifies XSRF tokens.
#[derive(Clone)]
pub struct XsrfEngine {
    secret: Vec<u8>,
    window_secs: u64,
    tolerance_windows: u32,
}

impl std::fmt::Debug for XsrfEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XsrfEngine")
            .field("window_secs", &self.window_secs)
            .field("tolerance_windows", &self.tolerance_windows)
            .finish_non_exhaustive()
    }
}

impl XsrfEngine {
    /// `window_secs` is clamped to at least one second.
    pub fn new(secret: impl Into<Vec<u8>>, window_secs: u64, tolerance_windows: u32) -> Self {
        Self {
            secret: secret.into(),
            window_secs: window_secs.max(1),
            tolerance_windows,
        }
    }

    /// Engine with a random per-process secret.
    pub fn with_random_secret(window_secs: u64, tolerance_windows: u32) -> Self {
        let mut secret = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self::new(secret, window_secs, tolerance_windows)
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// Window index containing `unix_secs`.
    pub fn window_for(&self, unix_secs: u64) -> u64 {
        unix_secs / self.window_secs
    }

    /// Token for `binding` in `window`.
    pub fn mint(&self, binding: &XsrfBinding, window: u64) -> String {
        URL_SAFE_NO_PAD.encode(self.mac(binding, window).finalize().into_bytes())
    }

    /// Token for `binding` in the current window.
    pub fn mint_now(&self, binding: &XsrfBinding) -> String {
        self.mint(binding, self.window_for(now_unix()))
    }

    /// Check `token` against `binding` at time `now`. Returns false for any
    /// malformed or mismatching token.
    pub fn verify(&self, token: &str, binding: &XsrfBinding, now: u64) -> bool {
        let Ok(submitted) = URL_SAFE_NO_PAD.decode(token.trim().as_bytes()) else {
            return false;
        };
        let current = self.window_for(now);
        (0..=u64::from(self.tolerance_windows))
            .map_while(|back| current.checked_sub(back))
            .any(|window| self.mac(binding, window).verify_slice(&submitted).is_ok())
    }

    /// `verify` against the system clock.
    pub fn verify_now(&self, token: &str, binding: &XsrfBinding) -> bool {
        self.verify(token, binding, now_unix())
    }

    fn mac(&self, binding: &XsrfBinding, window: u64) -> HmacSha256 {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(VERSION);
        mac.update(&window.to_be_bytes());
        mac.update(&binding.encode());
        mac
    }
}
