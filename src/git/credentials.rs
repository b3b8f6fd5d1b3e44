// src/git/credentials.rs

//! Process-wide credential broker for remote authentication
//!
//! Remote git operations funnel authentication challenges through a single
//! callback registered once at startup. The CLI installs a prompting
//! callback; tests install fixtures that answer without terminal I/O. When
//! nothing is registered, a default callback offers the agent/default
//! credential where allowed and declines everything else.

use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::warn;

/// Credential kinds a remote may accept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Default,
    Username,
    UsernamePassword,
    SshKey,
    SshCustom,
    SshInteractive,
}

/// An authentication challenge from a remote
#[derive(Debug, Clone)]
pub struct CredentialQuery {
    pub url: String,
    pub username_from_url: Option<String>,
    pub allowed: Vec<CredentialKind>,
}

impl CredentialQuery {
    pub fn allows(&self, kind: CredentialKind) -> bool {
        self.allowed.contains(&kind)
    }
}

/// The broker's answer to a challenge
#[derive(Debug, Clone)]
pub enum CredentialResponse {
    /// Use the default mechanism (credential helper / agent)
    Default,
    /// Username-only, as asked for by some SSH transports
    Username(String),
    /// Plaintext username and password
    UserPass { username: String, password: String },
    /// SSH key pair on disk
    SshKey {
        username: String,
        public_key: Option<PathBuf>,
        private_key: PathBuf,
        passphrase: Option<String>,
    },
    /// No credential of the allowed kinds is available; the caller should
    /// try another kind or fail with an authentication-required error
    Invalid,
    /// Abort the attempt with an authentication failure
    Error,
}

type CredentialCallback = Box<dyn Fn(&CredentialQuery) -> CredentialResponse + Send + Sync>;

static BROKER: OnceLock<CredentialCallback> = OnceLock::new();

/// Register the process-wide credential callback
///
/// The first registration wins; later calls are ignored with a warning.
/// Returns whether this call installed the callback.
pub fn set_credential_callback(
    callback: impl Fn(&CredentialQuery) -> CredentialResponse + Send + Sync + 'static,
) -> bool {
    let installed = BROKER.set(Box::new(callback)).is_ok();
    if !installed {
        warn!("credential callback already registered; ignoring replacement");
    }
    installed
}

/// Answer a challenge through the registered callback
pub(crate) fn answer(query: &CredentialQuery) -> CredentialResponse {
    match BROKER.get() {
        Some(callback) => callback(query),
        None if query.allows(CredentialKind::Default) => CredentialResponse::Default,
        None => CredentialResponse::Invalid,
    }
}
