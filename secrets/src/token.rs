use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes backing every generated token.
const TOKEN_BYTES: usize = 32;

/// Credential class a generated token belongs to.
///
/// The class only selects the human-readable prefix. Prefixes exist for
/// debuggability (log lines, support tickets) and are never parsed for
/// security decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    /// Bearer access token.
    Access,
    /// Refresh token paired with an access token or session.
    Refresh,
    /// Interactive web session id.
    Session,
    /// OAuth-style client secret.
    ClientSecret,
    /// Messaging-broker password.
    BrokerPassword,
}

impl TokenClass {
    pub fn prefix(&self) -> &'static str {
        match self {
            TokenClass::Access => "act",
            TokenClass::Refresh => "rft",
            TokenClass::Session => "sid",
            TokenClass::ClientSecret => "ccs",
            TokenClass::BrokerPassword => "bkp",
        }
    }
}

/// Generate an opaque token: `prefix '_' base64url(32 random bytes)`.
pub fn generate(class: TokenClass) -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);

    format!("{}_{}", class.prefix(), URL_SAFE_NO_PAD.encode(bytes))
}
