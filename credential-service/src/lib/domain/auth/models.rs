/// Principal resolved by a successful structured broker check.
///
/// Deliberately carries the externally-visible team id and the presented
/// username rather than raw store ids, so callers cannot skip the
/// owner/identity cross-checks by trusting client-supplied fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerPrincipal {
    pub username: String,
    pub team_id: String,
    pub ha_present: bool,
}

/// Internal reason a check denied.
///
/// Logged for observability; never exposed on the wire, where every
/// denial collapses to the same negative answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    EmptySecret,
    OversizedSecret,
    MalformedIdentity,
    IdentityMismatch,
    CredentialNotFound,
    CredentialInvalid,
    CredentialExpired,
    TeamSuspended,
    FeatureDisabled,
}
