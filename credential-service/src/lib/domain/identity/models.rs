use std::fmt;

use crate::identity::errors::IdentityParseError;

/// Topology a messaging client connects from.
///
/// Independent of [`ScopeTag`]: both vocabularies are validated against
/// their own allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolTag {
    /// Instance runtimes hosted by the platform.
    Hosted,
    /// Devices connecting from outside the platform.
    Remote,
}

impl ProtocolTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolTag::Hosted => "hosted",
            ProtocolTag::Remote => "remote",
        }
    }

    fn parse(tag: &str) -> Result<Self, IdentityParseError> {
        match tag {
            "hosted" => Ok(ProtocolTag::Hosted),
            "remote" => Ok(ProtocolTag::Remote),
            other => Err(IdentityParseError::UnknownProtocol(other.to_string())),
        }
    }
}

/// Resource class the client acts on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeTag {
    /// A team instance (externally addressed as a node).
    Node,
    /// An edge device.
    Device,
}

impl ScopeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeTag::Node => "node",
            ScopeTag::Device => "device",
        }
    }

    /// Word used when deriving the stored broker-client username for this
    /// resource class.
    pub fn credential_kind(&self) -> &'static str {
        match self {
            ScopeTag::Node => "instance",
            ScopeTag::Device => "device",
        }
    }

    fn parse(tag: &str) -> Result<Self, IdentityParseError> {
        match tag {
            "node" => Ok(ScopeTag::Node),
            "device" => Ok(ScopeTag::Device),
            other => Err(IdentityParseError::UnknownScope(other.to_string())),
        }
    }
}

/// Normalized identity parsed from a broker username/client-id pair.
///
/// `team_xid` and `owner_xid` are the externally-visible (encoded)
/// identifiers; nothing here has touched the store yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub protocol: ProtocolTag,
    pub scope: ScopeTag,
    pub team_xid: String,
    pub owner_xid: String,
    pub ha_present: bool,
}

impl NodeIdentity {
    /// Identity for a hosted instance.
    pub fn for_instance(team_xid: impl Into<String>, owner_xid: impl Into<String>) -> Self {
        Self {
            protocol: ProtocolTag::Hosted,
            scope: ScopeTag::Node,
            team_xid: team_xid.into(),
            owner_xid: owner_xid.into(),
            ha_present: false,
        }
    }

    /// Identity for a remote device.
    pub fn for_device(team_xid: impl Into<String>, owner_xid: impl Into<String>) -> Self {
        Self {
            protocol: ProtocolTag::Remote,
            scope: ScopeTag::Device,
            team_xid: team_xid.into(),
            owner_xid: owner_xid.into(),
            ha_present: false,
        }
    }

    /// Parse and cross-validate a username/client-id pair.
    ///
    /// The username must match the grammar exactly; the client id must be
    /// the username itself, or the username plus a `:haId` suffix for
    /// instance connections in a high-availability replica set.
    ///
    /// # Errors
    /// Any grammar violation or username/client-id inconsistency, as a
    /// typed [`IdentityParseError`].
    pub fn parse(username: &str, client_id: &str) -> Result<Self, IdentityParseError> {
        let segments: Vec<&str> = username.split(':').collect();
        if segments.len() != 4 {
            return Err(IdentityParseError::MalformedUsername {
                actual: segments.len(),
            });
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(IdentityParseError::EmptySegment);
        }

        let protocol = ProtocolTag::parse(segments[0])?;
        let scope = ScopeTag::parse(segments[1])?;

        let client_segments = client_id.split(':').count();
        let ha_present = match client_segments {
            4 => {
                if client_id != username {
                    return Err(IdentityParseError::ClientIdMismatch);
                }
                false
            }
            5 => {
                let (head, ha_id) = client_id
                    .rsplit_once(':')
                    .expect("5-segment client id always splits");
                if ha_id.is_empty() {
                    return Err(IdentityParseError::EmptySegment);
                }
                if scope == ScopeTag::Device {
                    return Err(IdentityParseError::HaSuffixOnDevice);
                }
                if head != username {
                    return Err(IdentityParseError::ClientIdMismatch);
                }
                true
            }
            actual => {
                return Err(IdentityParseError::MalformedClientId { actual });
            }
        };

        Ok(Self {
            protocol,
            scope,
            team_xid: segments[2].to_string(),
            owner_xid: segments[3].to_string(),
            ha_present,
        })
    }

    /// Encode the username for this identity.
    pub fn username(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.protocol.as_str(),
            self.scope.as_str(),
            self.team_xid,
            self.owner_xid
        )
    }

    /// Encode the client id, with an optional high-availability suffix.
    pub fn client_id(&self, ha_id: Option<&str>) -> String {
        match ha_id {
            Some(ha) => format!("{}:{}", self.username(), ha),
            None => self.username(),
        }
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username())
    }
}
