use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use uuid::Uuid;

use crate::credential::ports::ExternalIdCodec;

/// Opaque external-id codec: base64url over the raw UUID bytes.
///
/// Total and invertible. Anything that does not decode to exactly 16
/// bytes maps to None, which callers treat as "not found".
pub struct Base64IdCodec;

impl ExternalIdCodec for Base64IdCodec {
    fn encode(&self, id: &Uuid) -> String {
        URL_SAFE_NO_PAD.encode(id.as_bytes())
    }

    fn decode(&self, external_id: &str) -> Option<Uuid> {
        let bytes = URL_SAFE_NO_PAD.decode(external_id).ok()?;
        Uuid::from_slice(&bytes).ok()
    }
}
