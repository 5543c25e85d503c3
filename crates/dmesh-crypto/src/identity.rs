//! Public identity construction.

use dmesh_wire::envelope::KIND_IDENTITY;
use dmesh_wire::limits::WIRE_VERSION;
use dmesh_wire::{to_base64, PublicIdentity};

use crate::ids::fingerprint;

/// Build a shareable identity card from a display name and public keys.
///
/// The fingerprint is derived from the signing key, never supplied by
/// the caller, so a card can always be cross-checked against its key.
pub fn create_public_identity(
    name: &str,
    sign_pk: &[u8; 32],
    box_pk: &[u8; 32],
) -> PublicIdentity {
    PublicIdentity {
        v: WIRE_VERSION,
        kind: KIND_IDENTITY.into(),
        name: name.to_string(),
        fp: fingerprint(sign_pk).to_base64(),
        sign_pk: to_base64(sign_pk),
        box_pk: to_base64(box_pk),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Fingerprint;

    #[test]
    fn test_identity_fields() {
        let sign_pk = [1u8; 32];
        let box_pk = [2u8; 32];
        let id = create_public_identity("Alice", &sign_pk, &box_pk);

        assert_eq!(id.v, 1);
        assert_eq!(id.kind, "dmesh-id");
        assert_eq!(id.name, "Alice");
        assert_eq!(id.sign_pk, to_base64(&sign_pk));
        assert_eq!(id.box_pk, to_base64(&box_pk));
    }

    #[test]
    fn test_fingerprint_matches_key() {
        let sign_pk = [7u8; 32];
        let id = create_public_identity("Bob", &sign_pk, &[8u8; 32]);
        let fp = Fingerprint::from_base64(&id.fp).unwrap();
        assert_eq!(fp, fingerprint(&sign_pk));
    }

    #[test]
    fn test_json_shape() {
        let id = create_public_identity("Carol", &[0u8; 32], &[0u8; 32]);
        let json = id.to_json();
        assert!(json.contains("\"kind\":\"dmesh-id\""));
        assert!(json.contains("\"name\":\"Carol\""));
    }
}
