//! File transport.
//!
//! Messages travel as named `.dmesh` blobs: `message-<idprefix>.dmesh`
//! for envelopes, `identity-<fpprefix>.dmesh` for identity cards. The
//! adapter produces and parses blob contents; actually moving the files
//! (USB stick, email attachment, file picker) is the host's business.

use dmesh_crypto::Fingerprint;
use dmesh_wire::{MessageEnvelope, PublicIdentity, WireRecord};

use crate::error::{Result, TransportError};
use crate::transport::{Transport, TransportCapabilities};

/// Length of the hex prefix used in blob names.
const NAME_PREFIX_LEN: usize = 16;

/// The file adapter.
#[derive(Debug, Default)]
pub struct FileTransport {
    inbound: Vec<WireRecord>,
    listening: bool,
}

impl FileTransport {
    /// Create an adapter with an empty inbound buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blob name for an envelope.
    pub fn message_file_name(envelope: &MessageEnvelope) -> Result<String> {
        let msg_id = match &envelope.msg_id {
            Some(id) => dmesh_crypto::MessageId::from_base64(id)
                .map_err(|e| TransportError::Io(e.to_string()))?,
            None => {
                let ct = dmesh_wire::from_base64(&envelope.ciphertext)?;
                dmesh_crypto::message_id(&ct)
            }
        };
        Ok(format!(
            "message-{}.dmesh",
            &msg_id.to_hex()[..NAME_PREFIX_LEN]
        ))
    }

    /// Blob name for an identity card.
    pub fn identity_file_name(fp: &Fingerprint) -> String {
        format!("identity-{}.dmesh", &fp.to_hex()[..NAME_PREFIX_LEN])
    }

    /// Serialize an identity card to blob bytes plus its name.
    pub fn export_identity(identity: &PublicIdentity) -> Result<(String, Vec<u8>)> {
        let fp =
            Fingerprint::from_base64(&identity.fp).map_err(|e| TransportError::Io(e.to_string()))?;
        Ok((
            Self::identity_file_name(&fp),
            identity.to_json().into_bytes(),
        ))
    }

    /// Parse a received blob and queue its records for [`Transport::receive`].
    ///
    /// Returns how many records the blob contained.
    pub fn ingest(&mut self, file_bytes: &[u8]) -> Result<usize> {
        let text = std::str::from_utf8(file_bytes)
            .map_err(|e| TransportError::Io(format!("blob is not UTF-8: {}", e)))?;
        let record = WireRecord::parse(text)?;
        self.inbound.push(record);
        Ok(1)
    }
}

impl Transport for FileTransport {
    fn name(&self) -> &'static str {
        "file"
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            max_payload_size: usize::MAX,
            supports_chunking: false,
            bidirectional: true,
            realtime: false,
            offline: true,
            peer_discovery: false,
        }
    }

    fn send(&mut self, envelope: &MessageEnvelope) -> Result<Vec<String>> {
        Ok(vec![envelope.to_json()])
    }

    fn receive(&mut self) -> Result<Vec<WireRecord>> {
        Ok(std::mem::take(&mut self.inbound))
    }

    fn start_listening(&mut self) -> Result<()> {
        self.listening = true;
        Ok(())
    }

    fn stop_listening(&mut self) -> Result<()> {
        self.listening = false;
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmesh_crypto::{
        create_public_identity, encrypt, fingerprint, BoxKeyPair, EncryptOptions, SigningKeyPair,
    };

    fn sample_envelope() -> MessageEnvelope {
        let sign = SigningKeyPair::generate();
        let boxk = BoxKeyPair::generate();
        let recipient = BoxKeyPair::generate();
        encrypt(
            "file me",
            &sign,
            &boxk,
            &recipient.public_bytes(),
            EncryptOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_message_blob_round_trip() {
        let env = sample_envelope();
        let mut transport = FileTransport::new();

        let units = transport.send(&env).unwrap();
        assert_eq!(units.len(), 1);

        transport.ingest(units[0].as_bytes()).unwrap();
        assert_eq!(transport.receive().unwrap(), vec![WireRecord::Message(env)]);
    }

    #[test]
    fn test_message_file_name() {
        let env = sample_envelope();
        let name = FileTransport::message_file_name(&env).unwrap();
        assert!(name.starts_with("message-"));
        assert!(name.ends_with(".dmesh"));
        assert_eq!(name.len(), "message-".len() + 16 + ".dmesh".len());
    }

    #[test]
    fn test_message_file_name_without_declared_id() {
        let mut env = sample_envelope();
        let with_id = FileTransport::message_file_name(&env).unwrap();
        env.msg_id = None;
        let derived = FileTransport::message_file_name(&env).unwrap();
        assert_eq!(with_id, derived);
    }

    #[test]
    fn test_identity_blob_round_trip() {
        let sign_pk = [1u8; 32];
        let id = create_public_identity("Alice", &sign_pk, &[2; 32]);
        let (name, bytes) = FileTransport::export_identity(&id).unwrap();

        assert_eq!(name, FileTransport::identity_file_name(&fingerprint(&sign_pk)));

        let mut transport = FileTransport::new();
        transport.ingest(&bytes).unwrap();
        assert_eq!(transport.receive().unwrap(), vec![WireRecord::Identity(id)]);
    }

    #[test]
    fn test_ingest_rejects_garbage() {
        let mut transport = FileTransport::new();
        assert!(transport.ingest(&[0xff, 0xfe, 0x00]).is_err());
        assert!(transport.ingest(b"not a record").is_err());
    }
}
