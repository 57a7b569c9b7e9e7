//! Wire messages exchanged between callers, the proxy and instances

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::pre::{
    Ciphertext1, Ciphertext1Serialized, Ciphertext2, Ciphertext2Serialized, PublicKeySerialized,
    ReEncryptionKeySerialized,
};
use crate::types::{FunctionId, InstanceId};

/// The PRE-wrapped symmetric key carried by a message
///
/// Exactly one representation is present at a time. On the wire this is the
/// `is_re_encrypted` flag plus one of `wrapped_key1` / `wrapped_key2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrappedKey {
    /// Encrypted under the function leader's public key
    Direct(Ciphertext1Serialized),
    /// Re-encrypted towards the destination instance
    ReEncrypted(Ciphertext2Serialized),
}

/// A routed message
///
/// `ciphertext` is the payload encrypted under the wrapped symmetric key.
/// It is opaque to the proxy and always passes through byte-identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMessage", into = "RawMessage")]
pub struct SambaMessage {
    pub target: FunctionId,
    pub wrapped_key: WrappedKey,
    pub ciphertext: Vec<u8>,
}

impl SambaMessage {
    /// Build a message whose wrapped key is encrypted under the leader's key
    pub fn direct(target: FunctionId, wrapped_key: &Ciphertext1, ciphertext: Vec<u8>) -> Self {
        Self {
            target,
            wrapped_key: WrappedKey::Direct(wrapped_key.serialize()),
            ciphertext,
        }
    }

    pub fn is_re_encrypted(&self) -> bool {
        matches!(self.wrapped_key, WrappedKey::ReEncrypted(_))
    }

    /// Decode the direct wrapped key
    pub fn direct_key(&self) -> crate::Result<Ciphertext1> {
        match &self.wrapped_key {
            WrappedKey::Direct(wire) => Ok(Ciphertext1::from_serialized(wire)?),
            WrappedKey::ReEncrypted(_) => Err(Error::InvalidMessage(
                "message is already re-encrypted".to_string(),
            )),
        }
    }

    /// Decode the re-encrypted wrapped key
    pub fn re_encrypted_key(&self) -> crate::Result<Ciphertext2> {
        match &self.wrapped_key {
            WrappedKey::ReEncrypted(wire) => Ok(Ciphertext2::from_serialized(wire)?),
            WrappedKey::Direct(_) => Err(Error::InvalidMessage(
                "message is not re-encrypted".to_string(),
            )),
        }
    }

    /// Replace the wrapped key with its re-encrypted form, keeping the payload
    pub fn into_re_encrypted(self, wrapped_key: &Ciphertext2) -> Self {
        Self {
            target: self.target,
            wrapped_key: WrappedKey::ReEncrypted(wrapped_key.serialize()),
            ciphertext: self.ciphertext,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawMessage {
    target: FunctionId,
    is_re_encrypted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wrapped_key1: Option<Ciphertext1Serialized>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wrapped_key2: Option<Ciphertext2Serialized>,
    #[serde(with = "hex")]
    ciphertext: Vec<u8>,
}

impl TryFrom<RawMessage> for SambaMessage {
    type Error = Error;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        let wrapped_key = match (raw.is_re_encrypted, raw.wrapped_key1, raw.wrapped_key2) {
            (false, Some(wk1), None) => WrappedKey::Direct(wk1),
            (true, None, Some(wk2)) => WrappedKey::ReEncrypted(wk2),
            (flag, wk1, wk2) => {
                return Err(Error::InvalidMessage(format!(
                    "is_re_encrypted={} with wrapped_key1 {} and wrapped_key2 {}",
                    flag,
                    if wk1.is_some() { "present" } else { "absent" },
                    if wk2.is_some() { "present" } else { "absent" },
                )))
            }
        };

        Ok(Self {
            target: raw.target,
            wrapped_key,
            ciphertext: raw.ciphertext,
        })
    }
}

impl From<SambaMessage> for RawMessage {
    fn from(msg: SambaMessage) -> Self {
        let (is_re_encrypted, wrapped_key1, wrapped_key2) = match msg.wrapped_key {
            WrappedKey::Direct(wk1) => (false, Some(wk1), None),
            WrappedKey::ReEncrypted(wk2) => (true, None, Some(wk2)),
        };
        Self {
            target: msg.target,
            is_re_encrypted,
            wrapped_key1,
            wrapped_key2,
            ciphertext: msg.ciphertext,
        }
    }
}

/// Proxy -> leader: derive a re-encryption key for `instance_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReEncryptionKeyRequest {
    pub instance_id: InstanceId,
    pub public_key_serialized: PublicKeySerialized,
}

/// Leader -> proxy: the derived re-encryption key and its beneficiary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReEncryptionKeyMessage {
    pub instance_id: InstanceId,
    pub re_encryption_key_serialized: ReEncryptionKeySerialized,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn direct_message() -> SambaMessage {
        SambaMessage::direct(
            FunctionId::new(5),
            &Ciphertext1::new(vec![1, 2, 3]),
            vec![0xde, 0xad, 0xbe, 0xef],
        )
    }

    #[test]
    fn test_direct_message_wire_shape() {
        let json = serde_json::to_value(direct_message()).unwrap();
        assert_eq!(json["target"], 5);
        assert_eq!(json["is_re_encrypted"], false);
        assert_eq!(json["wrapped_key1"]["ct"], "010203");
        assert!(json.get("wrapped_key2").is_none());
        assert_eq!(json["ciphertext"], "deadbeef");
    }

    #[test]
    fn test_re_encrypted_message_wire_shape() {
        let msg = direct_message().into_re_encrypted(&Ciphertext2::new(vec![9, 9]));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["is_re_encrypted"], true);
        assert!(json.get("wrapped_key1").is_none());
        assert_eq!(json["wrapped_key2"]["ct"], "0909");
        assert_eq!(json["ciphertext"], "deadbeef");
    }

    #[test]
    fn test_flag_must_match_representation() {
        let mismatched = json!({
            "target": 5,
            "is_re_encrypted": true,
            "wrapped_key1": {"ct": "01"},
            "ciphertext": "00"
        });
        assert!(serde_json::from_value::<SambaMessage>(mismatched).is_err());

        let both = json!({
            "target": 5,
            "is_re_encrypted": false,
            "wrapped_key1": {"ct": "01"},
            "wrapped_key2": {"ct": "02"},
            "ciphertext": "00"
        });
        assert!(serde_json::from_value::<SambaMessage>(both).is_err());

        let neither = json!({"target": 5, "is_re_encrypted": false, "ciphertext": "00"});
        assert!(serde_json::from_value::<SambaMessage>(neither).is_err());
    }

    #[test]
    fn test_decode_from_wire() {
        let msg: SambaMessage = serde_json::from_value(json!({
            "target": 3,
            "is_re_encrypted": false,
            "wrapped_key1": {"ct": "aabb"},
            "ciphertext": "ff"
        }))
        .unwrap();
        assert_eq!(msg.target, FunctionId::new(3));
        assert!(!msg.is_re_encrypted());
        assert_eq!(msg.direct_key().unwrap().as_bytes(), &[0xaa, 0xbb]);
        assert!(msg.re_encrypted_key().is_err());
    }

    #[test]
    fn test_into_re_encrypted_keeps_payload() {
        let msg = direct_message();
        let payload = msg.ciphertext.clone();
        let out = msg.into_re_encrypted(&Ciphertext2::new(vec![4, 4]));
        assert!(out.is_re_encrypted());
        assert_eq!(out.ciphertext, payload);
        assert!(out.direct_key().is_err());
        assert_eq!(out.re_encrypted_key().unwrap().as_bytes(), &[4, 4]);
    }

    #[test]
    fn test_key_request_wire_shape() {
        let req = ReEncryptionKeyRequest {
            instance_id: InstanceId::new("http://b"),
            public_key_serialized: PublicKeySerialized { key: vec![1] },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["instance_id"], "http://b");
        assert_eq!(json["public_key_serialized"]["key"], "01");
    }
}
