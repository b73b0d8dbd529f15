//! Payload trait objects and the tag → type registry.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::error::ProtocolError;
use super::payloads;
use crate::types::ActorId;

// ---------------------------------------------------------------------------
// Payload traits
// ---------------------------------------------------------------------------

/// A concrete, serializable payload with a fixed wire tag.
pub trait PayloadType: Serialize + DeserializeOwned + Debug + Send + 'static {
    const TAG: &'static str;

    /// Handler context that must handle this payload instead of the one it
    /// was registered under.
    fn route(&self) -> Option<&str> {
        None
    }

    /// Actor this payload operates on, for commands that must wait until the
    /// actor is placed in the scene graph.
    fn target_actor(&self) -> Option<ActorId> {
        None
    }
}

/// Object-safe view of any [`PayloadType`].
pub trait Payload: Debug + Send {
    fn tag(&self) -> &'static str;
    fn route(&self) -> Option<&str>;
    fn target_actor(&self) -> Option<ActorId>;
    fn to_value(&self) -> Result<Value, serde_json::Error>;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: PayloadType> Payload for T {
    fn tag(&self) -> &'static str {
        T::TAG
    }

    fn route(&self) -> Option<&str> {
        PayloadType::route(self)
    }

    fn target_actor(&self) -> Option<ActorId> {
        PayloadType::target_actor(self)
    }

    fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

impl dyn Payload {
    pub fn downcast_ref<P: PayloadType>(&self) -> Option<&P> {
        self.as_any().downcast_ref::<P>()
    }

    pub fn is<P: PayloadType>(&self) -> bool {
        self.tag() == P::TAG
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

type DecodeFn = fn(Value) -> Result<Box<dyn Payload>, serde_json::Error>;

fn decode_as<P: PayloadType>(value: Value) -> Result<Box<dyn Payload>, serde_json::Error> {
    Ok(Box::new(serde_json::from_value::<P>(value)?))
}

struct Entry {
    decode: DecodeFn,
    context: String,
}

/// Explicit mapping from wire tag to payload type and default handler context.
pub struct PayloadRegistry {
    entries: HashMap<&'static str, Entry>,
}

impl PayloadRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry pre-populated with every built-in payload.
    pub fn with_core_payloads() -> Self {
        use payloads::*;

        let mut r = Self::new();
        r.register::<Handshake>(PROTOCOL_CONTEXT)
            .register::<HandshakeReply>(PROTOCOL_CONTEXT)
            .register::<HandshakeComplete>(PROTOCOL_CONTEXT)
            .register::<SyncRequest>(PROTOCOL_CONTEXT)
            .register::<SyncComplete>(PROTOCOL_CONTEXT)
            .register::<Heartbeat>(PROTOCOL_CONTEXT)
            .register::<HeartbeatReply>(PROTOCOL_CONTEXT)
            .register::<CreateActor>(ACTORS_CONTEXT)
            .register::<ActorUpdate>(ACTORS_CONTEXT)
            .register::<DestroyActors>(ACTORS_CONTEXT)
            .register::<SetBehavior>(ACTORS_CONTEXT)
            .register::<ObjectSpawned>(ACTORS_CONTEXT)
            .register::<ActorCorrection>(ACTORS_CONTEXT)
            .register::<UserJoined>(USERS_CONTEXT)
            .register::<UserLeft>(USERS_CONTEXT)
            .register::<UserUpdate>(USERS_CONTEXT)
            .register::<CreateAsset>(ASSETS_CONTEXT)
            .register::<AssetUpdate>(ASSETS_CONTEXT)
            .register::<PhysicsBridgeUpdate>(PHYSICS_CONTEXT)
            .register::<Trace>(APP_CONTEXT);
        r
    }

    /// Register `P` under its tag. Re-registering a tag replaces the entry.
    pub fn register<P: PayloadType>(&mut self, default_context: impl Into<String>) -> &mut Self {
        let entry = Entry {
            decode: decode_as::<P>,
            context: default_context.into(),
        };
        if self.entries.insert(P::TAG, entry).is_some() {
            warn!("Payload type '{}' re-registered", P::TAG);
        }
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    /// Default handler context for `tag`.
    pub fn context_of(&self, tag: &str) -> Option<&str> {
        self.entries.get(tag).map(|e| e.context.as_str())
    }

    /// Decode a `{ "type": ..., ... }` payload object.
    pub fn decode_payload(&self, value: Value) -> Result<Box<dyn Payload>, ProtocolError> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?
            .to_string();
        let entry = self
            .entries
            .get(tag.as_str())
            .ok_or_else(|| ProtocolError::UnregisteredPayload { tag: tag.clone() })?;
        (entry.decode)(value).map_err(|source| ProtocolError::MalformedPayload { tag, source })
    }
}

impl Default for PayloadRegistry {
    fn default() -> Self {
        Self::with_core_payloads()
    }
}

/// Encode a payload as a `{ "type": ..., ... }` object.
pub fn encode_payload(payload: &dyn Payload) -> Result<Value, ProtocolError> {
    let mut value = payload.to_value()?;
    let obj = value
        .as_object_mut()
        .ok_or_else(|| ProtocolError::NotAnObject {
            tag: payload.tag().to_string(),
        })?;
    obj.insert("type".into(), Value::String(payload.tag().into()));
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::payloads::{Heartbeat, Trace, TraceSeverity};
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Ping {
        n: u32,
    }

    impl PayloadType for Ping {
        const TAG: &'static str = "ping";
    }

    #[test]
    fn unknown_tag_fails_fast() {
        let r = PayloadRegistry::with_core_payloads();
        let err = r
            .decode_payload(serde_json::json!({ "type": "ping", "n": 1 }))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::UnregisteredPayload { tag } if tag == "ping"));
    }

    #[test]
    fn plugin_registration_extends_registry() {
        let mut r = PayloadRegistry::with_core_payloads();
        r.register::<Ping>("plugin");
        let p = r
            .decode_payload(serde_json::json!({ "type": "ping", "n": 7 }))
            .expect("decode");
        assert_eq!(p.downcast_ref::<Ping>(), Some(&Ping { n: 7 }));
        assert_eq!(r.context_of("ping"), Some("plugin"));
    }

    #[test]
    fn missing_discriminator() {
        let r = PayloadRegistry::with_core_payloads();
        assert!(matches!(
            r.decode_payload(serde_json::json!({ "n": 1 })),
            Err(ProtocolError::MissingType)
        ));
    }

    #[test]
    fn malformed_body_names_the_tag() {
        let r = PayloadRegistry::with_core_payloads();
        let err = r
            .decode_payload(serde_json::json!({ "type": "trace", "severity": 12 }))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedPayload { tag, .. } if tag == "trace"));
    }

    #[test]
    fn encoded_payload_carries_tag() {
        let trace = Trace {
            severity: TraceSeverity::Warning,
            message: "low fps".into(),
        };
        let v = encode_payload(&trace).expect("encode");
        assert_eq!(v["type"], "trace");
        assert_eq!(v["severity"], "warning");

        let v = encode_payload(&Heartbeat::default()).expect("encode");
        assert_eq!(v["type"], "heartbeat");
    }
}
