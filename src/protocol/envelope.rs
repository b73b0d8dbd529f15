use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::ProtocolError;
use super::registry::{encode_payload, Payload, PayloadRegistry, PayloadType};

/// Number of processed message ids remembered for duplicate suppression.
pub const MESSAGE_HISTORY_LEN: usize = 1024;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reply_to_id: Option<Uuid>,
    payload: Value,
}

/// One decoded message.
#[derive(Debug)]
pub struct Message {
    pub id: Uuid,
    pub reply_to_id: Option<Uuid>,
    pub payload: Box<dyn Payload>,
}

impl Message {
    /// New message with a fresh id.
    pub fn new<P: PayloadType>(payload: P) -> Self {
        Self {
            id: Uuid::new_v4(),
            reply_to_id: None,
            payload: Box::new(payload),
        }
    }

    /// New message answering `reply_to`.
    pub fn reply<P: PayloadType>(reply_to: Uuid, payload: P) -> Self {
        Self {
            reply_to_id: Some(reply_to),
            ..Self::new(payload)
        }
    }

    pub fn tag(&self) -> &'static str {
        self.payload.tag()
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        let raw = RawEnvelope {
            id: self.id,
            reply_to_id: self.reply_to_id,
            payload: encode_payload(self.payload.as_ref())?,
        };
        Ok(serde_json::to_string(&raw)?)
    }

    pub fn decode(text: &str, registry: &PayloadRegistry) -> Result<Self, ProtocolError> {
        let raw: RawEnvelope = serde_json::from_str(text)?;
        Ok(Self {
            id: raw.id,
            reply_to_id: raw.reply_to_id,
            payload: registry.decode_payload(raw.payload)?,
        })
    }
}

/// Bounded set of recently processed message ids.
#[derive(Debug, Default)]
pub struct MessageHistory {
    order: VecDeque<Uuid>,
    seen: HashSet<Uuid>,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id`. Returns `false` if it was already seen.
    pub fn insert(&mut self, id: Uuid) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > MESSAGE_HISTORY_LEN {
            if let Some(old) = self.order.pop_front() {
                self.seen.remove(&old);
            }
        }
        true
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
