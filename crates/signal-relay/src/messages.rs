//! Signal protocol messages

use serde::{Deserialize, Serialize};
use serde_json::Value;

use signal_core::{AddressFamily, RelayError};

/// Messages relayed over the signaling WebSocket.
///
/// Each message is one JSON text frame, adjacently tagged:
/// `{"type": "offer", "payload": {...}}`. Payloads are passed through
/// untouched; only the candidate line of a `candidate` is ever inspected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SignalMessage {
    /// Session description offer
    Offer(Value),

    /// Session description answer
    Answer(Value),

    /// A single ICE candidate
    Candidate(Value),
}

impl SignalMessage {
    /// Message kind as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            SignalMessage::Offer(_) => "offer",
            SignalMessage::Answer(_) => "answer",
            SignalMessage::Candidate(_) => "candidate",
        }
    }

    /// Address family of a candidate, `None` for offers and answers
    pub fn address_family(&self) -> Result<Option<AddressFamily>, RelayError> {
        match self {
            SignalMessage::Candidate(payload) => candidate_family(payload).map(Some),
            _ => Ok(None),
        }
    }

    /// Parse a text frame, enforcing the size limit first
    pub fn parse_frame(text: &str, max_size: usize) -> Result<Self, RelayError> {
        if text.len() > max_size {
            return Err(RelayError::MessageTooLarge {
                size: text.len(),
                max: max_size,
            });
        }
        Self::from_json(text).map_err(|e| RelayError::MalformedMessage(e.to_string()))
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Inspect the `candidate` line of an `RTCIceCandidateInit`-shaped payload
fn candidate_family(payload: &Value) -> Result<AddressFamily, RelayError> {
    let fields = payload.as_object().ok_or_else(|| {
        RelayError::MalformedMessage("candidate payload must be an object".into())
    })?;

    match fields.get("candidate") {
        Some(Value::String(line)) => Ok(AddressFamily::of_candidate(line)),
        Some(_) => Err(RelayError::MalformedMessage(
            "candidate field must be a string".into(),
        )),
        None => Err(RelayError::MissingCandidateAddress),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let msg = SignalMessage::Offer(json!({"type": "offer", "sdp": "v=0\r\n"}));
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"offer""#));
        assert!(json.contains(r#""payload":{"#));

        let parsed = SignalMessage::from_json(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_parse_candidate() {
        let text = r#"{"type":"candidate","payload":{"candidate":"candidate:1 1 udp 2122260223 10.0.0.2 5000 typ host","sdpMid":"0","sdpMLineIndex":0}}"#;
        let msg = SignalMessage::parse_frame(text, 1024).unwrap();
        assert_eq!(msg.kind(), "candidate");
        assert_eq!(msg.address_family().unwrap(), Some(AddressFamily::Ipv4));
    }

    #[test]
    fn test_offer_has_no_family() {
        let msg = SignalMessage::Answer(json!("opaque"));
        assert_eq!(msg.address_family().unwrap(), None);
    }

    #[test]
    fn test_candidate_missing_address() {
        let msg = SignalMessage::Candidate(json!({"sdpMid": "0"}));
        assert_eq!(
            msg.address_family(),
            Err(RelayError::MissingCandidateAddress)
        );
    }

    #[test]
    fn test_candidate_wrong_shape() {
        let msg = SignalMessage::Candidate(json!("candidate:1 1 udp 1 ::1 5000 typ host"));
        assert!(matches!(
            msg.address_family(),
            Err(RelayError::MalformedMessage(_))
        ));

        let msg = SignalMessage::Candidate(json!({"candidate": 42}));
        assert!(matches!(
            msg.address_family(),
            Err(RelayError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_parse_frame_rejects() {
        assert!(matches!(
            SignalMessage::parse_frame("not json", 1024),
            Err(RelayError::MalformedMessage(_))
        ));
        assert!(matches!(
            SignalMessage::parse_frame(r#"{"type":"bye","payload":{}}"#, 1024),
            Err(RelayError::MalformedMessage(_))
        ));

        let big = format!(r#"{{"type":"offer","payload":"{}"}}"#, "x".repeat(100));
        assert_eq!(
            SignalMessage::parse_frame(&big, 64),
            Err(RelayError::MessageTooLarge {
                size: big.len(),
                max: 64
            })
        );
    }
}
