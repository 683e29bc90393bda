//! Inbound wire events, decoded once at the transport boundary.
//!
//! The backend addresses events by string name. Rather than dispatching on
//! strings deep inside the cores, every inbound frame is decoded here into
//! the closed [`ServerEvent`] enum and then routed by exhaustive pattern
//! matching, so a mistyped event name can only fail loudly at one place.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::DecodeError;
use crate::types::{CallId, CallInvite, DeliveryState, TempId, WireMessage};

/// Every inbound event the coordination cores react to.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    CallInvitation(CallInvite),
    CallAccepted {
        call_id: CallId,
    },
    CallRejected {
        call_id: CallId,
        reason: String,
    },
    CallTimeout {
        call_id: CallId,
    },
    CallCancelled {
        call_id: CallId,
    },
    /// A message delivered to a joined conversation room. A populated
    /// `temp_id` inside the payload marks a locally originated message.
    MessageReceived(WireMessage),
    /// Server confirmation of an optimistic send.
    MessageConfirmed {
        temp_id: TempId,
        message: WireMessage,
    },
    /// Server-side failure of an optimistic send.
    MessageFailed {
        temp_id: TempId,
        error: String,
    },
    /// Delivery receipt. `message_id` may reference either ID space
    /// (temp or server-assigned) depending on which path won the race.
    MessageDelivered {
        message_id: String,
        status: DeliveryState,
        timestamp: Option<DateTime<Utc>>,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallRef {
    call_id: CallId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallReject {
    call_id: CallId,
    #[serde(default = "default_reject_reason")]
    reason: String,
}

fn default_reject_reason() -> String {
    "user_declined".to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    data: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Confirmation {
    temp_id: TempId,
    data: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Failure {
    temp_id: TempId,
    error: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryReceipt {
    message_id: String,
    status: DeliveryState,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

fn parse<T: serde::de::DeserializeOwned>(
    event: &'static str,
    payload: Value,
) -> Result<T, DecodeError> {
    serde_json::from_value(payload).map_err(|source| DecodeError::Payload { event, source })
}

impl ServerEvent {
    /// Decode one inbound frame.
    ///
    /// Malformed payloads return an error without mutating anything; callers
    /// log at warn and drop the frame. The `call_timeout` payload is accepted
    /// both as `{"callId": ...}` and as a bare string call ID, which the
    /// backend emits from its timer path.
    pub fn decode(name: &str, payload: Value) -> Result<ServerEvent, DecodeError> {
        match name {
            "call_invitation" => Ok(ServerEvent::CallInvitation(parse(
                "call_invitation",
                payload,
            )?)),
            "call_accepted" => {
                let r: CallRef = parse("call_accepted", payload)?;
                Ok(ServerEvent::CallAccepted { call_id: r.call_id })
            }
            "call_rejected" => {
                let r: CallReject = parse("call_rejected", payload)?;
                Ok(ServerEvent::CallRejected {
                    call_id: r.call_id,
                    reason: r.reason,
                })
            }
            "call_timeout" => {
                let call_id = match payload {
                    Value::String(raw) => CallId(raw),
                    other => parse::<CallRef>("call_timeout", other)?.call_id,
                };
                Ok(ServerEvent::CallTimeout { call_id })
            }
            "call_cancelled" => {
                let r: CallRef = parse("call_cancelled", payload)?;
                Ok(ServerEvent::CallCancelled { call_id: r.call_id })
            }
            "messageReceived" => {
                let envelope: Envelope = parse("messageReceived", payload)?;
                Ok(ServerEvent::MessageReceived(parse(
                    "messageReceived",
                    envelope.data,
                )?))
            }
            "messageConfirmed" => {
                let confirmation: Confirmation = parse("messageConfirmed", payload)?;
                Ok(ServerEvent::MessageConfirmed {
                    temp_id: confirmation.temp_id,
                    message: parse("messageConfirmed", confirmation.data)?,
                })
            }
            "messageFailed" => {
                let failure: Failure = parse("messageFailed", payload)?;
                Ok(ServerEvent::MessageFailed {
                    temp_id: failure.temp_id,
                    error: failure.error,
                })
            }
            "messageDelivered" => {
                let receipt: DeliveryReceipt = parse("messageDelivered", payload)?;
                Ok(ServerEvent::MessageDelivered {
                    message_id: receipt.message_id,
                    status: receipt.status,
                    timestamp: receipt.timestamp,
                })
            }
            other => Err(DecodeError::UnknownEvent(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_call_timeout_object_and_bare_string() {
        let from_object = ServerEvent::decode("call_timeout", json!({"callId": "c1"})).unwrap();
        let from_string = ServerEvent::decode("call_timeout", json!("c1")).unwrap();
        assert_eq!(from_object, from_string);
        assert_eq!(
            from_object,
            ServerEvent::CallTimeout {
                call_id: CallId::from("c1")
            }
        );
    }

    #[test]
    fn decodes_nested_message_envelope() {
        let event = ServerEvent::decode(
            "messageReceived",
            json!({
                "type": "text",
                "data": {
                    "id": "m1",
                    "conversationId": "conv1",
                    "senderId": "u2",
                    "content": "hey",
                    "type": "text",
                    "tempId": "t1",
                }
            }),
        )
        .unwrap();
        match event {
            ServerEvent::MessageReceived(message) => {
                assert_eq!(message.temp_id, Some(TempId::from("t1")));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn reject_reason_defaults_when_absent() {
        let event = ServerEvent::decode("call_rejected", json!({"callId": "c1"})).unwrap();
        assert_eq!(
            event,
            ServerEvent::CallRejected {
                call_id: CallId::from("c1"),
                reason: "user_declined".to_string(),
            }
        );
    }

    #[test]
    fn unknown_event_is_an_error_not_a_panic() {
        let err = ServerEvent::decode("call_acepted", json!({})).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownEvent(name) if name == "call_acepted"));
    }

    #[test]
    fn malformed_payload_is_reported() {
        let err = ServerEvent::decode("call_accepted", json!({"nope": 1})).unwrap_err();
        assert!(matches!(err, DecodeError::Payload { event, .. } if event == "call_accepted"));
    }
}
