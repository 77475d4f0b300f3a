use serde::{Deserialize, Serialize};

/// Event timestamps are heterogeneous by origin: live detections carry an ISO
/// wall-clock string, playback batches carry a seconds offset into the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    WallClock(String),
    Offset(f64),
}

/// One detected count change, as reported by the backend. `frame` is present
/// only for playback-sourced events; live ticks have no addressable frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountEvent {
    pub timestamp: Timestamp,
    pub count: u32,
    pub previous_count: u32,
    /// Cumulative count, monotonically non-decreasing. Older backends omit it.
    #[serde(default)]
    pub total_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<u64>,
}

impl CountEvent {
    /// True when the event recorded an increase over the previous count.
    pub fn is_increase(&self) -> bool {
        self.count > self.previous_count
    }
}

/// Client → server messages, tagged on the `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// One live-capture frame, base64 JPEG data URL.
    Frame { frame: String },
    /// Start backend-side processing of an uploaded file.
    VideoFile { filename: String },
    /// Request repositioning in the loaded recording.
    Seek { frame: u64 },
    Play,
    Pause,
}

/// Server → client messages. Every field is optional per message; the session
/// reducer updates only the facets that are present.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Detection {
        /// Annotated frame, base64 JPEG data URL.
        #[serde(default)]
        frame: Option<String>,
        #[serde(default)]
        count: Option<u32>,
        #[serde(default)]
        events: Option<Vec<CountEvent>>,
        #[serde(default)]
        frame_number: Option<u64>,
    },
    Complete {
        #[serde(default)]
        events: Option<Vec<CountEvent>>,
        #[serde(default)]
        total_frames: Option<u64>,
    },
}

/// The backend sends untyped `{"error": "..."}` payloads for e.g. a missing
/// file. They share the channel with tagged messages, so decoding tries the
/// tagged form first and falls back to this shape.
#[derive(Debug, Deserialize)]
struct BackendError {
    error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message(ServerMessage),
    Error(String),
}

/// Decode one inbound text payload. A payload matching neither shape is a
/// per-message failure; the caller logs and drops it without closing the
/// channel.
pub fn decode_inbound(text: &str) -> Result<Inbound, serde_json::Error> {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(msg) => Ok(Inbound::Message(msg)),
        Err(tagged_err) => match serde_json::from_str::<BackendError>(text) {
            Ok(BackendError { error }) => Ok(Inbound::Error(error)),
            Err(_) => Err(tagged_err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_serialize_with_type_tag() {
        let msg = ClientMessage::Frame {
            frame: "data:image/jpeg;base64,abc".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "frame");
        assert_eq!(json["frame"], "data:image/jpeg;base64,abc");

        let msg = ClientMessage::Seek { frame: 42 };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"seek","frame":42}"#
        );

        assert_eq!(
            serde_json::to_string(&ClientMessage::Play).unwrap(),
            r#"{"type":"play"}"#
        );
        assert_eq!(
            serde_json::to_string(&ClientMessage::Pause).unwrap(),
            r#"{"type":"pause"}"#
        );
    }

    #[test]
    fn detection_with_partial_fields_decodes() {
        let decoded = decode_inbound(r#"{"type":"detection","count":7}"#).unwrap();
        match decoded {
            Inbound::Message(ServerMessage::Detection {
                frame,
                count,
                events,
                frame_number,
            }) => {
                assert_eq!(count, Some(7));
                assert!(frame.is_none());
                assert!(events.is_none());
                assert!(frame_number.is_none());
            }
            other => panic!("unexpected decode: {:?}", other),
        }
    }

    #[test]
    fn complete_decodes_events_and_totals() {
        let text = r#"{
            "type": "complete",
            "events": [
                {"timestamp": 0.33, "count": 2, "previous_count": 0, "frame": 10},
                {"timestamp": 1.33, "count": 5, "previous_count": 2, "frame": 40}
            ],
            "total_frames": 100
        }"#;
        match decode_inbound(text).unwrap() {
            Inbound::Message(ServerMessage::Complete {
                events: Some(events),
                total_frames: Some(100),
            }) => {
                assert_eq!(events.len(), 2);
                assert_eq!(events[0].frame, Some(10));
                assert_eq!(events[0].timestamp, Timestamp::Offset(0.33));
                assert!(events[1].is_increase());
            }
            other => panic!("unexpected decode: {:?}", other),
        }
    }

    #[test]
    fn wall_clock_timestamps_decode_for_live_events() {
        let text = r#"{
            "type": "detection",
            "events": [{"timestamp": "2024-05-01T12:00:00", "count": 1, "previous_count": 0}]
        }"#;
        match decode_inbound(text).unwrap() {
            Inbound::Message(ServerMessage::Detection {
                events: Some(events),
                ..
            }) => {
                assert_eq!(
                    events[0].timestamp,
                    Timestamp::WallClock("2024-05-01T12:00:00".to_string())
                );
                assert_eq!(events[0].frame, None);
                assert_eq!(events[0].total_count, 0);
            }
            other => panic!("unexpected decode: {:?}", other),
        }
    }

    #[test]
    fn bare_error_payload_decodes() {
        match decode_inbound(r#"{"error": "File not found"}"#).unwrap() {
            Inbound::Error(msg) => assert_eq!(msg, "File not found"),
            other => panic!("unexpected decode: {:?}", other),
        }
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(decode_inbound("not json").is_err());
        assert!(decode_inbound(r#"{"type":"unheard_of"}"#).is_err());
    }
}
