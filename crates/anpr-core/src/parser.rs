// ── Event parsing ──
//
// Turns one reassembled stream payload into a `DetectionEvent`. The
// worker only sees the `EventParser` trait, so the wire schema can be
// versioned without touching the stream loop.

use bytes::Bytes;
use chrono::{DateTime, Utc};

use anpr_api::isapi;

use crate::model::{CameraId, DetectionEvent};

/// Longest plate text accepted from a camera.
pub const MAX_PLATE_LEN: usize = 16;

/// Why a payload produced no detection.
///
/// None of these is an error: the stream keeps running either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// Zero-length or whitespace-only payload.
    Empty,
    /// Payload bytes are not UTF-8.
    NotText,
    /// No alert document in the payload.
    NotAnAlert(String),
    /// A well-formed alert without a recognised plate (motion, heartbeat,
    /// or an ANPR read of `unknown`).
    NoPlate { event_type: Option<String> },
    /// The plate field is present but not plausible plate text.
    MalformedPlate(String),
    /// The payload was dropped before it could be reassembled.
    Incomplete(String),
}

impl ParseFailure {
    /// `true` for payloads that look broken, as opposed to events that
    /// simply carry no plate.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Self::NoPlate { .. })
    }
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("empty payload"),
            Self::NotText => f.write_str("payload is not valid UTF-8"),
            Self::NotAnAlert(reason) => write!(f, "not an alert document: {reason}"),
            Self::NoPlate {
                event_type: Some(kind),
            } => write!(f, "{kind} event without a plate"),
            Self::NoPlate { event_type: None } => f.write_str("event without a plate"),
            Self::MalformedPlate(plate) => write!(f, "malformed plate {plate:?}"),
            Self::Incomplete(reason) => write!(f, "incomplete payload: {reason}"),
        }
    }
}

/// Parses raw stream payloads for one wire schema.
pub trait EventParser: Send + Sync {
    fn parse(&self, raw: &[u8], camera_id: CameraId) -> Result<DetectionEvent, ParseFailure>;
}

/// Parser for Hikvision ISAPI `EventNotificationAlert` documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsapiEventParser;

impl EventParser for IsapiEventParser {
    fn parse(&self, raw: &[u8], camera_id: CameraId) -> Result<DetectionEvent, ParseFailure> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(ParseFailure::Empty);
        }
        let doc = std::str::from_utf8(raw).map_err(|_| ParseFailure::NotText)?;
        let alert = isapi::parse_alert(doc).map_err(|e| ParseFailure::NotAnAlert(e.to_string()))?;

        let plate = match alert.license_plate().map(str::trim) {
            None => None,
            Some(p) if p.is_empty() || p.eq_ignore_ascii_case("unknown") => None,
            Some(p) => Some(p),
        };
        let Some(plate) = plate else {
            return Err(ParseFailure::NoPlate {
                event_type: alert.event_type,
            });
        };
        if !is_plausible_plate(plate) {
            return Err(ParseFailure::MalformedPlate(plate.to_string()));
        }

        Ok(DetectionEvent {
            camera_id,
            raw: Bytes::copy_from_slice(raw),
            plate: Some(plate.to_string()),
            timestamp: alert
                .date_time
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_else(Utc::now),
            confidence: alert.anpr.as_ref().and_then(|a| a.confidence_level),
            device_address: alert.ip_address,
        })
    }
}

fn is_plausible_plate(plate: &str) -> bool {
    plate.len() <= MAX_PLATE_LEN
        && plate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn alert(plate_element: &str) -> String {
        format!(
            "<EventNotificationAlert version=\"2.0\">\
             <ipAddress>192.168.1.64</ipAddress>\
             <dateTime>2024-05-01T10:22:33+01:00</dateTime>\
             <eventType>ANPR</eventType>\
             <ANPR>{plate_element}<confidenceLevel>96</confidenceLevel></ANPR>\
             </EventNotificationAlert>"
        )
    }

    fn parse(doc: &str) -> Result<DetectionEvent, ParseFailure> {
        IsapiEventParser.parse(doc.as_bytes(), CameraId(4))
    }

    #[test]
    fn extracts_plate_and_metadata() {
        let event = parse(&alert("<licensePlate>AB12CDE</licensePlate>")).unwrap();

        assert_eq!(event.camera_id, CameraId(4));
        assert_eq!(event.plate.as_deref(), Some("AB12CDE"));
        assert_eq!(event.confidence, Some(96));
        assert_eq!(event.device_address.as_deref(), Some("192.168.1.64"));
        assert_eq!(event.timestamp.to_rfc3339(), "2024-05-01T09:22:33+00:00");
    }

    #[test]
    fn missing_plate_is_not_malformed() {
        let err = parse(&alert("")).unwrap_err();
        assert_eq!(
            err,
            ParseFailure::NoPlate {
                event_type: Some("ANPR".into())
            }
        );
        assert!(!err.is_malformed());
    }

    #[test]
    fn unknown_plate_counts_as_none() {
        let err = parse(&alert("<licensePlate>Unknown</licensePlate>")).unwrap_err();
        assert!(matches!(err, ParseFailure::NoPlate { .. }));
    }

    #[test]
    fn rejects_implausible_plates() {
        let long = parse(&alert("<licensePlate>ABCDEFGHIJKLMNOPQ</licensePlate>")).unwrap_err();
        assert!(matches!(long, ParseFailure::MalformedPlate(_)));

        let markup = parse(&alert("<licensePlate>AB&lt;12</licensePlate>")).unwrap_err();
        assert!(markup.is_malformed());
    }

    #[test]
    fn empty_and_binary_payloads_fail() {
        assert_eq!(IsapiEventParser.parse(b"", CameraId(1)).unwrap_err(), ParseFailure::Empty);
        assert_eq!(IsapiEventParser.parse(b" \r\n", CameraId(1)).unwrap_err(), ParseFailure::Empty);
        assert_eq!(
            IsapiEventParser
                .parse(&[0xFF, 0xD8, 0xFF], CameraId(1))
                .unwrap_err(),
            ParseFailure::NotText
        );
    }

    #[test]
    fn truncated_document_is_not_an_alert() {
        let doc = alert("<licensePlate>AB12CDE</licensePlate>");
        let err = parse(&doc[..doc.len() - 10]).unwrap_err();
        assert!(matches!(err, ParseFailure::NotAnAlert(_)));
    }

    #[test]
    fn bad_timestamp_falls_back_to_receipt_time() {
        let doc = "<EventNotificationAlert><dateTime>yesterday</dateTime>\
                   <ANPR><licensePlate>XY99ZZZ</licensePlate></ANPR></EventNotificationAlert>";
        let before = Utc::now();
        let event = parse(doc).unwrap();
        assert!(event.timestamp >= before);
        assert_eq!(event.device_address, None);
    }
}
