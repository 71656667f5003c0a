//! ISAPI `EventNotificationAlert` payloads.
//!
//! Hikvision cameras push one XML document per event on the alert stream.
//! Only a handful of fields matter for plate recognition. The document is
//! read with `quick-xml`'s pull reader and matched on local names, so
//! element names may carry a namespace prefix; attributes and unknown
//! elements are ignored, and missing fields come back as `None`.
//!
//! ```xml
//! <EventNotificationAlert version="2.0" xmlns="http://www.isapi.org/ver20/XMLSchema">
//!   <ipAddress>192.168.1.64</ipAddress>
//!   <channelID>1</channelID>
//!   <dateTime>2024-05-01T10:22:33+01:00</dateTime>
//!   <eventType>ANPR</eventType>
//!   <eventState>active</eventState>
//!   <ANPR>
//!     <licensePlate>AB12CDE</licensePlate>
//!     <confidenceLevel>96</confidenceLevel>
//!     <direction>forward</direction>
//!   </ANPR>
//! </EventNotificationAlert>
//! ```

use std::str::FromStr;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::Error;

/// Default subscription path for the alert stream.
pub const ALERT_STREAM_PATH: &str = "/ISAPI/Event/notification/alertStream";

/// Root element of every alert document.
pub const ALERT_ROOT: &str = "EventNotificationAlert";

/// Fields extracted from an `EventNotificationAlert` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventNotificationAlert {
    /// Address the device reports for itself.
    pub ip_address: Option<String>,
    pub channel_id: Option<u32>,
    /// Raw `dateTime` text, normally RFC 3339.
    pub date_time: Option<String>,
    /// `ANPR`, `VMD`, `videoloss`, ...
    pub event_type: Option<String>,
    pub event_state: Option<String>,
    /// Present only when the document carries an `<ANPR>` block.
    pub anpr: Option<AnprDetail>,
}

/// Contents of the `<ANPR>` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnprDetail {
    pub license_plate: Option<String>,
    pub confidence_level: Option<u8>,
    pub direction: Option<String>,
    pub vehicle_type: Option<String>,
}

impl EventNotificationAlert {
    /// Plate text, if the document carries one.
    pub fn license_plate(&self) -> Option<&str> {
        self.anpr.as_ref()?.license_plate.as_deref()
    }
}

/// Extract an alert from a single document.
///
/// Fails when the root element is missing or unterminated, or the XML is
/// malformed; every other field is optional.
pub fn parse_alert(doc: &str) -> Result<EventNotificationAlert, Error> {
    if doc.trim().is_empty() {
        return Err(Error::InvalidPayload("empty payload".into()));
    }

    let mut reader = Reader::from_str(doc);
    reader.config_mut().trim_text(true);

    let mut alert = EventNotificationAlert::default();
    // Local names of the open elements below the root.
    let mut path: Vec<String> = Vec::new();
    let mut in_root = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::InvalidPayload(format!("malformed XML: {e}")))?;
        match event {
            Event::Start(start) => {
                let name = local_name(&start);
                if in_root {
                    if path.is_empty() && name == "ANPR" {
                        alert.anpr.get_or_insert_with(AnprDetail::default);
                    }
                    path.push(name);
                } else if name == ALERT_ROOT {
                    in_root = true;
                }
            }
            Event::Empty(empty) => {
                let name = local_name(&empty);
                if !in_root && name == ALERT_ROOT {
                    return Ok(alert);
                }
                if in_root && path.is_empty() && name == "ANPR" {
                    alert.anpr.get_or_insert_with(AnprDetail::default);
                }
            }
            Event::End(_) if in_root => {
                if path.pop().is_none() {
                    return Ok(alert);
                }
            }
            Event::Text(text) if in_root => {
                let text = text
                    .unescape()
                    .map_err(|e| Error::InvalidPayload(format!("malformed XML: {e}")))?;
                assign(&mut alert, &path, text.trim());
            }
            Event::CData(data) if in_root => {
                assign(&mut alert, &path, String::from_utf8_lossy(&data).trim());
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::InvalidPayload(if in_root {
        format!("truncated <{ALERT_ROOT}> document")
    } else {
        format!("no <{ALERT_ROOT}> element")
    }))
}

/// Element name without its namespace prefix.
fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

/// Store the text of the element at `path`; the first occurrence wins.
fn assign(alert: &mut EventNotificationAlert, path: &[String], text: &str) {
    if text.is_empty() {
        return;
    }
    match path {
        [leaf] => match leaf.as_str() {
            "ipAddress" => fill(&mut alert.ip_address, text),
            "channelID" => fill(&mut alert.channel_id, text),
            "dateTime" => fill(&mut alert.date_time, text),
            "eventType" => fill(&mut alert.event_type, text),
            "eventState" => fill(&mut alert.event_state, text),
            _ => {}
        },
        [block, leaf] if block == "ANPR" => {
            let anpr = alert.anpr.get_or_insert_with(AnprDetail::default);
            match leaf.as_str() {
                "licensePlate" => fill(&mut anpr.license_plate, text),
                "confidenceLevel" => fill(&mut anpr.confidence_level, text),
                "direction" => fill(&mut anpr.direction, text),
                "vehicleType" => fill(&mut anpr.vehicle_type, text),
                _ => {}
            }
        }
        _ => {}
    }
}

fn fill<T: FromStr>(slot: &mut Option<T>, text: &str) {
    if slot.is_none() {
        *slot = text.parse().ok();
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ANPR_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<EventNotificationAlert version="2.0" xmlns="http://www.isapi.org/ver20/XMLSchema">
<ipAddress>192.168.1.64</ipAddress>
<channelID>1</channelID>
<dateTime>2024-05-01T10:22:33+01:00</dateTime>
<eventType>ANPR</eventType>
<eventState>active</eventState>
<ANPR>
<country>3</country>
<licensePlate>AB12CDE</licensePlate>
<confidenceLevel>96</confidenceLevel>
<direction>forward</direction>
<vehicleType>vehicle</vehicleType>
</ANPR>
</EventNotificationAlert>"#;

    #[test]
    fn parses_anpr_document() {
        let alert = parse_alert(ANPR_DOC).unwrap();
        assert_eq!(alert.ip_address.as_deref(), Some("192.168.1.64"));
        assert_eq!(alert.channel_id, Some(1));
        assert_eq!(alert.date_time.as_deref(), Some("2024-05-01T10:22:33+01:00"));
        assert_eq!(alert.event_type.as_deref(), Some("ANPR"));
        assert_eq!(alert.license_plate(), Some("AB12CDE"));

        let anpr = alert.anpr.unwrap();
        assert_eq!(anpr.confidence_level, Some(96));
        assert_eq!(anpr.direction.as_deref(), Some("forward"));
        assert_eq!(anpr.vehicle_type.as_deref(), Some("vehicle"));
    }

    #[test]
    fn tolerates_namespace_prefixes() {
        let doc = "<isapi:EventNotificationAlert><isapi:ANPR>\
                   <isapi:licensePlate> XY99ZZZ </isapi:licensePlate>\
                   </isapi:ANPR></isapi:EventNotificationAlert>";
        let alert = parse_alert(doc).unwrap();
        assert_eq!(alert.license_plate(), Some("XY99ZZZ"));
    }

    #[test]
    fn motion_event_has_no_anpr_block() {
        let doc = "<EventNotificationAlert><eventType>VMD</eventType>\
                   <eventState>active</eventState></EventNotificationAlert>";
        let alert = parse_alert(doc).unwrap();
        assert_eq!(alert.event_type.as_deref(), Some("VMD"));
        assert!(alert.anpr.is_none());
        assert!(alert.license_plate().is_none());
    }

    #[test]
    fn empty_plate_element_is_none() {
        let doc = "<EventNotificationAlert><ANPR><licensePlate></licensePlate>\
                   </ANPR></EventNotificationAlert>";
        assert!(parse_alert(doc).unwrap().license_plate().is_none());

        let self_closing = "<EventNotificationAlert><ANPR><licensePlate/>\
                            </ANPR></EventNotificationAlert>";
        assert!(parse_alert(self_closing).unwrap().license_plate().is_none());
    }

    #[test]
    fn truncated_document_is_rejected() {
        let doc = "<EventNotificationAlert><ANPR><licensePlate>AB12";
        assert!(matches!(parse_alert(doc), Err(Error::InvalidPayload(_))));
    }

    #[test]
    fn empty_and_foreign_payloads_are_rejected() {
        assert!(parse_alert("").is_err());
        assert!(parse_alert("   \r\n").is_err());
        assert!(parse_alert("<ResponseStatus><statusCode>1</statusCode></ResponseStatus>").is_err());
        assert!(parse_alert("not xml at all").is_err());
    }

    #[test]
    fn decodes_entities_and_cdata() {
        let doc = "<EventNotificationAlert><eventType>A&amp;B &lt;1&gt;</eventType>\
                   <ANPR><licensePlate><![CDATA[XY99ZZZ]]></licensePlate></ANPR>\
                   </EventNotificationAlert>";
        let alert = parse_alert(doc).unwrap();
        assert_eq!(alert.event_type.as_deref(), Some("A&B <1>"));
        assert_eq!(alert.license_plate(), Some("XY99ZZZ"));
    }

    #[test]
    fn mismatched_tags_are_rejected() {
        let doc = "<EventNotificationAlert><ANPR></eventType></EventNotificationAlert>";
        assert!(matches!(parse_alert(doc), Err(Error::InvalidPayload(_))));
    }

    #[test]
    fn first_occurrence_wins_and_nested_fields_are_ignored() {
        let doc = "<EventNotificationAlert><ipAddress>10.0.0.1</ipAddress>\
                   <ipAddress>10.0.0.2</ipAddress>\
                   <ANPR><pictureInfo><licensePlate>NOPE</licensePlate></pictureInfo>\
                   <licensePlate>AB12CDE</licensePlate></ANPR></EventNotificationAlert>";
        let alert = parse_alert(doc).unwrap();
        assert_eq!(alert.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(alert.license_plate(), Some("AB12CDE"));
    }
}
