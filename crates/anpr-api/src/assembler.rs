//! Reassembly of alert documents split across stream messages.
//!
//! Cameras normally send one `EventNotificationAlert` per message, but a
//! large ANPR document can arrive in pieces, and a multipart body can carry
//! several documents (plus boundary lines) in one message. The assembler
//! buffers from the opening root tag to the closing one and hands out each
//! complete document on its own.
//!
//! A partial document is bounded in size and age. When either bound is
//! exceeded the buffer is dropped and reported as [`Assembled::Discarded`];
//! the stream itself carries on.

use std::time::Duration;

use tokio::time::Instant;

const OPEN_TAG: &str = "<EventNotificationAlert";
const CLOSE_TAG: &str = "</EventNotificationAlert>";

/// Output of [`PayloadAssembler::push`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembled {
    /// A complete document, or a standalone message with no document in it.
    Payload(String),
    /// A partial document that could not be completed.
    Discarded(DiscardReason),
}

/// Why a partial document was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// The partial document grew past the size bound.
    TooLarge { bytes: usize, limit: usize },
    /// The rest of the document did not arrive within the time window.
    Expired { age: Duration },
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooLarge { bytes, limit } => {
                write!(f, "partial document of {bytes} bytes exceeds {limit} byte limit")
            }
            Self::Expired { age } => {
                write!(f, "partial document incomplete after {}ms", age.as_millis())
            }
        }
    }
}

/// Per-connection reassembly buffer.
#[derive(Debug)]
pub struct PayloadAssembler {
    buffer: String,
    started: Option<Instant>,
    max_bytes: usize,
    window: Duration,
}

impl PayloadAssembler {
    pub fn new(max_bytes: usize, window: Duration) -> Self {
        Self {
            buffer: String::new(),
            started: None,
            max_bytes,
            window,
        }
    }

    /// `true` while a partial document is buffered.
    pub fn is_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Feed one message; returns everything it completes, in order.
    pub fn push(&mut self, chunk: &str, now: Instant) -> Vec<Assembled> {
        let mut out = Vec::new();

        if let Some(started) = self.started {
            let age = now.saturating_duration_since(started);
            if age > self.window {
                out.push(Assembled::Discarded(DiscardReason::Expired { age }));
                self.reset();
            }
        }

        // A held tag prefix is not yet a document.
        let had_partial = self.buffer.starts_with(OPEN_TAG);
        self.buffer.push_str(chunk);

        let mut completed_any = false;
        while let Some(open) = self.buffer.find(OPEN_TAG) {
            let Some(close_rel) = self.buffer[open..].find(CLOSE_TAG) else {
                // Anything before the root is framing (boundaries, prolog).
                self.buffer.drain(..open);
                break;
            };
            let end = open + close_rel + CLOSE_TAG.len();
            let bytes = end - open;
            if bytes > self.max_bytes {
                out.push(Assembled::Discarded(DiscardReason::TooLarge {
                    bytes,
                    limit: self.max_bytes,
                }));
            } else {
                out.push(Assembled::Payload(self.buffer[open..end].to_string()));
            }
            self.buffer.drain(..end);
            self.started = None;
            completed_any = true;
        }

        if !self.buffer.starts_with(OPEN_TAG) {
            let leftover = std::mem::take(&mut self.buffer);
            if let Some(tail) = open_tag_prefix(&leftover) {
                self.buffer.push_str(tail);
            } else if !had_partial && !completed_any && !leftover.trim().is_empty() {
                out.push(Assembled::Payload(leftover));
            }
        }

        if self.buffer.len() > self.max_bytes {
            out.push(Assembled::Discarded(DiscardReason::TooLarge {
                bytes: self.buffer.len(),
                limit: self.max_bytes,
            }));
            self.reset();
        }

        if self.is_pending() {
            self.started.get_or_insert(now);
        } else {
            self.started = None;
        }

        out
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.started = None;
    }
}

/// Trailing slice of `text` that could be the start of a split root tag.
fn open_tag_prefix(text: &str) -> Option<&str> {
    (1..OPEN_TAG.len())
        .rev()
        .filter(|&len| len <= text.len())
        .find_map(|len| {
            let tail = text.get(text.len() - len..)?;
            OPEN_TAG.starts_with(tail).then_some(tail)
        })
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = "<EventNotificationAlert><ANPR><licensePlate>AB12CDE</licensePlate>\
                       </ANPR></EventNotificationAlert>";

    fn assembler() -> PayloadAssembler {
        PayloadAssembler::new(1024, Duration::from_secs(5))
    }

    #[test]
    fn whole_document_passes_through() {
        let mut asm = assembler();
        let out = asm.push(DOC, Instant::now());
        assert_eq!(out, vec![Assembled::Payload(DOC.to_string())]);
        assert!(!asm.is_pending());
    }

    #[test]
    fn joins_document_split_across_messages() {
        let mut asm = assembler();
        let now = Instant::now();
        let (head, tail) = DOC.split_at(40);

        assert!(asm.push(head, now).is_empty());
        assert!(asm.is_pending());
        let out = asm.push(tail, now + Duration::from_millis(10));
        assert_eq!(out, vec![Assembled::Payload(DOC.to_string())]);
        assert!(!asm.is_pending());
    }

    #[test]
    fn joins_document_split_inside_root_tag() {
        let mut asm = assembler();
        let now = Instant::now();
        let (head, tail) = DOC.split_at(10);

        assert!(asm.push(head, now).is_empty());
        assert_eq!(asm.push(tail, now), vec![Assembled::Payload(DOC.to_string())]);
    }

    #[test]
    fn joins_document_split_after_opening_bracket() {
        let mut asm = assembler();
        let now = Instant::now();

        assert!(asm.push("--boundary\r\n<", now).is_empty());
        assert!(asm.is_pending());
        assert_eq!(
            asm.push(&DOC[1..], now),
            vec![Assembled::Payload(DOC.to_string())]
        );
        assert!(!asm.is_pending());
    }

    #[test]
    fn splits_multipart_body_and_drops_framing() {
        let mut asm = assembler();
        let body = format!(
            "--boundary\r\nContent-Type: application/xml\r\n\r\n{DOC}\r\n\
             --boundary\r\nContent-Type: application/xml\r\n\r\n{DOC}\r\n--boundary--"
        );
        let out = asm.push(&body, Instant::now());
        assert_eq!(
            out,
            vec![
                Assembled::Payload(DOC.to_string()),
                Assembled::Payload(DOC.to_string()),
            ]
        );
        assert!(!asm.is_pending());
    }

    #[test]
    fn standalone_message_without_document_is_forwarded() {
        let mut asm = assembler();
        let out = asm.push("<ResponseStatus/>", Instant::now());
        assert_eq!(out, vec![Assembled::Payload("<ResponseStatus/>".into())]);
    }

    #[test]
    fn blank_message_produces_nothing() {
        let mut asm = assembler();
        assert!(asm.push("\r\n", Instant::now()).is_empty());
        assert!(asm.push("", Instant::now()).is_empty());
    }

    #[test]
    fn oversized_partial_is_discarded() {
        let mut asm = PayloadAssembler::new(64, Duration::from_secs(5));
        let partial = format!("<EventNotificationAlert>{}", "x".repeat(100));
        let out = asm.push(&partial, Instant::now());
        assert!(matches!(
            out.as_slice(),
            [Assembled::Discarded(DiscardReason::TooLarge { limit: 64, .. })]
        ));
        assert!(!asm.is_pending());

        // The next document is unaffected.
        let short = "<EventNotificationAlert></EventNotificationAlert>";
        assert_eq!(
            asm.push(short, Instant::now()),
            vec![Assembled::Payload(short.to_string())]
        );
    }

    #[test]
    fn oversized_document_completed_across_messages_is_discarded() {
        let mut asm = assembler();
        let now = Instant::now();
        let head = format!("<EventNotificationAlert><note>{}", "x".repeat(900));
        let tail = format!("{}</note></EventNotificationAlert>", "y".repeat(900));

        assert!(asm.push(&head, now).is_empty());
        let out = asm.push(&tail, now);
        assert!(
            matches!(
                out.as_slice(),
                [Assembled::Discarded(DiscardReason::TooLarge { limit: 1024, bytes })] if *bytes > 1024
            ),
            "{out:?}"
        );
        assert!(!asm.is_pending());

        assert_eq!(asm.push(DOC, now), vec![Assembled::Payload(DOC.to_string())]);
    }

    #[test]
    fn stale_partial_is_discarded_on_next_message() {
        let mut asm = assembler();
        let now = Instant::now();
        let (head, _) = DOC.split_at(40);

        assert!(asm.push(head, now).is_empty());
        let later = now + Duration::from_secs(6);
        let out = asm.push(DOC, later);

        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], Assembled::Discarded(DiscardReason::Expired { .. })));
        assert_eq!(out[1], Assembled::Payload(DOC.to_string()));
    }

    #[test]
    fn discard_reason_display() {
        let reason = DiscardReason::TooLarge {
            bytes: 70,
            limit: 64,
        };
        assert_eq!(
            reason.to_string(),
            "partial document of 70 bytes exceeds 64 byte limit"
        );
    }
}
