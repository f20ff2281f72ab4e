//! `text/event-stream` decoding for `/server-events/`.

use crate::models::event::ServerEvent;
use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use std::collections::VecDeque;

const DEFAULT_EVENT: &str = "message";

/// Incremental Server-Sent-Events parser.
///
/// Bytes may be fed in arbitrary pieces; lines are only decoded once their
/// terminator has arrived, so multi-byte characters split across network
/// reads survive intact. Lines end in `\n`, `\r` or `\r\n`, and a `\r\n`
/// pair split between two reads counts once.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// The previous byte was a `\r`, so a leading `\n` belongs to it.
    after_cr: bool,
    event: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume `chunk` and return every event it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        for &byte in chunk {
            if std::mem::take(&mut self.after_cr) && byte == b'\n' {
                continue;
            }
            match byte {
                b'\n' | b'\r' => {
                    self.after_cr = byte == b'\r';
                    let line = std::mem::take(&mut self.buffer);
                    let line = String::from_utf8_lossy(&line);
                    if let Some(event) = self.process_line(&line) {
                        events.push(event);
                    }
                }
                _ => self.buffer.push(byte),
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<ServerEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.last_id = Some(value.to_string()),
            // `retry` and unknown fields carry nothing we act on.
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<ServerEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(ServerEvent {
            event: event
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data,
            id: self.last_id.clone(),
        })
    }
}

/// Turn a byte stream into a stream of decoded events. Transport errors are
/// passed through as they occur.
pub fn decode_event_stream<S, E>(bytes: S) -> impl Stream<Item = Result<ServerEvent, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let state = (Box::pin(bytes), SseDecoder::new(), VecDeque::new());
    stream::unfold(state, |(mut bytes, mut decoder, mut pending)| async move {
        loop {
            if let Some(event) = pending.pop_front() {
                return Some((Ok(event), (bytes, decoder, pending)));
            }
            match bytes.next().await {
                Some(Ok(chunk)) => pending.extend(decoder.feed(&chunk)),
                Some(Err(err)) => return Some((Err(err), (bytes, decoder, pending))),
                None => return None,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_on_blank_line() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"event: upload_status\ndata: {\"id\":\"a\"}\n\n");
        assert_eq!(
            events,
            vec![ServerEvent {
                event: "upload_status".into(),
                data: "{\"id\":\"a\"}".into(),
                id: None,
            }]
        );
    }

    #[test]
    fn handles_split_reads_and_crlf() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: upl").is_empty());
        assert!(decoder.feed(b"oad_status\r\ndata: x").is_empty());
        let events = decoder.feed(b"yz\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "upload_status");
        assert_eq!(events[0].data, "xyz");
    }

    #[test]
    fn bare_carriage_returns_end_lines() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: a\r\r");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "a");

        let events = decoder.feed(b"event: upload_status\rdata: b\rdata: c\r\r");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "upload_status");
        assert_eq!(events[0].data, "b\nc");
    }

    #[test]
    fn crlf_split_between_reads_is_one_line_ending() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: a\r").is_empty());
        assert!(decoder.feed(b"\ndata: b\r").is_empty());
        let events = decoder.feed(b"\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "a\nb");
    }

    #[test]
    fn keeps_multibyte_characters_split_across_reads() {
        let mut decoder = SseDecoder::new();
        let text = "data: caf\u{e9}\n\n".as_bytes();
        let split = text.len() - 3;
        assert!(decoder.feed(&text[..split]).is_empty());
        let events = decoder.feed(&text[split..]);
        assert_eq!(events[0].data, "caf\u{e9}");
    }

    #[test]
    fn joins_data_lines_and_skips_comments() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": keep-alive\nid: 7\ndata: one\ndata:two\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, DEFAULT_EVENT);
        assert_eq!(events[0].data, "one\ntwo");
        assert_eq!(events[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn events_without_data_are_dropped() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: ping\n\n").is_empty());
        let events = decoder.feed(b"data: after\n\n");
        assert_eq!(events[0].event, DEFAULT_EVENT, "event name must reset after dispatch");
    }

    #[tokio::test]
    async fn stream_adapter_yields_events_in_order() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"data: a\n\ndata: ")),
            Ok(Bytes::from_static(b"b\n\n")),
            Err(std::io::Error::other("reset")),
        ];
        let mut events = Box::pin(decode_event_stream(stream::iter(chunks)));

        assert_eq!(events.next().await.unwrap().unwrap().data, "a");
        assert_eq!(events.next().await.unwrap().unwrap().data, "b");
        assert!(events.next().await.unwrap().is_err());
        assert!(events.next().await.is_none());
    }
}
