//! Server-sent events client over the shared streaming HTTP agent.

use std::{
    io::{BufRead, BufReader},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
    },
    thread,
};

use crate::http_client;
use crate::stream::transport::{TransportError, TransportEvent, TransportHandle, TransportKind};

struct SseHandle {
    stop: Arc<AtomicBool>,
}

impl TransportHandle for SseHandle {
    fn kind(&self) -> TransportKind {
        TransportKind::Push
    }

    fn close(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Open an SSE connection and spawn its reader thread.
///
/// The request itself is synchronous so a refused or misconfigured endpoint
/// fails construction and lets the caller fall back to the socket transport.
/// After `close`, the reader thread stops emitting events; it may linger
/// blocked on the wire until the server next sends data or drops the
/// connection.
pub(crate) fn connect(
    url: &str,
    events: Sender<TransportEvent>,
) -> Result<Box<dyn TransportHandle>, TransportError> {
    let response = http_client::streaming_agent()
        .get(url)
        .set("Accept", "text/event-stream")
        .call()
        .map_err(|err| TransportError::Push(err.to_string()))?;

    let stop = Arc::new(AtomicBool::new(false));
    let reader_stop = Arc::clone(&stop);
    let reader = BufReader::new(response.into_reader());
    let _ = events.send(TransportEvent::Opened);
    thread::Builder::new()
        .name("sse-reader".into())
        .spawn(move || read_events(reader, events, reader_stop))
        .map_err(|err| TransportError::Push(err.to_string()))?;

    Ok(Box::new(SseHandle { stop }))
}

fn read_events(
    mut reader: impl BufRead,
    events: Sender<TransportEvent>,
    stop: Arc<AtomicBool>,
) {
    let mut data_lines: Vec<String> = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        let read = match reader.read_line(&mut line) {
            Ok(read) => read,
            Err(err) => {
                if !stop.load(Ordering::Relaxed) {
                    let _ = events.send(TransportEvent::Failed(err.to_string()));
                }
                return;
            }
        };
        if stop.load(Ordering::Relaxed) {
            return;
        }
        if read == 0 {
            let _ = events.send(TransportEvent::Closed);
            return;
        }

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            if !data_lines.is_empty() {
                let payload = data_lines.join("\n");
                data_lines.clear();
                if events.send(TransportEvent::Message(payload)).is_err() {
                    return;
                }
            }
            continue;
        }
        if let Some(data) = parse_data_line(trimmed) {
            data_lines.push(data.to_string());
        }
    }
}

/// Extract the payload of a `data:` line; other fields (`event:`, `id:`,
/// `retry:`) and comment lines are ignored.
fn parse_data_line(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn collect(input: &str) -> Vec<TransportEvent> {
        let (tx, rx) = mpsc::channel();
        read_events(
            BufReader::new(input.as_bytes()),
            tx,
            Arc::new(AtomicBool::new(false)),
        );
        rx.try_iter().collect()
    }

    #[test]
    fn frames_data_lines_into_messages() {
        let events = collect("data: {\"loss\":0.5}\n\ndata: {\"loss\":0.4}\n\n");
        assert_eq!(
            events,
            vec![
                TransportEvent::Message("{\"loss\":0.5}".into()),
                TransportEvent::Message("{\"loss\":0.4}".into()),
                TransportEvent::Closed,
            ]
        );
    }

    #[test]
    fn joins_multi_line_data() {
        let events = collect("data: line1\ndata: line2\n\n");
        assert_eq!(
            events.first(),
            Some(&TransportEvent::Message("line1\nline2".into()))
        );
    }

    #[test]
    fn ignores_non_data_fields_and_comments() {
        let events = collect(": keepalive\nevent: metric\nid: 7\nretry: 500\ndata: x\n\n");
        assert_eq!(events, vec![TransportEvent::Message("x".into()), TransportEvent::Closed]);
    }

    #[test]
    fn eof_without_blank_line_drops_partial_event() {
        let events = collect("data: partial");
        assert_eq!(events, vec![TransportEvent::Closed]);
    }

    #[test]
    fn stop_flag_suppresses_events() {
        let (tx, rx) = mpsc::channel();
        read_events(
            BufReader::new("data: x\n\n".as_bytes()),
            tx,
            Arc::new(AtomicBool::new(true)),
        );
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn data_prefix_allows_missing_space() {
        assert_eq!(parse_data_line("data:x"), Some("x"));
        assert_eq!(parse_data_line("data: x"), Some("x"));
        assert_eq!(parse_data_line("id: 1"), None);
    }
}
