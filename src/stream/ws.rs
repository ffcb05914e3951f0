//! Websocket client used as the fallback delivery mechanism.

use std::{
    net::{Shutdown, TcpStream},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
    },
    thread,
};

use tungstenite::{Message, WebSocket, stream::MaybeTlsStream};

use crate::stream::transport::{TransportError, TransportEvent, TransportHandle, TransportKind};

struct WsHandle {
    stop: Arc<AtomicBool>,
    // Raw stream clone so close() can interrupt a blocked reader.
    tcp: Option<TcpStream>,
}

impl TransportHandle for WsHandle {
    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    fn close(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(tcp) = self.tcp.take() {
            let _ = tcp.shutdown(Shutdown::Both);
        }
    }
}

/// Perform the websocket handshake and spawn the reader thread.
///
/// The handshake is synchronous so a failure is visible to the caller's
/// fallback logic immediately.
pub(crate) fn connect(
    url: &str,
    events: Sender<TransportEvent>,
) -> Result<Box<dyn TransportHandle>, TransportError> {
    let (socket, _response) =
        tungstenite::connect(url).map_err(|err| TransportError::Socket(err.to_string()))?;

    let stop = Arc::new(AtomicBool::new(false));
    let tcp = raw_stream(&socket);
    let reader_stop = Arc::clone(&stop);
    let _ = events.send(TransportEvent::Opened);
    thread::Builder::new()
        .name("ws-reader".into())
        .spawn(move || read_messages(socket, events, reader_stop))
        .map_err(|err| TransportError::Socket(err.to_string()))?;

    Ok(Box::new(WsHandle { stop, tcp }))
}

fn raw_stream(socket: &WebSocket<MaybeTlsStream<TcpStream>>) -> Option<TcpStream> {
    match socket.get_ref() {
        MaybeTlsStream::Plain(stream) => stream.try_clone().ok(),
        MaybeTlsStream::Rustls(tls) => tls.get_ref().try_clone().ok(),
        _ => None,
    }
}

fn read_messages(
    mut socket: WebSocket<MaybeTlsStream<TcpStream>>,
    events: Sender<TransportEvent>,
    stop: Arc<AtomicBool>,
) {
    loop {
        let message = match socket.read() {
            Ok(message) => message,
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                if !stop.load(Ordering::Relaxed) {
                    let _ = events.send(TransportEvent::Closed);
                }
                return;
            }
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
        match message {
            Message::Text(text) => {
                if events
                    .send(TransportEvent::Message(text.as_str().to_owned()))
                    .is_err()
                {
                    return;
                }
            }
            Message::Close(_) => {
                let _ = events.send(TransportEvent::Closed);
                return;
            }
            // Binary frames and control frames carry no metric payloads.
            Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
        }
    }
}
