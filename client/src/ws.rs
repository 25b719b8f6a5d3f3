use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Uint8Array;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{BinaryType, CloseEvent, Event, MessageEvent, WebSocket};

use crate::connection::ConnectionEvent;
use crate::error::ClientError;
use crate::sync::{Transport, WireFrame};

#[derive(Debug)]
pub enum WsEvent {
    Connection(ConnectionEvent),
    Frame(WireFrame),
}

/// Browser WebSocket behind the `Transport` seam. Clones share the socket, so
/// the app can attach a freshly dialed socket while the board owns a clone.
#[derive(Clone, Default)]
pub struct WsTransport {
    socket: Rc<RefCell<Option<WebSocket>>>,
}

impl WsTransport {
    /// Swaps in a new socket, silencing and closing the previous one.
    pub fn attach(&self, socket: WebSocket) {
        if let Some(previous) = self.socket.borrow_mut().replace(socket) {
            detach(&previous);
        }
    }
}

impl Transport for WsTransport {
    fn send(&mut self, frame: WireFrame) -> Result<(), ClientError> {
        let socket = self.socket.borrow();
        let Some(socket) = socket.as_ref() else {
            return Err(ClientError::Transport("no socket".into()));
        };
        if socket.ready_state() != WebSocket::OPEN {
            return Err(ClientError::Transport("socket not open".into()));
        }
        let sent = match &frame {
            WireFrame::Text(text) => socket.send_with_str(text),
            WireFrame::Binary(data) => socket.send_with_u8_array(data),
        };
        sent.map_err(|error| ClientError::Transport(format!("{error:?}")))
    }

    fn close(&mut self) {
        if let Some(socket) = self.socket.borrow_mut().take() {
            detach(&socket);
        }
    }
}

fn detach(socket: &WebSocket) {
    socket.set_onopen(None);
    socket.set_onclose(None);
    socket.set_onerror(None);
    socket.set_onmessage(None);
    let _ = socket.close();
}

fn frame_from_event(event: &MessageEvent) -> Option<WireFrame> {
    let data = event.data();
    if let Ok(buffer) = data.dyn_into::<js_sys::ArrayBuffer>() {
        return Some(WireFrame::Binary(Uint8Array::new(&buffer).to_vec()));
    }
    event.data().as_string().map(WireFrame::Text)
}

/// Dials `url` and reports lifecycle changes and inbound frames to `on_event`.
pub fn open_socket(
    url: &str,
    on_event: impl 'static + FnMut(WsEvent),
) -> Result<WebSocket, JsValue> {
    let socket = WebSocket::new(url)?;
    socket.set_binary_type(BinaryType::Arraybuffer);

    let on_event = Rc::new(RefCell::new(on_event));

    {
        let on_event = on_event.clone();
        let onopen = Closure::<dyn FnMut(Event)>::new(move |_| {
            on_event.borrow_mut()(WsEvent::Connection(ConnectionEvent::Open));
        });
        socket.set_onopen(Some(onopen.as_ref().unchecked_ref()));
        onopen.forget();
    }

    {
        let on_event = on_event.clone();
        let onclose = Closure::<dyn FnMut(CloseEvent)>::new(move |event: CloseEvent| {
            log::info!("websocket closed (code {})", event.code());
            on_event.borrow_mut()(WsEvent::Connection(ConnectionEvent::Close));
        });
        socket.set_onclose(Some(onclose.as_ref().unchecked_ref()));
        onclose.forget();
    }

    {
        let on_event = on_event.clone();
        let onerror = Closure::<dyn FnMut(Event)>::new(move |_| {
            on_event.borrow_mut()(WsEvent::Connection(ConnectionEvent::Error));
        });
        socket.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onerror.forget();
    }

    {
        let on_event = on_event.clone();
        let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            match frame_from_event(&event) {
                Some(frame) => on_event.borrow_mut()(WsEvent::Frame(frame)),
                None => log::warn!("ignoring websocket message that is neither text nor binary"),
            }
        });
        socket.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        onmessage.forget();
    }

    Ok(socket)
}
