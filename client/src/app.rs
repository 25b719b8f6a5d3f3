use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use js_sys::{Array, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Blob, BlobPropertyBag, Element, Event, FileReader, HtmlAnchorElement, HtmlButtonElement,
    HtmlCanvasElement, HtmlInputElement, HtmlSpanElement, KeyboardEvent, PointerEvent,
    ProgressEvent, Url, Window,
};

use crate::board::Board;
use crate::config::BoardConfig;
use crate::connection::{ConnectionAction, ConnectionEvent};
use crate::dom::{
    event_to_point, get_element, set_status, set_tool_button, update_size_label, CanvasSurface,
};
use crate::export::EXPORT_FILE_NAME;
use crate::history::Outcome;
use crate::net::{session_id_from_path, websocket_url};
use crate::ws::{open_socket, WsEvent, WsTransport};

type AppBoard = Board<CanvasSurface, WsTransport>;

struct App {
    window: Window,
    board: RefCell<AppBoard>,
    transport: WsTransport,
    url: String,
    status_el: Element,
    status_text: Element,
}

impl App {
    fn connection_event(self: &Rc<Self>, event: ConnectionEvent) {
        let action = self.board.borrow_mut().handle_connection_event(event);
        self.drive(action);
    }

    fn drive(self: &Rc<Self>, action: ConnectionAction) {
        match action {
            ConnectionAction::None | ConnectionAction::Close => {}
            ConnectionAction::Dial => self.dial(),
            ConnectionAction::ScheduleRetry(delay) => self.schedule_retry(delay),
            ConnectionAction::GiveUp => {
                log::warn!("relay unreachable at {}, staying offline", self.url)
            }
        }
        self.refresh_status();
    }

    fn dial(self: &Rc<Self>) {
        log::info!("connecting to {}", self.url);
        let app = Rc::clone(self);
        match open_socket(&self.url, move |event| app.on_ws_event(event)) {
            Ok(socket) => self.transport.attach(socket),
            Err(error) => {
                log::error!("failed to open websocket: {error:?}");
                self.connection_event(ConnectionEvent::Error);
            }
        }
    }

    fn schedule_retry(self: &Rc<Self>, delay: Duration) {
        log::info!("reconnecting in {} ms", delay.as_millis());
        let app = Rc::clone(self);
        let ontimeout =
            Closure::once_into_js(move || app.connection_event(ConnectionEvent::RetryDue));
        let delay_ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        if let Err(error) = self.window.set_timeout_with_callback_and_timeout_and_arguments_0(
            ontimeout.unchecked_ref(),
            delay_ms,
        ) {
            log::error!("failed to schedule reconnect: {error:?}");
        }
    }

    fn on_ws_event(self: &Rc<Self>, event: WsEvent) {
        match event {
            WsEvent::Connection(event) => self.connection_event(event),
            WsEvent::Frame(frame) => {
                if let Err(error) = self.board.borrow_mut().handle_frame(&frame) {
                    log::warn!("dropping inbound frame: {error}");
                }
            }
        }
    }

    fn refresh_status(&self) {
        let board = self.board.borrow();
        let (state, text) = board.sync().connection().status();
        set_status(&self.status_el, &self.status_text, state, text);
    }
}

fn fit_canvas(canvas: &HtmlCanvasElement) -> (u32, u32) {
    let rect = canvas.get_bounding_client_rect();
    (rect.width().max(0.0) as u32, rect.height().max(0.0) as u32)
}

fn download_png(window: &Window, bytes: &[u8]) -> Result<(), JsValue> {
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    let parts = Array::of1(&Uint8Array::from(bytes));
    let options = BlobPropertyBag::new();
    options.set_type("image/png");
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
    let url = Url::create_object_url_with_blob(&blob)?;
    let anchor = document.create_element("a")?.dyn_into::<HtmlAnchorElement>()?;
    anchor.set_href(&url);
    anchor.set_download(EXPORT_FILE_NAME);
    anchor.click();
    Url::revoke_object_url(&url)
}

fn read_image_bytes(event: &ProgressEvent) -> Option<Vec<u8>> {
    let reader: FileReader = event.target()?.dyn_into().ok()?;
    let buffer = reader.result().ok()?.dyn_into::<js_sys::ArrayBuffer>().ok()?;
    Some(Uint8Array::new(&buffer).to_vec())
}

fn debug_enabled(search: &str) -> bool {
    search.contains("debug=1") || search.contains("debug=true")
}

#[wasm_bindgen(start)]
pub fn run() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    let location = window.location();
    let search = location.search().unwrap_or_default();

    let level = if debug_enabled(&search) {
        log::Level::Debug
    } else {
        log::Level::Info
    };
    let _ = console_log::init_with_level(level);

    let mut config = BoardConfig::default();
    if let Err(error) = config.apply_query(&search) {
        log::warn!("ignoring query settings: {error}");
        config = BoardConfig::default();
    }
    let path = location.pathname().unwrap_or_default();
    let session_id = session_id_from_path(&path).or_else(|| config.room.clone());
    let url = websocket_url(
        &location.protocol()?,
        &location.host()?,
        session_id.as_deref(),
    );

    let canvas: HtmlCanvasElement = get_element(&document, "board")?;
    let color_input: HtmlInputElement = get_element(&document, "color")?;
    let size_input: HtmlInputElement = get_element(&document, "size")?;
    let size_value: HtmlSpanElement = get_element(&document, "size-value")?;
    let eraser_button: HtmlButtonElement = get_element(&document, "eraser")?;
    let undo_button: HtmlButtonElement = get_element(&document, "undo")?;
    let redo_button: HtmlButtonElement = get_element(&document, "redo")?;
    let clear_button: HtmlButtonElement = get_element(&document, "clear")?;
    let image_button: HtmlButtonElement = get_element(&document, "image")?;
    let image_file: HtmlInputElement = get_element(&document, "image-file")?;
    let export_button: HtmlButtonElement = get_element(&document, "export")?;
    let status_el: Element = get_element(&document, "status")?;
    let status_text: Element = get_element(&document, "status-text")?;

    let (width, height) = fit_canvas(&canvas);
    canvas.set_width(width);
    canvas.set_height(height);

    let transport = WsTransport::default();
    let mut board = Board::new(&config, transport.clone());
    board.set_color(&color_input.value());
    if let Ok(size) = size_input.value().parse::<u8>() {
        board.set_line_width(size);
    }
    update_size_label(&size_input, &size_value);

    let app = Rc::new(App {
        window: window.clone(),
        board: RefCell::new(board),
        transport,
        url,
        status_el,
        status_text,
    });

    {
        let down_app = app.clone();
        let down_canvas = canvas.clone();
        let ondown = Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
            if event.button() != 0 {
                return;
            }
            event.prevent_default();
            let _ = down_canvas.set_pointer_capture(event.pointer_id());
            let point = event_to_point(&down_canvas, &event);
            let outcome = down_app.board.borrow_mut().pointer_down(point);
            if outcome != Outcome::Applied {
                log::debug!("pointer down: {outcome:?}");
            }
        });
        canvas.add_event_listener_with_callback("pointerdown", ondown.as_ref().unchecked_ref())?;
        ondown.forget();
    }

    {
        let move_app = app.clone();
        let move_canvas = canvas.clone();
        let onmove = Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
            let point = event_to_point(&move_canvas, &event);
            move_app.board.borrow_mut().pointer_move(point);
        });
        canvas.add_event_listener_with_callback("pointermove", onmove.as_ref().unchecked_ref())?;
        onmove.forget();
    }

    {
        let up_app = app.clone();
        let onup = Closure::<dyn FnMut(PointerEvent)>::new(move |_| {
            up_app.board.borrow_mut().pointer_up();
        });
        canvas.add_event_listener_with_callback("pointerup", onup.as_ref().unchecked_ref())?;
        onup.forget();
    }

    {
        let leave_app = app.clone();
        let onleave = Closure::<dyn FnMut(PointerEvent)>::new(move |_| {
            leave_app.board.borrow_mut().pointer_leave();
        });
        for name in ["pointerleave", "pointercancel"] {
            canvas.add_event_listener_with_callback(name, onleave.as_ref().unchecked_ref())?;
        }
        onleave.forget();
    }

    {
        let color_app = app.clone();
        let color_input_cb = color_input.clone();
        let oninput = Closure::<dyn FnMut(Event)>::new(move |_| {
            color_app.board.borrow_mut().set_color(&color_input_cb.value());
        });
        color_input.add_event_listener_with_callback("input", oninput.as_ref().unchecked_ref())?;
        oninput.forget();
    }

    {
        let size_app = app.clone();
        let size_input_cb = size_input.clone();
        let size_value_cb = size_value.clone();
        let oninput = Closure::<dyn FnMut(Event)>::new(move |_| {
            if let Ok(size) = size_input_cb.value().parse::<u8>() {
                size_app.board.borrow_mut().set_line_width(size);
            }
            update_size_label(&size_input_cb, &size_value_cb);
        });
        size_input.add_event_listener_with_callback("input", oninput.as_ref().unchecked_ref())?;
        oninput.forget();
    }

    {
        let eraser_app = app.clone();
        let eraser_button_cb = eraser_button.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| {
            let active = eraser_app.board.borrow_mut().toggle_eraser();
            set_tool_button(&eraser_button_cb, active);
        });
        eraser_button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    {
        let undo_app = app.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| {
            undo_app.board.borrow_mut().undo();
        });
        undo_button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    {
        let redo_app = app.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| {
            redo_app.board.borrow_mut().redo();
        });
        redo_button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    {
        let clear_app = app.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| {
            clear_app.board.borrow_mut().clear();
        });
        clear_button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    {
        let key_app = app.clone();
        let onkeydown = Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
            if !(event.meta_key() || event.ctrl_key()) {
                return;
            }
            let key = event.key();
            let redo = key.eq_ignore_ascii_case("y")
                || (event.shift_key() && key.eq_ignore_ascii_case("z"));
            if redo {
                event.prevent_default();
                key_app.board.borrow_mut().redo();
            } else if key.eq_ignore_ascii_case("z") {
                event.prevent_default();
                key_app.board.borrow_mut().undo();
            }
        });
        window.add_event_listener_with_callback("keydown", onkeydown.as_ref().unchecked_ref())?;
        onkeydown.forget();
    }

    {
        let image_file = image_file.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| {
            image_file.set_value("");
            image_file.click();
        });
        image_button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    {
        let image_app = app.clone();
        let image_file_cb = image_file.clone();
        let onchange = Closure::<dyn FnMut(Event)>::new(move |_| {
            let Some(file) = image_file_cb.files().and_then(|list| list.get(0)) else {
                return;
            };
            let reader = match FileReader::new() {
                Ok(reader) => reader,
                Err(error) => {
                    log::error!("failed to create file reader: {error:?}");
                    return;
                }
            };
            let load_app = image_app.clone();
            let onload = Closure::once_into_js(move |event: ProgressEvent| {
                let Some(bytes) = read_image_bytes(&event) else {
                    log::warn!("image file could not be read");
                    return;
                };
                match load_app.board.borrow_mut().insert_image_bytes(&bytes) {
                    Ok(outcome) => log::debug!("image insert: {outcome:?}"),
                    Err(error) => log::warn!("could not insert image: {error}"),
                }
            });
            reader.set_onload(Some(onload.unchecked_ref()));
            if let Err(error) = reader.read_as_array_buffer(&file) {
                log::error!("failed to read image file: {error:?}");
            }
        });
        image_file.add_event_listener_with_callback("change", onchange.as_ref().unchecked_ref())?;
        onchange.forget();
    }

    {
        let export_app = app.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| {
            let png = export_app.board.borrow().export_png();
            match png {
                Ok(Some(bytes)) => {
                    if let Err(error) = download_png(&export_app.window, &bytes) {
                        log::error!("download failed: {error:?}");
                    }
                }
                Ok(None) => log::debug!("nothing to export yet"),
                Err(error) => log::error!("export failed: {error}"),
            }
        });
        export_button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    {
        let resize_app = app.clone();
        let resize_canvas = canvas.clone();
        let onresize = Closure::<dyn FnMut()>::new(move || {
            let (width, height) = fit_canvas(&resize_canvas);
            resize_app.board.borrow_mut().request_resize(width, height);
        });
        window.add_event_listener_with_callback("resize", onresize.as_ref().unchecked_ref())?;
        onresize.forget();
    }

    {
        let unload_app = app.clone();
        let onbeforeunload = Closure::<dyn FnMut(Event)>::new(move |_| {
            unload_app.board.borrow_mut().unmount();
        });
        window.add_event_listener_with_callback(
            "beforeunload",
            onbeforeunload.as_ref().unchecked_ref(),
        )?;
        onbeforeunload.forget();
    }

    let surface = CanvasSurface::new(canvas)?;
    let action = app.board.borrow_mut().mount(surface);
    app.drive(action);

    Ok(())
}
