//! Browser page over web-sys.
//!
//! Every DOM listener, timer and animation frame is a wasm-bindgen closure
//! that forwards into the shield through a shared handler slot. The slot is
//! filled once the shield exists, so nothing is delivered during activation.

use super::types::{
    EventKind, FrameId, KeyEvent, ListenerId, ListenerSpec, ListenerTarget, Overlay, PageEvent,
    Signal, TargetKind, TimerId, Verdict, WindowMetrics,
};
use super::{Page, PageError};
use crate::config::{Hooks, ProtectionConfig};
use crate::shield::{init_security_protection, DeferredCalls, Shield, PROTECTED_CLASS};
use crate::watermark::{self, Identity};
use js_sys::{Array, Function, Promise, Reflect};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, Event, EventTarget, HtmlElement, KeyboardEvent, MutationObserver,
    MutationObserverInit, MutationRecord, Node, NodeList, Window,
};

type Handler = Rc<dyn Fn(Signal) -> Verdict>;
type Slot = Rc<RefCell<Option<Handler>>>;

const MEDIA_SELECTOR: &str = "img, video";

const FULLSCREEN_ELEMENT_PROPS: [&str; 4] = [
    "fullscreenElement",
    "webkitFullscreenElement",
    "mozFullScreenElement",
    "msFullscreenElement",
];

const FULLSCREEN_EVENTS: [(&str, &str); 4] = [
    ("onfullscreenchange", "fullscreenchange"),
    ("onwebkitfullscreenchange", "webkitfullscreenchange"),
    ("onmozfullscreenchange", "mozfullscreenchange"),
    ("onmsfullscreenchange", "MSFullscreenChange"),
];

const CONSOLE_METHODS: [&str; 8] = [
    "log", "info", "warn", "error", "debug", "table", "trace", "dir",
];

#[wasm_bindgen(inline_js = "export function debugger_statement() { debugger; }")]
extern "C" {
    #[wasm_bindgen(catch)]
    fn debugger_statement() -> Result<(), JsValue>;
}

fn deliver(slot: &Slot, signal: Signal) -> Verdict {
    let handler = slot.borrow().clone();
    match handler {
        Some(handler) => handler(signal),
        None => Verdict::PASS,
    }
}

fn js_err(value: JsValue) -> PageError {
    let message = value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{value:?}"));
    PageError::Dom(message)
}

fn millis(duration: Duration) -> i32 {
    duration.as_millis().min(i32::MAX as u128) as i32
}

fn is_present(value: &JsValue) -> bool {
    !value.is_undefined() && !value.is_null()
}

fn key_event(event: &KeyboardEvent) -> KeyEvent {
    KeyEvent {
        key: event.key(),
        key_code: event.key_code(),
        ctrl: event.ctrl_key(),
        shift: event.shift_key(),
        alt: event.alt_key(),
        meta: event.meta_key(),
    }
}

fn is_media(element: &Element) -> bool {
    matches!(element.tag_name().to_ascii_uppercase().as_str(), "IMG" | "VIDEO")
}

fn target_kind(event: &Event) -> TargetKind {
    // Selection starts on text nodes; classify their parent element.
    let element = event.target().and_then(|target| match target.dyn_into::<Element>() {
        Ok(element) => Some(element),
        Err(target) => target
            .dyn_into::<Node>()
            .ok()
            .and_then(|node| node.parent_element()),
    });
    let Some(element) = element else {
        return TargetKind::Other;
    };

    if is_media(&element) {
        return TargetKind::Media;
    }
    let editable = element
        .dyn_ref::<HtmlElement>()
        .map_or(false, |e| e.is_content_editable());
    match element.tag_name().to_ascii_uppercase().as_str() {
        "INPUT" | "TEXTAREA" | "SELECT" => TargetKind::FormInput,
        _ if editable => TargetKind::FormInput,
        _ => TargetKind::Other,
    }
}

fn page_event(kind: EventKind, event: &Event) -> Option<PageEvent> {
    let page_event = match kind {
        EventKind::KeyDown => PageEvent::KeyDown(key_event(event.dyn_ref()?)),
        EventKind::KeyUp => PageEvent::KeyUp(key_event(event.dyn_ref()?)),
        EventKind::ContextMenu => PageEvent::ContextMenu {
            target: target_kind(event),
        },
        EventKind::Copy => PageEvent::Copy,
        EventKind::Cut => PageEvent::Cut,
        EventKind::DragStart => PageEvent::DragStart {
            target: target_kind(event),
        },
        EventKind::Drop => PageEvent::Drop,
        EventKind::SelectStart => PageEvent::SelectStart {
            target: target_kind(event),
        },
        EventKind::VisibilityChange => PageEvent::VisibilityChange,
        EventKind::Blur => PageEvent::WindowBlur,
        EventKind::Focus => PageEvent::WindowFocus,
        EventKind::FullscreenChange => PageEvent::FullscreenChange,
        EventKind::Resize => PageEvent::Resize,
        EventKind::MouseLeave => PageEvent::MouseLeave,
        EventKind::MouseEnter => PageEvent::MouseEnter,
        EventKind::MediaInserted | EventKind::DisplayMediaRequest => return None,
    };
    Some(page_event)
}

fn apply(event: &Event, verdict: Verdict) {
    if verdict.prevent_default {
        event.prevent_default();
    }
    if verdict.stop_propagation {
        event.stop_propagation();
    }
}

fn count_media(nodes: &NodeList) -> usize {
    (0..nodes.length())
        .filter_map(|i| nodes.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .map(|element| {
            let nested = element
                .query_selector_all(MEDIA_SELECTOR)
                .map(|list| list.length() as usize)
                .unwrap_or(0);
            usize::from(is_media(&element)) + nested
        })
        .sum()
}

enum Registration {
    Dom {
        target: EventTarget,
        name: &'static str,
        capture: bool,
        closure: Closure<dyn FnMut(Event)>,
    },
    Mutation {
        observer: MutationObserver,
        _closure: Closure<dyn FnMut(Array, MutationObserver)>,
    },
    /// Delivered by the `getDisplayMedia` replacement rather than the DOM.
    Virtual,
}

struct DisplayMediaPatch {
    devices: JsValue,
    original: JsValue,
    _replacement: Closure<dyn FnMut() -> Promise>,
}

/// The live browser page.
pub struct WebPage {
    window: Window,
    document: Document,
    slot: Slot,
    noop: Closure<dyn FnMut()>,
    swallow: Closure<dyn FnMut(JsValue)>,
    listeners: HashMap<ListenerId, Registration>,
    next_listener: u32,
    timers: HashMap<TimerId, Closure<dyn FnMut()>>,
    frames: HashMap<FrameId, Closure<dyn FnMut(f64)>>,
    fired_timers: Rc<RefCell<Vec<TimerId>>>,
    fired_frames: Rc<RefCell<Vec<FrameId>>>,
    display_media: Option<DisplayMediaPatch>,
    console: Option<(JsValue, Vec<(&'static str, JsValue)>)>,
}

impl WebPage {
    fn new(slot: Slot) -> Result<Self, PageError> {
        let window = web_sys::window().ok_or(PageError::Unsupported("window"))?;
        let document = window
            .document()
            .ok_or(PageError::Unsupported("document"))?;
        Ok(Self {
            window,
            document,
            slot,
            noop: Closure::wrap(Box::new(|| {}) as Box<dyn FnMut()>),
            swallow: Closure::wrap(Box::new(|_: JsValue| {}) as Box<dyn FnMut(JsValue)>),
            listeners: HashMap::new(),
            next_listener: 1,
            timers: HashMap::new(),
            frames: HashMap::new(),
            fired_timers: Rc::new(RefCell::new(Vec::new())),
            fired_frames: Rc::new(RefCell::new(Vec::new())),
            display_media: None,
            console: None,
        })
    }

    /// A page for the standalone watermark functions; delivers nothing.
    fn detached() -> Result<Self, PageError> {
        Self::new(Rc::new(RefCell::new(None)))
    }

    fn body(&self) -> Result<HtmlElement, PageError> {
        self.document
            .body()
            .ok_or(PageError::Unsupported("document.body"))
    }

    fn body_has_class(&self, class: &str) -> bool {
        self.body()
            .map(|body| body.class_list().contains(class))
            .unwrap_or(false)
    }

    fn fullscreen_event_name(&self) -> Option<&'static str> {
        FULLSCREEN_EVENTS
            .iter()
            .find(|(prop, _)| Reflect::has(&self.document, &JsValue::from_str(prop)).unwrap_or(false))
            .map(|(_, name)| *name)
    }

    fn prune(&mut self) {
        for id in self.fired_timers.borrow_mut().drain(..) {
            self.timers.remove(&id);
        }
        for id in self.fired_frames.borrow_mut().drain(..) {
            self.frames.remove(&id);
        }
    }

    fn observe_media(&self) -> Result<Registration, PageError> {
        let slot = self.slot.clone();
        let closure = Closure::wrap(Box::new(move |records: Array, _: MutationObserver| {
            let count: usize = records
                .iter()
                .filter_map(|record| record.dyn_into::<MutationRecord>().ok())
                .map(|record| count_media(&record.added_nodes()))
                .sum();
            if count > 0 {
                deliver(&slot, Signal::Event(PageEvent::MediaInserted { count }));
            }
        }) as Box<dyn FnMut(Array, MutationObserver)>);

        let observer = MutationObserver::new(closure.as_ref().unchecked_ref()).map_err(js_err)?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        let root = self
            .document
            .document_element()
            .ok_or(PageError::Unsupported("document.documentElement"))?;
        observer
            .observe_with_options(&root, &init)
            .map_err(js_err)?;

        Ok(Registration::Mutation {
            observer,
            _closure: closure,
        })
    }

    fn listen_dom(&self, spec: ListenerSpec) -> Result<Registration, PageError> {
        let kind = spec.kind;
        let name = match kind {
            EventKind::FullscreenChange => self
                .fullscreen_event_name()
                .ok_or(PageError::Unsupported("fullscreenchange"))?,
            other => other.dom_name(),
        };
        let target: EventTarget = match (kind, spec.target) {
            (EventKind::MouseLeave | EventKind::MouseEnter, _) => self
                .document
                .document_element()
                .ok_or(PageError::Unsupported("document.documentElement"))?
                .into(),
            (_, ListenerTarget::Document) => self.document.clone().into(),
            (_, ListenerTarget::Window) => self.window.clone().into(),
        };

        let slot = self.slot.clone();
        let closure = Closure::wrap(Box::new(move |event: Event| {
            if let Some(page_event) = page_event(kind, &event) {
                apply(&event, deliver(&slot, Signal::Event(page_event)));
            }
        }) as Box<dyn FnMut(Event)>);
        target
            .add_event_listener_with_callback_and_bool(
                name,
                closure.as_ref().unchecked_ref(),
                spec.capture,
            )
            .map_err(js_err)?;

        Ok(Registration::Dom {
            target,
            name,
            capture: spec.capture,
            closure,
        })
    }

    fn media_elements(&self) -> Result<Vec<Element>, PageError> {
        let nodes = self
            .document
            .query_selector_all(MEDIA_SELECTOR)
            .map_err(js_err)?;
        Ok((0..nodes.length())
            .filter_map(|i| nodes.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect())
    }
}

impl Page for WebPage {
    fn now(&self) -> Duration {
        self.window
            .performance()
            .map(|perf| Duration::from_secs_f64(perf.now().max(0.0) / 1000.0))
            .unwrap_or_default()
    }

    fn window_metrics(&self) -> Option<WindowMetrics> {
        let read = |value: Result<JsValue, JsValue>| value.ok().and_then(|v| v.as_f64());
        Some(WindowMetrics {
            outer_width: read(self.window.outer_width())?,
            outer_height: read(self.window.outer_height())?,
            inner_width: read(self.window.inner_width())?,
            inner_height: read(self.window.inner_height())?,
        })
    }

    fn debugger_pause(&mut self) -> Option<Duration> {
        let perf = self.window.performance()?;
        let start = perf.now();
        if let Err(e) = debugger_statement() {
            debug!("debugger statement threw: {}", js_err(e));
            return None;
        }
        let elapsed = (perf.now() - start).max(0.0);
        Some(Duration::from_secs_f64(elapsed / 1000.0))
    }

    fn device_pixel_ratio(&self) -> Option<f64> {
        Some(self.window.device_pixel_ratio())
    }

    fn has_focus(&self) -> Option<bool> {
        self.document.has_focus().ok()
    }

    fn document_hidden(&self) -> Option<bool> {
        Some(self.document.hidden())
    }

    fn fullscreen_active(&self) -> Option<bool> {
        let mut supported = false;
        for prop in FULLSCREEN_ELEMENT_PROPS {
            let key = JsValue::from_str(prop);
            if !Reflect::has(&self.document, &key).unwrap_or(false) {
                continue;
            }
            supported = true;
            if Reflect::get(&self.document, &key)
                .map(|element| is_present(&element))
                .unwrap_or(false)
            {
                return Some(true);
            }
        }
        supported.then_some(false)
    }

    fn add_listener(&mut self, spec: ListenerSpec) -> Result<ListenerId, PageError> {
        let registration = match spec.kind {
            EventKind::DisplayMediaRequest => Registration::Virtual,
            EventKind::MediaInserted => self.observe_media()?,
            _ => self.listen_dom(spec)?,
        };
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.insert(id, registration);
        Ok(id)
    }

    fn remove_listener(&mut self, id: ListenerId) {
        match self.listeners.remove(&id) {
            Some(Registration::Dom {
                target,
                name,
                capture,
                closure,
            }) => {
                let _ = target.remove_event_listener_with_callback_and_bool(
                    name,
                    closure.as_ref().unchecked_ref(),
                    capture,
                );
            }
            Some(Registration::Mutation { observer, .. }) => observer.disconnect(),
            Some(Registration::Virtual) | None => {}
        }
    }

    fn set_timeout(&mut self, delay: Duration) -> Result<TimerId, PageError> {
        self.prune();
        let slot = self.slot.clone();
        let fired = self.fired_timers.clone();
        let handle = Rc::new(Cell::new(None::<TimerId>));
        let own = handle.clone();
        let closure = Closure::wrap(Box::new(move || {
            if let Some(id) = own.get() {
                deliver(&slot, Signal::Timer(id));
                fired.borrow_mut().push(id);
            }
        }) as Box<dyn FnMut()>);

        let raw = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                millis(delay),
            )
            .map_err(js_err)?;
        let id = TimerId(raw);
        handle.set(Some(id));
        self.timers.insert(id, closure);
        Ok(id)
    }

    fn set_interval(&mut self, period: Duration) -> Result<TimerId, PageError> {
        let slot = self.slot.clone();
        let handle = Rc::new(Cell::new(None::<TimerId>));
        let own = handle.clone();
        let closure = Closure::wrap(Box::new(move || {
            if let Some(id) = own.get() {
                deliver(&slot, Signal::Timer(id));
            }
        }) as Box<dyn FnMut()>);

        let raw = self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                millis(period).max(1),
            )
            .map_err(js_err)?;
        let id = TimerId(raw);
        handle.set(Some(id));
        self.timers.insert(id, closure);
        Ok(id)
    }

    fn clear_timer(&mut self, id: TimerId) {
        // Timeouts and intervals share one handle space.
        self.window.clear_timeout_with_handle(id.0);
        self.timers.remove(&id);
    }

    fn request_frame(&mut self) -> Result<FrameId, PageError> {
        self.prune();
        let slot = self.slot.clone();
        let fired = self.fired_frames.clone();
        let handle = Rc::new(Cell::new(None::<FrameId>));
        let own = handle.clone();
        let closure = Closure::wrap(Box::new(move |_: f64| {
            if let Some(id) = own.get() {
                deliver(&slot, Signal::Frame(id));
                fired.borrow_mut().push(id);
            }
        }) as Box<dyn FnMut(f64)>);

        let raw = self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
            .map_err(js_err)?;
        let id = FrameId(raw);
        handle.set(Some(id));
        self.frames.insert(id, closure);
        Ok(id)
    }

    fn cancel_frame(&mut self, id: FrameId) {
        let _ = self.window.cancel_animation_frame(id.0);
        self.frames.remove(&id);
    }

    fn add_body_class(&mut self, class: &str) -> Result<(), PageError> {
        self.body()?.class_list().add_1(class).map_err(js_err)
    }

    fn remove_body_class(&mut self, class: &str) -> Result<(), PageError> {
        self.body()?.class_list().remove_1(class).map_err(js_err)
    }

    fn set_media_filter(&mut self, filter: Option<&str>) -> Result<usize, PageError> {
        let mut touched = 0;
        for element in self.media_elements()? {
            let Ok(element) = element.dyn_into::<HtmlElement>() else {
                continue;
            };
            let style = element.style();
            match filter {
                Some(filter) => style.set_property("filter", filter).map_err(js_err)?,
                None => {
                    style.remove_property("filter").map_err(js_err)?;
                }
            }
            touched += 1;
        }
        Ok(touched)
    }

    fn lock_media(&mut self) -> Result<usize, PageError> {
        let elements = self.media_elements()?;
        for element in &elements {
            element
                .set_attribute("draggable", "false")
                .map_err(js_err)?;
        }
        Ok(elements.len())
    }

    fn upsert_overlay(&mut self, overlay: &Overlay) -> Result<(), PageError> {
        self.remove_overlay(&overlay.id)?;
        let body = self.body()?;

        let node = self.document.create_element("div").map_err(js_err)?;
        node.set_id(&overlay.id);
        node.set_class_name(&overlay.class);
        node.set_attribute("aria-hidden", "true").map_err(js_err)?;
        node.set_attribute(
            "style",
            &format!("{};opacity:{}", overlay.style, overlay.opacity),
        )
        .map_err(js_err)?;

        let line_class = format!("{}-text", overlay.class);
        for line in &overlay.lines {
            let child = self.document.create_element("div").map_err(js_err)?;
            child.set_class_name(&line_class);
            child.set_text_content(Some(line));
            node.append_child(&child).map_err(js_err)?;
        }

        body.append_child(&node).map_err(js_err)?;
        Ok(())
    }

    fn remove_overlay(&mut self, id: &str) -> Result<bool, PageError> {
        match self.document.get_element_by_id(id) {
            Some(element) => {
                element.remove();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn write_clipboard(&mut self, text: &str) -> Result<(), PageError> {
        let navigator = self.window.navigator();
        let clipboard = Reflect::get(&navigator, &JsValue::from_str("clipboard")).map_err(js_err)?;
        if !is_present(&clipboard) {
            return Err(PageError::Unsupported("navigator.clipboard"));
        }
        let write = Reflect::get(&clipboard, &JsValue::from_str("writeText"))
            .map_err(js_err)?
            .dyn_into::<Function>()
            .map_err(|_| PageError::Unsupported("navigator.clipboard.writeText"))?;

        let result = write
            .call1(&clipboard, &JsValue::from_str(text))
            .map_err(|e| PageError::PermissionDenied(js_err(e).to_string()))?;
        // Rejections arrive asynchronously and are only swallowed.
        if let Ok(promise) = result.dyn_into::<Promise>() {
            let _ = promise.catch(&self.swallow);
        }
        Ok(())
    }

    fn block_display_media(&mut self) -> Result<(), PageError> {
        if self.display_media.is_some() {
            return Ok(());
        }
        let devices = Reflect::get(&self.window.navigator(), &JsValue::from_str("mediaDevices"))
            .map_err(js_err)?;
        if !is_present(&devices) {
            return Err(PageError::Unsupported("navigator.mediaDevices"));
        }
        let key = JsValue::from_str("getDisplayMedia");
        let original = Reflect::get(&devices, &key).map_err(js_err)?;
        if !original.is_function() {
            return Err(PageError::Unsupported("navigator.mediaDevices.getDisplayMedia"));
        }

        let slot = self.slot.clone();
        let replacement = Closure::wrap(Box::new(move || {
            deliver(&slot, Signal::Event(PageEvent::DisplayMediaRequest));
            Promise::reject(&js_sys::Error::new("Screen capture is not allowed").into())
        }) as Box<dyn FnMut() -> Promise>);
        Reflect::set(&devices, &key, replacement.as_ref()).map_err(js_err)?;

        self.display_media = Some(DisplayMediaPatch {
            devices,
            original,
            _replacement: replacement,
        });
        Ok(())
    }

    fn restore_display_media(&mut self) {
        if let Some(patch) = self.display_media.take() {
            let key = JsValue::from_str("getDisplayMedia");
            if let Err(e) = Reflect::set(&patch.devices, &key, &patch.original) {
                debug!("could not restore getDisplayMedia: {}", js_err(e));
            }
        }
    }

    fn silence_console(&mut self) -> Result<(), PageError> {
        if self.console.is_some() {
            return Ok(());
        }
        let console = Reflect::get(&self.window, &JsValue::from_str("console")).map_err(js_err)?;
        if !is_present(&console) {
            return Err(PageError::Unsupported("console"));
        }

        let mut saved = Vec::new();
        for name in CONSOLE_METHODS {
            let key = JsValue::from_str(name);
            let original = Reflect::get(&console, &key).map_err(js_err)?;
            if original.is_function() {
                Reflect::set(&console, &key, self.noop.as_ref()).map_err(js_err)?;
                saved.push((name, original));
            }
        }
        self.console = Some((console, saved));
        Ok(())
    }

    fn restore_console(&mut self) {
        if let Some((console, saved)) = self.console.take() {
            for (name, original) in saved {
                let _ = Reflect::set(&console, &JsValue::from_str(name), &original);
            }
        }
    }
}

/// A shield bound to the live document.
#[wasm_bindgen]
pub struct WebShield {
    inner: Rc<RefCell<Shield<WebPage>>>,
    deferred: Rc<DeferredCalls>,
}

impl WebShield {
    /// Activate on the current document.
    pub fn activate(config: ProtectionConfig) -> Result<Self, PageError> {
        let slot: Slot = Rc::new(RefCell::new(None));
        let page = WebPage::new(slot.clone())?;
        if page.body_has_class(PROTECTED_CLASS) {
            warn!("content shield already active on this page, listeners will be duplicated");
        }

        let inner = Rc::new(RefCell::new(init_security_protection(page, config)));
        let deferred = Rc::new(DeferredCalls::default());
        let weak = Rc::downgrade(&inner);
        let pending = Rc::clone(&deferred);
        let handler: Handler = Rc::new(move |signal| {
            let Some(cell) = weak.upgrade() else {
                return Verdict::PASS;
            };
            let mut shield = match cell.try_borrow_mut() {
                Ok(shield) => shield,
                Err(_) => {
                    debug!("signal dropped during re-entrant dispatch");
                    return Verdict::PASS;
                }
            };
            let verdict = shield.handle(signal);
            // Host hooks may have asked to dispose or re-identify mid-handle.
            pending.apply(&mut shield);
            verdict
        });
        *slot.borrow_mut() = Some(handler);

        Ok(Self { inner, deferred })
    }
}

#[wasm_bindgen]
impl WebShield {
    /// Tear down everything the activation registered.
    pub fn dispose(&self) {
        match self.inner.try_borrow_mut() {
            Ok(mut shield) => shield.dispose(),
            Err(_) => {
                debug!("shield busy, dispose deferred");
                self.deferred.request_dispose();
            }
        }
    }

    #[wasm_bindgen(js_name = setIdentity)]
    pub fn set_identity(&self, email: Option<String>, id: Option<String>) {
        let identity = email.map(|email| Identity { email, id });
        match self.inner.try_borrow_mut() {
            Ok(mut shield) => shield.set_identity(identity),
            Err(_) => {
                debug!("shield busy, identity change deferred");
                self.deferred.request_identity(identity);
            }
        }
    }

    #[wasm_bindgen(js_name = isProtected)]
    pub fn is_protected(&self) -> bool {
        self.inner
            .try_borrow()
            .map(|shield| shield.is_protected())
            .unwrap_or(true)
    }

    #[wasm_bindgen(js_name = auditSummary)]
    pub fn audit_summary(&self) -> String {
        self.inner
            .try_borrow()
            .map(|shield| shield.audit().summary())
            .unwrap_or_default()
    }
}

fn to_js(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// JavaScript entry point. `config_json` uses the same keys as the JSON
/// configuration file; omitted keys take their defaults.
#[wasm_bindgen(js_name = initSecurityProtection)]
pub fn init_security_protection_js(
    config_json: Option<String>,
    on_dev_tools_open: Option<Function>,
    on_visibility_change: Option<Function>,
) -> Result<WebShield, JsValue> {
    let config: ProtectionConfig = match config_json {
        Some(json) => serde_json::from_str(&json).map_err(to_js)?,
        None => ProtectionConfig::default(),
    };

    let mut hooks = Hooks::default();
    if let Some(callback) = on_dev_tools_open {
        hooks = hooks.on_dev_tools_open(move |open| {
            let _ = callback.call1(&JsValue::NULL, &JsValue::from_bool(open));
        });
    }
    if let Some(callback) = on_visibility_change {
        hooks = hooks.on_visibility_change(move |hidden| {
            let _ = callback.call1(&JsValue::NULL, &JsValue::from_bool(hidden));
        });
    }

    WebShield::activate(config.with_hooks(hooks)).map_err(to_js)
}

#[wasm_bindgen(js_name = addWatermark)]
pub fn add_watermark_js(text: &str) -> Result<(), JsValue> {
    let mut page = WebPage::detached().map_err(to_js)?;
    watermark::add_watermark(&mut page, text).map_err(to_js)
}

#[wasm_bindgen(js_name = removeWatermark)]
pub fn remove_watermark_js() -> Result<(), JsValue> {
    let mut page = WebPage::detached().map_err(to_js)?;
    watermark::remove_watermark(&mut page).map(|_| ()).map_err(to_js)
}
