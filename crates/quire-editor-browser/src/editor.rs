//! A mounted editor: one contenteditable root, its listeners and the bridge.
//!
//! Host notifications leave as bubbling `CustomEvent`s on the root, with a
//! parsed JSON `detail`:
//!
//! - `quire-change`: the document's top-level children
//! - `quire-selection`: the document range, or `null`
//! - `quire-unhandled`: the name of a native event the bridge let through

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gloo_events::{EventListener, EventListenerOptions};
use gloo_timers::callback::Timeout;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    ClipboardEvent, CompositionEvent, CustomEvent, CustomEventInit, DragEvent, Element, Event,
    FocusEvent, HtmlElement, InputEvent, KeyboardEvent, Node,
};
use web_time::Instant;

use quire_editor_core::render::{DefaultElementRenderer, DefaultLeafRenderer};
use quire_editor_core::{
    Command, DataTransfer, Decorate, EditEngine, Editable, EditorConfig, ElementRenderer,
    EventResult, HostEvent, InputData, LeafRenderer, NativeEvent, ReconcileOutcome, RenderPipeline,
    SelectionPlatform, attr,
};

use crate::clipboard::WebDataTransfer;
use crate::dom::WebDom;
use crate::events::{event_target, host_event_payload, is_plain_text_paste, key_combo, target_ranges};
use crate::platform::quirks;
use crate::selection::WebSelection;

type Shared<E, Dc, R, L> = Rc<RefCell<Inner<E, Dc, R, L>>>;

/// Events listened for on the editor root.
const ROOT_EVENTS: &[&str] = &[
    "beforeinput",
    "compositionstart",
    "compositionend",
    "focusin",
    "focusout",
    "click",
    "keydown",
    "copy",
    "cut",
    "paste",
    "dragover",
    "dragstart",
    "drop",
];

struct Inner<E, Dc, R, L> {
    editable: Editable<E, Dc, R, L>,
    dom: WebDom,
    selection: WebSelection,
    root: HtmlElement,
}

impl<E, Dc, R, L> Inner<E, Dc, R, L>
where
    E: EditEngine,
    Dc: Decorate,
    R: ElementRenderer,
    L: LeafRenderer,
{
    fn render(&mut self) {
        let vroot = self.editable.render();
        for (name, value) in &vroot.attrs {
            if let Err(e) = self.root.set_attribute(name.as_str(), value) {
                tracing::warn!(target: "quire::render", attr = %name, "set_attribute failed: {:?}", e);
            }
        }
        if vroot.get_attr(attr::CONTENT_EDITABLE).is_none() {
            let _ = self.root.remove_attribute(attr::CONTENT_EDITABLE);
        }
        self.root.set_inner_html(&vroot.inner_html());
    }

    fn handle(&mut self, event: NativeEvent<'_, Node>) -> EventResult {
        self.editable.handle(&self.dom, &mut self.selection, event)
    }

    fn editor_active(&self) -> bool {
        let root: &Element = &self.root;
        root.owner_document()
            .and_then(|document| document.active_element())
            .is_some_and(|active| active == *root)
    }

    /// Reduce a DOM event to a bridge event and translate it.
    fn on_event(&mut self, evt: &Event) -> EventResult {
        let name = evt.type_();
        if name == "selectionchange" {
            let editor_active = self.editor_active();
            return self.handle(NativeEvent::SelectionChange {
                now: Instant::now(),
                editor_active,
            });
        }

        let Some(target) = event_target(evt) else {
            return EventResult::PassThrough;
        };
        match name.as_str() {
            "beforeinput" => {
                let Some(input) = evt.dyn_ref::<InputEvent>() else {
                    return EventResult::PassThrough;
                };
                let input_type = input.input_type();
                let text = input.data();
                let transfer = input.data_transfer().map(WebDataTransfer::new);
                let data = match (&transfer, &text) {
                    (Some(transfer), _) => Some(InputData::Transfer(transfer)),
                    (None, Some(text)) => Some(InputData::Text(text)),
                    (None, None) => None,
                };
                self.handle(NativeEvent::BeforeInput {
                    target,
                    input_type: &input_type,
                    data,
                    target_ranges: target_ranges(input),
                })
            }
            "compositionstart" => self.handle(NativeEvent::CompositionStart { target }),
            "compositionend" => {
                let data = evt.dyn_ref::<CompositionEvent>().and_then(CompositionEvent::data);
                self.handle(NativeEvent::CompositionEnd {
                    target,
                    data: data.as_deref(),
                })
            }
            "focusin" => self.handle(NativeEvent::Focus { target }),
            "focusout" => {
                let related = evt
                    .dyn_ref::<FocusEvent>()
                    .and_then(FocusEvent::related_target)
                    .and_then(|t| t.dyn_into::<Node>().ok());
                let active_unchanged = self.editor_active();
                self.handle(NativeEvent::Blur {
                    target,
                    related,
                    active_unchanged,
                })
            }
            "click" => self.handle(NativeEvent::Click { target }),
            "keydown" => {
                let Some(key) = evt.dyn_ref::<KeyboardEvent>() else {
                    return EventResult::PassThrough;
                };
                if key.is_composing() {
                    return EventResult::PassThrough;
                }
                self.handle(NativeEvent::KeyDown {
                    target,
                    combo: key_combo(key),
                })
            }
            "copy" | "cut" => {
                let Some(mut data) = evt
                    .dyn_ref::<ClipboardEvent>()
                    .and_then(WebDataTransfer::from_clipboard)
                else {
                    return EventResult::PassThrough;
                };
                let data: &mut dyn DataTransfer = &mut data;
                if name == "copy" {
                    self.handle(NativeEvent::Copy { target, data })
                } else {
                    self.handle(NativeEvent::Cut { target, data })
                }
            }
            "paste" => {
                let Some(raw) = evt
                    .dyn_ref::<ClipboardEvent>()
                    .and_then(ClipboardEvent::clipboard_data)
                else {
                    return EventResult::PassThrough;
                };
                let plain_text_only = is_plain_text_paste(&raw);
                let data = WebDataTransfer::new(raw);
                self.handle(NativeEvent::Paste {
                    target,
                    data: &data,
                    plain_text_only,
                })
            }
            "dragover" => self.handle(NativeEvent::DragOver { target }),
            "dragstart" => {
                let Some(mut data) = evt.dyn_ref::<DragEvent>().and_then(WebDataTransfer::from_drag)
                else {
                    return EventResult::PassThrough;
                };
                self.handle(NativeEvent::DragStart {
                    target,
                    data: &mut data,
                })
            }
            "drop" => {
                let Some(drag) = evt.dyn_ref::<DragEvent>() else {
                    return EventResult::PassThrough;
                };
                let Some(data) = WebDataTransfer::from_drag(drag) else {
                    return EventResult::PassThrough;
                };
                let has_files = data.has_files();
                self.handle(NativeEvent::Drop {
                    target,
                    x: drag.client_x() as f64,
                    y: drag.client_y() as f64,
                    data: &data,
                    has_files,
                })
            }
            other => {
                tracing::trace!(target: "quire::events", event = other, "unrouted event");
                EventResult::PassThrough
            }
        }
    }
}

/// An editor mounted into a container element.
///
/// Listeners attach one macrotask after mounting. Dropping the value
/// detaches them; [`BrowserEditor::unmount`] also removes the root element.
pub struct BrowserEditor<E, Dc = (), R = DefaultElementRenderer, L = DefaultLeafRenderer> {
    shared: Shared<E, Dc, R, L>,
    root: HtmlElement,
    listeners: Rc<RefCell<Vec<EventListener>>>,
}

impl<E: EditEngine + 'static> BrowserEditor<E> {
    /// Create the editor root inside `container`, render the engine's
    /// document into it and start listening.
    pub fn mount(container: &Element, engine: E, config: EditorConfig) -> Result<Self, JsValue> {
        Self::mount_with_pipeline(container, engine, config, RenderPipeline::default())
    }
}

impl<E, Dc, R, L> BrowserEditor<E, Dc, R, L>
where
    E: EditEngine + 'static,
    Dc: Decorate + 'static,
    R: ElementRenderer + 'static,
    L: LeafRenderer + 'static,
{
    /// Like [`BrowserEditor::mount`], rendering through custom decoration,
    /// element and leaf providers.
    pub fn mount_with_pipeline(
        container: &Element,
        engine: E,
        config: EditorConfig,
        pipeline: RenderPipeline<Dc, R, L>,
    ) -> Result<Self, JsValue> {
        let document = container
            .owner_document()
            .ok_or_else(|| JsValue::from_str("container has no owner document"))?;
        let root: HtmlElement = document.create_element("div")?.dyn_into()?;
        root.set_id(&config.editor_id);
        container.append_child(&root)?;

        let editor_id = config.editor_id.clone();
        let inner = Inner {
            editable: Editable::new(engine, config, quirks()).with_pipeline(pipeline),
            dom: WebDom::new(root.clone().into()),
            selection: WebSelection::new(root.clone()),
            root: root.clone(),
        };
        let shared = Rc::new(RefCell::new(inner));
        shared.borrow_mut().render();

        // Listeners go on after the first paint.
        let listeners = Rc::new(RefCell::new(Vec::new()));
        {
            let weak = Rc::downgrade(&shared);
            let slot = Rc::downgrade(&listeners);
            let root = root.clone();
            Timeout::new(0, move || {
                let Some(slot) = slot.upgrade() else {
                    return;
                };
                let mut attached: Vec<EventListener> = ROOT_EVENTS
                    .iter()
                    .map(|&name| listen(&weak, &root, name))
                    .collect();
                attached.push(listen(&weak, &document, "selectionchange"));
                *slot.borrow_mut() = attached;
                tracing::trace!(target: "quire::events", "listeners attached");
            })
            .forget();
        }

        tracing::debug!(target: "quire::events", %editor_id, "editor mounted");
        Ok(Self {
            shared,
            root,
            listeners,
        })
    }

    /// Run a command from outside the editor, e.g. a toolbar button.
    pub fn dispatch(&self, command: Command) {
        match self.shared.try_borrow_mut() {
            Ok(mut inner) => inner.editable.dispatch(command),
            Err(_) => {
                tracing::warn!(target: "quire::events", "dispatch during event handling dropped");
                return;
            }
        }
        sync(&self.shared);
    }

    /// Apply a change to the engine directly, then re-render.
    pub fn update_engine(&self, f: impl FnOnce(&mut E)) {
        match self.shared.try_borrow_mut() {
            Ok(mut inner) => f(inner.editable.engine_mut()),
            Err(_) => {
                tracing::warn!(target: "quire::events", "engine update during event handling dropped");
                return;
            }
        }
        sync(&self.shared);
    }

    pub fn with_engine<T>(&self, f: impl FnOnce(&E) -> T) -> T {
        f(self.shared.borrow().editable.engine())
    }

    pub fn set_read_only(&self, read_only: bool) {
        if let Ok(mut inner) = self.shared.try_borrow_mut() {
            inner.editable.context_mut().config.read_only = read_only;
            inner.render();
        }
    }

    /// Focus the root. The resulting `focusin` marks the editor focused.
    pub fn focus(&self) {
        if let Err(e) = self.root.focus() {
            tracing::debug!(target: "quire::events", "focus failed: {:?}", e);
        }
    }

    pub fn root(&self) -> &HtmlElement {
        &self.root
    }

    /// Detach listeners and remove the root element.
    pub fn unmount(self) {
        self.listeners.borrow_mut().clear();
        self.root.remove();
    }
}

fn listen<E, Dc, R, L>(
    weak: &Weak<RefCell<Inner<E, Dc, R, L>>>,
    target: &web_sys::EventTarget,
    name: &'static str,
) -> EventListener
where
    E: EditEngine + 'static,
    Dc: Decorate + 'static,
    R: ElementRenderer + 'static,
    L: LeafRenderer + 'static,
{
    let weak = weak.clone();
    EventListener::new_with_options(
        target,
        name,
        EventListenerOptions::enable_prevent_default(),
        move |evt| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let result = match shared.try_borrow_mut() {
                Ok(mut inner) => inner.on_event(evt),
                Err(_) => {
                    // A handler of ours caused this event synchronously.
                    tracing::debug!(target: "quire::events", event = name, "re-entrant event ignored");
                    return;
                }
            };
            if result == EventResult::Handled {
                evt.prevent_default();
            }
            sync(&shared);
        },
    )
}

/// After an event: re-render on content change, push the selection back if
/// the engine changed, notify the host.
fn sync<E, Dc, R, L>(shared: &Shared<E, Dc, R, L>)
where
    E: EditEngine + 'static,
    Dc: Decorate + 'static,
    R: ElementRenderer + 'static,
    L: LeafRenderer + 'static,
{
    let Ok(mut guard) = shared.try_borrow_mut() else {
        return;
    };
    let inner = &mut *guard;
    let changes = inner.editable.take_changes();
    let content_changed = changes
        .iter()
        .any(|change| matches!(change, HostEvent::ValueChanged(_)));
    if content_changed && !inner.editable.context().is_composing() {
        inner.render();
    }
    let outcome = inner.editable.reconcile_changed(&inner.dom, &mut inner.selection);
    let root = inner.root.clone();
    drop(guard);

    for change in &changes {
        notify(&root, change);
    }

    if let ReconcileOutcome::Applied { refocus } = outcome {
        // The selectionchange from our own write arrives before this runs.
        let weak = Rc::downgrade(shared);
        Timeout::new(0, move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let Ok(mut inner) = shared.try_borrow_mut() else {
                return;
            };
            if refocus {
                inner.selection.focus_editor();
            }
            inner.editable.release_guard();
        })
        .forget();
    }
}

fn notify(root: &HtmlElement, change: &HostEvent) {
    let (name, detail) = host_event_payload(change);
    let init = CustomEventInit::new();
    init.set_bubbles(true);
    init.set_detail(&js_sys::JSON::parse(&detail).unwrap_or(JsValue::NULL));
    match CustomEvent::new_with_event_init_dict(name, &init) {
        Ok(event) => {
            if let Err(e) = root.dispatch_event(&event) {
                tracing::warn!(target: "quire::events", event = name, "host notification failed: {:?}", e);
            }
        }
        Err(e) => {
            tracing::warn!(target: "quire::events", event = name, "could not build host notification: {:?}", e);
        }
    }
}
