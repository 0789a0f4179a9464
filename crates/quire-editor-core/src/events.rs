//! Native event translation.
//!
//! Each intercepted event either produces a document consequence (a command
//! handed to the engine, or a selection change) and reports
//! [`EventResult::Handled`] so the host prevents the native default, or is
//! left alone and, where the host should see it, re-emitted as
//! [`HostEvent::Bubbled`](crate::context::HostEvent::Bubbled).

use std::fmt;

use serde_json::Value;
use web_time::Instant;

use crate::context::BridgeContext;
use crate::document::NodeRef;
use crate::dom::{NativeDom, NativePoint, NativeRange, attr};
use crate::engine::{Command, DeleteUnit, EditEngine, MoveUnit};
use crate::fragment::{DataTransfer, FragmentExport, insert_data, set_fragment_data};
use crate::keys::{Hotkey, KeyCombo};
use crate::platform::SelectionPlatform;
use crate::types::{DocRange, Edge};

/// Outcome reported back to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventResult {
    /// The bridge acted; prevent the native default.
    Handled,
    /// Let the native default run.
    PassThrough,
}

/// Native event names, as re-emitted to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    BeforeInput,
    SelectionChange,
    CompositionStart,
    CompositionEnd,
    Focus,
    Blur,
    Click,
    KeyDown,
    Copy,
    Cut,
    Paste,
    DragOver,
    DragStart,
    Drop,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::BeforeInput => "beforeinput",
            EventKind::SelectionChange => "selectionchange",
            EventKind::CompositionStart => "compositionstart",
            EventKind::CompositionEnd => "compositionend",
            EventKind::Focus => "focus",
            EventKind::Blur => "blur",
            EventKind::Click => "click",
            EventKind::KeyDown => "keydown",
            EventKind::Copy => "copy",
            EventKind::Cut => "cut",
            EventKind::Paste => "paste",
            EventKind::DragOver => "dragover",
            EventKind::DragStart => "dragstart",
            EventKind::Drop => "drop",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a `beforeinput` event.
pub enum InputData<'a> {
    Text(&'a str),
    Transfer(&'a dyn DataTransfer),
}

/// A native event, reduced to what the bridge reads from it.
pub enum NativeEvent<'a, N> {
    BeforeInput {
        target: N,
        input_type: &'a str,
        data: Option<InputData<'a>>,
        /// `getTargetRanges()`; only the first is used.
        target_ranges: Vec<NativeRange<N>>,
    },
    SelectionChange {
        now: Instant,
        /// The editor root is the active element.
        editor_active: bool,
    },
    CompositionStart {
        target: N,
    },
    CompositionEnd {
        target: N,
        data: Option<&'a str>,
    },
    Focus {
        target: N,
    },
    Blur {
        target: N,
        related: Option<N>,
        /// The active element did not change: the whole window lost focus.
        active_unchanged: bool,
    },
    Click {
        target: N,
    },
    KeyDown {
        target: N,
        combo: KeyCombo,
    },
    Copy {
        target: N,
        data: &'a mut dyn DataTransfer,
    },
    Cut {
        target: N,
        data: &'a mut dyn DataTransfer,
    },
    Paste {
        target: N,
        data: &'a dyn DataTransfer,
        /// "Paste without formatting", which never reaches `beforeinput`.
        plain_text_only: bool,
    },
    DragOver {
        target: N,
    },
    DragStart {
        target: N,
        data: &'a mut dyn DataTransfer,
    },
    Drop {
        target: N,
        x: f64,
        y: f64,
        data: &'a dyn DataTransfer,
        has_files: bool,
    },
}

impl<N> NativeEvent<'_, N> {
    pub fn kind(&self) -> EventKind {
        match self {
            NativeEvent::BeforeInput { .. } => EventKind::BeforeInput,
            NativeEvent::SelectionChange { .. } => EventKind::SelectionChange,
            NativeEvent::CompositionStart { .. } => EventKind::CompositionStart,
            NativeEvent::CompositionEnd { .. } => EventKind::CompositionEnd,
            NativeEvent::Focus { .. } => EventKind::Focus,
            NativeEvent::Blur { .. } => EventKind::Blur,
            NativeEvent::Click { .. } => EventKind::Click,
            NativeEvent::KeyDown { .. } => EventKind::KeyDown,
            NativeEvent::Copy { .. } => EventKind::Copy,
            NativeEvent::Cut { .. } => EventKind::Cut,
            NativeEvent::Paste { .. } => EventKind::Paste,
            NativeEvent::DragOver { .. } => EventKind::DragOver,
            NativeEvent::DragStart { .. } => EventKind::DragStart,
            NativeEvent::Drop { .. } => EventKind::Drop,
        }
    }
}

/// Everything an event handler touches besides the bridge state.
pub struct EventEnv<'a, D, E, S> {
    pub dom: &'a D,
    pub engine: &'a mut E,
    pub native: &'a mut S,
    pub export: &'a dyn FragmentExport,
}

/// Translate one native event.
pub fn handle_event<D, E, S>(
    cx: &mut BridgeContext,
    env: &mut EventEnv<'_, D, E, S>,
    event: NativeEvent<'_, D::Node>,
) -> EventResult
where
    D: NativeDom,
    E: EditEngine,
    S: SelectionPlatform<D::Node>,
{
    let kind = event.kind();
    tracing::trace!(target: "quire::events", %kind, "native event");
    match event {
        NativeEvent::BeforeInput {
            target,
            input_type,
            data,
            target_ranges,
        } => on_before_input(cx, env, &target, input_type, data, target_ranges),
        NativeEvent::SelectionChange { now, editor_active } => {
            on_selection_change(cx, env, now, editor_active);
            EventResult::PassThrough
        }
        NativeEvent::CompositionStart { target } => {
            if cx.translator(env.dom, &*env.engine).has_editable_target(&target) {
                cx.begin_composition();
            }
            EventResult::PassThrough
        }
        NativeEvent::CompositionEnd { target, data } => {
            if cx.translator(env.dom, &*env.engine).has_editable_target(&target) {
                cx.end_composition();
                let committed = data.filter(|d| !d.is_empty());
                if let (true, Some(text)) = (cx.quirks.composition_end_inserts_text, committed) {
                    cx.dispatch(env.engine, Command::InsertText(text.to_string()));
                }
            }
            EventResult::PassThrough
        }
        NativeEvent::Focus { target } => {
            on_focus(cx, env, &target);
            EventResult::PassThrough
        }
        NativeEvent::Blur {
            target,
            related,
            active_unchanged,
        } => {
            on_blur(cx, env, &target, related.as_ref(), active_unchanged);
            EventResult::PassThrough
        }
        NativeEvent::Click { target } => {
            on_click(cx, env, &target);
            EventResult::PassThrough
        }
        NativeEvent::KeyDown { target, combo } => on_key_down(cx, env, &target, &combo),
        NativeEvent::Copy { target, data } => {
            if !cx.translator(env.dom, &*env.engine).has_editable_target(&target) {
                cx.bubble(kind);
                return EventResult::PassThrough;
            }
            write_fragment(env, data);
            EventResult::Handled
        }
        NativeEvent::Cut { target, data } => {
            if cx.config.read_only
                || !cx.translator(env.dom, &*env.engine).has_editable_target(&target)
            {
                cx.bubble(kind);
                return EventResult::PassThrough;
            }
            write_fragment(env, data);
            if env.engine.selection().is_some_and(DocRange::is_expanded) {
                cx.dispatch(env.engine, Command::DeleteFragment);
            }
            EventResult::Handled
        }
        NativeEvent::Paste {
            target,
            data,
            plain_text_only,
        } => {
            let editable = cx.translator(env.dom, &*env.engine).has_editable_target(&target);
            if editable
                && (!cx.quirks.has_before_input_support || plain_text_only)
                && !cx.config.read_only
            {
                insert_data(cx, env.engine, data);
                return EventResult::Handled;
            }
            cx.bubble(kind);
            EventResult::PassThrough
        }
        NativeEvent::DragOver { target } => {
            let translator = cx.translator(env.dom, &*env.engine);
            // Editable content accepts drops by default; only voids need to
            // opt in.
            if translator.has_dom_node(&target, false) && translator.is_target_inside_void(&target)
            {
                return EventResult::Handled;
            }
            cx.bubble(kind);
            EventResult::PassThrough
        }
        NativeEvent::DragStart { target, data } => {
            on_drag_start(cx, env, &target, data);
            EventResult::PassThrough
        }
        NativeEvent::Drop {
            target,
            x,
            y,
            data,
            has_files,
        } => on_drop(cx, env, &target, x, y, data, has_files),
    }
}

fn write_fragment<D, E: EditEngine, S>(env: &mut EventEnv<'_, D, E, S>, data: &mut dyn DataTransfer) {
    if let Err(e) = set_fragment_data(&*env.engine, env.export, data) {
        tracing::warn!(target: "quire::fragment", error = %e, "failed to write fragment payload");
    }
}

fn on_before_input<D, E, S>(
    cx: &mut BridgeContext,
    env: &mut EventEnv<'_, D, E, S>,
    target: &D::Node,
    input_type: &str,
    data: Option<InputData<'_>>,
    target_ranges: Vec<NativeRange<D::Node>>,
) -> EventResult
where
    D: NativeDom,
    E: EditEngine,
{
    if cx.config.read_only || !cx.translator(env.dom, &*env.engine).has_editable_target(target) {
        return EventResult::PassThrough;
    }
    // Composition updates cannot be cancelled; the committed text arrives
    // with composition end.
    if matches!(input_type, "insertCompositionText" | "deleteCompositionText") {
        return EventResult::PassThrough;
    }
    let selection = env.engine.selection().cloned();
    let mut acted = false;

    // Plain directional deletes compute their own range.
    let is_delete = input_type.starts_with("delete");
    if !is_delete || input_type.starts_with("deleteBy") {
        if let Some(native) = target_ranges.into_iter().next() {
            let resolved = cx.translator(env.dom, &*env.engine).to_document_range(native);
            match resolved {
                Ok(range) => {
                    if selection.as_ref() != Some(&range) {
                        cx.dispatch(env.engine, Command::Select(range));
                        acted = true;
                    }
                }
                Err(e) => {
                    tracing::warn!(target: "quire::events", error = %e, input_type, "dropping input with unresolvable target range");
                    return EventResult::Handled;
                }
            }
        }
    }

    if is_delete && selection.as_ref().is_some_and(DocRange::is_expanded) {
        cx.dispatch(env.engine, Command::DeleteFragment);
        return EventResult::Handled;
    }

    let commands: Vec<Command> = match input_type {
        "deleteByComposition" | "deleteByCut" | "deleteByDrag" => vec![Command::DeleteFragment],
        "deleteContent" | "deleteContentForward" => {
            vec![Command::DeleteForward(DeleteUnit::Character)]
        }
        "deleteContentBackward" => vec![Command::DeleteBackward(DeleteUnit::Character)],
        "deleteEntireSoftLine" => vec![
            Command::DeleteBackward(DeleteUnit::Line),
            Command::DeleteForward(DeleteUnit::Line),
        ],
        "deleteHardLineBackward" => vec![Command::DeleteBackward(DeleteUnit::Block)],
        "deleteSoftLineBackward" => vec![Command::DeleteBackward(DeleteUnit::Line)],
        "deleteHardLineForward" => vec![Command::DeleteForward(DeleteUnit::Block)],
        "deleteSoftLineForward" => vec![Command::DeleteForward(DeleteUnit::Line)],
        "deleteWordBackward" => vec![Command::DeleteBackward(DeleteUnit::Word)],
        "deleteWordForward" => vec![Command::DeleteForward(DeleteUnit::Word)],
        "insertLineBreak" | "insertParagraph" => vec![Command::InsertBreak],
        "insertFromComposition" | "insertFromDrop" | "insertFromPaste" | "insertFromYank"
        | "insertReplacementText" | "insertText" => match data {
            Some(InputData::Transfer(transfer)) => {
                acted |= insert_data(cx, env.engine, transfer);
                Vec::new()
            }
            Some(InputData::Text(text)) => vec![Command::InsertText(text.to_string())],
            None => Vec::new(),
        },
        "historyUndo" => vec![Command::Undo],
        "historyRedo" => vec![Command::Redo],
        "formatBold" | "formatItalic" | "formatUnderline" => {
            let key = input_type.trim_start_matches("format").to_ascii_lowercase();
            toggle_mark(cx, env.engine, &key);
            acted = true;
            Vec::new()
        }
        other => {
            tracing::trace!(target: "quire::events", input_type = other, "unhandled input type");
            Vec::new()
        }
    };
    acted |= !commands.is_empty();
    for command in commands {
        cx.dispatch(env.engine, command);
    }
    if acted {
        EventResult::Handled
    } else {
        EventResult::PassThrough
    }
}

fn toggle_mark<E: EditEngine>(cx: &mut BridgeContext, engine: &mut E, key: &str) {
    if engine.marks().get(key).is_some_and(|v| v == &Value::Bool(true)) {
        engine.remove_mark(key, &mut cx.registry);
    } else {
        engine.add_mark(key, Value::Bool(true), &mut cx.registry);
    }
}

fn on_selection_change<D, E, S>(
    cx: &mut BridgeContext,
    env: &mut EventEnv<'_, D, E, S>,
    now: Instant,
    editor_active: bool,
) where
    D: NativeDom,
    E: EditEngine,
    S: SelectionPlatform<D::Node>,
{
    if cx.config.read_only || cx.is_composing() || cx.is_reconciling() {
        return;
    }
    if !cx.throttle.admit(now) {
        return;
    }
    if !editor_active {
        cx.set_focused(false);
        if env.engine.selection().is_some() {
            cx.dispatch(env.engine, Command::Deselect);
        }
        return;
    }
    cx.set_focused(true);

    let Some(snapshot) = env.native.snapshot() else {
        cx.dispatch(env.engine, Command::Deselect);
        return;
    };
    let next = {
        let translator = cx.translator(env.dom, &*env.engine);
        let selectable = |point: Option<&NativePoint<D::Node>>| {
            point.is_some_and(|p| {
                translator.has_editable_target(&p.node) || translator.is_target_inside_void(&p.node)
            })
        };
        if selectable(snapshot.anchor.as_ref()) && selectable(snapshot.focus.as_ref()) {
            match translator.to_document_range(snapshot) {
                Ok(range) => Some(range),
                Err(e) => {
                    tracing::warn!(target: "quire::events", error = %e, "native selection did not resolve");
                    return;
                }
            }
        } else {
            None
        }
    };
    match next {
        Some(range) if env.engine.selection() != Some(&range) => {
            cx.dispatch(env.engine, Command::Select(range));
        }
        Some(_) => {}
        None => cx.dispatch(env.engine, Command::Deselect),
    }
}

fn on_focus<D, E, S>(cx: &mut BridgeContext, env: &mut EventEnv<'_, D, E, S>, target: &D::Node)
where
    D: NativeDom,
    E: EditEngine,
    S: SelectionPlatform<D::Node>,
{
    if cx.config.read_only
        || cx.is_reconciling()
        || !cx.translator(env.dom, &*env.engine).has_editable_target(target)
    {
        return;
    }
    if cx.quirks.redirect_nested_focus && *target != env.dom.editor_root() {
        env.native.focus_editor();
        return;
    }
    cx.set_focused(true);
    cx.bubble(EventKind::Focus);
}

fn on_blur<D, E, S>(
    cx: &mut BridgeContext,
    env: &mut EventEnv<'_, D, E, S>,
    target: &D::Node,
    related: Option<&D::Node>,
    active_unchanged: bool,
) where
    D: NativeDom,
    E: EditEngine,
{
    let translator = cx.translator(env.dom, &*env.engine);
    if cx.config.read_only || cx.is_reconciling() || !translator.has_editable_target(target) {
        return;
    }
    // The tab lost focus; keep the editor focused for when it comes back.
    if active_unchanged {
        return;
    }
    if let Some(related) = related {
        if *related == env.dom.editor_root() {
            return;
        }
        if env.dom.is_element(related) && env.dom.has_attribute(related, attr::SPACER) {
            return;
        }
        // Focus moving to a non-editable part of a non-void element.
        if translator.has_dom_node(related, false) {
            let lands_in_element = translator
                .path_of_native(related)
                .ok()
                .and_then(|path| env.engine.document().node(&path))
                .is_some_and(|node| matches!(node, NodeRef::Element(el) if !env.engine.is_void(el)));
            if lands_in_element {
                return;
            }
        }
    }
    cx.set_focused(false);
    cx.bubble(EventKind::Blur);
}

fn on_click<D, E, S>(cx: &mut BridgeContext, env: &mut EventEnv<'_, D, E, S>, target: &D::Node)
where
    D: NativeDom,
    E: EditEngine,
{
    let translator = cx.translator(env.dom, &*env.engine);
    if cx.config.read_only || !translator.has_dom_node(target, false) {
        cx.bubble(EventKind::Click);
        return;
    }
    let Ok(path) = translator.path_of_native(target) else {
        return;
    };
    let document = env.engine.document();
    let (Some(start), Some(end)) = (document.start(&path), document.end(&path)) else {
        return;
    };
    let start_void = document.void_ancestor(&start.path, &*env.engine);
    let end_void = document.void_ancestor(&end.path, &*env.engine);
    if start_void.is_some() && start_void == end_void {
        cx.dispatch(env.engine, Command::Select(DocRange::collapsed(start)));
    }
}

fn on_key_down<D, E, S>(
    cx: &mut BridgeContext,
    env: &mut EventEnv<'_, D, E, S>,
    target: &D::Node,
    combo: &KeyCombo,
) -> EventResult
where
    D: NativeDom,
    E: EditEngine,
{
    if cx.config.read_only || !cx.translator(env.dom, &*env.engine).has_editable_target(target) {
        return EventResult::PassThrough;
    }
    let apple = cx.quirks.is_apple;
    let is = |hotkey: Hotkey| hotkey.matches(combo, apple);
    let selection = env.engine.selection().cloned();
    let collapsed = selection.as_ref().is_some_and(DocRange::is_collapsed);
    let expanded = selection.as_ref().is_some_and(DocRange::is_expanded);
    let mv = |unit, reverse, edge| Command::Move { unit, reverse, edge };

    // History and caret movement are always ours: the native stack never
    // sees our edits, and native movement cannot skip voids.
    let command = if is(Hotkey::Redo) {
        Some(Command::Redo)
    } else if is(Hotkey::Undo) {
        Some(Command::Undo)
    } else if is(Hotkey::MoveLineBackward) {
        Some(mv(MoveUnit::Line, true, None))
    } else if is(Hotkey::MoveLineForward) {
        Some(mv(MoveUnit::Line, false, None))
    } else if is(Hotkey::ExtendLineBackward) {
        Some(mv(MoveUnit::Line, true, Some(Edge::Focus)))
    } else if is(Hotkey::ExtendLineForward) {
        Some(mv(MoveUnit::Line, false, Some(Edge::Focus)))
    } else if is(Hotkey::MoveBackward) {
        Some(if collapsed {
            mv(MoveUnit::Character, true, None)
        } else {
            Command::Collapse(Edge::Start)
        })
    } else if is(Hotkey::MoveForward) {
        Some(if collapsed {
            mv(MoveUnit::Character, false, None)
        } else {
            Command::Collapse(Edge::End)
        })
    } else if is(Hotkey::MoveWordBackward) {
        Some(mv(MoveUnit::Word, true, None))
    } else if is(Hotkey::MoveWordForward) {
        Some(mv(MoveUnit::Word, false, None))
    } else if !cx.quirks.has_before_input_support {
        match fallback_key_command(&is, expanded) {
            Some(command) => {
                if let Some(command) = command {
                    cx.dispatch(env.engine, command);
                }
                return EventResult::Handled;
            }
            None => None,
        }
    } else {
        None
    };

    match command {
        Some(command) => {
            cx.dispatch(env.engine, command);
            EventResult::Handled
        }
        None => {
            cx.bubble(EventKind::KeyDown);
            EventResult::PassThrough
        }
    }
}

/// Without `beforeinput` the edit intent has to be guessed from the key.
/// `Some(None)` swallows the key without a command.
fn fallback_key_command(is: &dyn Fn(Hotkey) -> bool, expanded: bool) -> Option<Option<Command>> {
    if is(Hotkey::Bold) || is(Hotkey::Italic) || is(Hotkey::TransposeCharacter) {
        return Some(None);
    }
    if is(Hotkey::SplitBlock) {
        return Some(Some(Command::InsertBreak));
    }
    let delete = [
        (Hotkey::DeleteBackward, Command::DeleteBackward(DeleteUnit::Character)),
        (Hotkey::DeleteForward, Command::DeleteForward(DeleteUnit::Character)),
        (Hotkey::DeleteLineBackward, Command::DeleteBackward(DeleteUnit::Line)),
        (Hotkey::DeleteLineForward, Command::DeleteForward(DeleteUnit::Line)),
        (Hotkey::DeleteWordBackward, Command::DeleteBackward(DeleteUnit::Word)),
        (Hotkey::DeleteWordForward, Command::DeleteForward(DeleteUnit::Word)),
    ];
    delete
        .into_iter()
        .find(|(hotkey, _)| is(*hotkey))
        .map(|(_, command)| {
            Some(if expanded {
                Command::DeleteFragment
            } else {
                command
            })
        })
}

fn on_drag_start<D, E, S>(
    cx: &mut BridgeContext,
    env: &mut EventEnv<'_, D, E, S>,
    target: &D::Node,
    data: &mut dyn DataTransfer,
) where
    D: NativeDom,
    E: EditEngine,
{
    let translator = cx.translator(env.dom, &*env.engine);
    if !translator.has_dom_node(target, false) {
        cx.bubble(EventKind::DragStart);
        return;
    }
    let whole_void = translator.path_of_native(target).ok().and_then(|path| {
        env.engine
            .document()
            .void_ancestor(&path, &*env.engine)
            .and(env.engine.document().range_of(&path))
    });
    // A dragged void must be selected to appear in the fragment.
    if let Some(range) = whole_void {
        cx.dispatch(env.engine, Command::Select(range));
    }
    write_fragment(env, data);
}

#[allow(clippy::too_many_arguments)]
fn on_drop<D, E, S>(
    cx: &mut BridgeContext,
    env: &mut EventEnv<'_, D, E, S>,
    target: &D::Node,
    x: f64,
    y: f64,
    data: &dyn DataTransfer,
    has_files: bool,
) -> EventResult
where
    D: NativeDom,
    E: EditEngine,
{
    let translator = cx.translator(env.dom, &*env.engine);
    if cx.config.read_only || !translator.has_dom_node(target, false) {
        return EventResult::PassThrough;
    }
    let quirks = cx.quirks;
    if quirks.has_before_input_support && !quirks.drop_needs_manual_insert && !has_files {
        cx.bubble(EventKind::Drop);
        return EventResult::PassThrough;
    }
    let range = match translator.event_range(target, x, y, &quirks) {
        Ok(range) => range,
        Err(e) => {
            tracing::warn!(target: "quire::events", error = %e, "dropping drop with no resolvable target");
            return EventResult::Handled;
        }
    };
    cx.dispatch(env.engine, Command::Select(range));
    insert_data(cx, env.engine, data);
    EventResult::Handled
}
