//! Per-editor bridge state shared by the event translator and reconciler.

use std::time::Duration;

use web_time::Instant;

use crate::config::EditorConfig;
use crate::document::Node;
use crate::dom::NativeDom;
use crate::engine::{Command, EditEngine};
use crate::events::EventKind;
use crate::identity::IdentityRegistry;
use crate::platform::Quirks;
use crate::position::Translator;
use crate::types::DocRange;

/// What the bridge is in the middle of.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    /// An IME composition is open; insertions wait for it to end.
    Composing,
    /// A programmatic selection write is in flight; the selection-change
    /// it triggers must be swallowed.
    Reconciling,
}

/// Admits at most one call per window. Calls inside the window are dropped.
#[derive(Clone, Debug)]
pub struct Throttle {
    window: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.window => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Notifications for the host application.
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    /// Document content changed.
    ValueChanged(Vec<Node>),
    /// Only the selection changed.
    SelectionChanged(Option<DocRange>),
    /// A native event the bridge did not consume.
    Bubbled(EventKind),
}

#[derive(Debug)]
pub struct BridgeContext {
    pub config: EditorConfig,
    pub quirks: Quirks,
    pub registry: IdentityRegistry,
    phase: Phase,
    pub(crate) focused: bool,
    pub(crate) throttle: Throttle,
    last_revision: Option<u64>,
    last_selection: Option<DocRange>,
    outbox: Vec<HostEvent>,
}

impl BridgeContext {
    pub fn new(config: EditorConfig, quirks: Quirks) -> Self {
        let throttle = Throttle::new(config.selection_throttle());
        Self {
            config,
            quirks,
            registry: IdentityRegistry::new(),
            phase: Phase::Idle,
            focused: false,
            throttle,
            last_revision: None,
            last_selection: None,
            outbox: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_composing(&self) -> bool {
        self.phase == Phase::Composing
    }

    pub fn is_reconciling(&self) -> bool {
        self.phase == Phase::Reconciling
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub(crate) fn begin_composition(&mut self) {
        self.phase = Phase::Composing;
    }

    pub(crate) fn end_composition(&mut self) {
        if self.phase == Phase::Composing {
            self.phase = Phase::Idle;
        }
    }

    pub(crate) fn hold_guard(&mut self) {
        self.phase = Phase::Reconciling;
    }

    /// Drop the reconcile guard. Hosts call this on the tick after a
    /// selection write so the resulting selection-change is ignored.
    pub fn release_guard(&mut self) {
        if self.phase == Phase::Reconciling {
            self.phase = Phase::Idle;
        }
    }

    /// Translator over the engine's current document and the last render.
    pub fn translator<'a, D: NativeDom, E: EditEngine>(
        &'a self,
        dom: &'a D,
        engine: &'a E,
    ) -> Translator<'a, D> {
        Translator::new(dom, engine.document(), engine, &self.registry)
    }

    /// Hand a command to the engine with identity re-propagation attached.
    pub fn dispatch<E: EditEngine>(&mut self, engine: &mut E, command: Command) {
        tracing::debug!(target: "quire::events", ?command, "dispatching command");
        engine.execute(command, &mut self.registry);
    }

    pub(crate) fn emit(&mut self, event: HostEvent) {
        self.outbox.push(event);
    }

    pub(crate) fn bubble(&mut self, kind: EventKind) {
        self.emit(HostEvent::Bubbled(kind));
    }

    /// Queue change notifications for whatever changed since the last call.
    /// Returns true if anything was queued.
    pub fn flush_changes<E: EditEngine>(&mut self, engine: &E) -> bool {
        let revision = engine.revision();
        let selection = engine.selection().cloned();
        if self.last_revision != Some(revision) {
            self.last_revision = Some(revision);
            self.last_selection = selection;
            self.emit(HostEvent::ValueChanged(engine.document().children.clone()));
            true
        } else if self.last_selection != selection {
            self.last_selection = selection.clone();
            self.emit(HostEvent::SelectionChanged(selection));
            true
        } else {
            false
        }
    }

    /// Treat the engine's current value and selection as already reported.
    pub fn mark_reported<E: EditEngine>(&mut self, engine: &E) {
        self.last_revision = Some(engine.revision());
        self.last_selection = engine.selection().cloned();
    }

    pub fn take_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.outbox)
    }
}
