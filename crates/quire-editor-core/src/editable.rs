//! One editor instance: bridge state, engine and render pipeline together.
//!
//! Hosts drive the cycle: feed native events to [`Editable::handle`], drain
//! [`Editable::take_changes`] for the application, [`Editable::render`] when
//! the value changed, and call [`Editable::reconcile_changed`] once the
//! render is on screen.

use crate::config::EditorConfig;
use crate::context::{BridgeContext, HostEvent};
use crate::dom::NativeDom;
use crate::engine::{Command, EditEngine};
use crate::events::{EventEnv, EventResult, NativeEvent, handle_event};
use crate::platform::{Quirks, SelectionPlatform};
use crate::reconcile::{ReconcileOutcome, reconcile};
use crate::render::{
    Decorate, DefaultElementRenderer, DefaultLeafRenderer, ElementRenderer, LeafRenderer,
    RenderPass, RenderPipeline,
};
use crate::vnode::VElement;

pub struct Editable<E, Dc = (), R = DefaultElementRenderer, L = DefaultLeafRenderer> {
    cx: BridgeContext,
    engine: E,
    pipeline: RenderPipeline<Dc, R, L>,
    /// The engine changed since the last reconcile.
    unreconciled: bool,
}

impl<E: EditEngine> Editable<E> {
    pub fn new(engine: E, config: EditorConfig, quirks: Quirks) -> Self {
        let mut cx = BridgeContext::new(config, quirks);
        cx.mark_reported(&engine);
        Self {
            cx,
            engine,
            pipeline: RenderPipeline::default(),
            unreconciled: false,
        }
    }
}

impl<E, Dc, R, L> Editable<E, Dc, R, L>
where
    E: EditEngine,
    Dc: Decorate,
    R: ElementRenderer,
    L: LeafRenderer,
{
    /// Swap in custom decoration and rendering providers.
    pub fn with_pipeline<Dc2, R2, L2>(
        self,
        pipeline: RenderPipeline<Dc2, R2, L2>,
    ) -> Editable<E, Dc2, R2, L2> {
        Editable {
            cx: self.cx,
            engine: self.engine,
            pipeline,
            unreconciled: self.unreconciled,
        }
    }

    /// Render the editor root for the engine's current state.
    pub fn render(&mut self) -> VElement {
        let document = self.engine.document();
        let decorations = self
            .pipeline
            .root_decorations(document, self.cx.config.placeholder.as_deref());
        let pass = RenderPass {
            document,
            caps: &self.engine,
            selection: self.engine.selection(),
            decorations: &decorations,
            read_only: self.cx.config.read_only,
        };
        self.pipeline
            .render_editor(&mut self.cx.registry, &pass, &self.cx.config, &self.cx.quirks)
    }

    /// Translate one native event against the last render.
    pub fn handle<D, S>(
        &mut self,
        dom: &D,
        native: &mut S,
        event: NativeEvent<'_, D::Node>,
    ) -> EventResult
    where
        D: NativeDom,
        S: SelectionPlatform<D::Node>,
    {
        let mut env = EventEnv {
            dom,
            engine: &mut self.engine,
            native,
            export: &self.pipeline,
        };
        handle_event(&mut self.cx, &mut env, event)
    }

    /// Push the engine's selection onto the native selection. Failures are
    /// logged and reported as skipped.
    pub fn reconcile<D, S>(&mut self, dom: &D, native: &mut S) -> ReconcileOutcome
    where
        D: NativeDom,
        S: SelectionPlatform<D::Node>,
    {
        self.unreconciled = false;
        match reconcile(&mut self.cx, dom, &self.engine, native) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(target: "quire::reconcile", error = %e, "selection reconcile failed");
                ReconcileOutcome::Skipped
            }
        }
    }

    /// Reconcile only if the engine's value or selection changed since the
    /// last reconcile. After an event the bridge dropped, such as a
    /// throttled selection-change, the native selection is left alone.
    pub fn reconcile_changed<D, S>(&mut self, dom: &D, native: &mut S) -> ReconcileOutcome
    where
        D: NativeDom,
        S: SelectionPlatform<D::Node>,
    {
        self.unreconciled |= self.cx.flush_changes(&self.engine);
        if !self.unreconciled {
            tracing::trace!(target: "quire::reconcile", "engine unchanged, reconcile skipped");
            return ReconcileOutcome::Skipped;
        }
        self.reconcile(dom, native)
    }

    /// Run a command outside of any native event, e.g. from a toolbar.
    pub fn dispatch(&mut self, command: Command) {
        self.cx.dispatch(&mut self.engine, command);
    }

    pub fn release_guard(&mut self) {
        self.cx.release_guard();
    }

    /// Notifications accumulated since the last call, including value and
    /// selection changes made by the engine.
    pub fn take_changes(&mut self) -> Vec<HostEvent> {
        self.unreconciled |= self.cx.flush_changes(&self.engine);
        self.cx.take_events()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn context(&self) -> &BridgeContext {
        &self.cx
    }

    pub fn context_mut(&mut self) -> &mut BridgeContext {
        &mut self.cx
    }

    pub fn pipeline(&self) -> &RenderPipeline<Dc, R, L> {
        &self.pipeline
    }
}
