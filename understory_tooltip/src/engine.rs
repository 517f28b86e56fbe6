// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The reconciliation engine.
//!
//! An [`Engine`] owns the provider registry and the map of displayed
//! assignments. Mutations of its inputs (seen flags, provider membership)
//! raise [`Invalidation`] flags and enqueue a deferred [`Pass`]; the host runs
//! queued passes on its next turn with [`Engine::run_pending`].
//!
//! ## Passes
//!
//! - **Update**: poll every live provider, keep the assignments whose tooltip
//!   [`should_show`](Tooltip::should_show), diff them against the displayed
//!   set, remove what left, create what arrived, then run a layout.
//! - **Layout**: re-align every displayed presentation against its target's
//!   current rectangle.
//!
//! ## Coalescing
//!
//! At most one pass per flag is queued at a time. Any number of
//! [`set_needs_update`](Engine::set_needs_update) calls within one turn
//! therefore produce a single update pass.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use hashbrown::{HashMap, HashSet};

use crate::assignment::Assignment;
use crate::error::BuildError;
use crate::presentation::{Presentation, Presenter};
use crate::provision::{Provider, Provisioner};
use crate::registry::WeakRegistry;
use crate::store::{MemoryStore, SeenStore};
use crate::tooltip::Tooltip;

bitflags::bitflags! {
    /// Pending work of an [`Engine`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Invalidation: u8 {
        /// Providers must be re-polled and the displayed set re-diffed.
        const UPDATE = 0b0000_0001;
        /// Displayed presentations must be re-aligned.
        const LAYOUT = 0b0000_0010;
    }
}

/// A deferred unit of engine work.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Re-poll, re-diff, then lay out.
    Update,
    /// Re-align only.
    Layout,
}

impl Pass {
    /// Returns the flag this pass consumes.
    #[must_use]
    pub const fn flag(self) -> Invalidation {
        match self {
            Self::Update => Invalidation::UPDATE,
            Self::Layout => Invalidation::LAYOUT,
        }
    }
}

/// Counters describing the work an engine has done.
///
/// Counters wrap on overflow.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Update passes that ran.
    pub updates: u64,
    /// Layout passes that ran, including those run by update passes.
    pub layouts: u64,
    /// Presentations created.
    pub created: u64,
    /// Presentations removed.
    pub removed: u64,
}

/// Implemented by the engine's shared state; tooltips hold it weakly.
pub(crate) trait Invalidate {
    fn set_needs_update(&self);
}

struct Shared {
    presenter: Box<dyn Presenter>,
    store: Rc<dyn SeenStore>,
    on_schedule: Option<Box<dyn Fn()>>,
    providers: RefCell<WeakRegistry<dyn Provider>>,
    displayed: RefCell<HashMap<Assignment, Rc<dyn Presentation>>>,
    needs: Cell<Invalidation>,
    scheduled: Cell<Invalidation>,
    queue: RefCell<VecDeque<Pass>>,
    observing_foreground: Cell<bool>,
    stats: Cell<PassStats>,
}

impl Shared {
    fn raise(&self, flags: Invalidation) {
        self.needs.set(self.needs.get() | flags);
    }

    fn schedule(&self, pass: Pass) {
        let flag = pass.flag();
        let scheduled = self.scheduled.get();
        if scheduled.contains(flag) {
            tracing::trace!(?pass, "pass already scheduled");
            return;
        }
        self.scheduled.set(scheduled | flag);
        self.queue.borrow_mut().push_back(pass);
        tracing::trace!(?pass, "pass scheduled");
        if let Some(wake) = &self.on_schedule {
            wake();
        }
    }

    fn update_stats(&self, f: impl FnOnce(&mut PassStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl Invalidate for Shared {
    fn set_needs_update(&self) {
        self.raise(Invalidation::UPDATE | Invalidation::LAYOUT);
        self.schedule(Pass::Update);
    }
}

/// Process-wide tooltip coordinator, as an explicit context object.
///
/// `Engine` is a cheap handle: clones share the same state. It is
/// single-threaded (`!Send`, `!Sync`); callers on other threads must hop onto
/// the engine's thread first.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
///
/// use kurbo::Rect;
/// use understory_tooltip::{
///     Control, Engine, Presentation, PresentRequest, Provider, Provisioner, Tooltip,
/// };
///
/// struct Bubble;
/// impl Presentation for Bubble {
///     fn remove(&self) {}
///     fn align(&self, _target_rect: Rect) {}
/// }
///
/// struct Compose {
///     intro: Rc<Tooltip>,
///     send: Rc<Control>,
/// }
/// impl Provider for Compose {
///     fn provide(&self, tooltips: &mut Provisioner) {
///         tooltips.assign_to_control(&self.intro, &self.send);
///     }
/// }
///
/// let engine = Engine::new(|_: &PresentRequest| -> Rc<dyn Presentation> { Rc::new(Bubble) });
/// let intro = Tooltip::builder("compose.intro").build(&engine);
/// let send = Rc::new(Control::new(Rect::new(0.0, 0.0, 44.0, 44.0)));
/// let compose = Rc::new(Compose { intro: intro.clone(), send: send.clone() });
///
/// engine.add_provider(compose.clone());
/// engine.run_pending();
/// assert_eq!(engine.views_for_provider(&intro, &*compose).len(), 1);
///
/// // Tapping the control dismisses the tooltip for good.
/// send.tap();
/// engine.run_pending();
/// assert!(intro.is_seen());
/// assert!(engine.views_for_provider(&intro, &*compose).is_empty());
/// ```
#[derive(Clone)]
pub struct Engine {
    shared: Rc<Shared>,
}

impl Engine {
    /// Creates an engine with `presenter` and an in-memory seen store.
    pub fn new(presenter: impl Presenter + 'static) -> Self {
        Self::from_parts(Box::new(presenter), Rc::new(MemoryStore::new()), None)
    }

    /// Starts configuring an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    fn from_parts(
        presenter: Box<dyn Presenter>,
        store: Rc<dyn SeenStore>,
        on_schedule: Option<Box<dyn Fn()>>,
    ) -> Self {
        Self {
            shared: Rc::new(Shared {
                presenter,
                store,
                on_schedule,
                providers: RefCell::new(WeakRegistry::new()),
                displayed: RefCell::new(HashMap::new()),
                needs: Cell::new(Invalidation::empty()),
                scheduled: Cell::new(Invalidation::empty()),
                queue: RefCell::new(VecDeque::new()),
                observing_foreground: Cell::new(false),
                stats: Cell::new(PassStats::default()),
            }),
        }
    }

    pub(crate) fn store(&self) -> Rc<dyn SeenStore> {
        Rc::clone(&self.shared.store)
    }

    pub(crate) fn invalidator(&self) -> Weak<dyn Invalidate> {
        let shared: Weak<Shared> = Rc::downgrade(&self.shared);
        shared
    }

    // -------------------------------------------------------------------------
    // Inputs
    // -------------------------------------------------------------------------

    /// Registers `provider` and requests an update.
    ///
    /// The engine keeps only a weak reference; the caller keeps the provider alive.
    pub fn add_provider(&self, provider: Rc<dyn Provider>) {
        let added = self.shared.providers.borrow_mut().insert(&provider);
        tracing::debug!(added, "provider registered");
        self.set_needs_update();
    }

    /// Unregisters `provider` and requests an update.
    pub fn remove_provider(&self, provider: &(dyn Provider + 'static)) {
        let removed = self.shared.providers.borrow_mut().remove(provider);
        tracing::debug!(removed, "provider unregistered");
        self.set_needs_update();
    }

    /// Returns `true` if `provider` is registered and alive.
    #[must_use]
    pub fn contains_provider(&self, provider: &(dyn Provider + 'static)) -> bool {
        self.shared.providers.borrow().contains(provider)
    }

    /// Clears every persisted seen flag at once and requests an update.
    pub fn mark_all_as_unseen(&self) {
        self.shared.store.clear_all();
        tracing::debug!("all tooltips marked unseen");
        self.set_needs_update();
    }

    // -------------------------------------------------------------------------
    // Scheduling
    // -------------------------------------------------------------------------

    /// Requests an update pass (which also lays out) on the next turn.
    pub fn set_needs_update(&self) {
        self.shared.set_needs_update();
    }

    /// Requests a layout-only pass on the next turn.
    pub fn set_needs_layout(&self) {
        self.shared.raise(Invalidation::LAYOUT);
        self.shared.schedule(Pass::Layout);
    }

    /// Returns the flags not yet consumed by a pass.
    #[must_use]
    pub fn invalidation(&self) -> Invalidation {
        self.shared.needs.get()
    }

    /// Returns `true` if a pass is queued.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.shared.queue.borrow().is_empty()
    }

    /// Runs one turn: the passes queued before this call, in order.
    ///
    /// Passes scheduled while the turn runs wait for the next turn.
    /// Returns the number of passes that did work; a pass whose flag was
    /// already consumed is a no-op.
    pub fn run_pending(&self) -> usize {
        let turn = self.shared.queue.borrow().len();
        let mut ran = 0;
        for _ in 0..turn {
            let Some(pass) = self.shared.queue.borrow_mut().pop_front() else {
                break;
            };
            let scheduled = self.shared.scheduled.get();
            self.shared.scheduled.set(scheduled - pass.flag());
            if self.perform(pass) {
                ran += 1;
            }
        }
        ran
    }

    /// Runs turns until no pass is queued.
    ///
    /// Does not return if passes keep scheduling further passes.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.has_pending() {
            ran += self.run_pending();
        }
        ran
    }

    /// Runs `pass` synchronously. Returns `false` if its flag was not raised.
    pub fn perform(&self, pass: Pass) -> bool {
        match pass {
            Pass::Update => self.update_now(),
            Pass::Layout => self.layout_now(),
        }
    }

    /// Runs the update pass now if an update is needed.
    pub fn update_now(&self) -> bool {
        let needs = self.shared.needs.get();
        if !needs.contains(Invalidation::UPDATE) {
            return false;
        }
        self.shared.needs.set(needs - Invalidation::UPDATE);
        self.update();
        true
    }

    /// Runs the layout pass now if a layout is needed.
    pub fn layout_now(&self) -> bool {
        let needs = self.shared.needs.get();
        if !needs.contains(Invalidation::LAYOUT) {
            return false;
        }
        self.shared.needs.set(needs - Invalidation::LAYOUT);
        self.layout();
        true
    }

    // -------------------------------------------------------------------------
    // Passes
    // -------------------------------------------------------------------------

    fn update(&self) {
        let providers: Vec<Rc<dyn Provider>> = self.shared.providers.borrow().iter().collect();

        let mut candidates = 0_usize;
        let mut desired: HashSet<Assignment> = HashSet::new();
        for provider in &providers {
            let mut provisioner = Provisioner::new(provider);
            provider.provide(&mut provisioner);
            for assignment in provisioner.into_pending() {
                candidates += 1;
                if assignment.tooltip().should_show() {
                    desired.insert(assignment);
                }
            }
        }
        let kept = desired.len();

        let mut stale: Vec<Rc<dyn Presentation>> = Vec::new();
        let fresh: Vec<Assignment> = {
            let mut displayed = self.shared.displayed.borrow_mut();
            displayed.retain(|assignment, presentation| {
                let keep = desired.contains(assignment);
                if !keep {
                    stale.push(Rc::clone(presentation));
                }
                keep
            });
            desired
                .into_iter()
                .filter(|assignment| !displayed.contains_key(assignment))
                .collect()
        };

        for presentation in &stale {
            presentation.remove();
        }
        for assignment in &fresh {
            let presentation = self.shared.presenter.create(&assignment.request());
            self.shared
                .displayed
                .borrow_mut()
                .insert(assignment.clone(), presentation);
        }

        let created = fresh.len();
        let removed = stale.len();
        self.shared.update_stats(|stats| {
            stats.updates = stats.updates.wrapping_add(1);
            stats.created = stats.created.wrapping_add(created as u64);
            stats.removed = stats.removed.wrapping_add(removed as u64);
        });
        tracing::debug!(
            providers = providers.len(),
            candidates,
            kept,
            created,
            removed,
            "tooltip update pass"
        );

        self.shared.raise(Invalidation::LAYOUT);
        self.layout_now();
        for presentation in self.presentations() {
            presentation.resume_animations();
        }
        if !self.shared.observing_foreground.replace(true) {
            tracing::debug!("foreground observer installed");
        }
    }

    fn layout(&self) {
        let displayed: Vec<(Assignment, Rc<dyn Presentation>)> = self
            .shared
            .displayed
            .borrow()
            .iter()
            .map(|(assignment, presentation)| (assignment.clone(), Rc::clone(presentation)))
            .collect();
        for (assignment, presentation) in &displayed {
            presentation.align(assignment.target_rect());
        }
        self.shared.update_stats(|stats| {
            stats.layouts = stats.layouts.wrapping_add(1);
        });
        tracing::trace!(displayed = displayed.len(), "tooltip layout pass");
    }

    fn presentations(&self) -> Vec<Rc<dyn Presentation>> {
        self.shared.displayed.borrow().values().cloned().collect()
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Returns the live presentations of `tooltip` created for `provider`.
    #[must_use]
    pub fn views_for_provider(
        &self,
        tooltip: &Tooltip,
        provider: &(dyn Provider + 'static),
    ) -> Vec<Rc<dyn Presentation>> {
        self.shared
            .displayed
            .borrow()
            .iter()
            .filter(|(assignment, _)| **assignment.tooltip() == *tooltip && assignment.is_from(provider))
            .map(|(_, presentation)| Rc::clone(presentation))
            .collect()
    }

    /// Returns the currently displayed assignments, in no particular order.
    #[must_use]
    pub fn displayed(&self) -> Vec<Assignment> {
        self.shared.displayed.borrow().keys().cloned().collect()
    }

    /// Returns the work counters.
    #[must_use]
    pub fn stats(&self) -> PassStats {
        self.shared.stats.get()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Suspends animations of every displayed presentation.
    pub fn did_enter_background(&self) {
        for presentation in self.presentations() {
            presentation.suspend_animations();
        }
    }

    /// Resumes animations, once the first update pass has installed the observer.
    pub fn will_enter_foreground(&self) {
        if !self.shared.observing_foreground.get() {
            return;
        }
        for presentation in self.presentations() {
            presentation.resume_animations();
        }
    }

    /// Removes every displayed presentation and drops all pending work.
    ///
    /// Providers stay registered; the next [`set_needs_update`](Self::set_needs_update)
    /// brings their tooltips back.
    pub fn shutdown(&self) {
        let displayed: Vec<Rc<dyn Presentation>> = self
            .shared
            .displayed
            .borrow_mut()
            .drain()
            .map(|(_, presentation)| presentation)
            .collect();
        for presentation in &displayed {
            presentation.remove();
        }
        self.shared.queue.borrow_mut().clear();
        self.shared.needs.set(Invalidation::empty());
        self.shared.scheduled.set(Invalidation::empty());
        let removed = displayed.len();
        self.shared.update_stats(|stats| {
            stats.removed = stats.removed.wrapping_add(removed as u64);
        });
        tracing::debug!(removed, "tooltip engine shut down");
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("providers", &self.shared.providers.borrow().len())
            .field("displayed", &self.shared.displayed.borrow().len())
            .field("invalidation", &self.shared.needs.get())
            .field("queue", &self.shared.queue.borrow())
            .field("stats", &self.shared.stats.get())
            .finish_non_exhaustive()
    }
}

/// Configures an [`Engine`].
///
/// A presenter is required; the store defaults to a [`MemoryStore`].
#[derive(Default)]
pub struct EngineBuilder {
    presenter: Option<Box<dyn Presenter>>,
    store: Option<Rc<dyn SeenStore>>,
    on_schedule: Option<Box<dyn Fn()>>,
}

impl EngineBuilder {
    /// Sets the presentation factory.
    #[must_use]
    pub fn presenter(mut self, presenter: impl Presenter + 'static) -> Self {
        self.presenter = Some(Box::new(presenter));
        self
    }

    /// Sets the seen-flag store shared by every tooltip of the engine.
    #[must_use]
    pub fn store<S: SeenStore + 'static>(mut self, store: Rc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets a callback run whenever a pass is queued.
    ///
    /// Hosts use it to wake their event loop so that it calls
    /// [`Engine::run_pending`] on its next turn. The callback must not run
    /// the pass inline.
    #[must_use]
    pub fn on_schedule(mut self, wake: impl Fn() + 'static) -> Self {
        self.on_schedule = Some(Box::new(wake));
        self
    }

    /// Builds the engine.
    ///
    /// Fails with [`BuildError::MissingPresenter`] if no presenter was set.
    pub fn build(self) -> Result<Engine, BuildError> {
        let presenter = self.presenter.ok_or(BuildError::MissingPresenter)?;
        let store: Rc<dyn SeenStore> = match self.store {
            Some(store) => store,
            None => Rc::new(MemoryStore::new()),
        };
        Ok(Engine::from_parts(presenter, store, self.on_schedule))
    }
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("presenter", &self.presenter.is_some())
            .field("store", &self.store.is_some())
            .field("on_schedule", &self.on_schedule.is_some())
            .finish()
    }
}
