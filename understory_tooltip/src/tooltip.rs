// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tooltips, their dependency graph, and the seen/unseen state machine.
//!
//! A tooltip is identified by its name, which is also its key in the
//! [`SeenStore`]. Two kinds of edges relate tooltips:
//!
//! - **`show_after`**: prerequisites. A tooltip is only eligible once every
//!   prerequisite has been seen.
//! - **`bundle_with`**: an equivalence class. Marking one member seen or
//!   unseen marks every member.
//!
//! Both edge sets are [`WeakRegistry`]s, so an edge never keeps the tooltip
//! at its far end alive.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::hash::{Hash, Hasher};

use crate::engine::{Engine, Invalidate};
use crate::registry::WeakRegistry;
use crate::store::SeenStore;

/// A named, persistently tracked hint.
///
/// Tooltips are created with [`Tooltip::builder`] and shared as `Rc<Tooltip>`.
/// Equality and hashing use the name only.
///
/// # Eligibility
///
/// [`should_show`](Self::should_show) is `true` iff the tooltip is unseen and
/// every `show_after` prerequisite is seen. Whether it is actually displayed
/// also depends on some provider asking for it.
pub struct Tooltip {
    name: Box<str>,
    show_after: RefCell<WeakRegistry<Self>>,
    bundle_with: RefCell<WeakRegistry<Self>>,
    store: Rc<dyn SeenStore>,
    invalidator: Weak<dyn Invalidate>,
}

impl Tooltip {
    /// Starts building a tooltip named `name`.
    #[must_use]
    pub fn builder(name: impl Into<Box<str>>) -> TooltipBuilder {
        TooltipBuilder {
            name: name.into(),
            show_after: Vec::new(),
            bundle_with: Vec::new(),
        }
    }

    /// Returns the name, which doubles as the persistence key.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the seen flag is set in the store.
    #[must_use]
    pub fn is_seen(&self) -> bool {
        self.store.get(&self.name).unwrap_or(false)
    }

    /// Returns `true` if this tooltip is unseen and all its prerequisites are seen.
    ///
    /// Stops at the first unseen prerequisite.
    #[must_use]
    pub fn should_show(&self) -> bool {
        if self.is_seen() {
            return false;
        }
        self.show_after.borrow().iter().all(|before| before.is_seen())
    }

    /// Marks this tooltip and every bundle member seen, then requests an update.
    pub fn mark_as_seen(&self) {
        self.store.set(&self.name, true);
        for member in self.bundle_with() {
            self.store.set(&member.name, true);
        }
        tracing::debug!(tooltip = %self.name, "marked seen");
        self.invalidate();
    }

    /// Clears the seen flag of this tooltip and every bundle member, then requests an update.
    pub fn mark_as_unseen(&self) {
        self.store.clear(&self.name);
        for member in self.bundle_with() {
            self.store.clear(&member.name);
        }
        tracing::debug!(tooltip = %self.name, "marked unseen");
        self.invalidate();
    }

    /// Returns the live prerequisites.
    #[must_use]
    pub fn show_after(&self) -> Vec<Rc<Self>> {
        self.show_after.borrow().iter().collect()
    }

    /// Replaces the prerequisites and requests an update.
    pub fn set_show_after<'a>(&self, tooltips: impl IntoIterator<Item = &'a Rc<Self>>) {
        *self.show_after.borrow_mut() = tooltips.into_iter().cloned().collect();
        self.invalidate();
    }

    /// Returns the live bundle members, excluding this tooltip.
    #[must_use]
    pub fn bundle_with(&self) -> Vec<Rc<Self>> {
        self.bundle_with.borrow().iter().collect()
    }

    /// Replaces the bundle members of this tooltip only, then requests an update.
    ///
    /// Unlike [`TooltipBuilder::bundle_with`], this does not rebuild the
    /// equivalence class: the new members do not learn about this tooltip or
    /// about each other. Marking this tooltip seen still marks every listed
    /// member, but marking a member seen only reaches the members *it* lists.
    pub fn set_bundle_with<'a>(&self, tooltips: impl IntoIterator<Item = &'a Rc<Self>>) {
        *self.bundle_with.borrow_mut() = tooltips
            .into_iter()
            .filter(|member| ***member != *self)
            .cloned()
            .collect();
        self.invalidate();
    }

    fn invalidate(&self) {
        if let Some(engine) = self.invalidator.upgrade() {
            engine.set_needs_update();
        }
    }
}

impl PartialEq for Tooltip {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Tooltip {}

impl Hash for Tooltip {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for Tooltip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tooltip")
            .field("name", &self.name)
            .field("seen", &self.is_seen())
            .field("show_after", &self.show_after.borrow().len())
            .field("bundle_with", &self.bundle_with.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Tooltip`].
///
/// ```
/// use understory_tooltip::{Engine, Tooltip};
/// # use understory_tooltip::{Presentation, PresentRequest};
/// # use std::rc::Rc;
/// # struct Nothing;
/// # impl Presentation for Nothing {
/// #     fn remove(&self) {}
/// #     fn align(&self, _: kurbo::Rect) {}
/// # }
/// # let engine = Engine::new(|_: &PresentRequest| -> Rc<dyn Presentation> { Rc::new(Nothing) });
///
/// let compose = Tooltip::builder("compose").build(&engine);
/// let send = Tooltip::builder("send").show_after([&compose]).build(&engine);
///
/// assert!(compose.should_show());
/// assert!(!send.should_show(), "waits for its prerequisite");
///
/// compose.mark_as_seen();
/// assert!(send.should_show());
/// ```
#[derive(Debug)]
pub struct TooltipBuilder {
    name: Box<str>,
    show_after: Vec<Rc<Tooltip>>,
    bundle_with: Vec<Rc<Tooltip>>,
}

impl TooltipBuilder {
    /// Adds prerequisites that must all be seen before this tooltip is eligible.
    #[must_use]
    pub fn show_after<'a>(mut self, tooltips: impl IntoIterator<Item = &'a Rc<Tooltip>>) -> Self {
        self.show_after.extend(tooltips.into_iter().cloned());
        self
    }

    /// Adds tooltips that are marked seen and unseen together with this one.
    ///
    /// At [`build`](Self::build) time the new tooltip and every listed member
    /// are linked into a complete graph: each of them lists all the others.
    #[must_use]
    pub fn bundle_with<'a>(mut self, tooltips: impl IntoIterator<Item = &'a Rc<Tooltip>>) -> Self {
        self.bundle_with.extend(tooltips.into_iter().cloned());
        self
    }

    /// Creates the tooltip, sharing `engine`'s store and invalidation.
    pub fn build(self, engine: &Engine) -> Rc<Tooltip> {
        let bundle: Vec<Rc<Tooltip>> = self
            .bundle_with
            .into_iter()
            .filter(|member| *member.name != *self.name)
            .collect();
        let tooltip = Rc::new(Tooltip {
            name: self.name,
            show_after: RefCell::new(self.show_after.into_iter().collect()),
            bundle_with: RefCell::new(bundle.iter().cloned().collect()),
            store: engine.store(),
            invalidator: engine.invalidator(),
        });
        for member in &bundle {
            let mut edges = member.bundle_with.borrow_mut();
            for other in &bundle {
                if other != member {
                    edges.insert(other);
                }
            }
            edges.insert(&tooltip);
        }
        tooltip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Recorder;

    fn engine() -> Engine {
        Engine::new(Recorder::default())
    }

    fn names(tooltips: &[Rc<Tooltip>]) -> Vec<&str> {
        let mut names: Vec<&str> = tooltips.iter().map(|t| t.name()).collect();
        names.sort_unstable();
        names
    }

    #[test]
    fn should_show_truth_table() {
        let engine = engine();
        let a = Tooltip::builder("a").build(&engine);
        let b = Tooltip::builder("b").build(&engine);
        let c = Tooltip::builder("c").show_after([&a, &b]).build(&engine);

        assert!(!c.should_show(), "both prerequisites unseen");
        a.mark_as_seen();
        assert!(!c.should_show(), "one prerequisite unseen");
        b.mark_as_seen();
        assert!(c.should_show());

        c.mark_as_seen();
        assert!(!c.should_show(), "seen tooltips never show");
        a.mark_as_unseen();
        assert!(!c.should_show());
    }

    #[test]
    fn bundle_closure_is_a_clique() {
        let engine = engine();
        let b1 = Tooltip::builder("b1").build(&engine);
        let b2 = Tooltip::builder("b2").build(&engine);
        let b3 = Tooltip::builder("b3").build(&engine);
        let t = Tooltip::builder("t")
            .bundle_with([&b1, &b2, &b3])
            .build(&engine);

        assert_eq!(names(&t.bundle_with()), ["b1", "b2", "b3"]);
        assert_eq!(names(&b1.bundle_with()), ["b2", "b3", "t"]);
        assert_eq!(names(&b2.bundle_with()), ["b1", "b3", "t"]);
        assert_eq!(names(&b3.bundle_with()), ["b1", "b2", "t"]);
    }

    #[test]
    fn bundle_marks_together() {
        let engine = engine();
        let y = Tooltip::builder("y").build(&engine);
        let x = Tooltip::builder("x").bundle_with([&y]).build(&engine);

        x.mark_as_seen();
        assert!(x.is_seen() && y.is_seen());

        x.mark_as_unseen();
        assert!(!x.is_seen() && !y.is_seen());

        y.mark_as_seen();
        assert!(x.is_seen(), "closure makes the bundle symmetric");

        engine.mark_all_as_unseen();
        assert!(!x.is_seen() && !y.is_seen());
    }

    #[test]
    fn edges_do_not_keep_tooltips_alive() {
        let engine = engine();
        let a = Tooltip::builder("a").build(&engine);
        let b = Tooltip::builder("b").show_after([&a]).bundle_with([&a]).build(&engine);
        let weak = Rc::downgrade(&a);
        drop(a);

        assert!(weak.upgrade().is_none());
        assert!(b.show_after().is_empty());
        assert!(b.bundle_with().is_empty());
        assert!(b.should_show(), "released prerequisites no longer block");
    }

    #[test]
    fn setter_does_not_repropagate() {
        let engine = engine();
        let a = Tooltip::builder("a").build(&engine);
        let b = Tooltip::builder("b").build(&engine);
        a.set_bundle_with([&b, &a]);

        assert_eq!(names(&a.bundle_with()), ["b"]);
        assert!(b.bundle_with().is_empty());

        a.mark_as_seen();
        assert!(b.is_seen());
        a.mark_as_unseen();
        b.mark_as_seen();
        assert!(!a.is_seen());
    }

    #[test]
    fn mutations_request_an_update() {
        let engine = engine();
        let a = Tooltip::builder("a").build(&engine);
        engine.run_until_idle();
        assert!(!engine.has_pending());

        a.mark_as_seen();
        assert!(engine.has_pending());
        engine.run_until_idle();

        let none: [&Rc<Tooltip>; 0] = [];
        a.set_show_after(none);
        assert!(engine.has_pending());
    }

    #[test]
    fn equality_is_by_name() {
        let engine = engine();
        let a = Tooltip::builder("same").build(&engine);
        let b = Tooltip::builder("same").build(&engine);
        assert_eq!(*a, *b);
        b.mark_as_seen();
        assert!(a.is_seen(), "same name, same persisted flag");
    }
}
