// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Assignments: one tooltip, for one provider, at one target.

use alloc::rc::{Rc, Weak};
use core::fmt;
use core::hash::{Hash, Hasher};

use kurbo::Rect;

use crate::presentation::PresentRequest;
use crate::provision::Provider;
use crate::target::{Region, TapSubscription, Target};
use crate::tooltip::Tooltip;

struct Inner {
    tooltip: Rc<Tooltip>,
    provider: Weak<dyn Provider>,
    target: Target,
    spacing: Option<f64>,
    container: Option<Weak<dyn Region>>,
    /// Held for its `Drop`: deregisters the auto-invalidation listener.
    _tap: Option<TapSubscription>,
}

/// A declared binding of a tooltip to a provider and a target.
///
/// Assignments are created by a [`Provisioner`](crate::Provisioner) every time
/// the engine polls a provider. They are cheap to clone; clones share one
/// allocation.
///
/// # Identity
///
/// Two assignments are equal iff they name the same tooltip (by name), the
/// same provider (by allocation) and the same target (see [`Target`]). The
/// spacing override and container are not part of identity, so an assignment
/// that stays displayed keeps the spacing it was first created with.
///
/// # Auto-invalidation
///
/// When the target is a [`Control`](crate::Control), constructing the
/// assignment subscribes to its taps: a tap marks the tooltip (and its bundle)
/// seen. The subscription is released with the last clone of the assignment.
#[derive(Clone)]
pub struct Assignment {
    inner: Rc<Inner>,
}

impl Assignment {
    pub(crate) fn new(
        tooltip: &Rc<Tooltip>,
        provider: Weak<dyn Provider>,
        target: Target,
        spacing: Option<f64>,
        container: Option<Weak<dyn Region>>,
    ) -> Self {
        let tap = target.as_control().map(|control| {
            let tooltip = Rc::downgrade(tooltip);
            control.subscribe_tap(move || {
                if let Some(tooltip) = tooltip.upgrade() {
                    tooltip.mark_as_seen();
                }
            })
        });
        Self {
            inner: Rc::new(Inner {
                tooltip: Rc::clone(tooltip),
                provider,
                target,
                spacing,
                container,
                _tap: tap,
            }),
        }
    }

    /// Returns the assigned tooltip.
    #[must_use]
    pub fn tooltip(&self) -> &Rc<Tooltip> {
        &self.inner.tooltip
    }

    /// Returns the provider that declared this assignment, if it is still alive.
    #[must_use]
    pub fn provider(&self) -> Option<Rc<dyn Provider>> {
        self.inner.provider.upgrade()
    }

    /// Returns `true` if `provider` declared this assignment.
    #[must_use]
    pub fn is_from(&self, provider: &(dyn Provider + 'static)) -> bool {
        core::ptr::addr_eq(
            Weak::as_ptr(&self.inner.provider),
            provider as *const dyn Provider,
        )
    }

    /// Returns the target.
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.inner.target
    }

    /// Returns the spacing override.
    #[must_use]
    pub fn spacing(&self) -> Option<f64> {
        self.inner.spacing
    }

    /// Returns the provider's container, if it supplied one and it is alive.
    #[must_use]
    pub fn container(&self) -> Option<Rc<dyn Region>> {
        self.inner.container.as_ref().and_then(Weak::upgrade)
    }

    /// Resolves the target's current rectangle, relative to the container if any.
    #[must_use]
    pub fn target_rect(&self) -> Rect {
        let container = self.container();
        self.inner.target.resolve_in(container.as_deref())
    }

    /// Marks the tooltip (and its bundle) seen.
    ///
    /// This is the manual invalidation path for targets that are not
    /// dismiss-on-tap controls.
    pub fn invalidate(&self) {
        self.inner.tooltip.mark_as_seen();
    }

    pub(crate) fn request(&self) -> PresentRequest {
        PresentRequest {
            tooltip: Rc::clone(&self.inner.tooltip),
            target: self.inner.target.clone(),
            spacing: self.inner.spacing,
            container: self.container(),
        }
    }

    fn provider_addr(&self) -> *const () {
        Weak::as_ptr(&self.inner.provider).cast()
    }
}

impl PartialEq for Assignment {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
            || (self.provider_addr() == other.provider_addr()
                && self.inner.tooltip == other.inner.tooltip
                && self.inner.target == other.inner.target)
    }
}

impl Eq for Assignment {}

impl Hash for Assignment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.tooltip.hash(state);
        self.provider_addr().hash(state);
        self.inner.target.hash(state);
    }
}

impl fmt::Debug for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assignment")
            .field("tooltip", &self.inner.tooltip.name())
            .field("provider", &self.provider_addr())
            .field("target", &self.inner.target)
            .field("spacing", &self.inner.spacing)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Engine;
    use crate::provision::Provisioner;
    use crate::target::Control;
    use crate::testing::{Recorder, Wants};
    use hashbrown::HashSet;

    #[test]
    fn identity_ignores_spacing() {
        let engine = Engine::new(Recorder::default());
        let tooltip = Tooltip::builder("a").build(&engine);
        let provider: Rc<dyn Provider> = Rc::new(Wants::default());
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);

        let mut provisioner = Provisioner::new(&provider);
        let first = provisioner.assign(&tooltip, Target::Rect(rect), Some(4.0));
        let second = provisioner.assign(&tooltip, Target::Rect(rect), None);
        assert_eq!(first, second);

        let set: HashSet<Assignment> = [first, second].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn identity_distinguishes_each_component() {
        let engine = Engine::new(Recorder::default());
        let a = Tooltip::builder("a").build(&engine);
        let b = Tooltip::builder("b").build(&engine);
        let p: Rc<dyn Provider> = Rc::new(Wants::default());
        let q: Rc<dyn Provider> = Rc::new(Wants::default());
        let here = Target::Rect(Rect::new(0.0, 0.0, 1.0, 1.0));
        let there = Target::Rect(Rect::new(5.0, 5.0, 6.0, 6.0));

        let base = Provisioner::new(&p).assign(&a, here.clone(), None);
        assert_ne!(base, Provisioner::new(&p).assign(&b, here.clone(), None));
        assert_ne!(base, Provisioner::new(&q).assign(&a, here.clone(), None));
        assert_ne!(base, Provisioner::new(&p).assign(&a, there, None));
        assert_eq!(base, Provisioner::new(&p).assign(&a, here, None));
        assert!(base.is_from(&*p));
        assert!(!base.is_from(&*q));
    }

    #[test]
    fn control_wiring_follows_assignment_lifetime() {
        let engine = Engine::new(Recorder::default());
        let tooltip = Tooltip::builder("a").build(&engine);
        let provider: Rc<dyn Provider> = Rc::new(Wants::default());
        let control = Rc::new(Control::new(Rect::new(0.0, 0.0, 44.0, 44.0)));

        let assignment =
            Provisioner::new(&provider).assign_to_control(&tooltip, &control);
        let clone = assignment.clone();
        assert_eq!(control.listener_count(), 1);

        drop(assignment);
        assert_eq!(control.listener_count(), 1, "a clone still holds the wiring");

        control.tap();
        assert!(tooltip.is_seen());

        drop(clone);
        assert_eq!(control.listener_count(), 0);
    }

    #[test]
    fn manual_invalidation_marks_bundle() {
        let engine = Engine::new(Recorder::default());
        let partner = Tooltip::builder("partner").build(&engine);
        let tooltip = Tooltip::builder("a").bundle_with([&partner]).build(&engine);
        let provider: Rc<dyn Provider> = Rc::new(Wants::default());

        let assignment =
            Provisioner::new(&provider).assign_to_rect(&tooltip, Rect::new(0.0, 0.0, 1.0, 1.0));
        assignment.invalidate();
        assert!(tooltip.is_seen());
        assert!(partner.is_seen());
    }
}
