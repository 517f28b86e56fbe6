// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Providers and the per-pass provisioning surface.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::fmt;
use core::hash::{Hash, Hasher};

use kurbo::Rect;

use crate::assignment::Assignment;
use crate::target::{Control, DynamicRect, Region, Target};
use crate::tooltip::Tooltip;

/// A feature module that declares which tooltips it wants shown, and where.
///
/// The engine holds providers weakly: a provider stays registered only while
/// something else owns it. Providers compare by allocation, so the same
/// provider registered twice is registered once.
pub trait Provider {
    /// The region tooltips of this provider are placed in.
    ///
    /// Target rectangles are re-based onto its origin before alignment.
    /// Defaults to no container (the reference space itself).
    fn container(&self) -> Option<Rc<dyn Region>> {
        None
    }

    /// Declares the assignments this provider wants right now.
    ///
    /// Called on every update pass. All assignments must be made synchronously
    /// through `tooltips` before returning.
    fn provide(&self, tooltips: &mut Provisioner);
}

impl PartialEq for dyn Provider {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::addr_eq(self as *const Self, other as *const Self)
    }
}

impl Eq for dyn Provider {}

impl Hash for dyn Provider {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self as *const Self).cast::<()>().hash(state);
    }
}

impl fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Provider")
            .field(&(self as *const Self).cast::<()>())
            .finish()
    }
}

/// Accumulates the assignments of one provider during one update pass.
///
/// Every `assign*` call appends one [`Assignment`] and returns a handle to it.
/// Keep the handle to invalidate manually later, or drop a pending assignment
/// again before the pass ends with [`retract`](Self::retract).
pub struct Provisioner {
    provider: Weak<dyn Provider>,
    container: Option<Weak<dyn Region>>,
    pending: Vec<Assignment>,
}

impl Provisioner {
    /// Starts an empty provisioning pass on behalf of `provider`.
    ///
    /// The provider's [`container`](Provider::container) is sampled once, here.
    #[must_use]
    pub fn new(provider: &Rc<dyn Provider>) -> Self {
        Self {
            provider: Rc::downgrade(provider),
            container: provider.container().as_ref().map(Rc::downgrade),
            pending: Vec::new(),
        }
    }

    /// Assigns `tooltip` to `target` with an optional spacing override.
    pub fn assign(
        &mut self,
        tooltip: &Rc<Tooltip>,
        target: Target,
        spacing: Option<f64>,
    ) -> Assignment {
        let assignment = Assignment::new(
            tooltip,
            Weak::clone(&self.provider),
            target,
            spacing,
            self.container.clone(),
        );
        self.pending.push(assignment.clone());
        assignment
    }

    /// Assigns `tooltip` to a dismiss-on-tap control.
    pub fn assign_to_control(&mut self, tooltip: &Rc<Tooltip>, control: &Rc<Control>) -> Assignment {
        self.assign(tooltip, Target::control(control), None)
    }

    /// Assigns `tooltip` to a view or region; invalidation is up to the caller.
    pub fn assign_to_region<R: Region + 'static>(
        &mut self,
        tooltip: &Rc<Tooltip>,
        region: &Rc<R>,
    ) -> Assignment {
        self.assign(tooltip, Target::region(region), None)
    }

    /// Assigns `tooltip` to a fixed rectangle.
    pub fn assign_to_rect(&mut self, tooltip: &Rc<Tooltip>, rect: Rect) -> Assignment {
        self.assign(tooltip, Target::Rect(rect), None)
    }

    /// Assigns `tooltip` to a rectangle recomputed on every layout pass.
    pub fn assign_to_dynamic_rect(&mut self, tooltip: &Rc<Tooltip>, rect: &DynamicRect) -> Assignment {
        self.assign(tooltip, Target::dynamic(rect), None)
    }

    /// Drops every pending assignment of `tooltip`, returning how many were dropped.
    pub fn retract(&mut self, tooltip: &Tooltip) -> usize {
        let before = self.pending.len();
        self.pending.retain(|assignment| **assignment.tooltip() != *tooltip);
        before - self.pending.len()
    }

    /// Returns the assignments made so far in this pass.
    #[must_use]
    pub fn pending(&self) -> &[Assignment] {
        &self.pending
    }

    pub(crate) fn into_pending(self) -> Vec<Assignment> {
        self.pending
    }
}

impl fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner")
            .field("provider", &Weak::as_ptr(&self.provider).cast::<()>())
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
