// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The boundary to the presentation layer.
//!
//! The engine never draws anything. For every assignment that becomes
//! eligible it asks a [`Presenter`] for a [`Presentation`], and it tells that
//! presentation when to re-align and when to go away. Geometry, anchoring and
//! animation all live behind these two traits.

use alloc::rc::Rc;
use core::fmt;

use kurbo::Rect;

use crate::target::{Region, Target};
use crate::tooltip::Tooltip;

/// Everything a [`Presenter`] needs to create one presentation.
#[derive(Clone)]
pub struct PresentRequest {
    /// The tooltip to present.
    pub tooltip: Rc<Tooltip>,
    /// What the tooltip points at.
    pub target: Target,
    /// Optional override of the gap between tooltip and target.
    pub spacing: Option<f64>,
    /// The providing feature's container, when it supplies one.
    pub container: Option<Rc<dyn Region>>,
}

impl fmt::Debug for PresentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentRequest")
            .field("tooltip", &self.tooltip.name())
            .field("target", &self.target)
            .field("spacing", &self.spacing)
            .field("container", &self.container.as_ref().map(|c| c.frame()))
            .finish()
    }
}

/// Presentation factory, supplied once when the [`Engine`](crate::Engine) is built.
///
/// Any `Fn(&PresentRequest) -> Rc<dyn Presentation>` closure is a presenter.
pub trait Presenter {
    /// Creates and attaches a presentation for `request`.
    fn create(&self, request: &PresentRequest) -> Rc<dyn Presentation>;
}

impl<F> Presenter for F
where
    F: Fn(&PresentRequest) -> Rc<dyn Presentation>,
{
    fn create(&self, request: &PresentRequest) -> Rc<dyn Presentation> {
        self(request)
    }
}

/// A live, on-screen tooltip created by a [`Presenter`].
///
/// The engine calls [`remove`](Self::remove) exactly once, when the
/// presentation's assignment leaves the desired set, and never calls
/// [`align`](Self::align) afterwards. Implementations should treat a call to
/// `align` on a detached presentation as a bug and panic.
pub trait Presentation {
    /// Detaches the presentation.
    fn remove(&self);

    /// Re-anchors the presentation against its target's current rectangle.
    fn align(&self, target_rect: Rect);

    /// Pauses idle animations, e.g. while the application is in the background.
    fn suspend_animations(&self) {}

    /// Resumes animations paused by [`suspend_animations`](Self::suspend_animations).
    fn resume_animations(&self) {}
}
