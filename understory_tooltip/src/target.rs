// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Targets a tooltip can point at, and rectangle resolution.

use alloc::rc::{Rc, Weak};
use core::cell::{Cell, RefCell};
use core::fmt;
use core::hash::{Hash, Hasher};

use kurbo::Rect;
use smallvec::SmallVec;

/// Anything with an on-screen frame: a view, a region, a container.
///
/// Frames are expressed in one shared reference coordinate space; see
/// [`Target::resolve_in`] for how a container re-bases them.
pub trait Region {
    /// Returns the current frame.
    fn frame(&self) -> Rect;
}

/// A rectangle recomputed on every layout pass.
///
/// Identity is the allocation: providers keep the same `Rc` across passes so
/// that their assignment stays equal from one pass to the next.
pub type DynamicRect = Rc<dyn Fn() -> Rect>;

type Listener = Rc<dyn Fn()>;

/// A dismiss-on-tap control.
///
/// Tooltips assigned to a control are invalidated automatically: tapping it
/// marks the tooltip (and its bundle) seen. The wiring is a tap listener held
/// by a [`TapSubscription`], which deregisters itself when dropped.
pub struct Control {
    frame: Cell<Rect>,
    listeners: RefCell<SmallVec<[(u64, Listener); 2]>>,
    next_listener: Cell<u64>,
}

impl Control {
    /// Creates a control occupying `frame`.
    #[must_use]
    pub fn new(frame: Rect) -> Self {
        Self {
            frame: Cell::new(frame),
            listeners: RefCell::new(SmallVec::new()),
            next_listener: Cell::new(0),
        }
    }

    /// Moves the control.
    pub fn set_frame(&self, frame: Rect) {
        self.frame.set(frame);
    }

    /// Registers `listener` to run on every [`tap`](Self::tap).
    ///
    /// The listener stays registered for as long as the returned subscription lives.
    #[must_use = "dropping the subscription deregisters the listener"]
    pub fn subscribe_tap(self: &Rc<Self>, listener: impl Fn() + 'static) -> TapSubscription {
        let id = self.next_listener.get();
        self.next_listener.set(id.wrapping_add(1));
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        TapSubscription {
            control: Rc::downgrade(self),
            id,
        }
    }

    /// Delivers a tap to every registered listener.
    ///
    /// Listeners may subscribe or unsubscribe while the tap is delivered; the
    /// set notified is the one registered when the tap started.
    pub fn tap(&self) {
        let listeners: SmallVec<[Listener; 2]> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener();
        }
    }

    /// Returns the number of registered tap listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl Region for Control {
    fn frame(&self) -> Rect {
        self.frame.get()
    }
}

impl fmt::Debug for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Control")
            .field("frame", &self.frame.get())
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

/// Keeps a tap listener registered on a [`Control`]; dropping it deregisters.
pub struct TapSubscription {
    control: Weak<Control>,
    id: u64,
}

impl Drop for TapSubscription {
    fn drop(&mut self) {
        if let Some(control) = self.control.upgrade() {
            control
                .listeners
                .borrow_mut()
                .retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for TapSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TapSubscription")
            .field("id", &self.id)
            .field("live", &(self.control.strong_count() > 0))
            .finish()
    }
}

/// What an assignment points a tooltip at.
///
/// Equality and hashing are by identity: controls, regions and dynamic
/// rectangles compare by allocation, static rectangles by their exact
/// coordinates. Controls and regions are held weakly; once released they
/// resolve to [`Rect::ZERO`].
#[derive(Clone)]
pub enum Target {
    /// A dismiss-on-tap control; assignments to it invalidate themselves.
    Control(Weak<Control>),
    /// An arbitrary view or region; invalidation is manual.
    Region(Weak<dyn Region>),
    /// A fixed rectangle.
    Rect(Rect),
    /// A rectangle recomputed on every layout pass.
    Dynamic(DynamicRect),
}

impl Target {
    /// Targets `control`.
    #[must_use]
    pub fn control(control: &Rc<Control>) -> Self {
        Self::Control(Rc::downgrade(control))
    }

    /// Targets `region`.
    #[must_use]
    pub fn region<R: Region + 'static>(region: &Rc<R>) -> Self {
        let region: Weak<R> = Rc::downgrade(region);
        Self::Region(region)
    }

    /// Targets a dynamic rectangle, keeping the caller's `Rc` identity.
    #[must_use]
    pub fn dynamic(rect: &DynamicRect) -> Self {
        Self::Dynamic(Rc::clone(rect))
    }

    /// Returns the control if this targets a live dismiss-on-tap control.
    #[must_use]
    pub fn as_control(&self) -> Option<Rc<Control>> {
        match self {
            Self::Control(control) => control.upgrade(),
            _ => None,
        }
    }

    /// Returns `true` for targets that invalidate their assignment on tap.
    #[must_use]
    pub fn is_dismiss_on_tap(&self) -> bool {
        matches!(self, Self::Control(_))
    }

    /// Resolves the target's current rectangle in the reference space.
    ///
    /// Released controls and regions resolve to [`Rect::ZERO`]. Dynamic
    /// rectangles are evaluated on every call.
    #[must_use]
    pub fn resolve(&self) -> Rect {
        match self {
            Self::Control(control) => control.upgrade().map_or(Rect::ZERO, |c| c.frame()),
            Self::Region(region) => region.upgrade().map_or(Rect::ZERO, |r| r.frame()),
            Self::Rect(rect) => *rect,
            Self::Dynamic(rect) => rect(),
        }
    }

    /// Resolves the target relative to the origin of `container`, if any.
    #[must_use]
    pub fn resolve_in(&self, container: Option<&dyn Region>) -> Rect {
        let rect = self.resolve();
        match container {
            Some(container) => rect - container.frame().origin().to_vec2(),
            None => rect,
        }
    }

    fn identity(&self) -> *const () {
        match self {
            Self::Control(control) => Weak::as_ptr(control).cast(),
            Self::Region(region) => Weak::as_ptr(region).cast(),
            Self::Dynamic(rect) => Rc::as_ptr(rect).cast(),
            Self::Rect(_) => core::ptr::null(),
        }
    }
}

fn rect_bits(rect: &Rect) -> [u64; 4] {
    [
        rect.x0.to_bits(),
        rect.y0.to_bits(),
        rect.x1.to_bits(),
        rect.y1.to_bits(),
    ]
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Rect(a), Self::Rect(b)) => rect_bits(a) == rect_bits(b),
            (Self::Control(_), Self::Control(_))
            | (Self::Region(_), Self::Region(_))
            | (Self::Dynamic(_), Self::Dynamic(_)) => self.identity() == other.identity(),
            _ => false,
        }
    }
}

impl Eq for Target {}

impl Hash for Target {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::Rect(rect) => rect_bits(rect).hash(state),
            _ => self.identity().hash(state),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Control(control) => f.debug_tuple("Control").field(&Weak::as_ptr(control)).finish(),
            Self::Region(region) => f
                .debug_tuple("Region")
                .field(&Weak::as_ptr(region).cast::<()>())
                .finish(),
            Self::Rect(rect) => f.debug_tuple("Rect").field(rect).finish(),
            Self::Dynamic(rect) => f
                .debug_tuple("Dynamic")
                .field(&Rc::as_ptr(rect).cast::<()>())
                .finish(),
        }
    }
}

impl From<Rect> for Target {
    fn from(rect: Rect) -> Self {
        Self::Rect(rect)
    }
}
