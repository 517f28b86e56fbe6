// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Tooltip: declarative reconciliation of onboarding tooltips.
//!
//! Feature modules ([`Provider`]s) declare which [`Tooltip`]s they would like
//! shown and where. The [`Engine`] periodically polls them, filters the
//! declarations by each tooltip's persisted seen state and its dependency
//! graph, and diffs the result against what is on screen. Only the
//! difference reaches the presentation layer: a [`Presentation`] is created
//! for each newly eligible assignment and removed for each one that left.
//!
//! - **Tooltips** ([`Tooltip`], [`TooltipBuilder`]): named hints with
//!   `show_after` prerequisites and `bundle_with` equivalence classes.
//! - **Seen state** ([`SeenStore`], [`MemoryStore`]): a flag per tooltip name.
//! - **Targets** ([`Target`], [`Control`], [`Region`]): what a tooltip points
//!   at. Assignments to a [`Control`] dismiss themselves when it is tapped.
//! - **Provisioning** ([`Provider`], [`Provisioner`], [`Assignment`]): the
//!   per-pass declaration surface.
//! - **Weak sets** ([`WeakRegistry`]): identity sets that never keep their
//!   members alive; used for providers and tooltip edges.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use kurbo::Rect;
//! use understory_tooltip::{Engine, Presentation, PresentRequest, Provider, Provisioner, Tooltip};
//!
//! struct Bubble;
//! impl Presentation for Bubble {
//!     fn remove(&self) {}
//!     fn align(&self, _target_rect: Rect) {}
//! }
//!
//! struct Sidebar {
//!     welcome: Rc<Tooltip>,
//!     search: Rc<Tooltip>,
//! }
//! impl Provider for Sidebar {
//!     fn provide(&self, tooltips: &mut Provisioner) {
//!         tooltips.assign_to_rect(&self.welcome, Rect::new(0.0, 0.0, 200.0, 40.0));
//!         tooltips.assign_to_rect(&self.search, Rect::new(0.0, 40.0, 200.0, 80.0));
//!     }
//! }
//!
//! let engine = Engine::new(|_: &PresentRequest| -> Rc<dyn Presentation> { Rc::new(Bubble) });
//! let welcome = Tooltip::builder("sidebar.welcome").build(&engine);
//! let search = Tooltip::builder("sidebar.search")
//!     .show_after([&welcome])
//!     .build(&engine);
//!
//! let sidebar = Rc::new(Sidebar { welcome: welcome.clone(), search: search.clone() });
//! engine.add_provider(sidebar.clone());
//!
//! // Passes are deferred; the host runs them on its next turn.
//! engine.run_pending();
//! assert_eq!(engine.displayed().len(), 1, "search waits for welcome");
//!
//! welcome.mark_as_seen();
//! engine.run_pending();
//! let shown = engine.displayed();
//! assert_eq!(shown.len(), 1);
//! assert_eq!(shown[0].tooltip().name(), "sidebar.search");
//! ```
//!
//! ## Scheduling
//!
//! Every input mutation (a seen flag flips, a provider is added or removed, a
//! dependency edge changes) raises [`Invalidation::UPDATE`] and queues at
//! most one [`Pass::Update`]. Geometry-only changes call
//! [`Engine::set_needs_layout`]. Hosts drive the queue from their event loop
//! with [`Engine::run_pending`], typically woken through
//! [`EngineBuilder::on_schedule`].
//!
//! ## Threading
//!
//! Everything here is single-threaded and uses `Rc`. Work from other threads
//! must be marshalled onto the engine's thread by the host.
//!
//! ## Logging
//!
//! The crate emits [`tracing`](https://docs.rs/tracing) events: `debug` for
//! pass summaries and seen-state changes, `trace` for scheduling, `warn` for
//! persistence failures. Install a subscriber in the host to see them.
//!
//! ## Features
//!
//! - `std` (default): forwards to Kurbo's `std` feature.
//! - `libm`: forwards to Kurbo's `libm` feature for `no_std` builds.
//! - `persistence`: adds [`FileStore`], a JSON-file-backed [`SeenStore`].
//!
//! This crate is `no_std` and uses `alloc` unless `persistence` is enabled.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod assignment;
mod engine;
mod error;
#[cfg(feature = "persistence")]
mod file_store;
mod presentation;
mod provision;
mod registry;
mod store;
mod target;
#[cfg(test)]
mod testing;
mod tooltip;

pub use assignment::Assignment;
pub use engine::{Engine, EngineBuilder, Invalidation, Pass, PassStats};
pub use error::BuildError;
#[cfg(feature = "persistence")]
pub use error::StoreError;
#[cfg(feature = "persistence")]
pub use file_store::FileStore;
pub use presentation::{PresentRequest, Presentation, Presenter};
pub use provision::{Provider, Provisioner};
pub use registry::{Iter, WeakRegistry};
pub use store::{MemoryStore, SeenStore};
pub use target::{Control, DynamicRect, Region, TapSubscription, Target};
pub use tooltip::{Tooltip, TooltipBuilder};
