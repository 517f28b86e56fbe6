// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording doubles shared by the unit tests.

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use kurbo::Rect;

use crate::presentation::{PresentRequest, Presentation, Presenter};
use crate::provision::{Provider, Provisioner};
use crate::target::Target;
use crate::tooltip::Tooltip;

#[derive(Debug, Default)]
pub(crate) struct Log {
    pub(crate) created: Vec<String>,
    pub(crate) removed: Vec<String>,
    pub(crate) aligned: Vec<(String, Rect)>,
    pub(crate) spacing: Vec<Option<f64>>,
    pub(crate) suspended: usize,
    pub(crate) resumed: usize,
}

/// Presenter that records every call into a shared [`Log`].
#[derive(Clone, Debug, Default)]
pub(crate) struct Recorder {
    pub(crate) log: Rc<RefCell<Log>>,
}

impl Presenter for Recorder {
    fn create(&self, request: &PresentRequest) -> Rc<dyn Presentation> {
        let name = request.tooltip.name().to_string();
        let mut log = self.log.borrow_mut();
        log.created.push(name.clone());
        log.spacing.push(request.spacing);
        Rc::new(Recorded {
            name,
            log: Rc::clone(&self.log),
            removed: Cell::new(false),
        })
    }
}

struct Recorded {
    name: String,
    log: Rc<RefCell<Log>>,
    removed: Cell<bool>,
}

impl Presentation for Recorded {
    fn remove(&self) {
        assert!(!self.removed.replace(true), "removed twice: {}", self.name);
        self.log.borrow_mut().removed.push(self.name.clone());
    }

    fn align(&self, target_rect: Rect) {
        assert!(!self.removed.get(), "aligned after removal: {}", self.name);
        self.log
            .borrow_mut()
            .aligned
            .push((self.name.clone(), target_rect));
    }

    fn suspend_animations(&self) {
        self.log.borrow_mut().suspended += 1;
    }

    fn resume_animations(&self) {
        self.log.borrow_mut().resumed += 1;
    }
}

/// One declared assignment: tooltip, target and spacing override.
pub(crate) type Want = (Rc<Tooltip>, Target, Option<f64>);

/// Provider that assigns a fixed list of `(tooltip, target)` pairs.
#[derive(Default)]
pub(crate) struct Wants {
    pub(crate) items: RefCell<Vec<Want>>,
    pub(crate) polls: Cell<usize>,
}

impl Wants {
    pub(crate) fn with(items: impl IntoIterator<Item = (Rc<Tooltip>, Target)>) -> Self {
        Self {
            items: RefCell::new(
                items
                    .into_iter()
                    .map(|(tooltip, target)| (tooltip, target, None))
                    .collect(),
            ),
            polls: Cell::new(0),
        }
    }
}

impl Provider for Wants {
    fn provide(&self, tooltips: &mut Provisioner) {
        self.polls.set(self.polls.get() + 1);
        for (tooltip, target, spacing) in self.items.borrow().iter() {
            tooltips.assign(tooltip, target.clone(), *spacing);
        }
    }
}
