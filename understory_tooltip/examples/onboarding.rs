// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Onboarding walkthrough.
//!
//! Drive a three-step onboarding flow with `understory_tooltip`: a welcome
//! hint, a compose hint that waits for it, and a pair of bundled hints that
//! are dismissed together.
//!
//! Run:
//! - `cargo run -p understory_tooltip --example onboarding`

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::Rect;
use understory_tooltip::{
    Control, Engine, Presentation, PresentRequest, Provider, Provisioner, Region, Target, Tooltip,
};

/// Prints what a real presentation layer would draw.
struct Printed {
    name: String,
}

impl Presentation for Printed {
    fn remove(&self) {
        println!("  - hide  {}", self.name);
    }

    fn align(&self, target_rect: Rect) {
        println!(
            "  * place {} at ({:.0}, {:.0})",
            self.name, target_rect.x0, target_rect.y1
        );
    }
}

struct Window(Rect);

impl Region for Window {
    fn frame(&self) -> Rect {
        self.0
    }
}

struct Inbox {
    window: Rc<Window>,
    welcome: Rc<Tooltip>,
    compose: Rc<Tooltip>,
    compose_button: Rc<Control>,
}

impl Provider for Inbox {
    fn container(&self) -> Option<Rc<dyn Region>> {
        Some(self.window.clone())
    }

    fn provide(&self, tooltips: &mut Provisioner) {
        tooltips.assign_to_region(&self.welcome, &self.window);
        tooltips.assign_to_control(&self.compose, &self.compose_button);
    }
}

struct Toolbar {
    archive: Rc<Tooltip>,
    snooze: Rc<Tooltip>,
    buttons: RefCell<Vec<Rc<Control>>>,
}

impl Provider for Toolbar {
    fn provide(&self, tooltips: &mut Provisioner) {
        let buttons = self.buttons.borrow();
        tooltips.assign(&self.archive, Target::control(&buttons[0]), Some(6.0));
        tooltips.assign_to_control(&self.snooze, &buttons[1]);
    }
}

fn turn(engine: &Engine, label: &str) {
    println!("{label}");
    engine.run_until_idle();
}

fn main() {
    let engine = Engine::new(|request: &PresentRequest| -> Rc<dyn Presentation> {
        println!("  + show  {}", request.tooltip.name());
        Rc::new(Printed {
            name: request.tooltip.name().to_owned(),
        })
    });

    let welcome = Tooltip::builder("inbox.welcome").build(&engine);
    let compose = Tooltip::builder("inbox.compose")
        .show_after([&welcome])
        .build(&engine);
    let snooze = Tooltip::builder("toolbar.snooze")
        .show_after([&compose])
        .build(&engine);
    let archive = Tooltip::builder("toolbar.archive")
        .show_after([&compose])
        .bundle_with([&snooze])
        .build(&engine);

    let window = Rc::new(Window(Rect::new(100.0, 100.0, 900.0, 700.0)));
    let compose_button = Rc::new(Control::new(Rect::new(120.0, 120.0, 200.0, 150.0)));
    let inbox = Rc::new(Inbox {
        window,
        welcome: welcome.clone(),
        compose: compose.clone(),
        compose_button: compose_button.clone(),
    });
    let toolbar = Rc::new(Toolbar {
        archive,
        snooze,
        buttons: RefCell::new(vec![
            Rc::new(Control::new(Rect::new(700.0, 110.0, 740.0, 140.0))),
            Rc::new(Control::new(Rect::new(750.0, 110.0, 790.0, 140.0))),
        ]),
    });

    engine.add_provider(inbox.clone());
    engine.add_provider(toolbar.clone());
    turn(&engine, "launch:");

    welcome.mark_as_seen();
    turn(&engine, "welcome dismissed:");

    compose_button.set_frame(Rect::new(140.0, 120.0, 220.0, 150.0));
    engine.set_needs_layout();
    turn(&engine, "compose button moved:");

    compose_button.tap();
    turn(&engine, "compose tapped:");

    // Archive and snooze are bundled: tapping either dismisses both.
    toolbar.buttons.borrow()[1].tap();
    turn(&engine, "snooze tapped:");

    let stats = engine.stats();
    println!(
        "{} updates, {} layouts, {} shown, {} hidden",
        stats.updates, stats.layouts, stats.created, stats.removed
    );
}
