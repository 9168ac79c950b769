//! Button state tracking with both edge-triggered and level-triggered queries.
//!
//! Physical keys are mapped by the platform layer onto a small set of abstract
//! controls: the eight pad buttons the game reacts to, plus a few developer
//! keys that never reach gameplay code.
//!
//! - **Level-triggered (held):** `is_held(control)` is true every frame the
//!   control is physically down.
//!
//! - **Edge-triggered (just_pressed / just_released):** true only during the
//!   frame the transition happened. They are cleared by `end_frame()`, which the
//!   main loop calls only after at least one fixed step has consumed them, so a
//!   press landing on a frame with zero simulation steps is not lost.

use serde::Deserialize;
use std::collections::HashSet;

/// Abstract pad buttons. Only `A` and `B` drive the textbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    Start,
    Select,
}

impl Button {
    /// All buttons in a fixed order, used to report presses deterministically.
    pub const ALL: &'static [Button] = &[
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::A,
        Button::B,
        Button::Start,
        Button::Select,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::A => "A",
            Self::B => "B",
            Self::Start => "Start",
            Self::Select => "Select",
        }
    }
}

impl std::fmt::Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Keys reserved for development tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DevKey {
    ToggleOverlay,
    Reload,
    TogglePause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Pad(Button),
    Dev(DevKey),
}

impl From<Button> for Control {
    fn from(button: Button) -> Self {
        Control::Pad(button)
    }
}

impl From<DevKey> for Control {
    fn from(key: DevKey) -> Self {
        Control::Dev(key)
    }
}

pub struct InputState {
    held: HashSet<Control>,
    just_pressed: HashSet<Control>,
    just_released: HashSet<Control>,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    pub fn key_down(&mut self, control: impl Into<Control>) {
        let control = control.into();
        if self.held.insert(control) {
            self.just_pressed.insert(control);
        }
    }

    pub fn key_up(&mut self, control: impl Into<Control>) {
        let control = control.into();
        if self.held.remove(&control) {
            self.just_released.insert(control);
        }
    }

    pub fn is_held(&self, control: impl Into<Control>) -> bool {
        self.held.contains(&control.into())
    }

    pub fn is_just_pressed(&self, control: impl Into<Control>) -> bool {
        self.just_pressed.contains(&control.into())
    }

    pub fn is_just_released(&self, control: impl Into<Control>) -> bool {
        self.just_released.contains(&control.into())
    }

    /// Pad buttons pressed this frame, in `Button::ALL` order.
    pub fn just_pressed_buttons(&self) -> Vec<Button> {
        Button::ALL
            .iter()
            .copied()
            .filter(|&button| self.is_just_pressed(button))
            .collect()
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}
