//! Gamepad
//!
//! This module implements Game Boy joypad input handling.
//!
//! JOYP Register (0xFF00):
//! - Bit 5: Select button keys (0 = selected)
//! - Bit 4: Select direction keys (0 = selected)
//! - Bit 3: Down or Start (0 = pressed)
//! - Bit 2: Up or Select (0 = pressed)
//! - Bit 1: Left or B (0 = pressed)
//! - Bit 0: Right or A (0 = pressed)

use crate::common::Byte;
use serde::{Deserialize, Serialize};

pub const JOYP_ADDR: u16 = 0xFF00;

const SELECT_DIRECTIONS: Byte = 0x10;
const SELECT_BUTTONS: Byte = 0x20;

/// Game Boy buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Right,
    Left,
    Up,
    Down,
}

impl Button {
    /// JOYP line this button pulls low
    fn line(&self) -> Byte {
        match self {
            Button::A | Button::Right => 0x01,
            Button::B | Button::Left => 0x02,
            Button::Select | Button::Up => 0x04,
            Button::Start | Button::Down => 0x08,
        }
    }

    /// Selection bit that connects this button's group to the lines
    fn group(&self) -> Byte {
        match self {
            Button::A | Button::B | Button::Select | Button::Start => SELECT_BUTTONS,
            _ => SELECT_DIRECTIONS,
        }
    }
}

/// Gamepad state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gamepad {
    /// Pressed action buttons, one bit per line (1 = pressed)
    buttons: Byte,
    /// Pressed directions, one bit per line (1 = pressed)
    directions: Byte,
    /// Selection register (bits 4-5 of JOYP)
    selection: Byte,
}

impl Default for Gamepad {
    fn default() -> Self {
        Self::new()
    }
}

impl Gamepad {
    /// Create a new Gamepad with nothing pressed and both groups deselected
    pub fn new() -> Self {
        Self {
            buttons: 0,
            directions: 0,
            selection: 0x30,
        }
    }

    /// Read JOYP register (0xFF00)
    pub fn read(&self) -> Byte {
        0xC0 | self.selection | (!self.selected_lines() & 0x0F)
    }

    /// Write JOYP register (0xFF00)
    /// Only bits 4-5 are writable (selection)
    pub fn write(&mut self, value: Byte) {
        self.selection = value & 0x30;
    }

    /// Lines currently pulled low, active-high
    fn selected_lines(&self) -> Byte {
        let mut lines = 0;
        if self.selection & SELECT_BUTTONS == 0 {
            lines |= self.buttons;
        }
        if self.selection & SELECT_DIRECTIONS == 0 {
            lines |= self.directions;
        }
        lines
    }

    /// Set button state.
    ///
    /// Returns true when a selected line went from high to low, which is
    /// the condition for a Joypad interrupt request.
    pub fn set_button(&mut self, button: Button, pressed: bool) -> bool {
        let before = self.selected_lines();
        let group = match button.group() {
            SELECT_BUTTONS => &mut self.buttons,
            _ => &mut self.directions,
        };
        if pressed {
            *group |= button.line();
        } else {
            *group &= !button.line();
        }
        self.selected_lines() & !before != 0
    }

    /// Check if button is pressed
    pub fn is_pressed(&self, button: Button) -> bool {
        let group = match button.group() {
            SELECT_BUTTONS => self.buttons,
            _ => self.directions,
        };
        group & button.line() != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joyp_read_no_selection() {
        let gamepad = Gamepad::new();
        assert_eq!(gamepad.read(), 0xFF);
    }

    #[test]
    fn test_joyp_read_buttons() {
        let mut gamepad = Gamepad::new();
        gamepad.write(0x10); // Select buttons (bit 5 = 0, bit 4 = 1)
        assert_eq!(gamepad.read() & 0x0F, 0x0F);

        gamepad.set_button(Button::A, true);
        assert_eq!(gamepad.read() & 0x0F, 0x0E);

        gamepad.set_button(Button::Start, true);
        assert_eq!(gamepad.read() & 0x0F, 0x06);

        // Directions are not visible while only buttons are selected
        gamepad.set_button(Button::Up, true);
        assert_eq!(gamepad.read() & 0x0F, 0x06);
    }

    #[test]
    fn test_joyp_read_directions() {
        let mut gamepad = Gamepad::new();
        gamepad.write(0x20); // Select directions (bit 4 = 0, bit 5 = 1)
        gamepad.set_button(Button::Right, true);
        gamepad.set_button(Button::Up, true);
        assert_eq!(gamepad.read(), 0xEA);
    }

    #[test]
    fn test_interrupt_only_on_selected_press() {
        let mut gamepad = Gamepad::new();
        // Nothing selected: no line can fall
        assert!(!gamepad.set_button(Button::A, true));
        gamepad.set_button(Button::A, false);

        gamepad.write(0x10);
        assert!(gamepad.set_button(Button::A, true));
        // Holding or releasing does not trigger again
        assert!(!gamepad.set_button(Button::A, true));
        assert!(!gamepad.set_button(Button::A, false));
        assert!(!gamepad.set_button(Button::Down, true));
    }

    #[test]
    fn test_is_pressed() {
        let mut gamepad = Gamepad::new();
        gamepad.set_button(Button::Select, true);
        assert!(gamepad.is_pressed(Button::Select));
        assert!(!gamepad.is_pressed(Button::Up));
    }
}
