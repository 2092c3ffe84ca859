use bitflags::bitflags;

pub const KEYINPUT_ALL_RELEASED: u16 = 0x3FF;

bitflags! {
    pub struct KeyInput: u16 {
        const A = 1 << 0;
        const B = 1 << 1;
        const SELECT = 1 << 2;
        const START = 1 << 3;
        const RIGHT = 1 << 4;
        const LEFT = 1 << 5;
        const UP = 1 << 6;
        const DOWN = 1 << 7;
        const R = 1 << 8;
        const L = 1 << 9;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Keys {
    ButtonA = 0,
    ButtonB = 1,
    Select = 2,
    Start = 3,
    Right = 4,
    Left = 5,
    Up = 6,
    Down = 7,
    ButtonR = 8,
    ButtonL = 9,
}

/// KEYINPUT is active low: a set bit means the key is released.
pub struct Keypad {
    pub keyinput: KeyInput,
    pub keycnt: u16,
}

impl Keypad {
    pub fn new() -> Self {
        Self {
            keyinput: KeyInput::all(),
            keycnt: 0,
        }
    }

    pub fn set_key(&mut self, key: Keys, pressed: bool) {
        let flag = KeyInput::from_bits_truncate(1 << key as u16);
        self.keyinput.set(flag, !pressed);
    }
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_low() {
        let mut keypad = Keypad::new();
        assert_eq!(keypad.keyinput.bits(), KEYINPUT_ALL_RELEASED);

        keypad.set_key(Keys::Start, true);
        assert_eq!(keypad.keyinput.bits(), KEYINPUT_ALL_RELEASED & !0x8);
        keypad.set_key(Keys::Start, false);
        assert_eq!(keypad.keyinput.bits(), KEYINPUT_ALL_RELEASED);
    }
}
