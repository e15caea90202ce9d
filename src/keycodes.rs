//! `rdev::Key` <-> integer keycode mapping.
//!
//! Keycodes are PC set-1 style virtual codes (the numbering used by most
//! cross-platform hook libraries): F2 = 60, F4 = 62, F10 = 68. Extended keys
//! carry a `0x0E00` or `0xE000` prefix. Keys the hook reports as
//! `Key::Unknown(raw)` are carried as `UNMAPPED_BASE + raw` so they still
//! survive a save/load cycle on the same platform.

use rdev::Key;

use crate::event::Keycode;

pub const UNMAPPED_BASE: Keycode = 0x1_0000;

pub const F2: Keycode = 0x3C;
pub const F4: Keycode = 0x3E;
pub const F10: Keycode = 0x44;

const TABLE: &[(Key, Keycode)] = &[
    (Key::Escape, 0x01),
    (Key::Num1, 0x02),
    (Key::Num2, 0x03),
    (Key::Num3, 0x04),
    (Key::Num4, 0x05),
    (Key::Num5, 0x06),
    (Key::Num6, 0x07),
    (Key::Num7, 0x08),
    (Key::Num8, 0x09),
    (Key::Num9, 0x0A),
    (Key::Num0, 0x0B),
    (Key::Minus, 0x0C),
    (Key::Equal, 0x0D),
    (Key::Backspace, 0x0E),
    (Key::Tab, 0x0F),
    (Key::KeyQ, 0x10),
    (Key::KeyW, 0x11),
    (Key::KeyE, 0x12),
    (Key::KeyR, 0x13),
    (Key::KeyT, 0x14),
    (Key::KeyY, 0x15),
    (Key::KeyU, 0x16),
    (Key::KeyI, 0x17),
    (Key::KeyO, 0x18),
    (Key::KeyP, 0x19),
    (Key::LeftBracket, 0x1A),
    (Key::RightBracket, 0x1B),
    (Key::Return, 0x1C),
    (Key::ControlLeft, 0x1D),
    (Key::KeyA, 0x1E),
    (Key::KeyS, 0x1F),
    (Key::KeyD, 0x20),
    (Key::KeyF, 0x21),
    (Key::KeyG, 0x22),
    (Key::KeyH, 0x23),
    (Key::KeyJ, 0x24),
    (Key::KeyK, 0x25),
    (Key::KeyL, 0x26),
    (Key::SemiColon, 0x27),
    (Key::Quote, 0x28),
    (Key::BackQuote, 0x29),
    (Key::ShiftLeft, 0x2A),
    (Key::BackSlash, 0x2B),
    (Key::KeyZ, 0x2C),
    (Key::KeyX, 0x2D),
    (Key::KeyC, 0x2E),
    (Key::KeyV, 0x2F),
    (Key::KeyB, 0x30),
    (Key::KeyN, 0x31),
    (Key::KeyM, 0x32),
    (Key::Comma, 0x33),
    (Key::Dot, 0x34),
    (Key::Slash, 0x35),
    (Key::ShiftRight, 0x36),
    (Key::KpMultiply, 0x37),
    (Key::Alt, 0x38),
    (Key::Space, 0x39),
    (Key::CapsLock, 0x3A),
    (Key::F1, 0x3B),
    (Key::F2, F2),
    (Key::F3, 0x3D),
    (Key::F4, F4),
    (Key::F5, 0x3F),
    (Key::F6, 0x40),
    (Key::F7, 0x41),
    (Key::F8, 0x42),
    (Key::F9, 0x43),
    (Key::F10, F10),
    (Key::NumLock, 0x45),
    (Key::ScrollLock, 0x46),
    (Key::Kp7, 0x47),
    (Key::Kp8, 0x48),
    (Key::Kp9, 0x49),
    (Key::KpMinus, 0x4A),
    (Key::Kp4, 0x4B),
    (Key::Kp5, 0x4C),
    (Key::Kp6, 0x4D),
    (Key::KpPlus, 0x4E),
    (Key::Kp1, 0x4F),
    (Key::Kp2, 0x50),
    (Key::Kp3, 0x51),
    (Key::Kp0, 0x52),
    (Key::KpDelete, 0x53),
    (Key::IntlBackslash, 0x56),
    (Key::F11, 0x57),
    (Key::F12, 0x58),
    (Key::KpReturn, 0x0E1C),
    (Key::ControlRight, 0x0E1D),
    (Key::KpDivide, 0x0E35),
    (Key::PrintScreen, 0x0E37),
    (Key::AltGr, 0x0E38),
    (Key::Pause, 0x0E45),
    (Key::Home, 0x0E47),
    (Key::PageUp, 0x0E49),
    (Key::End, 0x0E4F),
    (Key::PageDown, 0x0E51),
    (Key::Insert, 0x0E52),
    (Key::Delete, 0x0E53),
    (Key::MetaLeft, 0x0E5B),
    (Key::MetaRight, 0x0E5C),
    (Key::UpArrow, 0xE048),
    (Key::LeftArrow, 0xE04B),
    (Key::RightArrow, 0xE04D),
    (Key::DownArrow, 0xE050),
];

/// Keycode for a key reported by the hook. `None` for keys with no stable
/// code.
pub fn from_key(key: Key) -> Option<Keycode> {
    if let Key::Unknown(raw) = key {
        return Some(UNMAPPED_BASE.saturating_add(raw));
    }
    TABLE.iter().find(|(k, _)| *k == key).map(|(_, code)| *code)
}

/// Key to inject for a recorded keycode.
pub fn to_key(keycode: Keycode) -> Option<Key> {
    if keycode >= UNMAPPED_BASE {
        return Some(Key::Unknown(keycode - UNMAPPED_BASE));
    }
    TABLE.iter().find(|(_, code)| *code == keycode).map(|(k, _)| *k)
}

/// Human-readable name for log lines and the status text.
pub fn name(keycode: Keycode) -> String {
    match to_key(keycode) {
        Some(Key::Unknown(raw)) => format!("raw:{}", raw),
        Some(key) => format!("{:?}", key),
        None => format!("#{}", keycode),
    }
}

/// Every known key with its keycode, in keycode order.
pub fn table() -> impl Iterator<Item = (Keycode, Key)> {
    let mut entries: Vec<_> = TABLE.iter().map(|(k, code)| (*code, *k)).collect();
    entries.sort_by_key(|(code, _)| *code);
    entries.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hotkeys_match_function_keys() {
        assert_eq!(from_key(Key::F2), Some(60));
        assert_eq!(from_key(Key::F4), Some(62));
        assert_eq!(from_key(Key::F10), Some(68));
    }

    #[test]
    fn table_has_no_duplicate_codes() {
        let mut codes: Vec<_> = TABLE.iter().map(|(_, c)| *c).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), TABLE.len());
    }

    #[test]
    fn every_table_key_maps_back() {
        for (key, code) in TABLE {
            assert_eq!(to_key(*code), Some(*key));
            assert_eq!(from_key(*key), Some(*code));
        }
    }

    #[test]
    fn unknown_keys_use_offset_range() {
        assert_eq!(from_key(Key::Unknown(175)), Some(UNMAPPED_BASE + 175));
        assert_eq!(to_key(UNMAPPED_BASE + 175), Some(Key::Unknown(175)));
        assert_eq!(name(UNMAPPED_BASE + 175), "raw:175");
    }

    #[test]
    fn unassigned_code_has_no_key() {
        assert_eq!(to_key(0x7F), None);
        assert_eq!(name(0x7F), "#127");
    }
}
