//! Wireless-controller button bitmask.
//!
//! Bit positions follow the vendor packet layout: bit 0 is `R1`, bit 15 is
//! `LEFT` on the directional pad.

use bitflags::bitflags;
use strider_types::StriderError;

bitflags! {
    /// Buttons held down in one controller frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ControllerKeys: u16 {
        const R1     = 1 << 0;
        const L1     = 1 << 1;
        const START  = 1 << 2;
        const SELECT = 1 << 3;
        const R2     = 1 << 4;
        const L2     = 1 << 5;
        const F1     = 1 << 6;
        const F2     = 1 << 7;
        const A      = 1 << 8;
        const B      = 1 << 9;
        const X      = 1 << 10;
        const Y      = 1 << 11;
        const UP     = 1 << 12;
        const RIGHT  = 1 << 13;
        const DOWN   = 1 << 14;
        const LEFT   = 1 << 15;
    }
}

impl ControllerKeys {
    /// Decode a raw frame bitmask.  All 16 bits are meaningful.
    pub fn from_frame(bits: u16) -> Self {
        Self::from_bits_retain(bits)
    }

    /// `true` when every key in `combo` is held.
    pub fn holds(self, combo: ControllerKeys) -> bool {
        !combo.is_empty() && self.contains(combo)
    }

    /// Names of the held keys, in packet order.
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }

    /// Parse a `+`-separated key combination such as `"L2+B"`.
    ///
    /// # Errors
    ///
    /// Returns [`StriderError::InvalidCommand`] for unknown key names.
    pub fn parse_combo(text: &str) -> Result<Self, StriderError> {
        text.split('+')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .try_fold(ControllerKeys::empty(), |acc, part| {
                ControllerKeys::from_name(&part.to_ascii_uppercase())
                    .map(|key| acc | key)
                    .ok_or_else(|| {
                        StriderError::InvalidCommand(format!("unknown controller key '{part}'"))
                    })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_layout_matches_packet_order() {
        assert_eq!(ControllerKeys::R1.bits(), 0x0001);
        assert_eq!(ControllerKeys::L2.bits(), 0x0020);
        assert_eq!(ControllerKeys::B.bits(), 0x0200);
        assert_eq!(ControllerKeys::LEFT.bits(), 0x8000);
        assert_eq!(ControllerKeys::all().bits(), 0xFFFF);
    }

    #[test]
    fn holds_requires_every_key() {
        let frame = ControllerKeys::from_frame(0x0020 | 0x0200);
        assert!(frame.holds(ControllerKeys::L2 | ControllerKeys::B));
        assert!(!frame.holds(ControllerKeys::L2 | ControllerKeys::A));
        assert!(!frame.holds(ControllerKeys::empty()));
    }

    #[test]
    fn parse_combo_accepts_any_case() {
        assert_eq!(
            ControllerKeys::parse_combo("l2 + b").unwrap(),
            ControllerKeys::L2 | ControllerKeys::B
        );
        assert_eq!(ControllerKeys::parse_combo("down").unwrap(), ControllerKeys::DOWN);
        assert!(ControllerKeys::parse_combo("L3").is_err());
    }

    #[test]
    fn names_in_packet_order() {
        let frame = ControllerKeys::DOWN | ControllerKeys::R1;
        assert_eq!(frame.names(), vec!["R1", "DOWN"]);
    }
}
