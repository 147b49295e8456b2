//! GUIDs as stored in a GPT.

/// A GUID in its on-disk byte order.
///
/// The first three fields are little-endian integers, the last eight
/// bytes are kept in order.  [`Display`](core::fmt::Display) renders the
/// canonical `8-4-4-4-12` form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid([u8; 16]);

impl Guid {
    pub const NIL: Self = Self([0; 16]);

    /// Wrap bytes as read from disk.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Build from the fields of the canonical text form.
    pub const fn from_fields(d1: u32, d2: u16, d3: u16, d4: [u8; 8]) -> Self {
        let a = d1.to_le_bytes();
        let b = d2.to_le_bytes();
        let c = d3.to_le_bytes();
        Self([
            a[0], a[1], a[2], a[3], b[0], b[1], c[0], c[1], d4[0], d4[1], d4[2], d4[3], d4[4], d4[5], d4[6], d4[7],
        ])
    }

    /// The on-disk bytes.
    pub const fn bytes(&self) -> [u8; 16] {
        self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0 == [0; 16]
    }
}

impl core::fmt::Display for Guid {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        let b = &self.0;
        write!(
            fmt,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            u16::from_le_bytes([b[4], b[5]]),
            u16::from_le_bytes([b[6], b[7]]),
            b[8],
            b[9],
            b[10],
            b[11],
            b[12],
            b[13],
            b[14],
            b[15]
        )
    }
}

impl core::fmt::Debug for Guid {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        write!(fmt, "Guid({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn mixed_endian_rendering() {
        // NetBSD FFS as it sits in a GPT entry
        let raw = [
            0x5a, 0x8d, 0xf4, 0x49, 0x0e, 0xb1, 0xdc, 0x11, 0xb9, 0x9b, 0x00, 0x19, 0xd1, 0x87, 0x96, 0x48,
        ];
        let guid = Guid::from_bytes(raw);
        assert_eq!(format!("{guid}"), "49f48d5a-b10e-11dc-b99b-0019d1879648");
        // rendering twice gives the same string
        assert_eq!(format!("{guid}"), format!("{}", Guid::from_bytes(guid.bytes())));
    }

    #[test]
    fn fields_match_bytes() {
        let guid = Guid::from_fields(0xebd0a0a2, 0xb9e5, 0x4433, [0x87, 0xc0, 0x68, 0xb6, 0xb7, 0x26, 0x99, 0xc7]);
        assert_eq!(&guid.bytes()[..4], &[0xa2, 0xa0, 0xd0, 0xeb]);
        assert_eq!(format!("{guid}"), "ebd0a0a2-b9e5-4433-87c0-68b6b72699c7");
        assert!(Guid::NIL.is_nil());
        assert!(!guid.is_nil());
    }
}
