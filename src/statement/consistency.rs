use num_enum::{IntoPrimitive, TryFromPrimitive};

/// CQL consistency level, sent as a 16-bit code on the wire.
///
/// Values match the native protocol's consistency level codes, so the codec can
/// round-trip a `Consistency` without a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(i16)]
pub enum Consistency {
    Any = 0x0000,
    One = 0x0001,
    Two = 0x0002,
    Three = 0x0003,
    Quorum = 0x0004,
    All = 0x0005,
    LocalQuorum = 0x0006,
    EachQuorum = 0x0007,
    Serial = 0x0008,
    LocalSerial = 0x0009,
    LocalOne = 0x000A,
}

impl Default for Consistency {
    /// Matches most driver defaults: a single-DC quorum.
    fn default() -> Self {
        Consistency::LocalQuorum
    }
}
