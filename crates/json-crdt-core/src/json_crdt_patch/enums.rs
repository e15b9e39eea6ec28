//! Enumerations for the JSON CRDT Patch protocol.

#![allow(non_snake_case)]

/// Reserved session IDs.
pub mod SESSION {
    /// Reserved by the protocol: cannot be used by users.
    pub const SYSTEM: u64 = 0;
    /// The only valid session ID when running in server-clock mode.
    pub const SERVER: u64 = 1;
    /// Global/schema patches applied on all clients identically.
    pub const GLOBAL: u64 = 2;
    /// Local-only patches (e.g. cursor position, not shared).
    pub const LOCAL: u64 = 3;
    /// Maximum allowed session ID (53-bit safe integer).
    pub const MAX: u64 = 9007199254740991;
}

/// Reserved system-session time values.
pub mod SYSTEM_SESSION_TIME {
    pub const ORIGIN: u64 = 0;
}

/// 3-bit CRDT data-type discriminant.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonCrdtDataType {
    Con = 0b000,
    Val = 0b001,
    Obj = 0b010,
    Vec = 0b011,
    Str = 0b100,
    Bin = 0b101,
    Arr = 0b110,
}

impl JsonCrdtDataType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Con => "con",
            Self::Val => "val",
            Self::Obj => "obj",
            Self::Vec => "vec",
            Self::Str => "str",
            Self::Bin => "bin",
            Self::Arr => "arr",
        }
    }

    /// `true` for the RGA-backed kinds (`str`, `bin`, `arr`).
    pub fn is_sequence(self) -> bool {
        matches!(self, Self::Str | Self::Bin | Self::Arr)
    }
}

impl std::fmt::Display for JsonCrdtDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 5-bit operation opcode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonCrdtPatchOpcode {
    NewCon = JsonCrdtDataType::Con as u8,           // 0
    NewVal = JsonCrdtDataType::Val as u8,           // 1
    NewObj = JsonCrdtDataType::Obj as u8,           // 2
    NewVec = JsonCrdtDataType::Vec as u8,           // 3
    NewStr = JsonCrdtDataType::Str as u8,           // 4
    NewBin = JsonCrdtDataType::Bin as u8,           // 5
    NewArr = JsonCrdtDataType::Arr as u8,           // 6
    InsVal = 0b01000 | JsonCrdtDataType::Val as u8, // 9
    InsObj = 0b01000 | JsonCrdtDataType::Obj as u8, // 10
    InsVec = 0b01000 | JsonCrdtDataType::Vec as u8, // 11
    InsStr = 0b01000 | JsonCrdtDataType::Str as u8, // 12
    InsBin = 0b01000 | JsonCrdtDataType::Bin as u8, // 13
    InsArr = 0b01000 | JsonCrdtDataType::Arr as u8, // 14
    UpdArr = (0b01000 | JsonCrdtDataType::Arr as u8) + 1, // 15
    Del = 0b10000,                                  // 16
    Nop = 0b10001,                                  // 17
}

impl JsonCrdtPatchOpcode {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::NewCon),
            1 => Some(Self::NewVal),
            2 => Some(Self::NewObj),
            3 => Some(Self::NewVec),
            4 => Some(Self::NewStr),
            5 => Some(Self::NewBin),
            6 => Some(Self::NewArr),
            9 => Some(Self::InsVal),
            10 => Some(Self::InsObj),
            11 => Some(Self::InsVec),
            12 => Some(Self::InsStr),
            13 => Some(Self::InsBin),
            14 => Some(Self::InsArr),
            15 => Some(Self::UpdArr),
            16 => Some(Self::Del),
            17 => Some(Self::Nop),
            _ => None,
        }
    }
}
