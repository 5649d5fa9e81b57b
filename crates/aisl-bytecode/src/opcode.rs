//! Bytecode opcodes for the AISL virtual machine.
//!
//! All opcodes are single-byte instructions. Some take an additional operand
//! that follows the opcode byte in the instruction stream (see [`crate::instruction::Operand`]).
//!
//! Opcodes are grouped by category:
//! - 0x00-0x0F: stack manipulation & constants
//! - 0x10-0x1F: locals
//! - 0x20-0x2F: i64 arithmetic
//! - 0x30-0x3F: f64 arithmetic
//! - 0x40-0x4F: decimal arithmetic
//! - 0x50-0x5F: i64 comparison
//! - 0x60-0x6F: f64 comparison
//! - 0x70-0x7F: decimal comparison
//! - 0x80-0x8F: logical
//! - 0x90-0x9F: control flow
//! - 0xA0-0xAF: calls
//! - 0xB0-0xBF: string operations
//! - 0xC0-0xCF: array operations
//! - 0xD0-0xDF: map operations
//! - 0xE0-0xEF: I/O, host calls, result inspection, GC
//! - 0xF0-0xFF: JSON, channels, special
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // ===== Stack manipulation & constants (0x00-0x0F) =====
    /// Push a 64-bit integer constant (operand: i64).
    PushInt = 0x00,
    /// Push a 64-bit float constant (operand: f64).
    PushFloat = 0x01,
    /// Push a boolean constant (operand: bool).
    PushBool = 0x02,
    /// Push a string constant from the pool (operand: u32 index).
    PushString = 0x03,
    /// Push the unit value.
    PushUnit = 0x04,
    /// Pop the top of stack.
    Pop = 0x05,
    /// Duplicate the top of stack.
    Dup = 0x06,

    // ===== Locals (0x10-0x1F) =====
    /// Load local variable onto the stack (operand: u32 slot).
    LoadLocal = 0x10,
    /// Store the top of stack into a local variable (operand: u32 slot).
    StoreLocal = 0x11,

    // ===== i64 arithmetic (0x20-0x2F) =====
    AddI64 = 0x20,
    SubI64 = 0x21,
    MulI64 = 0x22,
    DivI64 = 0x23,
    ModI64 = 0x24,
    NegI64 = 0x25,
    AbsI64 = 0x26,
    MinI64 = 0x27,
    MaxI64 = 0x28,
    PowI64 = 0x29,

    // ===== f64 arithmetic (0x30-0x3F) =====
    AddF64 = 0x30,
    SubF64 = 0x31,
    MulF64 = 0x32,
    DivF64 = 0x33,
    ModF64 = 0x34,
    NegF64 = 0x35,
    AbsF64 = 0x36,
    MinF64 = 0x37,
    MaxF64 = 0x38,
    SqrtF64 = 0x39,
    PowF64 = 0x3A,

    // ===== decimal arithmetic (0x40-0x4F) =====
    AddDecimal = 0x40,
    SubDecimal = 0x41,
    MulDecimal = 0x42,
    DivDecimal = 0x43,
    NegDecimal = 0x44,
    ModDecimal = 0x45,
    AbsDecimal = 0x46,
    MinDecimal = 0x47,
    MaxDecimal = 0x48,

    // ===== i64 comparison (0x50-0x5F) =====
    EqI64 = 0x50,
    NeI64 = 0x51,
    LtI64 = 0x52,
    GtI64 = 0x53,
    LeI64 = 0x54,
    GeI64 = 0x55,

    // ===== f64 comparison (0x60-0x6F) =====
    EqF64 = 0x60,
    NeF64 = 0x61,
    LtF64 = 0x62,
    GtF64 = 0x63,
    LeF64 = 0x64,
    GeF64 = 0x65,

    // ===== decimal comparison (0x70-0x7F) =====
    EqDecimal = 0x70,
    NeDecimal = 0x71,
    LtDecimal = 0x72,
    GtDecimal = 0x73,
    LeDecimal = 0x74,
    GeDecimal = 0x75,

    // ===== Logical (0x80-0x8F) =====
    AndBool = 0x80,
    OrBool = 0x81,
    NotBool = 0x82,
    EqBool = 0x83,
    NeBool = 0x84,

    // ===== Control flow (0x90-0x9F) =====
    /// Unconditional jump (operand: u32 target instruction index).
    Jump = 0x90,
    /// Pop condition; jump if false (operand: u32 target).
    JumpIfFalse = 0x91,
    /// Pop condition; jump if true (operand: u32 target).
    JumpIfTrue = 0x92,
    /// Call a function (operand: func_idx u32, arg_count u32).
    Call = 0x93,
    /// Return the top of stack to the caller.
    Return = 0x94,
    /// Halt the virtual machine.
    Halt = 0x95,

    // ===== String operations (0xB0-0xBF) =====
    StrLen = 0xB0,
    StrConcat = 0xB1,
    /// Slice(str, start, length) — consumes 3 stack values in that order.
    StrSlice = 0xB2,
    StrIndexGet = 0xB3,
    StrEq = 0xB4,
    StrNe = 0xB5,
    StrLt = 0xB6,
    StrLe = 0xB7,
    StrGt = 0xB8,
    StrGe = 0xB9,
    StrFromI64 = 0xBA,
    StrFromF64 = 0xBB,
    StrFromBool = 0xBC,
    StrFromDecimal = 0xBD,
    StrSplit = 0xBE,
    StrTrim = 0xBF,

    // ===== Array operations (0xC0-0xCF) =====
    /// Allocate a new array (operand: u32 requested capacity).
    ArrayNew = 0xC0,
    ArrayPush = 0xC1,
    ArrayGet = 0xC2,
    ArraySet = 0xC3,
    ArrayLen = 0xC4,

    // ===== Map operations (0xD0-0xDF) =====
    MapNew = 0xD0,
    MapSet = 0xD1,
    MapGet = 0xD2,
    MapHas = 0xD3,
    MapDelete = 0xD4,
    MapLen = 0xD5,
    MapKeys = 0xD6,

    // ===== I/O, host calls, result inspection, GC (0xE0-0xEF) =====
    IoOpen = 0xE0,
    IoRead = 0xE1,
    IoWrite = 0xE2,
    IoClose = 0xE3,
    IoStdinRead = 0xE4,
    PrintI64 = 0xE5,
    PrintF64 = 0xE6,
    PrintBool = 0xE7,
    PrintString = 0xE8,
    PrintArray = 0xE9,
    PrintMap = 0xEA,
    PrintDecimal = 0xEB,
    GcCollect = 0xEC,
    GcStats = 0xED,
    /// Call a host function looked up by name in the constant pool
    /// (operand: func_idx u32 name-index, arg_count u32). Covers the wider
    /// builtin catalogue (network, filesystem, process, crypto, regex,
    /// SQLite, WebSocket, FFI) that this spec treats as an external
    /// collaborator: the VM only marshals arguments and results.
    HostCall = 0xEE,

    // ===== JSON, channels, result, special (0xF0-0xFF) =====
    JsonParse = 0xF0,
    JsonStringify = 0xF1,
    /// Create a new bounded channel (operand: u32 capacity).
    ChannelNew = 0xF2,
    ChannelSend = 0xF3,
    ChannelRecv = 0xF4,
    IsOk = 0xF5,
    IsErr = 0xF6,
    Unwrap = 0xF7,
    UnwrapOr = 0xF8,
    ErrorCode = 0xF9,
    ErrorMsg = 0xFA,
}

impl Opcode {
    /// Decode a byte into an opcode. Returns `None` for unassigned bytes.
    pub fn from_u8(byte: u8) -> Option<Self> {
        use Opcode::*;
        Some(match byte {
            0x00 => PushInt,
            0x01 => PushFloat,
            0x02 => PushBool,
            0x03 => PushString,
            0x04 => PushUnit,
            0x05 => Pop,
            0x06 => Dup,
            0x10 => LoadLocal,
            0x11 => StoreLocal,
            0x20 => AddI64,
            0x21 => SubI64,
            0x22 => MulI64,
            0x23 => DivI64,
            0x24 => ModI64,
            0x25 => NegI64,
            0x26 => AbsI64,
            0x27 => MinI64,
            0x28 => MaxI64,
            0x29 => PowI64,
            0x30 => AddF64,
            0x31 => SubF64,
            0x32 => MulF64,
            0x33 => DivF64,
            0x34 => ModF64,
            0x35 => NegF64,
            0x36 => AbsF64,
            0x37 => MinF64,
            0x38 => MaxF64,
            0x39 => SqrtF64,
            0x3A => PowF64,
            0x40 => AddDecimal,
            0x41 => SubDecimal,
            0x42 => MulDecimal,
            0x43 => DivDecimal,
            0x44 => NegDecimal,
            0x45 => ModDecimal,
            0x46 => AbsDecimal,
            0x47 => MinDecimal,
            0x48 => MaxDecimal,
            0x50 => EqI64,
            0x51 => NeI64,
            0x52 => LtI64,
            0x53 => GtI64,
            0x54 => LeI64,
            0x55 => GeI64,
            0x60 => EqF64,
            0x61 => NeF64,
            0x62 => LtF64,
            0x63 => GtF64,
            0x64 => LeF64,
            0x65 => GeF64,
            0x70 => EqDecimal,
            0x71 => NeDecimal,
            0x72 => LtDecimal,
            0x73 => GtDecimal,
            0x74 => LeDecimal,
            0x75 => GeDecimal,
            0x80 => AndBool,
            0x81 => OrBool,
            0x82 => NotBool,
            0x83 => EqBool,
            0x84 => NeBool,
            0x90 => Jump,
            0x91 => JumpIfFalse,
            0x92 => JumpIfTrue,
            0x93 => Call,
            0x94 => Return,
            0x95 => Halt,
            0xB0 => StrLen,
            0xB1 => StrConcat,
            0xB2 => StrSlice,
            0xB3 => StrIndexGet,
            0xB4 => StrEq,
            0xB5 => StrNe,
            0xB6 => StrLt,
            0xB7 => StrLe,
            0xB8 => StrGt,
            0xB9 => StrGe,
            0xBA => StrFromI64,
            0xBB => StrFromF64,
            0xBC => StrFromBool,
            0xBD => StrFromDecimal,
            0xBE => StrSplit,
            0xBF => StrTrim,
            0xC0 => ArrayNew,
            0xC1 => ArrayPush,
            0xC2 => ArrayGet,
            0xC3 => ArraySet,
            0xC4 => ArrayLen,
            0xD0 => MapNew,
            0xD1 => MapSet,
            0xD2 => MapGet,
            0xD3 => MapHas,
            0xD4 => MapDelete,
            0xD5 => MapLen,
            0xD6 => MapKeys,
            0xE0 => IoOpen,
            0xE1 => IoRead,
            0xE2 => IoWrite,
            0xE3 => IoClose,
            0xE4 => IoStdinRead,
            0xE5 => PrintI64,
            0xE6 => PrintF64,
            0xE7 => PrintBool,
            0xE8 => PrintString,
            0xE9 => PrintArray,
            0xEA => PrintMap,
            0xEB => PrintDecimal,
            0xEC => GcCollect,
            0xED => GcStats,
            0xEE => HostCall,
            0xF0 => JsonParse,
            0xF1 => JsonStringify,
            0xF2 => ChannelNew,
            0xF3 => ChannelSend,
            0xF4 => ChannelRecv,
            0xF5 => IsOk,
            0xF6 => IsErr,
            0xF7 => Unwrap,
            0xF8 => UnwrapOr,
            0xF9 => ErrorCode,
            0xFA => ErrorMsg,
            _ => return None,
        })
    }

    /// Encode this opcode as a byte.
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// The mnemonic used in the `AISLTEXT1` text format. This mapping is
    /// bijective with [`Opcode::from_mnemonic`].
    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            PushInt => "PUSH_INT",
            PushFloat => "PUSH_FLOAT",
            PushBool => "PUSH_BOOL",
            PushString => "PUSH_STRING",
            PushUnit => "PUSH_UNIT",
            Pop => "POP",
            Dup => "DUP",
            LoadLocal => "LOAD_LOCAL",
            StoreLocal => "STORE_LOCAL",
            AddI64 => "ADD_I64",
            SubI64 => "SUB_I64",
            MulI64 => "MUL_I64",
            DivI64 => "DIV_I64",
            ModI64 => "MOD_I64",
            NegI64 => "NEG_I64",
            AbsI64 => "ABS_I64",
            MinI64 => "MIN_I64",
            MaxI64 => "MAX_I64",
            PowI64 => "POW_I64",
            AddF64 => "ADD_F64",
            SubF64 => "SUB_F64",
            MulF64 => "MUL_F64",
            DivF64 => "DIV_F64",
            ModF64 => "MOD_F64",
            NegF64 => "NEG_F64",
            AbsF64 => "ABS_F64",
            MinF64 => "MIN_F64",
            MaxF64 => "MAX_F64",
            SqrtF64 => "SQRT_F64",
            PowF64 => "POW_F64",
            AddDecimal => "ADD_DECIMAL",
            SubDecimal => "SUB_DECIMAL",
            MulDecimal => "MUL_DECIMAL",
            DivDecimal => "DIV_DECIMAL",
            NegDecimal => "NEG_DECIMAL",
            ModDecimal => "MOD_DECIMAL",
            AbsDecimal => "ABS_DECIMAL",
            MinDecimal => "MIN_DECIMAL",
            MaxDecimal => "MAX_DECIMAL",
            EqI64 => "EQ_I64",
            NeI64 => "NE_I64",
            LtI64 => "LT_I64",
            GtI64 => "GT_I64",
            LeI64 => "LE_I64",
            GeI64 => "GE_I64",
            EqF64 => "EQ_F64",
            NeF64 => "NE_F64",
            LtF64 => "LT_F64",
            GtF64 => "GT_F64",
            LeF64 => "LE_F64",
            GeF64 => "GE_F64",
            EqDecimal => "EQ_DECIMAL",
            NeDecimal => "NE_DECIMAL",
            LtDecimal => "LT_DECIMAL",
            GtDecimal => "GT_DECIMAL",
            LeDecimal => "LE_DECIMAL",
            GeDecimal => "GE_DECIMAL",
            AndBool => "AND_BOOL",
            OrBool => "OR_BOOL",
            NotBool => "NOT_BOOL",
            EqBool => "EQ_BOOL",
            NeBool => "NE_BOOL",
            Jump => "JUMP",
            JumpIfFalse => "JUMP_IF_FALSE",
            JumpIfTrue => "JUMP_IF_TRUE",
            Call => "CALL",
            Return => "RETURN",
            Halt => "HALT",
            StrLen => "STR_LEN",
            StrConcat => "STR_CONCAT",
            StrSlice => "STR_SLICE",
            StrIndexGet => "STR_INDEX_GET",
            StrEq => "STR_EQ",
            StrNe => "STR_NE",
            StrLt => "STR_LT",
            StrLe => "STR_LE",
            StrGt => "STR_GT",
            StrGe => "STR_GE",
            StrFromI64 => "STR_FROM_I64",
            StrFromF64 => "STR_FROM_F64",
            StrFromBool => "STR_FROM_BOOL",
            StrFromDecimal => "STR_FROM_DECIMAL",
            StrSplit => "STR_SPLIT",
            StrTrim => "STR_TRIM",
            ArrayNew => "ARRAY_NEW",
            ArrayPush => "ARRAY_PUSH",
            ArrayGet => "ARRAY_GET",
            ArraySet => "ARRAY_SET",
            ArrayLen => "ARRAY_LEN",
            MapNew => "MAP_NEW",
            MapSet => "MAP_SET",
            MapGet => "MAP_GET",
            MapHas => "MAP_HAS",
            MapDelete => "MAP_DELETE",
            MapLen => "MAP_LEN",
            MapKeys => "MAP_KEYS",
            IoOpen => "IO_OPEN",
            IoRead => "IO_READ",
            IoWrite => "IO_WRITE",
            IoClose => "IO_CLOSE",
            IoStdinRead => "IO_STDIN_READ",
            PrintI64 => "PRINT_I64",
            PrintF64 => "PRINT_F64",
            PrintBool => "PRINT_BOOL",
            PrintString => "PRINT_STRING",
            PrintArray => "PRINT_ARRAY",
            PrintMap => "PRINT_MAP",
            PrintDecimal => "PRINT_DECIMAL",
            GcCollect => "GC_COLLECT",
            GcStats => "GC_STATS",
            HostCall => "HOST_CALL",
            JsonParse => "JSON_PARSE",
            JsonStringify => "JSON_STRINGIFY",
            ChannelNew => "CHANNEL_NEW",
            ChannelSend => "CHANNEL_SEND",
            ChannelRecv => "CHANNEL_RECV",
            IsOk => "IS_OK",
            IsErr => "IS_ERR",
            Unwrap => "UNWRAP",
            UnwrapOr => "UNWRAP_OR",
            ErrorCode => "ERROR_CODE",
            ErrorMsg => "ERROR_MSG",
        }
    }

    /// Parse a mnemonic from the `AISLTEXT1` text format back to an opcode.
    /// Unrecognised mnemonics fail the load (return `None`).
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        ALL_OPCODES.iter().copied().find(|op| op.mnemonic() == s)
    }

    /// Whether this opcode is one of the jump instructions.
    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jump | Opcode::JumpIfFalse | Opcode::JumpIfTrue)
    }

    /// Whether this opcode terminates a basic block.
    pub fn is_terminator(self) -> bool {
        self.is_jump() || matches!(self, Opcode::Return | Opcode::Halt)
    }
}

/// Every opcode, used for exhaustive roundtrip testing and mnemonic lookup.
pub const ALL_OPCODES: &[Opcode] = &[
    Opcode::PushInt,
    Opcode::PushFloat,
    Opcode::PushBool,
    Opcode::PushString,
    Opcode::PushUnit,
    Opcode::Pop,
    Opcode::Dup,
    Opcode::LoadLocal,
    Opcode::StoreLocal,
    Opcode::AddI64,
    Opcode::SubI64,
    Opcode::MulI64,
    Opcode::DivI64,
    Opcode::ModI64,
    Opcode::NegI64,
    Opcode::AbsI64,
    Opcode::MinI64,
    Opcode::MaxI64,
    Opcode::PowI64,
    Opcode::AddF64,
    Opcode::SubF64,
    Opcode::MulF64,
    Opcode::DivF64,
    Opcode::ModF64,
    Opcode::NegF64,
    Opcode::AbsF64,
    Opcode::MinF64,
    Opcode::MaxF64,
    Opcode::SqrtF64,
    Opcode::PowF64,
    Opcode::AddDecimal,
    Opcode::SubDecimal,
    Opcode::MulDecimal,
    Opcode::DivDecimal,
    Opcode::NegDecimal,
    Opcode::ModDecimal,
    Opcode::AbsDecimal,
    Opcode::MinDecimal,
    Opcode::MaxDecimal,
    Opcode::EqI64,
    Opcode::NeI64,
    Opcode::LtI64,
    Opcode::GtI64,
    Opcode::LeI64,
    Opcode::GeI64,
    Opcode::EqF64,
    Opcode::NeF64,
    Opcode::LtF64,
    Opcode::GtF64,
    Opcode::LeF64,
    Opcode::GeF64,
    Opcode::EqDecimal,
    Opcode::NeDecimal,
    Opcode::LtDecimal,
    Opcode::GtDecimal,
    Opcode::LeDecimal,
    Opcode::GeDecimal,
    Opcode::AndBool,
    Opcode::OrBool,
    Opcode::NotBool,
    Opcode::EqBool,
    Opcode::NeBool,
    Opcode::Jump,
    Opcode::JumpIfFalse,
    Opcode::JumpIfTrue,
    Opcode::Call,
    Opcode::Return,
    Opcode::Halt,
    Opcode::StrLen,
    Opcode::StrConcat,
    Opcode::StrSlice,
    Opcode::StrIndexGet,
    Opcode::StrEq,
    Opcode::StrNe,
    Opcode::StrLt,
    Opcode::StrLe,
    Opcode::StrGt,
    Opcode::StrGe,
    Opcode::StrFromI64,
    Opcode::StrFromF64,
    Opcode::StrFromBool,
    Opcode::StrFromDecimal,
    Opcode::StrSplit,
    Opcode::StrTrim,
    Opcode::ArrayNew,
    Opcode::ArrayPush,
    Opcode::ArrayGet,
    Opcode::ArraySet,
    Opcode::ArrayLen,
    Opcode::MapNew,
    Opcode::MapSet,
    Opcode::MapGet,
    Opcode::MapHas,
    Opcode::MapDelete,
    Opcode::MapLen,
    Opcode::MapKeys,
    Opcode::IoOpen,
    Opcode::IoRead,
    Opcode::IoWrite,
    Opcode::IoClose,
    Opcode::IoStdinRead,
    Opcode::PrintI64,
    Opcode::PrintF64,
    Opcode::PrintBool,
    Opcode::PrintString,
    Opcode::PrintArray,
    Opcode::PrintMap,
    Opcode::PrintDecimal,
    Opcode::GcCollect,
    Opcode::GcStats,
    Opcode::HostCall,
    Opcode::JsonParse,
    Opcode::JsonStringify,
    Opcode::ChannelNew,
    Opcode::ChannelSend,
    Opcode::ChannelRecv,
    Opcode::IsOk,
    Opcode::IsErr,
    Opcode::Unwrap,
    Opcode::UnwrapOr,
    Opcode::ErrorCode,
    Opcode::ErrorMsg,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_opcodes() {
        for &op in ALL_OPCODES {
            let byte = op.to_u8();
            assert_eq!(Opcode::from_u8(byte), Some(op), "byte 0x{byte:02X}");
        }
    }

    #[test]
    fn mnemonic_roundtrip_all_opcodes() {
        for &op in ALL_OPCODES {
            let name = op.mnemonic();
            assert_eq!(Opcode::from_mnemonic(name), Some(op), "mnemonic {name}");
        }
    }

    #[test]
    fn unknown_opcode_byte_is_none() {
        assert_eq!(Opcode::from_u8(0x0F), None);
        assert_eq!(Opcode::from_u8(0xFF), None);
    }

    #[test]
    fn unknown_mnemonic_is_none() {
        assert_eq!(Opcode::from_mnemonic("NOT_A_REAL_OPCODE"), None);
    }

    #[test]
    fn jump_and_terminator_classification() {
        assert!(Opcode::Jump.is_jump());
        assert!(Opcode::JumpIfFalse.is_jump());
        assert!(!Opcode::Call.is_jump());
        assert!(Opcode::Return.is_terminator());
        assert!(Opcode::Halt.is_terminator());
        assert!(!Opcode::AddI64.is_terminator());
    }
}
