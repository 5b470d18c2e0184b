// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The four single-byte code spaces the VM reports measurements in, and the source
//! attribution that may travel with an opcode.
//!
//! Codes are plain newtypes rather than enums: the VM hands us raw bytes and any byte must be
//! representable, including ones this table has never heard of. Those render as [`UNKNOWN`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of any code that has no entry in its space's table.
pub const UNKNOWN: &str = "Unknown";

macro_rules! code_space {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($konst:ident = $code:literal => $label:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u8);

        impl $name {
            $(pub const $konst: $name = $name($code);)*

            const NAMES: [Option<&'static str>; 256] = {
                let mut names: [Option<&'static str>; 256] = [None; 256];
                $(names[$code as usize] = Some($label);)*
                names
            };

            #[inline]
            pub const fn code(self) -> u8 {
                self.0
            }

            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub fn name(self) -> &'static str {
                Self::NAMES[self.index()].unwrap_or(UNKNOWN)
            }

            /// Whether this code has an entry in the name table.
            pub fn is_known(self) -> bool {
                Self::NAMES[self.index()].is_some()
            }
        }

        impl From<u8> for $name {
            fn from(code: u8) -> Self {
                $name(code)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

code_space! {
    /// One bytecode instruction.
    Op {
        INVALID = 0x00 => "OpInvalid",
        HALT = 0x01 => "OpHalt",
        NOOP = 0x02 => "OpNoop",
        EXEC = 0x03 => "OpExec",
        PRECALL = 0x04 => "OpPrecall",
        CALL = 0x05 => "OpCall",
        CALL_NATIVE_BODY = 0x06 => "OpCallNativeBody",
        RETURN = 0x07 => "OpReturn",
        RETURN_FROM_BLOCK = 0x08 => "OpReturnFromBlock",
        RETURN_TO_BLOCK = 0x09 => "OpReturnToBlock",
        DEFER = 0x0A => "OpDefer",
        CALL_DEFERRED_NATIVE_BODY = 0x0B => "OpCallDeferNativeBody",
        GO = 0x0C => "OpGo",
        SELECT = 0x0D => "OpSelect",
        SWITCH_CLAUSE = 0x0E => "OpSwitchClause",
        SWITCH_CLAUSE_CASE = 0x0F => "OpSwitchClauseCase",
        TYPE_SWITCH = 0x10 => "OpTypeSwitch",
        IF_COND = 0x11 => "OpIfCond",
        POP_VALUE = 0x12 => "OpPopValue",
        POP_RESULTS = 0x13 => "OpPopResults",
        POP_BLOCK = 0x14 => "OpPopBlock",
        POP_FRAME_AND_RESET = 0x15 => "OpPopFrameAndReset",
        PANIC1 = 0x16 => "OpPanic1",
        PANIC2 = 0x17 => "OpPanic2",
        RETURN_CALL_DEFERS = 0x18 => "OpReturnCallDefers",

        UPOS = 0x20 => "OpUpos",
        UNEG = 0x21 => "OpUneg",
        UNOT = 0x22 => "OpUnot",
        UXOR = 0x23 => "OpUxor",
        URECV = 0x25 => "OpUrecv",
        LOR = 0x26 => "OpLor",
        LAND = 0x27 => "OpLand",
        EQL = 0x28 => "OpEql",
        NEQ = 0x29 => "OpNeq",
        LSS = 0x2A => "OpLss",
        LEQ = 0x2B => "OpLeq",
        GTR = 0x2C => "OpGtr",
        GEQ = 0x2D => "OpGeq",
        ADD = 0x2E => "OpAdd",
        SUB = 0x2F => "OpSub",
        BOR = 0x30 => "OpBor",
        XOR = 0x31 => "OpXor",
        MUL = 0x32 => "OpMul",
        QUO = 0x33 => "OpQuo",
        REM = 0x34 => "OpRem",
        SHL = 0x35 => "OpShl",
        SHR = 0x36 => "OpShr",
        BAND = 0x37 => "OpBand",
        BANDN = 0x38 => "OpBandn",

        EVAL = 0x40 => "OpEval",
        BINARY1 = 0x41 => "OpBinary1",
        INDEX1 = 0x42 => "OpIndex1",
        INDEX2 = 0x43 => "OpIndex2",
        SELECTOR = 0x44 => "OpSelector",
        SLICE = 0x45 => "OpSlice",
        STAR = 0x46 => "OpStar",
        REF = 0x47 => "OpRef",
        TYPE_ASSERT1 = 0x48 => "OpTypeAssert1",
        TYPE_ASSERT2 = 0x49 => "OpTypeAssert2",
        STATIC_TYPE_OF = 0x4A => "OpStaticTypeOf",
        COMPOSITE_LIT = 0x4B => "OpCompositeLit",
        ARRAY_LIT = 0x4C => "OpArrayLit",
        SLICE_LIT = 0x4D => "OpSliceLit",
        SLICE_LIT2 = 0x4E => "OpSliceLit2",
        MAP_LIT = 0x4F => "OpMapLit",
        STRUCT_LIT = 0x50 => "OpStructLit",
        FUNC_LIT = 0x51 => "OpFuncLit",
        CONVERT = 0x52 => "OpConvert",

        FIELD_TYPE = 0x70 => "OpFieldType",
        ARRAY_TYPE = 0x71 => "OpArrayType",
        SLICE_TYPE = 0x72 => "OpSliceType",
        POINTER_TYPE = 0x73 => "OpPointerType",
        INTERFACE_TYPE = 0x74 => "OpInterfaceType",
        CHAN_TYPE = 0x75 => "OpChanType",
        FUNC_TYPE = 0x76 => "OpFuncType",
        MAP_TYPE = 0x77 => "OpMapType",
        STRUCT_TYPE = 0x78 => "OpStructType",

        ASSIGN = 0x80 => "OpAssign",
        ADD_ASSIGN = 0x81 => "OpAddAssign",
        SUB_ASSIGN = 0x82 => "OpSubAssign",
        MUL_ASSIGN = 0x83 => "OpMulAssign",
        QUO_ASSIGN = 0x84 => "OpQuoAssign",
        REM_ASSIGN = 0x85 => "OpRemAssign",
        BAND_ASSIGN = 0x86 => "OpBandAssign",
        BANDN_ASSIGN = 0x87 => "OpBandnAssign",
        BOR_ASSIGN = 0x88 => "OpBorAssign",
        XOR_ASSIGN = 0x89 => "OpXorAssign",
        SHL_ASSIGN = 0x8A => "OpShlAssign",
        SHR_ASSIGN = 0x8B => "OpShrAssign",
        DEFINE = 0x8C => "OpDefine",
        INC = 0x8D => "OpInc",
        DEC = 0x8E => "OpDec",

        VALUE_DECL = 0x90 => "OpValueDecl",
        TYPE_DECL = 0x91 => "OpTypeDecl",

        STICKY = 0xD0 => "OpSticky",
        BODY = 0xD1 => "OpBody",
        FOR_LOOP = 0xD2 => "OpForLoop",
        RANGE_ITER = 0xD3 => "OpRangeIter",
        RANGE_ITER_STRING = 0xD4 => "OpRangeIterString",
        RANGE_ITER_MAP = 0xD5 => "OpRangeIterMap",
        RANGE_ITER_ARRAY_PTR = 0xD6 => "OpRangeIterArrayPtr",
    }
}

code_space! {
    /// A state-store access performed while executing.
    StoreOp {
        GET_OBJECT = 0x01 => "StoreGetObject",
        SET_OBJECT = 0x02 => "StoreSetObject",
        DELETE_OBJECT = 0x03 => "StoreDeleteObject",
        GET_TYPE = 0x04 => "StoreGetType",
        SET_TYPE = 0x05 => "StoreSetType",
        GET_BLOCK_NODE = 0x06 => "StoreGetBlockNode",
        SET_BLOCK_NODE = 0x07 => "StoreSetBlockNode",
        GET_PACKAGE_REALM = 0x08 => "StoreGetPackageRealm",
        SET_PACKAGE_REALM = 0x09 => "StoreSetPackageRealm",
        ADD_MEM_PACKAGE = 0x0A => "StoreAddMemPackage",
        GET_MEM_PACKAGE = 0x0B => "StoreGetMemPackage",
        GET_PACKAGE = 0x0C => "StoreGetPackage",
        SET_PACKAGE = 0x0D => "StoreSetPackage",
        AMINO_MARSHAL = 0x0E => "StoreAminoMarshal",
        AMINO_UNMARSHAL = 0x0F => "StoreAminoUnmarshal",
        FINALIZE_TX = 0x10 => "StoreFinalizeTx",
    }
}

code_space! {
    /// A VM builtin invoked without executing bytecode.
    NativeOp {
        PRINT = 0x01 => "NativePrint",
        PRINT_1 = 0x02 => "NativePrint_1",
        PRINT_1000 = 0x03 => "NativePrint_1000",
        PRINT_10000 = 0x04 => "NativePrint_10000",
        SHA256 = 0x10 => "NativeSha256",
        KECCAK256 = 0x11 => "NativeKeccak256",
        VERIFY_ED25519 = 0x12 => "NativeVerifyEd25519",
        EMIT_EVENT = 0x20 => "NativeEmitEvent",
        GET_CONTEXT = 0x21 => "NativeGetContext",
        DERIVE_ADDRESS = 0x22 => "NativeDeriveAddress",
        BANKER_GET_COINS = 0x30 => "NativeBankerGetCoins",
        BANKER_SEND_COINS = 0x31 => "NativeBankerSendCoins",
        BANKER_TOTAL_COIN = 0x32 => "NativeBankerTotalCoin",
    }
}

code_space! {
    /// A finer-grained step inside an opcode.
    SubOp {
        DEFINE = 0x01 => "SubOpDefine",
        ASSIGN = 0x02 => "SubOpAssign",
        ASSIGN_INDEX = 0x03 => "SubOpAssignIndex",
        ASSIGN_FIELD = 0x04 => "SubOpAssignField",
        EVAL_INDEX = 0x05 => "SubOpEvalIndex",
        EVAL_SELECTOR = 0x06 => "SubOpEvalSelector",
        EVAL_CALL_ARGS = 0x07 => "SubOpEvalCallArgs",
        COPY_VALUE = 0x08 => "SubOpCopyValue",
        ALLOCATE = 0x09 => "SubOpAllocate",
    }
}

/// Source attribution for an in-flight opcode. An empty `file` or a non-positive `line`
/// means the opcode is not attributed to any location.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpContext {
    pub file: String,
    pub line: i32,
    pub func: String,
    pub pkg_path: String,
}

impl OpContext {
    pub fn new(file: impl Into<String>, line: i32) -> Self {
        Self {
            file: file.into(),
            line,
            ..Default::default()
        }
    }

    pub fn with_func(mut self, func: impl Into<String>) -> Self {
        self.func = func.into();
        self
    }

    pub fn with_pkg_path(mut self, pkg_path: impl Into<String>) -> Self {
        self.pkg_path = pkg_path.into();
        self
    }

    pub fn is_attributed(&self) -> bool {
        !self.file.is_empty() && self.line > 0
    }

    pub fn location_key(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

/// Variable attribution for a sub-op.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SubOpContext {
    #[default]
    None,
    Var(String),
    Index(usize),
}

impl SubOpContext {
    pub fn var(name: impl Into<String>) -> Self {
        SubOpContext::Var(name.into())
    }

    pub fn index(index: usize) -> Self {
        SubOpContext::Index(index)
    }

    /// Key used to aggregate variable statistics; positional variables are keyed `#<index>`.
    pub fn var_key(&self) -> Option<String> {
        match self {
            SubOpContext::None => None,
            SubOpContext::Var(name) if name.is_empty() => None,
            SubOpContext::Var(name) => Some(name.clone()),
            SubOpContext::Index(i) => Some(format!("#{i}")),
        }
    }
}

/// One frame of the VM call stack.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StackFrame {
    pub func: String,
    pub file: String,
    pub line: i32,
    pub pkg_path: String,
}

impl StackFrame {
    pub fn new(func: impl Into<String>, file: impl Into<String>, line: i32) -> Self {
        Self {
            func: func.into(),
            file: file.into(),
            line,
            pkg_path: String::new(),
        }
    }

    pub fn with_pkg_path(mut self, pkg_path: impl Into<String>) -> Self {
        self.pkg_path = pkg_path.into();
        self
    }

    /// Leaf frame for an attributed opcode context.
    pub(crate) fn from_context(ctx: &OpContext) -> Self {
        Self {
            func: ctx.func.clone(),
            file: ctx.file.clone(),
            line: ctx.line,
            pkg_path: ctx.pkg_path.clone(),
        }
    }

    /// Display name used in flame graphs: the function if known, otherwise `file:line`.
    pub fn display_name(&self) -> String {
        if self.func.is_empty() {
            format!("{}:{}", self.file, self.line)
        } else {
            self.func.clone()
        }
    }
}

#[cfg(test)]
#[path = "unit_tests/ops_tests.rs"]
mod ops_tests;
