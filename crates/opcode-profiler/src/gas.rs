// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::ops::Op;

/// Cost charged for any opcode without a calibrated entry. Never zero, so executed but
/// uncalibrated opcodes still show up in gas-weighted reports.
pub const DEFAULT_OP_GAS: i64 = 1;

// Opcode and its calibrated cost.
const CALIBRATED_OP_GAS: &[(Op, i64)] = &[
    //
    // Control flow
    //

    // Call setup and teardown touch frames and blocks, so they dominate simple control flow
    (Op::HALT, 1),
    (Op::NOOP, 1),
    (Op::EXEC, 25),
    (Op::PRECALL, 207),
    (Op::CALL, 256),
    (Op::CALL_NATIVE_BODY, 424),
    (Op::RETURN, 38),
    (Op::RETURN_FROM_BLOCK, 36),
    (Op::RETURN_TO_BLOCK, 23),
    (Op::DEFER, 64),
    (Op::CALL_DEFERRED_NATIVE_BODY, 33),
    (Op::GO, 1),
    (Op::SELECT, 1),
    (Op::SWITCH_CLAUSE, 38),
    (Op::SWITCH_CLAUSE_CASE, 143),
    (Op::TYPE_SWITCH, 171),
    (Op::IF_COND, 38),
    (Op::POP_VALUE, 1),
    (Op::POP_RESULTS, 1),
    (Op::POP_BLOCK, 3),
    (Op::POP_FRAME_AND_RESET, 15),
    (Op::PANIC1, 121),
    (Op::PANIC2, 21),
    (Op::RETURN_CALL_DEFERS, 78),
    //
    // Unary and binary operators
    //

    // All of these work on values already on the stack; no allocation
    (Op::UPOS, 7),
    (Op::UNEG, 25),
    (Op::UNOT, 6),
    (Op::UXOR, 14),
    (Op::LOR, 26),
    (Op::LAND, 24),
    (Op::EQL, 160),
    (Op::NEQ, 95),
    (Op::LSS, 13),
    (Op::LEQ, 19),
    (Op::GTR, 20),
    (Op::GEQ, 26),
    (Op::ADD, 18),
    (Op::SUB, 6),
    (Op::BOR, 23),
    (Op::XOR, 13),
    (Op::MUL, 19),
    (Op::QUO, 16),
    (Op::REM, 18),
    (Op::SHL, 22),
    (Op::SHR, 20),
    (Op::BAND, 9),
    (Op::BANDN, 15),
    //
    // Expressions
    //
    (Op::EVAL, 29),
    (Op::BINARY1, 19),
    (Op::INDEX1, 77),
    (Op::INDEX2, 195),
    (Op::SELECTOR, 32),
    (Op::SLICE, 103),
    (Op::STAR, 40),
    (Op::REF, 125),
    (Op::TYPE_ASSERT1, 30),
    (Op::TYPE_ASSERT2, 25),
    (Op::STATIC_TYPE_OF, 100),
    // Composite construction allocates and scales with element count
    (Op::COMPOSITE_LIT, 50),
    (Op::ARRAY_LIT, 137),
    (Op::SLICE_LIT, 183),
    (Op::SLICE_LIT2, 467),
    (Op::MAP_LIT, 475),
    (Op::STRUCT_LIT, 179),
    (Op::FUNC_LIT, 61),
    (Op::CONVERT, 16),
    //
    // Assignment and declarations
    //
    (Op::ASSIGN, 79),
    (Op::ADD_ASSIGN, 85),
    (Op::SUB_ASSIGN, 57),
    (Op::MUL_ASSIGN, 55),
    (Op::QUO_ASSIGN, 50),
    (Op::REM_ASSIGN, 46),
    (Op::BAND_ASSIGN, 54),
    (Op::BANDN_ASSIGN, 44),
    (Op::BOR_ASSIGN, 55),
    (Op::XOR_ASSIGN, 48),
    (Op::SHL_ASSIGN, 68),
    (Op::SHR_ASSIGN, 68),
    (Op::DEFINE, 111),
    (Op::INC, 76),
    (Op::DEC, 46),
    (Op::VALUE_DECL, 113),
    (Op::TYPE_DECL, 100),
    //
    // Loops
    //
    (Op::STICKY, 1),
    (Op::BODY, 43),
    (Op::FOR_LOOP, 27),
    (Op::RANGE_ITER, 105),
    (Op::RANGE_ITER_STRING, 55),
    (Op::RANGE_ITER_MAP, 48),
    (Op::RANGE_ITER_ARRAY_PTR, 46),
];

static OP_GAS: [i64; 256] = {
    let mut table = [DEFAULT_OP_GAS; 256];
    let mut i = 0;
    while i < CALIBRATED_OP_GAS.len() {
        let (op, gas) = CALIBRATED_OP_GAS[i];
        table[op.0 as usize] = gas;
        i += 1;
    }
    table
};

/// Static gas cost of `op`.
#[inline]
pub fn get_op_gas(op: Op) -> i64 {
    OP_GAS[op.index()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibrated_entries_are_positive() {
        for (op, gas) in CALIBRATED_OP_GAS {
            assert!(*gas > 0, "{op} has non-positive gas {gas}");
            assert_eq!(get_op_gas(*op), *gas);
        }
    }

    #[test]
    fn uncalibrated_ops_cost_one() {
        assert_eq!(get_op_gas(Op::INVALID), DEFAULT_OP_GAS);
        assert_eq!(get_op_gas(Op(0xFF)), 1);
        assert_eq!(get_op_gas(Op(0x24)), 1);
    }

    #[test]
    fn no_duplicate_calibrations() {
        let mut seen = [false; 256];
        for (op, _) in CALIBRATED_OP_GAS {
            assert!(!seen[op.index()], "{op} calibrated twice");
            seen[op.index()] = true;
        }
    }
}
