// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use super::*;

#[test]
fn known_codes_have_prefixed_names() {
    assert_eq!(Op::ADD.name(), "OpAdd");
    assert_eq!(Op::MUL.to_string(), "OpMul");
    assert_eq!(StoreOp::GET_OBJECT.name(), "StoreGetObject");
    assert_eq!(NativeOp::PRINT.name(), "NativePrint");
    assert_eq!(SubOp::DEFINE.name(), "SubOpDefine");
}

#[test]
fn unknown_codes_use_sentinel_in_every_space() {
    assert_eq!(Op(0xFF).name(), UNKNOWN);
    assert_eq!(StoreOp(0xFF).name(), UNKNOWN);
    assert_eq!(NativeOp(0xFF).name(), UNKNOWN);
    assert_eq!(SubOp(0xFF).name(), UNKNOWN);
    assert_eq!(StoreOp(0).to_string(), "Unknown");
    assert!(!Op(0x24).is_known());
    assert!(Op::ADD.is_known());
}

#[test]
fn every_code_renders() {
    for code in 0..=u8::MAX {
        assert!(!Op(code).name().is_empty());
        assert!(!StoreOp(code).name().is_empty());
        assert!(!NativeOp(code).name().is_empty());
        assert!(!SubOp(code).name().is_empty());
    }
}

#[test]
fn context_attribution() {
    assert!(OpContext::new("main.gno", 12).is_attributed());
    assert!(!OpContext::new("", 12).is_attributed());
    assert!(!OpContext::new("main.gno", 0).is_attributed());
    assert!(!OpContext::new("main.gno", -3).is_attributed());
    assert!(!OpContext::default().is_attributed());
    assert_eq!(OpContext::new("main.gno", 12).location_key(), "main.gno:12");
}

#[test]
fn sub_op_var_keys() {
    assert_eq!(SubOpContext::var("x").var_key().as_deref(), Some("x"));
    assert_eq!(SubOpContext::index(2).var_key().as_deref(), Some("#2"));
    assert_eq!(SubOpContext::var("").var_key(), None);
    assert_eq!(SubOpContext::None.var_key(), None);
}

#[test]
fn frame_display_falls_back_to_location() {
    assert_eq!(StackFrame::new("Transfer", "token.gno", 40).display_name(), "Transfer");
    assert_eq!(StackFrame::new("", "token.gno", 40).display_name(), "token.gno:40");
}
