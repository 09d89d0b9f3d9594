#![allow(dead_code)]

use fancast::{InterfaceId, MethodCall, MethodId, ReturnKind};

// ============================================================================
// Test Interfaces
// ============================================================================

pub struct Speech;
pub struct Clicks;

pub fn speech() -> InterfaceId {
    InterfaceId::of::<Speech>()
}

pub fn clicks() -> InterfaceId {
    InterfaceId::of::<Clicks>()
}

// ============================================================================
// Test Methods
// ============================================================================

pub const SPEAK: MethodId = MethodId::new("speak", ReturnKind::Value);
pub const IS_MUTED: MethodId = MethodId::new("is_muted", ReturnKind::Bool);
pub const COUNT: MethodId = MethodId::new("count", ReturnKind::Int);
pub const PING: MethodId = MethodId::new("ping", ReturnKind::Void);

pub fn speak() -> MethodCall {
    MethodCall::new(SPEAK)
}
