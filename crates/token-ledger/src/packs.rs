//! Purchasable token packs

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenPack {
    pub id: &'static str,
    pub name: &'static str,
    pub tokens: u32,
    /// Price in euro cents
    pub price_cents: u32,
}

pub const TOKEN_PACKS: &[TokenPack] = &[
    TokenPack {
        id: "starter",
        name: "Starter",
        tokens: 5,
        price_cents: 99,
    },
    TokenPack {
        id: "pro",
        name: "Pro",
        tokens: 25,
        price_cents: 399,
    },
    TokenPack {
        id: "business",
        name: "Business",
        tokens: 100,
        price_cents: 1299,
    },
];

/// Look up a pack by id, case-insensitively
pub fn find_pack(id: &str) -> Option<&'static TokenPack> {
    TOKEN_PACKS.iter().find(|p| p.id.eq_ignore_ascii_case(id.trim()))
}
