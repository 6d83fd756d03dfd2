//! Thin compatibility layers exposing the on-chain programs to this app.

pub mod mine;
pub mod operator;
pub mod registry;
pub mod smart_wallet;
