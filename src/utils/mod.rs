//! Cryptographic primitives for session tokens

pub mod crypto;
