//! Session credentials issued after login or email verification.
//! Used by: handlers, state.

pub mod claims;
pub mod sign;
