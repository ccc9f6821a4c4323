//! # parlor-auth
//!
//! Bearer tokens for the live channel and HTTP triggers. Token issuance
//! belongs to the account service; this crate verifies tokens and can
//! mint them for tests and local tooling.

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
