//! Bearer-token identification of the scanning user. Tokens are issued by the
//! account service; this crate only verifies them.

pub mod claims;
pub mod jwt;

pub use jwt::{AuthUser, JwtKeys};
