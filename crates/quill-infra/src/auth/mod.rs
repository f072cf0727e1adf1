//! Authentication implementations.

#[cfg(feature = "auth")]
mod jwt;
mod session;

#[cfg(feature = "auth")]
pub use jwt::{JwtConfig, JwtTokenService};
pub use session::StaticSession;
#[cfg(feature = "auth")]
pub use session::TokenSession;
