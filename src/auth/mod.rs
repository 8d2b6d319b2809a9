//! Service-account authentication: assertion signing and token exchange.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`AssertionBuilder`] | Builds the RS256-signed JWT assertion |
//! | [`TokenExchangeClient`] | Trades the assertion for an [`AccessToken`] |
//! | [`TokenCache`] | Optional reuse of tokens until shortly before expiry |

mod assertion;
mod cache;
mod exchange;

pub use assertion::{
    Assertion, AssertionBuilder, Claims, Clock, FixedClock, JwtHeader, SystemClock,
    ASSERTION_LIFETIME_SECS, CLOUD_PLATFORM_SCOPE,
};
pub use cache::{TokenCache, DEFAULT_REFRESH_MARGIN};
pub use exchange::{AccessToken, TokenExchangeClient, JWT_BEARER_GRANT_TYPE};
