pub mod auth;
pub mod rate_limit;
pub mod response;

pub use auth::{authorize, protect, AllowedRoles};
pub use rate_limit::{rate_limit, RateLimiter};
pub use response::{ApiResponse, ApiResult};
