pub mod gate;
pub mod password;
pub mod token;

pub use gate::{authorize, AuthError, AuthGate, Principal, Role};
pub use password::{hash_password, verify_password, PasswordError};
pub use token::{Claims, ResetToken, TokenError, TokenIssuer};
