//! Authentication primitives.
//!
//! - [`PasswordHasher`]: argon2id password hashes in PHC string format
//! - [`TokenIssuer`]: HS256 JSON Web Tokens carrying the user id and role

mod password;
mod token;

pub use password::{HashCost, PasswordHasher, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};
pub use token::{Claims, TokenConfig, TokenError, TokenIssuer};
