// Authentication and authorization.
// Passwords are argon2id PHC strings; sessions are short-lived HS256 JWTs whose
// `jti` can be revoked through the denylist on logout.

pub mod denylist;
pub mod extractor;
pub mod handlers;
pub mod password;
pub mod roles;
pub mod token;

pub use extractor::AuthUser;
