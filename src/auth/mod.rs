//! Authentication primitives and HTTP handlers: password hashing, bearer tokens.

mod handlers;
mod jwt;
mod password;

pub use handlers::{login, login_form, me, register, register_form};
pub use jwt::{Claims, TokenError, TokenIssuer};
pub use password::PasswordHasher;
