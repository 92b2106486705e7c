pub mod jwt;
pub mod lockout;
pub mod password;

pub use jwt::{Claims, JwtCodec, TokenStatus};
pub use password::{generate_temp_password, hash_password, validate_password_strength, verify_password};
