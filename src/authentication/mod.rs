mod jwt;
mod middleware;
mod password;

pub use jwt::{Claims, JwtKeys};
pub use middleware::*;
pub use password::*;
