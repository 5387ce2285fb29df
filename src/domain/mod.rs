mod reset_token;
mod user;

pub use reset_token::*;
pub use user::*;
