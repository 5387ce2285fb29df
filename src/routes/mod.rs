mod forgot_password;
mod login;
mod register;
mod reset_password;
mod user;

pub use forgot_password::*;
pub use login::*;
pub use register::*;
pub use reset_password::*;
pub use user::*;
