
mod login;
mod password_reset;
mod register;
mod user;
