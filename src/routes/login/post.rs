use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::{
    accounts::{AccountError, Accounts, LoginAttempt},
    domain::UserId,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    message: &'static str,
    user_id: UserId,
    username: String,
    email: Option<String>,
    token: String,
}

pub async fn login(
    login_data: web::Json<LoginAttempt>,
    accounts: web::Data<Accounts>,
) -> Result<HttpResponse, AccountError> {
    let success = accounts.login(login_data.into_inner()).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        message: "ok",
        user_id: success.user.id,
        username: success.user.username,
        email: success.user.email,
        token: success.token,
    }))
}
