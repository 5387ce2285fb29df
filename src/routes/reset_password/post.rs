use actix_web::{web, HttpResponse};

use crate::accounts::{AccountError, Accounts};

#[derive(serde::Deserialize)]
pub struct ResetPasswordData {
    token: Option<String>,
    password: Option<String>,
}

pub async fn reset_password(
    reset_password_data: web::Json<ResetPasswordData>,
    accounts: web::Data<Accounts>,
) -> Result<HttpResponse, AccountError> {
    let ResetPasswordData { token, password } = reset_password_data.into_inner();
    accounts.reset_password(token, password).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "password reset ok" })))
}
