use actix_web::{web, HttpResponse};

use crate::accounts::{AccountError, Accounts, FORGOT_PASSWORD_MESSAGE};

#[derive(serde::Deserialize)]
pub struct ForgotPasswordRequest {
    email: Option<String>,
}

pub async fn forgot_password(
    forgot_password_request: web::Json<ForgotPasswordRequest>,
    accounts: web::Data<Accounts>,
) -> Result<HttpResponse, AccountError> {
    accounts
        .forgot_password(forgot_password_request.into_inner().email)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": FORGOT_PASSWORD_MESSAGE })))
}
