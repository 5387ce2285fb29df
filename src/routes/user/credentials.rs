use actix_web::{web, HttpResponse};

use super::authorize;
use crate::{
    accounts::{AccountError, Accounts, CredentialUpdate},
    authentication::Claims,
    domain::UserId,
};

pub async fn change_credentials(
    id: web::Path<i32>,
    update: web::Json<CredentialUpdate>,
    claims: web::ReqData<Claims>,
    accounts: web::Data<Accounts>,
) -> Result<HttpResponse, AccountError> {
    let user_id = UserId(id.into_inner());
    authorize(&claims, user_id)?;

    accounts
        .change_credentials(user_id, update.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "ok" })))
}
