use actix_web::{web, HttpResponse};

use crate::accounts::{AccountError, Accounts, Registration};

pub async fn register(
    register_data: web::Json<Registration>,
    accounts: web::Data<Accounts>,
) -> Result<HttpResponse, AccountError> {
    let user_id = accounts.register(register_data.into_inner()).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "registered",
        "userId": user_id,
    })))
}
