use actix_web::{web, HttpResponse};

use super::authorize;
use crate::{
    accounts::{AccountError, Accounts},
    authentication::Claims,
    domain::{UserId, UserProfile},
};

pub async fn get_user_by_id(
    id: web::Path<i32>,
    claims: web::ReqData<Claims>,
    accounts: web::Data<Accounts>,
) -> Result<HttpResponse, AccountError> {
    let user_id = UserId(id.into_inner());
    authorize(&claims, user_id)?;

    let user = accounts.get_profile(user_id).await?;
    Ok(HttpResponse::Ok().json(UserProfile::from(user)))
}
