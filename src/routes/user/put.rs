use actix_web::{web, HttpResponse};

use super::authorize;
use crate::{
    accounts::{AccountError, Accounts},
    authentication::Claims,
    domain::{ProfileUpdate, UserId, UserProfile},
};

pub async fn update_user(
    id: web::Path<i32>,
    profile: web::Json<ProfileUpdate>,
    claims: web::ReqData<Claims>,
    accounts: web::Data<Accounts>,
) -> Result<HttpResponse, AccountError> {
    let user_id = UserId(id.into_inner());
    authorize(&claims, user_id)?;

    let user = accounts
        .update_profile(user_id, profile.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(UserProfile::from(user)))
}
