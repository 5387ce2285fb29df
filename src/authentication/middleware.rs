use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, ResponseError,
};
use futures_util::{
    future::{ok, Ready},
    FutureExt,
};
use std::{
    future::Future,
    pin::Pin,
    rc::Rc,
    sync::Arc,
    task::{Context, Poll},
};

use super::jwt::JwtKeys;
use crate::accounts::AccountError;

/// Auth gate for protected scopes. Verified `Claims` are placed in the
/// request extensions for handlers to pick up via `web::ReqData<Claims>`.
pub struct JwtMiddleware {
    keys: Arc<JwtKeys>,
}

impl JwtMiddleware {
    pub fn new(keys: Arc<JwtKeys>) -> Self {
        Self { keys }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = JwtMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(JwtMiddlewareService {
            service: Rc::new(service),
            keys: self.keys.clone(),
        })
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    keys: Arc<JwtKeys>,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let keys = self.keys.clone();

        async move {
            let claims = bearer_token(&req).and_then(|token| match keys.verify_jwt(&token) {
                Ok(claims) => Some(claims),
                Err(e) => {
                    tracing::debug!(error = %e, "Rejected bearer token");
                    None
                }
            });

            match claims {
                Some(claims) => {
                    req.extensions_mut().insert(claims);
                    service.call(req).await.map(|res| res.map_into_boxed_body())
                }
                None => Ok(req.into_response(AccountError::Unauthenticated.error_response())),
            }
        }
        .boxed_local()
    }
}
