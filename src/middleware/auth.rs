use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method},
    web, Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::LocalBoxFuture;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::{ready, Ready};
use std::ops::Deref;
use std::rc::Rc;

use crate::models::{Role, User};
use crate::services::{auth_service, token_service};
use crate::state::AppState;
use crate::utils::AppError;

/// Who may call a method on a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    /// Anyone; a valid token still identifies the caller
    Public,
    Authenticated,
    /// Authenticated with one of these roles; an empty list admits nobody
    Roles(Vec<Role>),
}

impl Access {
    pub fn admin() -> Self {
        Access::Roles(vec![Role::Admin])
    }
}

/// Per-resource allow-list of methods. Methods without an entry are refused.
#[derive(Clone, Default)]
pub struct AccessPolicy {
    rules: HashMap<Method, Access>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, method: Method, access: Access) -> Self {
        self.rules.insert(method, access);
        self
    }

    pub fn rule(&self, method: &Method) -> Option<&Access> {
        self.rules.get(method)
    }
}

/// Authenticated caller, re-read from storage on every request
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl Deref for AuthUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req.extensions().get::<AuthUser>().cloned();
        ready(user.ok_or_else(|| AppError::Unauthorized("Authentication required.".into()).into()))
    }
}

/// Optional caller for routes that serve both anonymous and signed-in users
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }

    pub fn describe(&self) -> &str {
        self.0.as_ref().map(|u| u.email.as_str()).unwrap_or("anonymous")
    }
}

impl FromRequest for Viewer {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req.extensions().get::<AuthUser>().map(|u| u.0.clone());
        ready(Ok(Viewer(user)))
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn is_websocket_upgrade(req: &ServiceRequest) -> bool {
    req.headers()
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

/// Bearer header first; `?token=` is honoured only on WebSocket upgrades
fn request_token(req: &ServiceRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(token_service::bearer_token)
        .map(String::from);
    if from_header.is_some() || !is_websocket_upgrade(req) {
        return from_header;
    }

    web::Query::<TokenQuery>::from_query(req.query_string())
        .ok()
        .and_then(|q| q.into_inner().token)
        .filter(|t| !t.is_empty())
}

fn required_roles_message(roles: &[Role]) -> String {
    let names: Vec<String> = roles.iter().map(Role::to_string).collect();
    format!(
        "You do not have the necessary permissions. Required role(s): {}.",
        names.join(", ")
    )
}

/// Runs the policy for one request; on success the caller (if any) is in the extensions
async fn authorize(req: &ServiceRequest, access: Option<Access>) -> Result<(), AppError> {
    let Some(access) = access else {
        log::warn!("❌ {} {} refused: method not allowed by policy", req.method(), req.path());
        return Err(AppError::Forbidden("Access to this resource is not allowed.".into()));
    };

    let state = req
        .app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("Application state is not configured.".into()))?;
    let token = request_token(req);

    match access {
        Access::Public => {
            if let Some(token) = token {
                match auth_service::authenticate(state.store(), &state.config, &token).await {
                    Ok(user) => {
                        req.extensions_mut().insert(AuthUser(user));
                    }
                    // Public routes fall back to anonymous on a bad token
                    Err(e) => log::debug!("Ignoring token on public route {}: {}", req.path(), e),
                }
            }
        }
        Access::Authenticated | Access::Roles(_) => {
            let token = token.ok_or_else(|| {
                log::warn!("❌ {} {} refused: missing token", req.method(), req.path());
                AppError::Unauthorized("Missing authentication token.".into())
            })?;
            let user = auth_service::authenticate(state.store(), &state.config, &token)
                .await
                .map_err(|e| {
                    log::warn!("❌ {} {} refused: {}", req.method(), req.path(), e);
                    e
                })?;

            if let Access::Roles(roles) = &access {
                if !roles.contains(&user.role) {
                    log::warn!("❌ {} {} refused for {} ({})", req.method(), req.path(), user.email, user.role);
                    return Err(AppError::Forbidden(required_roles_message(roles)));
                }
            }
            req.extensions_mut().insert(AuthUser(user));
        }
    }
    Ok(())
}

impl<S, B> Transform<S, ServiceRequest> for AccessPolicy
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            policy: Rc::new(self.clone()),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    policy: Rc<AccessPolicy>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let access = self.policy.rule(req.method()).cloned();

        Box::pin(async move {
            if let Err(err) = authorize(&req, access).await {
                return Ok(req.error_response(err).map_into_right_body());
            }
            service.call(req).await.map(ServiceResponse::map_into_left_body)
        })
    }
}
