use super::error::rejection;
use super::handler;
use crate::application_port::*;
use crate::domain_model::UserId;
use crate::server::Server;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let auth = server.auth_service.clone();

    let health = warp::get()
        .and(warp::path("health"))
        .and(warp::path::end())
        .and_then(handler::health);

    let sign_in = warp::post()
        .and(warp::path("signIn"))
        .and(warp::path::end())
        .and(json_body())
        .and(client_ip())
        .and(with(auth.clone()))
        .and_then(handler::sign_in);

    let sign_up = warp::post()
        .and(warp::path("signUp"))
        .and(warp::path::end())
        .and(json_body())
        .and(client_ip())
        .and(with(auth.clone()))
        .and_then(handler::sign_up);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(json_body())
        .and(client_ip())
        .and(with(auth.clone()))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(json_body())
        .and(client_ip())
        .and(with(auth.clone()))
        .and_then(handler::logout);

    let logout_all = warp::post()
        .and(warp::path("logoutAll"))
        .and(warp::path::end())
        .and(with_verification(auth.clone()))
        .and(with(auth.clone()))
        .and_then(handler::logout_all);

    let me = warp::get()
        .and(warp::path("me"))
        .and(warp::path::end())
        .and(with_verification(auth.clone()))
        .and(with(auth.clone()))
        .and_then(handler::me);

    let settings = warp::put()
        .and(warp::path("settings"))
        .and(warp::path::end())
        .and(with_verification(auth.clone()))
        .and(json_body())
        .and(with(auth))
        .and_then(handler::update_settings);

    warp::path("users")
        .and(warp::path("api"))
        .and(warp::path("v1"))
        .and(
            health
                .or(sign_in)
                .or(sign_up)
                .or(refresh)
                .or(logout)
                .or(logout_all)
                .or(me)
                .or(settings),
        )
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn json_body<T: DeserializeOwned + Send>()
-> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn client_ip() -> impl Filter<Extract = (String,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("x-real-ip")
        .and(warp::header::optional::<String>("x-forwarded-for"))
        .and(warp::addr::remote())
        .map(
            |real_ip: Option<String>, forwarded_for: Option<String>, remote: Option<SocketAddr>| {
                handler::resolve_client_ip(real_ip.as_deref(), forwarded_for.as_deref(), remote)
            },
        )
}

/// Resolves the caller from `X-API-Token`, falling back to a bearer token.
fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (UserId,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("x-api-token")
        .and(warp::header::optional::<String>("authorization"))
        .and_then(move |api_token: Option<String>, authorization: Option<String>| {
            let auth_service = auth_service.clone();
            async move {
                let token = api_token
                    .or_else(|| {
                        authorization.and_then(|v| v.strip_prefix("Bearer ").map(str::to_string))
                    })
                    .ok_or_else(|| rejection(AuthError::InvalidToken))?;
                let claims = auth_service
                    .validate_access(&token)
                    .await
                    .map_err(rejection)?;
                Ok::<UserId, warp::Rejection>(claims.user_id)
            }
        })
}
