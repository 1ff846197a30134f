use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use tracing::{debug, warn};
use warp::http::StatusCode;
use warp::{Rejection, reject};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub slug: &'static str,
}

/// Rejection carrying a classified service error.
#[derive(Debug, Clone, Copy)]
pub struct ApiError {
    pub slug: &'static str,
    pub class: ErrorClass,
}

impl reject::Reject for ApiError {}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let class = error.class();
        match class {
            ErrorClass::Internal => warn!(error = %error, "request failed"),
            _ => debug!(error = %error, "request rejected"),
        }
        ApiError {
            slug: error.slug(),
            class,
        }
    }
}

pub fn rejection(error: AuthError) -> Rejection {
    reject::custom(ApiError::from(error))
}

fn status_of(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::BadRequest => StatusCode::BAD_REQUEST,
        ErrorClass::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Conflict => StatusCode::CONFLICT,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (slug, status) = if let Some(api) = err.find::<ApiError>() {
        (api.slug, status_of(api.class))
    } else if err.is_not_found() {
        ("not-found", StatusCode::NOT_FOUND)
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some()
        || err.find::<warp::reject::PayloadTooLarge>().is_some()
        || err.find::<warp::reject::UnsupportedMediaType>().is_some()
    {
        (InputError::Malformed.slug(), StatusCode::BAD_REQUEST)
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ("method-not-allowed", StatusCode::METHOD_NOT_ALLOWED)
    } else {
        warn!("unhandled rejection: {:?}", err);
        ("internal-server-error", StatusCode::INTERNAL_SERVER_ERROR)
    };

    let json = warp::reply::json(&ErrorResponse { slug });
    Ok(warp::reply::with_status(json, status))
}
