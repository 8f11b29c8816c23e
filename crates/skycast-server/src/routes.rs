//! Route table.

use std::convert::Infallible;

use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::error::error_response;
use crate::handlers::{self, Fact};
use crate::AppState;

/// Largest accepted JSON body for the account endpoints. Bodies must carry a
/// Content-Length; chunked uploads are refused with 411.
const MAX_BODY_BYTES: u64 = 16 * 1024;

fn with_state(
    state: AppState,
) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// All SkyCast routes, with request tracing and JSON rejection bodies.
pub fn routes(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let home = warp::path::end().and(warp::get()).and_then(handlers::home);

    let health = warp::path!("api" / "health")
        .and(warp::get())
        .and_then(handlers::health);

    let create_account = warp::path!("api" / "create-account")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::create_account);

    let login = warp::path!("api" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::login);

    let update_password = warp::path!("api" / "update-password")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::update_password);

    let weather = warp::path!("api" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::weather);

    let weather_fact = warp::path!("api" / String / Fact)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::weather_fact);

    let invalidate_cache = warp::path!("api" / String / "cache")
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and_then(handlers::invalidate_cache);

    let clear_cache = warp::path!("api" / "cache")
        .and(warp::delete())
        .and(with_state(state))
        .and_then(handlers::clear_cache);

    home.or(health)
        .or(create_account)
        .or(login)
        .or(update_password)
        .or(weather)
        .or(weather_fact)
        .or(invalidate_cache)
        .or(clear_cache)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

/// Render warp rejections as `{"error": ...}` bodies.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some() {
        (StatusCode::BAD_REQUEST, "Request body must be a JSON object")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length required")
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Content-Type must be application/json")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        tracing::error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(error_response(status, message))
}
