//! Request handlers.
//!
//! Every handler is infallible from warp's point of view: component errors are
//! rendered through `ApiError` before they leave this module.

use std::convert::Infallible;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::{json, Value};
use skycast_accounts::AccountResult;
use skycast_weather::{facts, WeatherPayload};
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use crate::error::ApiError;
use crate::AppState;

pub const GREETING: &str = "Hello from SkyCast!";

/// Derived view of a city's payload, selected by the last path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fact {
    CurrentConditions,
    WeekAverageTemp,
    MaxTempDay,
    MinTempDay,
    HighestPrecipDay,
}

impl FromStr for Fact {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "current-conditions" => Ok(Self::CurrentConditions),
            "week-average-temp" => Ok(Self::WeekAverageTemp),
            "max-temp-day" => Ok(Self::MaxTempDay),
            "min-temp-day" => Ok(Self::MinTempDay),
            "highest-precip-day" => Ok(Self::HighestPrecipDay),
            _ => Err(()),
        }
    }
}

impl Fact {
    fn derive(self, payload: &WeatherPayload) -> Result<Value, ApiError> {
        let value = match self {
            Fact::CurrentConditions => Value::Object(facts::current_conditions(payload)),
            Fact::WeekAverageTemp => {
                json!({ "week_average_temp": facts::week_average_temp(payload)? })
            }
            Fact::MaxTempDay => to_value(facts::max_temp_day(payload)?)?,
            Fact::MinTempDay => to_value(facts::min_temp_day(payload)?)?,
            Fact::HighestPrecipDay => to_value(facts::highest_precip_day(payload)?)?,
        };
        Ok(value)
    }
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub old_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}

fn json_response(value: &Value, status: StatusCode) -> Response {
    reply::with_status(reply::json(value), status).into_response()
}

fn respond(result: Result<Response, ApiError>) -> Result<Response, Infallible> {
    Ok(result.unwrap_or_else(ApiError::into_response))
}

/// Absent, null and empty fields all count as missing.
fn required(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.is_empty())
}

/// Path segments arrive percent-encoded.
fn decode_city(raw: &str) -> Result<String, ApiError> {
    let city = urlencoding::decode(raw)
        .map_err(|_| ApiError::bad_request("City must be valid UTF-8"))?
        .into_owned();
    if city.trim().is_empty() {
        return Err(ApiError::bad_request("City is required"));
    }
    Ok(city)
}

async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> AccountResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Account task failed: {}", e)))?
        .map_err(ApiError::from)
}

pub async fn home() -> Result<impl Reply, Infallible> {
    Ok(GREETING)
}

pub async fn health() -> Result<impl Reply, Infallible> {
    tracing::debug!("Health check");
    Ok(reply::json(&json!({ "status": "healthy" })))
}

/// Full payload for a city.
pub async fn weather(city: String, state: AppState) -> Result<Response, Infallible> {
    respond(weather_reply(city, state).await)
}

async fn weather_reply(city: String, state: AppState) -> Result<Response, ApiError> {
    let city = decode_city(&city)?;
    let payload = state.weather.load_or_fetch(&city).await?;
    Ok(json_response(&to_value(&payload)?, StatusCode::OK))
}

/// One derived fact for a city.
pub async fn weather_fact(
    city: String,
    fact: Fact,
    state: AppState,
) -> Result<Response, Infallible> {
    respond(weather_fact_reply(city, fact, state).await)
}

async fn weather_fact_reply(
    city: String,
    fact: Fact,
    state: AppState,
) -> Result<Response, ApiError> {
    let city = decode_city(&city)?;
    let payload = state.weather.load_or_fetch(&city).await?;
    Ok(json_response(&fact.derive(&payload)?, StatusCode::OK))
}

/// Drop a city's cache entry.
pub async fn invalidate_cache(city: String, state: AppState) -> Result<Response, Infallible> {
    respond(invalidate_cache_reply(city, state).await)
}

async fn invalidate_cache_reply(city: String, state: AppState) -> Result<Response, ApiError> {
    let city = decode_city(&city)?;
    let invalidated = state.weather.invalidate(&city).await?;
    Ok(json_response(&json!({ "invalidated": invalidated }), StatusCode::OK))
}

/// Drop every city's cache entry.
pub async fn clear_cache(state: AppState) -> Result<Response, Infallible> {
    respond(
        state
            .weather
            .clear()
            .await
            .map(|cleared| json_response(&json!({ "cleared": cleared }), StatusCode::OK))
            .map_err(ApiError::from),
    )
}

pub async fn create_account(
    body: CredentialsRequest,
    state: AppState,
) -> Result<Response, Infallible> {
    respond(create_account_reply(body, state).await)
}

async fn create_account_reply(
    body: CredentialsRequest,
    state: AppState,
) -> Result<Response, ApiError> {
    let (Some(username), Some(password)) = (required(body.username), required(body.password))
    else {
        return Err(ApiError::bad_request("Username and password are required"));
    };

    let accounts = state.accounts.clone();
    run_blocking(move || accounts.create_account(&username, &password)).await?;

    Ok(json_response(
        &json!({ "message": "Account created successfully" }),
        StatusCode::CREATED,
    ))
}

pub async fn login(body: CredentialsRequest, state: AppState) -> Result<Response, Infallible> {
    respond(login_reply(body, state).await)
}

async fn login_reply(body: CredentialsRequest, state: AppState) -> Result<Response, ApiError> {
    let (Some(username), Some(password)) = (required(body.username), required(body.password))
    else {
        return Err(ApiError::bad_request("Username and password are required"));
    };

    let accounts = state.accounts.clone();
    if !run_blocking(move || accounts.authenticate(&username, &password)).await? {
        return Err(ApiError::Unauthorized);
    }

    Ok(json_response(&json!({ "message": "Login successful" }), StatusCode::OK))
}

pub async fn update_password(
    body: UpdatePasswordRequest,
    state: AppState,
) -> Result<Response, Infallible> {
    respond(update_password_reply(body, state).await)
}

async fn update_password_reply(
    body: UpdatePasswordRequest,
    state: AppState,
) -> Result<Response, ApiError> {
    let (Some(username), Some(old_password), Some(new_password)) = (
        required(body.username),
        required(body.old_password),
        required(body.new_password),
    ) else {
        return Err(ApiError::bad_request(
            "Username, old password, and new password are required",
        ));
    };

    let accounts = state.accounts.clone();
    run_blocking(move || accounts.update_password(&username, &old_password, &new_password))
        .await?;

    Ok(json_response(
        &json!({ "message": "Password updated successfully" }),
        StatusCode::OK,
    ))
}
