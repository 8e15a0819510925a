// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # HTTP Server
//!
//! The warp filter tree for the REST API. Every filter matches path, then
//! method, then authentication, then body, so an unauthenticated request to
//! a known route is answered with 401 rather than a body error.

use anyhow::Result;
use serde::Serialize;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use tracing::{error, info};
use warp::filters::body::BodyDeserializeError;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::auth::{AuthContext, AuthManager};
use crate::config::ServerConfig;
use crate::database::Database;
use crate::errors::{ApiError, ErrorResponse};
use crate::health::{middleware as health_routes, HealthChecker};
use crate::logging::AppLogger;
use crate::routes::{
    admin::{AdminCreateUserRequest, AdminUpdateUserRequest},
    calculator::{self, BmiRequest, CaloricNeedsRequest},
    trainings::TrainingRequest,
    users::{ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateDailyCaloriesRequest, UpdateProfileRequest},
    AdminRoutes, StatsRoutes, TrainingRoutes, UserRoutes,
};

/// Shared collaborators handed to every request
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub auth_manager: AuthManager,
}

impl AppState {
    pub fn new(database: Database, auth_manager: AuthManager) -> Self {
        Self {
            database,
            auth_manager,
        }
    }

    fn users(&self) -> UserRoutes {
        UserRoutes::new(self.database.clone(), self.auth_manager.clone())
    }

    fn trainings(&self) -> TrainingRoutes {
        TrainingRoutes::new(self.database.clone())
    }

    fn stats(&self) -> StatsRoutes {
        StatsRoutes::new(self.database.clone())
    }

    fn admin(&self) -> AdminRoutes {
        AdminRoutes::new(self.database.clone(), self.auth_manager.clone())
    }
}

/// Bind and serve until the process is stopped
pub async fn run(state: AppState, config: &ServerConfig) -> Result<()> {
    let host: IpAddr = config
        .http_host
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid HTTP_HOST {}: {}", config.http_host, e))?;
    let address = SocketAddr::new(host, config.http_port);

    info!("HTTP server starting on {}", address);
    warp::serve(api(state, &config.security.cors_origins))
        .run(address)
        .await;

    Ok(())
}

/// The complete filter tree: API routes, health probes, CORS, error mapping and request logging
pub fn api(
    state: AppState,
    cors_origins: &[String],
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let cors = cors(cors_origins);
    let log = warp::log::custom(|info| {
        AppLogger::log_api_request(
            info.method().as_str(),
            info.path(),
            info.status().as_u16(),
            info.elapsed().as_millis() as u64,
        );
    });

    let health = health_routes::routes(HealthChecker::new(state.database.clone()));

    user_routes(state.clone())
        .or(training_routes(state.clone()))
        .unify()
        .or(calculator_routes())
        .unify()
        .or(stats_routes(state.clone()))
        .unify()
        .or(admin_routes(state))
        .unify()
        .or(health)
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(cors)
        .with(log)
}

fn cors(origins: &[String]) -> warp::cors::Builder {
    let builder = warp::cors()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"]);

    if origins.iter().any(|origin| origin == "*") {
        builder.allow_any_origin()
    } else {
        builder.allow_origins(origins.iter().map(String::as_str))
    }
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Authenticate from the bearer header, rejecting with an [`ApiError`]
fn with_auth(state: AppState) -> impl Filter<Extract = (AuthContext,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let state = state.clone();
        async move {
            state
                .auth_manager
                .authenticate_request(header.as_deref(), &state.database)
                .await
                .map_err(warp::reject::custom)
        }
    })
}

/// Turn a handler result into a response: `status` on success, the error's own status otherwise
fn respond<T: Serialize>(result: Result<T, ApiError>, status: StatusCode) -> Result<Response, Rejection> {
    Ok(match result {
        Ok(body) => warp::reply::with_status(warp::reply::json(&body), status).into_response(),
        Err(error) => error_reply(&error),
    })
}

fn error_reply(error: &ApiError) -> Response {
    if let ApiError::Internal(source) = error {
        error!("Request failed: {:#}", source);
    }
    warp::reply::with_status(warp::reply::json(&error.to_response()), error.status_code()).into_response()
}

fn user_routes(state: AppState) -> BoxedFilter<(Response,)> {
    let register = warp::path!("register")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(warp::body::json())
        .and_then(|state: AppState, request: RegisterRequest| async move {
            respond(state.users().register(request).await, StatusCode::CREATED)
        });

    let login = warp::path!("login")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(warp::body::json())
        .and_then(|state: AppState, request: LoginRequest| async move {
            respond(state.users().login(request).await, StatusCode::OK)
        });

    let logout = warp::path!("logout")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_auth(state.clone()))
        .and_then(|state: AppState, context: AuthContext| async move {
            respond(state.users().logout(&context).await, StatusCode::OK)
        });

    let change_password = warp::path!("change-password")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_auth(state.clone()))
        .and(warp::body::json())
        .and_then(
            |state: AppState, context: AuthContext, request: ChangePasswordRequest| async move {
                respond(state.users().change_password(&context, request).await, StatusCode::CREATED)
            },
        );

    let list_users = warp::path!("users")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(|state: AppState| async move { respond(state.users().list_users().await, StatusCode::OK) });

    let get_user = warp::path!("users" / i64)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(|user_id: i64, state: AppState| async move {
            respond(state.users().get_user(user_id).await, StatusCode::OK)
        });

    let delete_user = warp::path!("users" / i64)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and(with_auth(state.clone()))
        .and_then(|user_id: i64, state: AppState, context: AuthContext| async move {
            respond(state.users().delete_user(&context, user_id).await, StatusCode::OK)
        });

    let update_profile = warp::path!("userprofiles" / i64)
        .and(warp::put())
        .and(with_state(state.clone()))
        .and(with_auth(state.clone()))
        .and(warp::body::json())
        .and_then(
            |profile_id: i64, state: AppState, context: AuthContext, request: UpdateProfileRequest| async move {
                respond(
                    state.users().update_profile(&context, profile_id, request).await,
                    StatusCode::OK,
                )
            },
        );

    let update_daily_calories = warp::path!("update-daily-calories")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_auth(state))
        .and(warp::body::json())
        .and_then(
            |state: AppState, context: AuthContext, request: UpdateDailyCaloriesRequest| async move {
                respond(
                    state.users().update_daily_calories(&context, request).await,
                    StatusCode::CREATED,
                )
            },
        );

    register
        .or(login)
        .unify()
        .or(logout)
        .unify()
        .or(change_password)
        .unify()
        .or(list_users)
        .unify()
        .or(get_user)
        .unify()
        .or(delete_user)
        .unify()
        .or(update_profile)
        .unify()
        .or(update_daily_calories)
        .unify()
        .boxed()
}

fn training_routes(state: AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("trainings")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_auth(state.clone()))
        .and_then(|state: AppState, context: AuthContext| async move {
            respond(state.trainings().list(&context).await, StatusCode::OK)
        });

    let create = warp::path!("trainings")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_auth(state.clone()))
        .and(warp::body::json())
        .and_then(|state: AppState, context: AuthContext, request: TrainingRequest| async move {
            respond(state.trainings().create(&context, request).await, StatusCode::CREATED)
        });

    let get = warp::path!("trainings" / i64)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_auth(state.clone()))
        .and_then(|training_id: i64, state: AppState, context: AuthContext| async move {
            respond(state.trainings().get(&context, training_id).await, StatusCode::OK)
        });

    let update = warp::path!("trainings" / i64)
        .and(warp::put())
        .and(with_state(state.clone()))
        .and(with_auth(state.clone()))
        .and(warp::body::json())
        .and_then(
            |training_id: i64, state: AppState, context: AuthContext, request: TrainingRequest| async move {
                respond(
                    state.trainings().update(&context, training_id, request).await,
                    StatusCode::OK,
                )
            },
        );

    let delete = warp::path!("trainings" / i64)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and(with_auth(state))
        .and_then(|training_id: i64, state: AppState, context: AuthContext| async move {
            respond(state.trainings().delete(&context, training_id).await, StatusCode::OK)
        });

    list.or(create)
        .unify()
        .or(get)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

fn calculator_routes() -> BoxedFilter<(Response,)> {
    let bmi = warp::path!("bmi")
        .and(warp::post())
        .and(warp::body::json())
        .and_then(|request: BmiRequest| async move { respond(calculator::bmi(request), StatusCode::CREATED) });

    let daily_calories = warp::path!("daily-calories")
        .and(warp::post())
        .and(warp::body::json())
        .and_then(|request: CaloricNeedsRequest| async move {
            respond(calculator::daily_caloric_needs(request), StatusCode::CREATED)
        });

    bmi.or(daily_calories).unify().boxed()
}

fn stats_routes(state: AppState) -> BoxedFilter<(Response,)> {
    let users_number = warp::path!("total-users-number")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(|state: AppState| async move { respond(state.stats().users_number().await, StatusCode::OK) });

    let kilometers_number = warp::path!("total-kilometers-number")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(|state: AppState| async move {
            respond(state.stats().kilometers_number().await, StatusCode::OK)
        });

    let calories_number = warp::path!("total-calories-number")
        .and(warp::get())
        .and(with_state(state))
        .and_then(|state: AppState| async move {
            respond(state.stats().calories_number().await, StatusCode::OK)
        });

    users_number
        .or(kilometers_number)
        .unify()
        .or(calories_number)
        .unify()
        .boxed()
}

fn admin_routes(state: AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("admin" / "users")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_auth(state.clone()))
        .and_then(|state: AppState, context: AuthContext| async move {
            respond(state.admin().list_users(&context).await, StatusCode::OK)
        });

    let create = warp::path!("admin" / "users")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_auth(state.clone()))
        .and(warp::body::json())
        .and_then(
            |state: AppState, context: AuthContext, request: AdminCreateUserRequest| async move {
                respond(state.admin().create_user(&context, request).await, StatusCode::CREATED)
            },
        );

    let get = warp::path!("admin" / "users" / i64)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_auth(state.clone()))
        .and_then(|user_id: i64, state: AppState, context: AuthContext| async move {
            respond(state.admin().get_user(&context, user_id).await, StatusCode::OK)
        });

    let update = warp::path!("admin" / "users" / i64)
        .and(warp::put())
        .and(with_state(state.clone()))
        .and(with_auth(state.clone()))
        .and(warp::body::json())
        .and_then(
            |user_id: i64, state: AppState, context: AuthContext, request: AdminUpdateUserRequest| async move {
                respond(
                    state.admin().update_user(&context, user_id, request).await,
                    StatusCode::OK,
                )
            },
        );

    let delete = warp::path!("admin" / "users" / i64)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and(with_auth(state))
        .and_then(|user_id: i64, state: AppState, context: AuthContext| async move {
            respond(state.admin().delete_user(&context, user_id).await, StatusCode::OK)
        });

    list.or(create)
        .unify()
        .or(get)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

/// Map rejections to the JSON error body
async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if let Some(api_error) = err.find::<ApiError>() {
        return Ok(error_reply(api_error));
    }

    let (status, message, code) = if let Some(e) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {e}"), "bad_request")
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string(), "not_found")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
            "method_not_allowed",
        )
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected a JSON body".to_string(),
            "unsupported_media_type",
        )
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
            "internal_error",
        )
    };

    let body = ErrorResponse { message, error: code };
    Ok(warp::reply::with_status(warp::reply::json(&body), status).into_response())
}
