// src/routes.rs
use std::sync::Arc;
use warp::reject::Rejection;
use crate::handlers::{marketcap::get_marketcap_data, marketcap::get_marketcap_page,
                     profile::get_profile_data, profile::get_profile_page};
use crate::state::AppState;
use log::info;

use std::convert::Infallible;
use warp::{Filter, Reply};
use crate::handlers::error::ApiError;

// Map rejections to a JSON error body
async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;

    if err.is_not_found() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = "Not Found";
    } else if let Some(api_error) = err.find::<ApiError>() {
        code = api_error.status;
        message = &api_error.message;
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = warp::http::StatusCode::METHOD_NOT_ALLOWED;
        message = "Method Not Allowed";
    } else {
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal Server Error";
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
        })),
        code,
    ))
}

pub fn routes(state: Arc<AppState>) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let state_filter = warp::any().map(move || state.clone());

    let index_route = warp::path::end()
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(get_marketcap_page);

    let marketcap_route = warp::path!("marketcap")
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(get_marketcap_page);

    let profile_route = warp::path!("profile" / String)
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(get_profile_page);

    let marketcap_api_route = warp::path!("api" / "v1" / "marketcap")
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(get_marketcap_data);

    let profile_api_route = warp::path!("api" / "v1" / "profile" / String)
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(get_profile_data);

    info!("All routes configured successfully.");

    index_route
        .or(marketcap_route)
        .or(profile_route)
        .or(marketcap_api_route)
        .or(profile_api_route)
        .recover(handle_rejection)
}
