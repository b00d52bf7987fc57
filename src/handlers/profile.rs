// src/handlers/profile.rs
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Rejection, Reply};
use log::{error, info, warn};

use crate::services::pages::{build_profile, PageError};
use crate::state::AppState;
use super::error::ApiError;
use super::views::{render, ErrorTemplate, ProfileTemplate};

pub async fn get_profile_page(symbol: String, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    info!("Handling request for profile page of {}", symbol);
    let client = state.client();

    let rendered = match build_profile(&client, &state.config, &symbol, state.today()).await {
        Ok(record) => render(&ProfileTemplate::new(&record), StatusCode::OK),
        Err(e @ PageError::InvalidSymbol(_)) => {
            warn!("{}", e);
            let message = e.to_string();
            render(&ErrorTemplate { error_message: &message }, StatusCode::NOT_FOUND)
        }
        Err(e) => {
            error!("Failed to build profile for {}: {}", symbol, e);
            Err(ApiError::from(e))
        }
    };

    rendered.map_err(warp::reject::custom)
}

pub async fn get_profile_data(symbol: String, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    info!("Handling request for profile data of {}", symbol);
    let client = state.client();

    match build_profile(&client, &state.config, &symbol, state.today()).await {
        Ok(record) => Ok(warp::reply::json(&record)),
        Err(e) => {
            error!("Failed to build profile for {}: {}", symbol, e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}
