// src/handlers/marketcap.rs
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Json;
use warp::{Rejection, Reply};
use log::{error, info};

use crate::services::pages::{build_overview, OverviewRow};
use crate::state::AppState;
use super::error::ApiError;
use super::views::{render, MarketCapTemplate};

async fn overview(state: &AppState) -> Result<Vec<OverviewRow>, Rejection> {
    let client = state.client();
    build_overview(&client, &state.config).await.map_err(|e| {
        error!("Failed to build market cap overview: {}", e);
        warp::reject::custom(ApiError::from(e))
    })
}

pub async fn get_marketcap_page(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    info!("Handling request for market cap page");
    let rows = overview(&state).await?;
    render(&MarketCapTemplate { rows: &rows }, StatusCode::OK).map_err(warp::reject::custom)
}

pub async fn get_marketcap_data(state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling request for market cap data");
    let rows = overview(&state).await?;
    info!("Successfully built {} market cap rows", rows.len());
    Ok(warp::reply::json(&rows))
}
