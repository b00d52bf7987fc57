// src/handlers/views.rs
use askama::Template;
use warp::http::StatusCode;
use warp::reply::{Html, WithStatus};

use crate::services::charts::PLOTLY_CDN;
use crate::services::pages::{OverviewRow, ProfileRecord};
use super::error::ApiError;

#[derive(Template)]
#[template(path = "marketcap.html")]
pub struct MarketCapTemplate<'a> {
    pub rows: &'a [OverviewRow],
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate<'a> {
    pub stock: &'a ProfileRecord,
    pub plotly_cdn: &'a str,
}

impl<'a> ProfileTemplate<'a> {
    pub fn new(stock: &'a ProfileRecord) -> Self {
        Self { stock, plotly_cdn: PLOTLY_CDN }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub error_message: &'a str,
}

pub fn render<T: Template>(template: &T, status: StatusCode) -> Result<WithStatus<Html<String>>, ApiError> {
    let body = template.render().map_err(|e| {
        log::error!("Template render error: {}", e);
        ApiError::internal(format!("Template error: {}", e))
    })?;
    Ok(warp::reply::with_status(warp::reply::html(body), status))
}
