pub mod error;
pub mod marketcap;
pub mod profile;
pub mod views;
