pub mod calculations;
pub mod charts;
pub mod formatting;
pub mod market_data;
pub mod pages;
pub mod statements;
pub mod yahoo;
