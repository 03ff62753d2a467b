pub mod config;
pub mod screener;
