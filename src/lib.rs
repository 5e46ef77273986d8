pub mod app;
pub mod catalog;
pub mod config;
pub mod pagination;
pub mod playback;
pub mod preferences;
pub mod route;
pub mod search;
pub mod storage;
pub mod tmdb;
pub mod views;
pub mod watchlist;
