//! Terminal places directory: community points of interest on a Braille map,
//! with category, area and text filters kept in sync across map, list and detail.

pub mod api;
pub mod app;
pub mod braille;
pub mod compose;
pub mod config;
pub mod data;
pub mod geocode;
pub mod locate;
pub mod map;
pub mod place;
pub mod sync;
pub mod ui;
pub mod views;
pub mod worker;
