#![forbid(unsafe_code)]

pub mod bgg;
pub mod cli;
pub mod config;
pub mod description;
pub mod error;
pub mod formats;
pub mod impose;
pub mod logging;
pub mod markup;
pub mod normalize;
pub mod print;
pub mod render;
