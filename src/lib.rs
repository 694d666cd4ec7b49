//! matchpoint — conversational tennis matchmaking bot.

pub mod catalog;
pub mod channels;
pub mod config;
pub mod error;
pub mod flow;
pub mod matching;
pub mod model;
pub mod store;
