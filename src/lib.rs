#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod configuration;
pub mod registry;
