pub mod logging;
pub mod error;

pub mod components;
pub mod configs;

pub mod cli;
pub mod engine;

pub use error::{
    ExperienceError,
    Result,
};
