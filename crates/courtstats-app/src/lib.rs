pub mod cli;
pub mod config;
pub mod discovery;
pub mod index;
pub mod league;
pub mod loader;
pub mod logging;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod supplements;
