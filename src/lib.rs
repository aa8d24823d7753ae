pub mod audio;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod levels;
pub mod rng;
pub mod runner;
pub mod score_store;
pub mod types;
pub mod world;
