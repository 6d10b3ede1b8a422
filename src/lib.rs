pub mod batch;
pub mod cache;
pub mod cli;
pub mod config;
pub mod display;
pub mod engine;
pub mod equilibrium;
pub mod error;
pub mod game_tree;
pub mod games;
pub mod plot;
pub mod policy;
pub mod record;
pub mod solver;
