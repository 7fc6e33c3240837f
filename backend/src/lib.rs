pub mod config;
pub mod error;
pub mod extract;
pub mod inference;
pub mod pages;
pub mod pipeline;
pub mod recommend;
pub mod routes;
pub mod state;
