// src/edgar/mod.rs
pub mod client;
pub mod models;

pub use client::{EdgarClient, FilingSource};
pub use models::FilingInfo;
