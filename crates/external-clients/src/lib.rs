pub mod access_management;
pub mod catalog;
pub mod client;
pub mod doi;
pub mod ingestion_admin;
pub mod pid;

pub use client::{RetryPolicy, RetryingClient};
