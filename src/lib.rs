#![doc = "The `taskdeck` library crate."]
#![doc = ""]
#![doc = "Domain models, authentication, timeline windows, the dashboard queries, routing"]
#![doc = "configuration and error handling for the Taskdeck API. The binary (`main.rs`)"]
#![doc = "builds the HTTP server from these pieces."]

pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod response;
pub mod routes;
pub mod timeline;
