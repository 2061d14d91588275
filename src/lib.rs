//! Family holiday destination recommender.
//!
//! Family members rate attraction categories; the service averages those
//! ratings, scores every known destination with a gradient-boosted model
//! trained at startup and returns the best matches.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
