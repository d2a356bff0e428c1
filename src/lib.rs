//! Cached project catalog for the Spark student initiative.
//!
//! Projects live in a Firestore collection. [`projects::ProjectService`]
//! keeps an in-memory copy that is refreshed at most once per TTL, shared by
//! any number of consumers, and replaced by a built-in catalog when
//! Firestore cannot be reached.

pub mod cache;
pub mod config;
pub mod logging;
pub mod projects;
pub mod render;
pub mod store;
