//! Wire-level domain types for the snippet service.
//!
//! Everything here mirrors the backend's JSON contract one-to-one. Types carry
//! no behavior beyond DTO mapping; the HTTP adapter and cached store live in
//! the `services` crate.

pub mod models;
