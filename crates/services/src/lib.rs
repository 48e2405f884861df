//! Client-side service layer for the snippet backend: access-token
//! acquisition, the HTTP adapter behind the [`SnippetOperations`] façade, and
//! the cached query/mutation store views consume.
//!
//! [`SnippetOperations`]: services::snippet_operations::SnippetOperations

pub mod services;
