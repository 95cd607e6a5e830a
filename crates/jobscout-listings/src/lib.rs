//! HTTP client for the vacancy listings API.
//!
//! Exposes the three endpoints the core consumes: parameterized vacancy
//! search, single-vacancy lookup, and the hierarchical area tree. The
//! [`VacancySource`] trait is the seam the chat engine depends on, so
//! tests can substitute an in-memory fake.

pub mod client;

pub use client::{AreaNode, ListingsClient, SearchPage, VacancySource};
