//! ghwatcher GitHub infrastructure adapter.
//!
//! Implements [`compliance::GitHubApi`] over the GitHub REST API with
//! [`reqwest`], authenticating as a GitHub App installation.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. URL
//! construction, pagination, payload shapes, and the app token exchange live
//! here; the [`compliance`] crate never sees them.

pub mod auth;
pub mod client;
pub mod models;
pub mod settings;

pub use client::GithubClient;
pub use settings::{AppCredentials, GithubSettings};
