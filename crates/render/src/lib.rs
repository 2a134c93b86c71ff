//! Render REST client for static-site hosting.
//!
//! Provides an async client for the [Render](https://render.com) API v1:
//! looking services up by name, creating static sites bound to a git
//! branch, and triggering deploys.

pub mod client;
pub mod types;

pub use client::{Client, Error};
pub use types::{Deploy, NewStaticSite, Service, ServiceDetails, StaticSiteDetails};
