//! HTTP/JSON adapter for the rate limiter.
//!
//! # API Endpoints
//!
//! - `POST /config` installs a new policy (JSON body, see [`Policy`](crate::ratelimit::Policy)).
//! - `POST /request?clientId=<id>` makes one admission decision; 200 when
//!   admitted, 429 when refused.
//! - `GET /metrics` reports the active limiter's counters.
//! - `GET /health` returns `OK`.
//!
//! The first three are also served under `/api`.

mod server;
mod service;

pub use server::HttpServer;
pub use service::{router, ConfigureResponse, ErrorResponse, API_PREFIX};
