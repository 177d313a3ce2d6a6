//! HTTP server layer for the signing gateway.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     HTTPS (rustls, axum-server)                 │
//! │                            POST /sign                           │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    auth     │  │        routes           │  │
//! │  │ (upload +   │  │ (HTTP Basic)│  │  (router config)        │  │
//! │  │  sign)      │  │             │  │                         │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod client_ip;
pub mod handlers;
pub mod routes;
pub mod tls;

pub use auth::{basic_auth_middleware, parse_basic_authorization, AuthError, BasicAuth};
pub use client_ip::{client_ip, host_from_remote_addr, ClientIp};
pub use handlers::{method_not_allowed_handler, sign_handler, AppState, FILE_FIELD};
pub use routes::{create_router, RouterConfig, DEFAULT_MAX_UPLOAD_SIZE};
pub use tls::load_tls_config;
