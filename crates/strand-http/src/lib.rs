//! # Strand HTTP
//!
//! Request and response types consumed by the Strand pipeline.
//!
//! The transport layer builds a [`Request`] per inbound message, the pipeline
//! walks it through its units, and whichever stage finalizes the walk hands
//! back a [`Response`].

pub mod error;
pub mod extensions;
pub mod request;
pub mod response;

pub use error::{Error, Result};
pub use extensions::Extensions;
pub use request::{Request, RequestBuilder, ResponseHook};
pub use response::Response;

pub use bytes::Bytes;
pub use hyper::{HeaderMap, Method, StatusCode, Uri, Version};
