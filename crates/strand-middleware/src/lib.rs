//! Built-in units for Strand pipelines
//!
//! Every unit here implements [`HandlerUnit`](strand_pipeline::HandlerUnit)
//! and can be mounted anywhere in a pipeline. [`ErrorHandler`] is the only
//! error-phase unit; the rest run in the normal phase.

pub mod basic_auth;
pub mod error_handler;
pub mod limit;
pub mod logger;
pub mod method_override;
pub mod response_time;
pub mod static_files;
pub mod timeout;
pub mod vhost;

pub use basic_auth::{
	AuthenticatedUser, BasicAuth, BasicAuthConfig, CredentialVerifier, StaticCredentials,
	parse_basic_credentials,
};
pub use error_handler::{ErrorHandler, ErrorHandlerConfig, Representation};
pub use limit::{Limit, LimitConfig};
pub use logger::{AccessRecord, LogFormat, Logger, LoggerConfig};
pub use method_override::{MethodOverride, MethodOverrideConfig, OriginalMethod};
pub use response_time::{RESPONSE_TIME_HEADER, ResponseTime};
pub use static_files::{StaticFiles, StaticFilesConfig};
pub use timeout::{Timeout, TimeoutConfig};
pub use vhost::Vhost;
