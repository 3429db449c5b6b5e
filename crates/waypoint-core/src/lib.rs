//! # Waypoint Core
//!
//! Shared vocabulary of the waypoint routing and dispatch engine:
//!
//! - [`exception`]: startup errors and the runtime fault hierarchy
//! - [`http`]: request/response value types
//! - [`signal`]: the `Success | Pass | Stop | Fault` outcome a handler returns

pub mod exception;
pub mod http;
pub mod signal;

pub use exception::{ConfigurationError, Fault, FaultType, Result, UrlError, is_subtype};
pub use self::http::{Request, Response, ResponseError};
pub use signal::{Outcome, SignalKind};
