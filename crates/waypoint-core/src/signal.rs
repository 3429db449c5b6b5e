//! Dispatch signals.
//!
//! A handler reports how it went by returning an [`Outcome`] value instead of
//! unwinding. The dispatcher reads it as follows:
//!
//! | Outcome | Dispatcher reaction |
//! |---|---|
//! | `Success(response)` | stop trying candidates, render `response` |
//! | `Pass` | try the next candidate (not-found when exhausted) |
//! | `Stop(response)` | abort the pipeline, render `response` as-is |
//! | `Fault(fault)` | resolve `fault` through the resolution table |

use crate::exception::Fault;
use crate::http::Response;

#[derive(Debug)]
pub enum Outcome {
	Success(Response),
	Pass,
	Stop(Response),
	Fault(Fault),
}

impl Outcome {
	pub fn ok(response: Response) -> Self {
		Outcome::Success(response)
	}

	pub fn stop(response: Response) -> Self {
		Outcome::Stop(response)
	}

	pub fn fault(fault: Fault) -> Self {
		Outcome::Fault(fault)
	}

	pub fn kind(&self) -> SignalKind {
		match self {
			Outcome::Success(_) => SignalKind::Success,
			Outcome::Pass => SignalKind::Pass,
			Outcome::Stop(_) => SignalKind::Stop,
			Outcome::Fault(_) => SignalKind::Fault,
		}
	}
}

impl From<Result<Response, Fault>> for Outcome {
	fn from(result: Result<Response, Fault>) -> Self {
		match result {
			Ok(response) => Outcome::Success(response),
			Err(fault) => Outcome::Fault(fault),
		}
	}
}

/// Payload-free view of an [`Outcome`], used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
	Success,
	Pass,
	Stop,
	Fault,
}

impl std::fmt::Display for SignalKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			SignalKind::Success => "success",
			SignalKind::Pass => "pass",
			SignalKind::Stop => "stop",
			SignalKind::Fault => "fault",
		};
		f.write_str(name)
	}
}
