//! Submission and polling of remote inference jobs.
//!
//! A job is submitted with `POST <endpoint>` and a `{ "input": {...} }` body, then its
//! status is polled at `GET .../status/<id>` until the handler reports a terminal state.

pub mod transport;

use std::fmt;
use std::thread;
use std::time::Duration;

use json::JsonValue;
use tracing::{debug, error, info};

use crate::config::{ApiConfig, ConfigError, EndpointMode};
use crate::formats::{JsonError, JsonObject};

pub use transport::{ConnectionError, HttpResponse, Transport, UreqTransport};

#[derive(Debug, thiserror::Error)]
pub enum JobError {
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error("Remote call failed with status {status}\n  - {body}")]
	Transport { status: u16, body: String },
	#[error(transparent)]
	Connection(#[from] ConnectionError),
	#[error("Job failed: {0}")]
	Failed(String),
	#[error("Job timed out after {attempts} attempts")]
	Timeout { attempts: u32 },
	#[error("Handler response is not valid JSON\n  - {0}")]
	InvalidJson(#[from] json::Error),
	#[error("Handler response has an unexpected shape\n  - {0}")]
	InvalidResponse(#[from] JsonError),
}

/// Opaque job identifier handed out by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
	/// Queued or in progress.
	Running,
	Completed,
	Failed,
}

impl JobStatus {
	pub fn from_remote(status: &str) -> Self {
		match status {
			"COMPLETED" | "SUCCESS" => JobStatus::Completed,
			"FAILED" | "ERROR" | "CANCELLED" | "TIMED_OUT" => JobStatus::Failed,
			_ => JobStatus::Running,
		}
	}

	pub fn is_terminal(self) -> bool {
		!matches!(self, JobStatus::Running)
	}
}

/// One decoded answer of the handler, from either the submit or the status endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
	pub id: Option<JobId>,
	pub status: JobStatus,
	/// `output` of the response, `JsonValue::Null` when absent.
	pub output: JsonValue,
	pub error: Option<String>,
	/// The whole response, for fields that handlers put next to `output`.
	pub raw: JsonValue,
}

impl JobReport {
	pub fn parse(body: &str) -> Result<Self, JobError> {
		let raw = json::parse(body)?;
		let obj = JsonObject::from_value("response", &raw)?;

		let id = obj.get_nullable_str("id")?.map(|id| JobId(id.to_owned()));
		let status = obj
			.get_nullable_str("status")?
			.map(JobStatus::from_remote)
			.unwrap_or(JobStatus::Running);
		let error = obj.get_nullable_str("error")?.map(str::to_owned);
		let output = obj.0.get("output").cloned().unwrap_or(JsonValue::Null);

		Ok(Self {
			id,
			status,
			output,
			error,
			raw,
		})
	}

	/// `output` as an object, if the handler returned one.
	pub fn output_object(&self) -> Option<JsonObject<'_>> {
		JsonObject::from_value("output", &self.output).ok()
	}

	fn into_result(self) -> Result<Self, JobError> {
		match self.status {
			JobStatus::Failed => {
				let msg = self.error.unwrap_or_else(|| "Unknown error".to_owned());
				error!("Remote job failed: {}", msg);
				Err(JobError::Failed(msg))
			}
			_ => Ok(self),
		}
	}
}

pub struct JobClient<T> {
	config: ApiConfig,
	transport: T,
}

impl<T: Transport> JobClient<T> {
	pub fn new(config: ApiConfig, transport: T) -> Self {
		Self { config, transport }
	}

	pub fn config(&self) -> &ApiConfig {
		&self.config
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	fn dispatch(&self, payload: &JsonValue) -> Result<JobReport, JobError> {
		let url = self.config.endpoint().url();
		let response = self
			.transport
			.post_json(url, self.config.api_key(), &json::stringify(payload.clone()))?;
		if !response.is_success() {
			return Err(JobError::Transport {
				status: response.status,
				body: response.body,
			});
		}
		JobReport::parse(&response.body)
	}

	/// Posts `payload` and returns the id of the created job.
	pub fn submit(&self, payload: &JsonValue) -> Result<JobId, JobError> {
		let report = self.dispatch(payload)?;
		report
			.id
			.ok_or_else(|| JobError::InvalidResponse(JsonError::KeyDoesNotExist("id".to_owned())))
	}

	/// Polls with the configured [`PollSettings`](crate::config::PollSettings).
	pub fn await_completion(&self, id: &JobId) -> Result<JobReport, JobError> {
		let poll = self.config.poll;
		self.await_completion_with(id, poll.max_attempts, poll.interval)
	}

	/// Polls the status endpoint at most `max_attempts` times, `interval` apart.
	pub fn await_completion_with(
		&self,
		id: &JobId,
		max_attempts: u32,
		interval: Duration,
	) -> Result<JobReport, JobError> {
		let url = self.config.endpoint().status_url(&id.0);

		for attempt in 1..=max_attempts {
			if attempt > 1 {
				thread::sleep(interval);
			}

			let response = self.transport.get(&url, self.config.api_key())?;
			if !response.is_success() {
				return Err(JobError::Transport {
					status: response.status,
					body: response.body,
				});
			}

			let report = JobReport::parse(&response.body)?;
			debug!("Job {} poll {}/{}: {:?}", id, attempt, max_attempts, report.status);
			if report.status.is_terminal() {
				return report.into_result();
			}
		}

		Err(JobError::Timeout {
			attempts: max_attempts,
		})
	}

	/// Submits `payload` and waits for its result.
	///
	/// A `/runsync` endpoint is never polled, and neither is an answer without a job id:
	/// both are taken as the final result.
	pub fn run(&self, payload: &JsonValue) -> Result<JobReport, JobError> {
		let report = self.dispatch(payload)?;

		if self.config.endpoint().mode() == EndpointMode::Sync {
			return report.into_result();
		}

		let Some(id) = report.id.clone() else {
			debug!("Handler answered without a job id, using the answer as is");
			return report.into_result();
		};
		info!("Submitted job {}", id);
		self.await_completion(&id)
	}

	/// Asks the handler for its debug help, to check credentials and reachability.
	pub fn ping(&self) -> Result<JobReport, JobError> {
		let mut input = JsonValue::new_object();
		input["debug_help"] = true.into();
		let mut payload = JsonValue::new_object();
		payload["input"] = input;
		self.run(&payload)
	}
}
