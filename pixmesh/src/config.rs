use std::fmt;
use std::time::Duration;

use crate::HANDLER_PROTOCOL_VERSION;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
	#[error("API key is missing")]
	MissingApiKey,
	#[error("API endpoint is missing")]
	MissingEndpoint,
	#[error("Endpoint {0:?} must use https")]
	InsecureScheme(String),
	#[error("Endpoint {url:?} does not match https://<host>/v2/<id>/(run|runsync)\n  - {msg}")]
	BadEndpoint { url: String, msg: &'static str },
}

/// How the remote handler answers a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointMode {
	/// `/run`: the response only carries a job id, the result has to be polled.
	Async,
	/// `/runsync`: the response usually carries the result already.
	Sync,
}

/// A validated remote endpoint of the form `https://<host>/v2/<id>/(run|runsync)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
	url: String,
	base: String,
	mode: EndpointMode,
}

impl Endpoint {
	pub fn url(&self) -> &str {
		&self.url
	}

	pub fn mode(&self) -> EndpointMode {
		self.mode
	}

	/// Status URL of a job, `https://<host>/v2/<id>/status/<job id>`.
	pub fn status_url(&self, job_id: &str) -> String {
		format!("{}/status/{}", self.base, job_id)
	}
}

impl fmt::Display for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.url)
	}
}

fn is_host_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':')
}

fn is_id_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || matches!(c, '-' | '_')
}

/// Checks `url` against the endpoint pattern without touching the network.
pub fn validate_endpoint(url: &str) -> Result<Endpoint, ConfigError> {
	let bad = |msg| ConfigError::BadEndpoint {
		url: url.to_owned(),
		msg,
	};

	if url.is_empty() {
		return Err(ConfigError::MissingEndpoint);
	}
	if url.starts_with("http://") {
		return Err(ConfigError::InsecureScheme(url.to_owned()));
	}
	let rest = url.strip_prefix("https://").ok_or_else(|| bad("scheme must be https"))?;

	let segments: Vec<&str> = rest.split('/').collect();
	let [host, version, id, action] = segments.as_slice() else {
		return Err(bad("expected exactly host, version, id and action segments"));
	};

	if host.is_empty() || !host.chars().all(is_host_char) {
		return Err(bad("invalid host"));
	}
	if *version != HANDLER_PROTOCOL_VERSION {
		return Err(bad("version segment must be v2"));
	}
	if id.is_empty() || !id.chars().all(is_id_char) {
		return Err(bad("invalid endpoint id"));
	}
	let mode = match *action {
		"run" => EndpointMode::Async,
		"runsync" => EndpointMode::Sync,
		_ => return Err(bad("action must be run or runsync")),
	};

	Ok(Endpoint {
		url: url.to_owned(),
		base: format!("https://{host}/{version}/{id}"),
		mode,
	})
}

/// Polling behaviour of the job client against the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
	pub max_attempts: u32,
	pub interval: Duration,
}

impl Default for PollSettings {
	fn default() -> Self {
		Self {
			max_attempts: 60,
			interval: Duration::from_millis(5000),
		}
	}
}

/// Credentials and endpoint of the remote inference service.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
	api_key: String,
	endpoint: Endpoint,
	pub poll: PollSettings,
}

impl ApiConfig {
	pub fn new(api_key: impl Into<String>, endpoint: &str) -> Result<Self, ConfigError> {
		let api_key = api_key.into();
		if api_key.trim().is_empty() {
			return Err(ConfigError::MissingApiKey);
		}

		Ok(Self {
			api_key,
			endpoint: validate_endpoint(endpoint)?,
			poll: PollSettings::default(),
		})
	}

	pub fn with_poll(mut self, poll: PollSettings) -> Self {
		self.poll = poll;
		self
	}

	pub fn api_key(&self) -> &str {
		&self.api_key
	}

	pub fn endpoint(&self) -> &Endpoint {
		&self.endpoint
	}
}

// never print the key
impl fmt::Debug for ApiConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ApiConfig")
			.field("api_key", &"<redacted>")
			.field("endpoint", &self.endpoint.url)
			.field("poll", &self.poll)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_run_and_runsync() {
		let run = validate_endpoint("https://api.example.ai/v2/abc123/run").unwrap();
		assert_eq!(run.mode(), EndpointMode::Async);
		assert_eq!(run.status_url("job-1"), "https://api.example.ai/v2/abc123/status/job-1");

		let sync = validate_endpoint("https://api.example.ai/v2/abc123/runsync").unwrap();
		assert_eq!(sync.mode(), EndpointMode::Sync);
		assert_eq!(sync.status_url("x"), "https://api.example.ai/v2/abc123/status/x");
	}

	#[test]
	fn rejects_bad_endpoints() {
		assert!(matches!(
			validate_endpoint("http://api.example.ai/v2/abc123/run"),
			Err(ConfigError::InsecureScheme(_))
		));
		for url in [
			"https://api.example.ai/abc123/run",
			"https://api.example.ai/v2/abc123/run/extra",
			"https://api.example.ai/v2/abc123/status",
			"https://api.example.ai/v1/abc123/run",
			"https://api.example.ai/v2//run",
			"https:///v2/abc123/run",
			"https://api.example.ai/v2/abc123/run?x=1",
			"ftp://api.example.ai/v2/abc123/run",
		] {
			assert!(
				matches!(validate_endpoint(url), Err(ConfigError::BadEndpoint { .. })),
				"{url} should be rejected"
			);
		}
		assert_eq!(validate_endpoint(""), Err(ConfigError::MissingEndpoint));
	}

	#[test]
	fn config_requires_key() {
		assert_eq!(
			ApiConfig::new("  ", "https://api.example.ai/v2/abc123/run"),
			Err(ConfigError::MissingApiKey)
		);
		let config = ApiConfig::new("secret", "https://api.example.ai/v2/abc123/run").unwrap();
		assert_eq!(config.poll, PollSettings::default());
		assert!(!format!("{config:?}").contains("secret"));
	}
}
