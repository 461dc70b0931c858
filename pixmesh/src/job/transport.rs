use std::time::Duration;

/// Status code and body of an HTTP exchange, whatever the status was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
	pub status: u16,
	pub body: String,
}

impl HttpResponse {
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// The request never produced a response (DNS, TLS, socket, timeout).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Could not reach {url}\n  - {msg}")]
pub struct ConnectionError {
	pub url: String,
	pub msg: String,
}

/// Blocking HTTP seam of the job client. Non-2xx responses are returned, not turned into errors.
pub trait Transport {
	fn post_json(&self, url: &str, api_key: &str, body: &str) -> Result<HttpResponse, ConnectionError>;
	fn get(&self, url: &str, api_key: &str) -> Result<HttpResponse, ConnectionError>;
}

impl<T: Transport + ?Sized> Transport for &T {
	fn post_json(&self, url: &str, api_key: &str, body: &str) -> Result<HttpResponse, ConnectionError> {
		(**self).post_json(url, api_key, body)
	}

	fn get(&self, url: &str, api_key: &str) -> Result<HttpResponse, ConnectionError> {
		(**self).get(url, api_key)
	}
}

pub struct UreqTransport {
	agent: ureq::Agent,
}

impl UreqTransport {
	pub fn new(timeout: Duration) -> Self {
		let agent = ureq::AgentBuilder::new().timeout(timeout).build();
		Self { agent }
	}
}

impl Default for UreqTransport {
	fn default() -> Self {
		Self::new(Duration::from_secs(120))
	}
}

fn read_response(url: &str, response: ureq::Response) -> Result<HttpResponse, ConnectionError> {
	let status = response.status();
	let body = response.into_string().map_err(|e| ConnectionError {
		url: url.to_owned(),
		msg: e.to_string(),
	})?;
	Ok(HttpResponse { status, body })
}

fn finish(url: &str, result: Result<ureq::Response, ureq::Error>) -> Result<HttpResponse, ConnectionError> {
	match result {
		Ok(response) | Err(ureq::Error::Status(_, response)) => read_response(url, response),
		Err(ureq::Error::Transport(transport)) => Err(ConnectionError {
			url: url.to_owned(),
			msg: transport.to_string(),
		}),
	}
}

impl Transport for UreqTransport {
	fn post_json(&self, url: &str, api_key: &str, body: &str) -> Result<HttpResponse, ConnectionError> {
		let result = self
			.agent
			.post(url)
			.set("Authorization", &format!("Bearer {api_key}"))
			.set("Content-Type", "application/json")
			.send_string(body);
		finish(url, result)
	}

	fn get(&self, url: &str, api_key: &str) -> Result<HttpResponse, ConnectionError> {
		let result = self.agent.get(url).set("Authorization", &format!("Bearer {api_key}")).call();
		finish(url, result)
	}
}

#[cfg(test)]
pub(crate) mod mock {
	use std::cell::RefCell;
	use std::collections::VecDeque;

	use super::*;

	#[derive(Debug, Clone, PartialEq, Eq)]
	pub struct Request {
		pub method: &'static str,
		pub url: String,
		pub api_key: String,
		pub body: Option<String>,
	}

	/// Answers POSTs and GETs from two scripted queues and records every request.
	///
	/// An exhausted GET queue repeats `fallback_get`, if any.
	#[derive(Default)]
	pub struct ScriptedTransport {
		posts: RefCell<VecDeque<HttpResponse>>,
		gets: RefCell<VecDeque<HttpResponse>>,
		pub fallback_get: Option<HttpResponse>,
		pub requests: RefCell<Vec<Request>>,
	}

	pub fn ok(body: &str) -> HttpResponse {
		HttpResponse {
			status: 200,
			body: body.to_owned(),
		}
	}

	impl ScriptedTransport {
		pub fn new() -> Self {
			Self::default()
		}

		pub fn on_post(self, response: HttpResponse) -> Self {
			self.posts.borrow_mut().push_back(response);
			self
		}

		pub fn on_get(self, response: HttpResponse) -> Self {
			self.gets.borrow_mut().push_back(response);
			self
		}

		pub fn count(&self, method: &str) -> usize {
			self.requests.borrow().iter().filter(|r| r.method == method).count()
		}

		pub fn posted_bodies(&self) -> Vec<json::JsonValue> {
			self.requests
				.borrow()
				.iter()
				.filter_map(|r| r.body.as_deref())
				.map(|body| json::parse(body).unwrap())
				.collect()
		}

		fn record(&self, method: &'static str, url: &str, api_key: &str, body: Option<&str>) {
			self.requests.borrow_mut().push(Request {
				method,
				url: url.to_owned(),
				api_key: api_key.to_owned(),
				body: body.map(str::to_owned),
			});
		}
	}

	fn unscripted(url: &str) -> ConnectionError {
		ConnectionError {
			url: url.to_owned(),
			msg: "no scripted response".to_owned(),
		}
	}

	impl Transport for ScriptedTransport {
		fn post_json(&self, url: &str, api_key: &str, body: &str) -> Result<HttpResponse, ConnectionError> {
			self.record("POST", url, api_key, Some(body));
			self.posts.borrow_mut().pop_front().ok_or_else(|| unscripted(url))
		}

		fn get(&self, url: &str, api_key: &str) -> Result<HttpResponse, ConnectionError> {
			self.record("GET", url, api_key, None);
			let next = self.gets.borrow_mut().pop_front();
			next.or_else(|| self.fallback_get.clone()).ok_or_else(|| unscripted(url))
		}
	}
}
