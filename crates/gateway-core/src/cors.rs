//! CORS and Private-Network-Access handling.

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::Config;

const ALLOWED_HEADERS: &[&str] = &[
	"content-type",
	"authorization",
	"x-blob-namespace",
	"x-blob-key",
	"x-blob-public",
	"x-blob-visibility",
	"x-channel-token",
];

const EXPOSED_HEADERS: &[&str] = &["content-length", "content-disposition"];

pub fn build_cors_layer(config: &Config) -> CorsLayer {
	let allow_origin = if config.cors_origin == "*" {
		AllowOrigin::any()
	} else {
		let origin = config.cors_origin.clone();
		match HeaderValue::from_str(&origin) {
			Ok(value) => AllowOrigin::exact(value),
			Err(_) => AllowOrigin::any(),
		}
	};

	CorsLayer::new()
		.allow_origin(allow_origin)
		.allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
		.allow_headers(ALLOWED_HEADERS.iter().map(|h| HeaderName::from_static(h)).collect::<Vec<_>>())
		.expose_headers(EXPOSED_HEADERS.iter().map(|h| HeaderName::from_static(h)).collect::<Vec<_>>())
}

/// Echoes `Access-Control-Request-Private-Network: true` back as
/// `Access-Control-Allow-Private-Network: true` on preflight responses.
/// `tower_http::cors` has no built-in support for this Chrome-specific
/// header, so it's a standalone layer stacked alongside `CorsLayer`.
#[derive(Clone, Copy, Default)]
pub struct PrivateNetworkLayer;

impl<S> tower::Layer<S> for PrivateNetworkLayer {
	type Service = PrivateNetworkService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		PrivateNetworkService { inner }
	}
}

#[derive(Clone)]
pub struct PrivateNetworkService<S> {
	inner: S,
}

const REQUEST_PNA: HeaderName = HeaderName::from_static("access-control-request-private-network");
const ALLOW_PNA: HeaderName = HeaderName::from_static("access-control-allow-private-network");

impl<S, B> tower::Service<axum::http::Request<B>> for PrivateNetworkService<S>
where
	S: tower::Service<axum::http::Request<B>, Response = axum::response::Response> + Clone + Send + 'static,
	S::Future: Send + 'static,
	B: Send + 'static,
{
	type Response = axum::response::Response;
	type Error = S::Error;
	type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

	fn poll_ready(
		&mut self,
		cx: &mut std::task::Context<'_>,
	) -> std::task::Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, req: axum::http::Request<B>) -> Self::Future {
		let wants_pna = req.headers().get(&REQUEST_PNA).is_some_and(|v| v == "true");
		let mut inner = self.inner.clone();
		Box::pin(async move {
			let mut resp = inner.call(req).await?;
			if wants_pna {
				resp.headers_mut().insert(ALLOW_PNA, HeaderValue::from_static("true"));
			}
			Ok(resp)
		})
	}
}

// vim: ts=4
