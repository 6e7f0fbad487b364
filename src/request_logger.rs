use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use std::time::Instant;

/// Authenticated subject resolved by an auth guard, stashed in the
/// request-local cache so the access log can attribute the request without
/// re-running token verification.
#[derive(Debug, Default)]
pub struct RequestIdentity(pub Option<String>);

/// Fairing logging one line per HTTP request with method, path, the
/// resolved identity when one authenticated, status, and elapsed time.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(|| Instant::now());
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let started = request.local_cache(|| Instant::now());
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let identity = request.local_cache(RequestIdentity::default);

        match &identity.0 {
            Some(subject) => log::info!(
                "{} {} as {} -> {} ({:.2}ms)",
                request.method(),
                request.uri(),
                subject,
                response.status().code,
                elapsed_ms
            ),
            None => log::info!(
                "{} {} -> {} ({:.2}ms)",
                request.method(),
                request.uri(),
                response.status().code,
                elapsed_ms
            ),
        }
    }
}
