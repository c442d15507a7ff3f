use chrono::{DateTime, NaiveDateTime, Utc, Weekday};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, CONTENT_LENGTH, HOST, LAST_MODIFIED};
use reqwest::{StatusCode, Url};
use crate::activity::Activity;
use crate::hash::sha256_reader;
use crate::model::{FileDescriptor, FileOutcome};
use crate::status::StatusBoard;

/// `Last-Modified` as edge servers send it, after the `"Mon, "` weekday prefix.
pub const LAST_MODIFIED_FORMAT: &str = "%d %b %Y %H:%M:%S GMT";
const X_CACHE: &str = "X-Cache";

/// Turns one GET against the edge server into one [`FileOutcome`].
#[derive(Clone)]
pub struct Verifier {
    client: Client,
    server: String,
    vhost: Option<String>,
    checksum: bool,
}

impl Verifier {
    /// `server` is `host` or `host:port`; requests go to `http://{server}{path}`.
    pub fn new(client: Client, server: impl Into<String>, vhost: Option<String>, checksum: bool) -> Self {
        Self {
            client,
            server: server.into(),
            vhost: vhost.filter(|v| !v.is_empty()),
            checksum,
        }
    }

    pub fn url_for(&self, path: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!("http://{}{}", self.server, path))
    }

    /// Fetches `file` and classifies the response. Never fails: every problem ends up as a flag.
    pub fn verify(&self, worker: usize, file: &FileDescriptor, board: &StatusBoard) -> FileOutcome {
        let mut outcome = FileOutcome::new(&file.path);
        board.update_slot(worker, Some(&file.path), Some(Activity::Requesting));

        let url = match self.url_for(&file.path) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(worker, path = %file.path, "could not build request URL: {e}");
                outcome.read_error = true;
                return outcome;
            }
        };

        let mut request = self.client.get(url.clone());
        if let Some(vhost) = &self.vhost {
            request = request.header(HOST, vhost);
        }

        let mut response = match request.send() {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(worker, "error fetching {url}: {e}");
                outcome.read_error = true;
                return outcome;
            }
        };

        board.update_slot(worker, Some(&file.path), Some(Activity::Reading));

        if response.status() != StatusCode::OK {
            tracing::warn!(worker, "no 200 response for {}: {}", file.path, response.status().as_u16());
            outcome.bad_request = true;
            return outcome;
        }

        let headers = response.headers();
        let cache_status = headers.get(X_CACHE).and_then(|v| v.to_str().ok()).unwrap_or_default();
        if cache_status != "HIT" {
            outcome.miss = true;
            let shown = if cache_status.is_empty() { "[no cache status]" } else { cache_status };
            tracing::info!("{}: {shown}", file.path);
        }

        if let Some(observed) = last_modified(headers) {
            outcome.observed_last_modified = Some(observed);
            if let Some(expected) = file.expected_last_modified.filter(|&e| e != observed) {
                tracing::warn!(
                    "Last-Modified not matching for '{}' (got '{observed}', expected '{expected}')",
                    file.path,
                );
            }
        }

        if self.checksum {
            board.update_slot(worker, None, Some(Activity::Hashing));
            check_body(worker, file, &mut response, &mut outcome);
        } else {
            check_content_length(file, response.headers(), &mut outcome);
        }

        outcome
    }
}

fn last_modified(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let raw = headers.get(LAST_MODIFIED)?.to_str().ok()?;
    // the weekday has to be a weekday, but need not agree with the date
    let (weekday, rest) = raw.split_once(", ")?;
    weekday.parse::<Weekday>().ok()?;
    NaiveDateTime::parse_from_str(rest, LAST_MODIFIED_FORMAT)
        .ok()
        .map(|t| t.and_utc())
}

fn check_size(file: &FileDescriptor, observed: u64, outcome: &mut FileOutcome) {
    outcome.observed_size = Some(observed);
    if let Some(expected) = file.expected_size.filter(|&e| e > 0 && e != observed) {
        outcome.bad_size = true;
        tracing::warn!("'{}' has wrong size ({observed}, expected {expected})", file.path);
    }
}

fn check_content_length(file: &FileDescriptor, headers: &HeaderMap, outcome: &mut FileOutcome) {
    let Some(raw) = headers.get(CONTENT_LENGTH) else {
        tracing::debug!("no Content-Length header for '{}'", file.path);
        return;
    };

    match raw.to_str().ok().and_then(|s| s.trim().parse::<u64>().ok()) {
        Some(size) => check_size(file, size, outcome),
        None => tracing::warn!("could not parse Content-Length ({raw:?}) from '{}'", file.path),
    }
}

fn check_body(worker: usize, file: &FileDescriptor, response: &mut Response, outcome: &mut FileOutcome) {
    let digest = match sha256_reader(response) {
        Ok(digest) => digest,
        Err(e) => {
            tracing::warn!(worker, "could not read file '{}': {e}", file.path);
            outcome.read_error = true;
            return;
        }
    };

    check_size(file, digest.size, outcome);

    if let Some(expected) = file.expected_checksum.as_deref().filter(|&e| !e.is_empty() && e != digest.hex) {
        outcome.bad_checksum = true;
        tracing::warn!(
            worker,
            "wrong SHA256 for '{}' (size {}, got {}, expected {expected})",
            file.path, digest.size, digest.hex,
        );
    }
    outcome.observed_checksum = Some(digest.hex);
}
