//! Loading the list of files to check.
//!
//! Two formats are understood:
//! - flat: `<sha256>  .<path>` per line, as written by `sha256sum` run from the document root;
//! - JSON lines: one [`ManifestEntry`] per line, picked when the source ends in `.json`.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use thiserror::Error;
use crate::model::{FileDescriptor, ManifestEntry};

/// Separates checksum from path in a flat list. The path keeps its leading `/`.
const FLAT_SEPARATOR: &str = "  .";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Flat,
    JsonLines,
}

impl Format {
    pub fn for_source(source: &str) -> Self {
        let path = Url::parse(source).map_or_else(|_| source.to_owned(), |u| u.path().to_owned());
        if path.ends_with(".json") {
            Self::JsonLines
        } else {
            Self::Flat
        }
    }
}

#[derive(Debug, Error)]
pub enum FileListError {
    #[error("could not get url {url}: {source}")]
    Request { url: String, source: reqwest::Error },
    #[error("could not get file list {url}: HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("could not read file list: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected '<checksum>  .<path>', got '{content}'")]
    MalformedLine { line: usize, content: String },
    #[error("line {line}: {source}: '{content}'")]
    MalformedJson { line: usize, content: String, source: serde_json::Error },
    #[error("line {line}: path '{path}' does not start with '/'")]
    MalformedPath { line: usize, path: String },
}

/// Reads the list from an `http(s)` URL, or from a local path for anything else.
pub fn load(client: &Client, source: &str) -> Result<Vec<FileDescriptor>, FileListError> {
    let format = Format::for_source(source);

    match Url::parse(source) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            let response = client.get(url).send().map_err(|source_err| FileListError::Request {
                url: source.to_owned(),
                source: source_err,
            })?;

            if response.status() != StatusCode::OK {
                return Err(FileListError::Status { url: source.to_owned(), status: response.status() });
            }

            parse(response, format)
        }
        _ => parse(File::open(source)?, format),
    }
}

pub fn parse<R: Read>(body: R, format: Format) -> Result<Vec<FileDescriptor>, FileListError> {
    let mut files = vec![];

    for (index, line) in BufReader::new(body).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let file = match format {
            Format::Flat => parse_flat_line(index + 1, &line)?,
            Format::JsonLines => parse_json_line(index + 1, &line)?,
        };
        files.push(file);
    }

    Ok(files)
}

fn parse_flat_line(line_number: usize, line: &str) -> Result<FileDescriptor, FileListError> {
    let malformed = || FileListError::MalformedLine { line: line_number, content: line.to_owned() };
    let (checksum, path) = line.split_once(FLAT_SEPARATOR).ok_or_else(malformed)?;

    if checksum.is_empty() || !path.starts_with('/') {
        return Err(malformed());
    }

    Ok(FileDescriptor {
        expected_checksum: Some(checksum.to_owned()),
        ..FileDescriptor::new(path)
    })
}

fn parse_json_line(line_number: usize, line: &str) -> Result<FileDescriptor, FileListError> {
    let entry = serde_json::from_str::<ManifestEntry>(line)
        .map_err(|source| FileListError::MalformedJson { line: line_number, content: line.to_owned(), source })?;

    // anything else would be glued onto the server name
    if !entry.path.starts_with('/') {
        return Err(FileListError::MalformedPath { line: line_number, path: entry.path });
    }

    Ok(FileDescriptor::from(entry))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;
    use super::*;
    use crate::test_server::{self, Route};

    #[test]
    fn format_follows_suffix() {
        assert_eq!(Format::for_source("http://h/sha256.txt"), Format::Flat);
        assert_eq!(Format::for_source("http://h/manifest.json"), Format::JsonLines);
        assert_eq!(Format::for_source("http://h/manifest.json?v=2"), Format::JsonLines);
        assert_eq!(Format::for_source("/tmp/manifest.json"), Format::JsonLines);
        assert_eq!(Format::for_source("list"), Format::Flat);
    }

    #[test]
    fn flat_lines() {
        let body = "abc123  ./index.html\n\ndef456  ./img/logo  with spaces.png\n";
        let files = parse(body.as_bytes(), Format::Flat).unwrap();

        assert_eq!(
            files,
            vec![
                FileDescriptor { expected_checksum: Some("abc123".into()), ..FileDescriptor::new("/index.html") },
                FileDescriptor {
                    expected_checksum: Some("def456".into()),
                    ..FileDescriptor::new("/img/logo  with spaces.png")
                },
            ]
        );
    }

    #[test]
    fn flat_line_without_separator_is_rejected() {
        let err = parse("abc123  ./ok\nabc123 /broken\n".as_bytes(), Format::Flat).unwrap_err();
        assert!(matches!(err, FileListError::MalformedLine { line: 2, .. }), "{err}");
    }

    #[test]
    fn json_lines() {
        let body = concat!(
            r#"{"Path":"/a","Size":12,"Checksum":"ff","LastModified":"2015-10-21T07:28:00Z"}"#,
            "\n",
            r#"{"Path":"/b","Size":0}"#,
            "\n",
        );
        let files = parse(body.as_bytes(), Format::JsonLines).unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "/a");
        assert_eq!(files[0].expected_size, Some(12));
        assert_eq!(files[0].expected_checksum.as_deref(), Some("ff"));
        assert_eq!(files[0].expected_last_modified.unwrap().to_rfc3339(), "2015-10-21T07:28:00+00:00");
        assert_eq!(files[1], FileDescriptor::new("/b"));
    }

    #[test]
    fn bad_json_reports_its_line() {
        let err = parse("{\"Path\":\"/a\"}\nnot json\n".as_bytes(), Format::JsonLines).unwrap_err();
        assert!(matches!(err, FileListError::MalformedJson { line: 2, .. }), "{err}");
    }

    #[test]
    fn json_path_must_be_absolute() {
        let body = concat!(r#"{"Path":"/ok","Size":1}"#, "\n", r#"{"Path":"a.txt","Size":1}"#, "\n");
        let err = parse(body.as_bytes(), Format::JsonLines).unwrap_err();
        assert!(matches!(&err, FileListError::MalformedPath { line: 2, path } if path == "a.txt"), "{err}");
    }

    fn client() -> Client {
        Client::builder().timeout(Duration::from_secs(10)).no_proxy().build().unwrap()
    }

    #[test]
    fn load_over_http() {
        let server = test_server::start([("/sha256.txt", Route::ok("aa  ./x\nbb  ./y\n"))]);
        let files = load(&client(), &format!("http://{}/sha256.txt", server.addr)).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["/x", "/y"]);
    }

    #[test]
    fn load_rejects_non_200() {
        let server = test_server::start(Vec::<(&str, Route)>::new());
        let err = load(&client(), &format!("http://{}/sha256.txt", server.addr)).unwrap_err();
        assert!(matches!(err, FileListError::Status { status, .. } if status == StatusCode::NOT_FOUND), "{err}");
    }

    #[test]
    fn load_from_disk() {
        let mut f = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(f, r#"{{"Path":"/z","Size":3,"Checksum":"cc"}}"#).unwrap();
        f.flush().unwrap();

        let files = load(&client(), f.path().to_str().unwrap()).unwrap();
        assert_eq!(files[0].expected_size, Some(3));
    }
}
