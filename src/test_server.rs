//! Scripted HTTP/1.1 server for tests.
//!
//! Each path answers with a fixed status, header set and body; unknown paths get a 404.
//! One connection serves one request and is then closed.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Advertise more bytes than are sent, then hang up mid-body.
    pub truncate: bool,
    /// Omit `Content-Length` and close the connection to end the body.
    pub no_content_length: bool,
}

impl Route {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: vec![],
            body: body.into(),
            truncate: false,
            no_content_length: false,
        }
    }

    pub fn status(status: u16) -> Self {
        Self { status, ..Self::ok(Vec::new()) }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn hit(self) -> Self {
        self.header("X-Cache", "HIT")
    }

    pub fn truncated(mut self) -> Self {
        self.truncate = true;
        self
    }

    pub fn without_content_length(mut self) -> Self {
        self.no_content_length = true;
        self
    }
}

pub struct TestServer {
    /// `host:port`, ready to be used as the edge server.
    pub addr: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Raw request heads received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Starts the server on a background thread. It runs until the process exits.
pub fn start(routes: impl IntoIterator<Item = (&'static str, Route)>) -> TestServer {
    let routes: HashMap<String, Route> = routes.into_iter().map(|(p, r)| (p.to_owned(), r)).collect();
    let routes = Arc::new(routes);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().unwrap().to_string();

    let seen = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let seen = Arc::clone(&seen);
            thread::spawn(move || handle(stream, &routes, &seen));
        }
    });

    TestServer { addr, requests }
}

/// An address nothing listens on.
pub fn refused_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().unwrap().to_string()
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, Route>, seen: &Mutex<Vec<String>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let Some(head) = read_head(&mut stream) else { return };
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_owned();
    seen.lock().unwrap().push(head);

    let route = routes.get(&path).cloned().unwrap_or_else(|| Route::status(404));
    let mut response = format!("HTTP/1.1 {} Scripted\r\nConnection: close\r\n", route.status);
    for (name, value) in &route.headers {
        response += &format!("{name}: {value}\r\n");
    }
    if !route.no_content_length {
        let advertised = if route.truncate { route.body.len() + 1024 } else { route.body.len() };
        response += &format!("Content-Length: {advertised}\r\n");
    }
    response += "\r\n";

    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(&route.body);
    let _ = stream.flush();
}

fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8(buf).ok()
}
