//! Minimal canned-response HTTP server for offline API tests.
//!
//! The client's `base_url` is the test seam: point it at
//! `MockApi::url("/v1")` and register one response per request target.
//! Requests are recorded so tests can assert call counts (e.g. the
//! resolver fast path must not enumerate editions).

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Clone)]
struct Route {
    status: u16,
    body: String,
    delay: Option<Duration>,
}

pub struct MockApi {
    addr: SocketAddr,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    hits: Arc<Mutex<Vec<String>>>,
}

impl MockApi {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let addr = listener.local_addr().unwrap();
        let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::new(Mutex::new(HashMap::new()));
        let hits: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let thread_routes = Arc::clone(&routes);
        let thread_hits = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let routes = Arc::clone(&thread_routes);
                let hits = Arc::clone(&thread_hits);
                thread::spawn(move || handle(stream, routes, hits));
            }
        });

        Self { addr, routes, hits }
    }

    /// Absolute URL for a path on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Register a 200 response for an exact request target
    /// (path, including the query string reqwest will send).
    pub fn route(&self, target: &str, body: &str) {
        self.route_status(target, 200, body);
    }

    pub fn route_status(&self, target: &str, status: u16, body: &str) {
        self.routes.lock().unwrap().insert(
            target.to_string(),
            Route {
                status,
                body: body.to_string(),
                delay: None,
            },
        );
    }

    /// Register a response that sleeps before answering (timeout tests).
    pub fn route_delayed(&self, target: &str, body: &str, delay: Duration) {
        self.routes.lock().unwrap().insert(
            target.to_string(),
            Route {
                status: 200,
                body: body.to_string(),
                delay: Some(delay),
            },
        );
    }

    /// Number of requests whose target starts with `prefix`.
    pub fn hits_for(&self, prefix: &str) -> usize {
        self.hits
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.starts_with(prefix))
            .count()
    }

    pub fn hit_count(&self) -> usize {
        self.hits.lock().unwrap().len()
    }
}

fn handle(stream: TcpStream, routes: Arc<Mutex<HashMap<String, Route>>>, hits: Arc<Mutex<Vec<String>>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    // "GET /v1/datasets?offset=0&limit=50 HTTP/1.1"
    let target = match request_line.split_whitespace().nth(1) {
        Some(t) => t.to_string(),
        None => return,
    };
    // Drain headers; requests are GET, so no body follows.
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) if line == "\r\n" || line == "\n" => break,
            Ok(_) => {}
            Err(_) => return,
        }
    }

    hits.lock().unwrap().push(target.clone());

    let route = {
        let routes = routes.lock().unwrap();
        routes
            .get(&target)
            .or_else(|| {
                let path_only = target.split('?').next().unwrap_or(&target);
                routes.get(path_only)
            })
            .cloned()
    };
    let route = route.unwrap_or(Route {
        status: 404,
        body: r#"{"message":"not found"}"#.to_string(),
        delay: None,
    });

    if let Some(delay) = route.delay {
        thread::sleep(delay);
    }

    let reason = match route.status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        route.status,
        reason,
        route.body.len(),
        route.body
    );
    let mut stream = reader.into_inner();
    let _ = stream.write_all(response.as_bytes());
}
