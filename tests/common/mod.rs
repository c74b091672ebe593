//! Scripted TestOps stand-in for retry timing tests.
//!
//! httpmock answers every match the same way, so sequences such as
//! 429, 429, 201 are served from a queue by an axum handler that also
//! records when each request arrived.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

pub const TESTCASE_PATH: &str = "/api/rs/testcase";

#[derive(Debug, Clone)]
pub enum Reply {
    Status(StatusCode, String),
    /// Hold the request open for the given time before answering.
    Stall(Duration),
}

impl Reply {
    pub fn status(status: StatusCode) -> Self {
        Reply::Status(status, String::new())
    }

    pub fn json(status: StatusCode, body: serde_json::Value) -> Self {
        Reply::Status(status, body.to_string())
    }
}

#[derive(Clone, Default)]
struct Script {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    arrivals: Arc<Mutex<Vec<Instant>>>,
    bodies: Arc<Mutex<Vec<String>>>,
}

async fn create_test_case(State(script): State<Script>, body: Bytes) -> Response {
    script.arrivals.lock().unwrap().push(Instant::now());
    script
        .bodies
        .lock()
        .unwrap()
        .push(String::from_utf8_lossy(&body).into_owned());
    let reply = script.replies.lock().unwrap().pop_front();

    match reply {
        Some(Reply::Status(status, body)) => {
            (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        Some(Reply::Stall(pause)) => {
            tokio::time::sleep(pause).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

pub struct ScriptedServer {
    addr: SocketAddr,
    script: Script,
}

impl ScriptedServer {
    pub async fn start(replies: Vec<Reply>) -> Self {
        let script = Script {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            ..Script::default()
        };
        let app = Router::new()
            .route(TESTCASE_PATH, post(create_test_case))
            .with_state(script.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, script }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}{}", self.addr, TESTCASE_PATH)
    }

    pub fn arrivals(&self) -> Vec<Instant> {
        self.script.arrivals.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.script.bodies.lock().unwrap().clone()
    }
}

/// Accepts every connection and closes it before any response is written.
pub struct HangUpServer {
    addr: SocketAddr,
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl HangUpServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let arrivals = Arc::new(Mutex::new(Vec::new()));

        let recorded = arrivals.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                recorded.lock().unwrap().push(Instant::now());
                drop(stream);
            }
        });

        Self { addr, arrivals }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}{}", self.addr, TESTCASE_PATH)
    }

    pub fn arrivals(&self) -> Vec<Instant> {
        self.arrivals.lock().unwrap().clone()
    }
}
