//! Test doubles shared by the unit tests

use crate::error::{Error, Result};
use crate::save::FileSaver;
use crate::transport::{ApiRequest, ApiResponse, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::sync::{Notify, oneshot};

struct Scripted {
    response: Result<ApiResponse>,
    gate: Option<oneshot::Receiver<()>>,
}

/// Transport that answers from a FIFO script and records every request
///
/// A gated entry holds its response until the paired sender fires (or is
/// dropped), which lets a test keep one request in flight while others run.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ApiRequest>>,
    arrived: Notify,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next request immediately
    pub fn push(&self, response: Result<ApiResponse>) {
        self.script.lock().push_back(Scripted {
            response,
            gate: None,
        });
    }

    /// Answer the next request once `gate` resolves
    pub fn push_gated(&self, response: Result<ApiResponse>, gate: oneshot::Receiver<()>) {
        self.script.lock().push_back(Scripted {
            response,
            gate: Some(gate),
        });
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// Resolve once at least `count` requests have arrived
    pub async fn wait_for_requests(&self, count: usize) {
        loop {
            let notified = self.arrived.notified();
            let seen = self.requests.lock().len();
            if seen >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let next = self.script.lock().pop_front();
        self.requests.lock().push(request.clone());
        self.arrived.notify_waiters();

        let Some(Scripted { response, gate }) = next else {
            return Err(Error::Transport {
                cause: format!("no scripted response for {request:?}"),
            });
        };
        if let Some(gate) = gate {
            gate.await.ok();
        }
        response
    }
}

/// 2xx/4xx/5xx response with a JSON body
pub fn json_response(status: u16, body: &str) -> ApiResponse {
    ApiResponse {
        status,
        content_disposition: None,
        body: body.as_bytes().to_vec(),
    }
}

/// Response with an empty body
pub fn status_response(status: u16) -> ApiResponse {
    ApiResponse {
        status,
        ..Default::default()
    }
}

/// 200 response carrying audio bytes
pub fn audio_response(bytes: &[u8], content_disposition: Option<&str>) -> ApiResponse {
    ApiResponse {
        status: 200,
        content_disposition: content_disposition.map(str::to_owned),
        body: bytes.to_vec(),
    }
}

/// Saver that keeps files in memory
#[derive(Default)]
pub struct MemorySaver {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saved filenames in save order
    pub fn filenames(&self) -> Vec<String> {
        self.files.lock().iter().map(|(name, _)| name.clone()).collect()
    }
}

#[async_trait]
impl FileSaver for MemorySaver {
    async fn save(&self, filename: &str, bytes: Vec<u8>) -> Result<PathBuf> {
        self.files.lock().push((filename.to_string(), bytes));
        Ok(PathBuf::from("/memory").join(filename))
    }
}

/// Saver whose every call fails with an I/O error
pub struct BrokenSaver;

#[async_trait]
impl FileSaver for BrokenSaver {
    async fn save(&self, _filename: &str, _bytes: Vec<u8>) -> Result<PathBuf> {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only filesystem",
        )))
    }
}
