//! Dedicated parse threads.
//!
//! Requests carry raw text; replies carry the dehydrated [`ParsedDocument`]
//! which the builder rehydrates. Workers share no state with the index.

use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tokio_util::sync::CancellationToken;

use super::error::WorkspaceError;
use crate::base::Location;
use crate::syntax::ParsedDocument;

struct ParseRequest {
    location: Location,
    text: String,
    cancel: CancellationToken,
}

enum WorkerReply {
    Parsed(String),
    Cancelled,
    Failed(serde_json::Error),
}

struct ParseResponse {
    location: Location,
    reply: WorkerReply,
}

/// A pool of parse threads fed through a request channel.
pub struct ParseWorker {
    requests: Option<Sender<ParseRequest>>,
    responses: Receiver<ParseResponse>,
    handles: Vec<JoinHandle<()>>,
}

impl ParseWorker {
    /// Spawn `threads` workers (at least one).
    pub fn spawn(threads: usize) -> Self {
        let (request_tx, request_rx) = unbounded::<ParseRequest>();
        let (response_tx, response_rx) = unbounded::<ParseResponse>();
        let handles = (0..threads.max(1))
            .map(|n| {
                let requests = request_rx.clone();
                let responses = response_tx.clone();
                std::thread::Builder::new()
                    .name(format!("tessera-parse-{n}"))
                    .spawn(move || serve(requests, responses))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!("[BUILD] failed to spawn parse worker: {}", e);
                    None
                }
            })
            .collect();
        Self {
            requests: Some(request_tx),
            responses: response_rx,
            handles,
        }
    }

    pub fn threads(&self) -> usize {
        self.handles.len()
    }

    /// Parse a batch. `None` marks a parse that was cancelled.
    pub fn parse_batch(
        &self,
        jobs: Vec<(Location, String, CancellationToken)>,
    ) -> Result<Vec<(Location, Option<ParsedDocument>)>, WorkspaceError> {
        let sender = self
            .requests
            .as_ref()
            .filter(|_| !self.handles.is_empty())
            .ok_or(WorkspaceError::WorkerShutdown)?;
        let count = jobs.len();
        for (location, text, cancel) in jobs {
            sender
                .send(ParseRequest {
                    location,
                    text,
                    cancel,
                })
                .map_err(|_| WorkspaceError::WorkerShutdown)?;
        }

        let mut results = Vec::with_capacity(count);
        for _ in 0..count {
            let response = self
                .responses
                .recv()
                .map_err(|_| WorkspaceError::WorkerShutdown)?;
            let document = match response.reply {
                WorkerReply::Parsed(payload) => Some(ParsedDocument::rehydrate(&payload).map_err(
                    |source| WorkspaceError::Transfer {
                        location: response.location.clone(),
                        source,
                    },
                )?),
                WorkerReply::Cancelled => None,
                WorkerReply::Failed(source) => {
                    return Err(WorkspaceError::Transfer {
                        location: response.location,
                        source,
                    });
                }
            };
            results.push((response.location, document));
        }
        Ok(results)
    }
}

fn serve(requests: Receiver<ParseRequest>, responses: Sender<ParseResponse>) {
    for request in requests {
        let reply = match ParsedDocument::parse_cancellable(&request.text, &request.cancel) {
            Some(document) => match document.dehydrate() {
                Ok(payload) => WorkerReply::Parsed(payload),
                Err(e) => WorkerReply::Failed(e),
            },
            None => WorkerReply::Cancelled,
        };
        let response = ParseResponse {
            location: request.location,
            reply,
        };
        if responses.send(response).is_err() {
            break;
        }
    }
}

impl Drop for ParseWorker {
    fn drop(&mut self) {
        // Closing the request channel ends every worker loop
        self.requests.take();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("[BUILD] parse worker panicked");
            }
        }
    }
}
