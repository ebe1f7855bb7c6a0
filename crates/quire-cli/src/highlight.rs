//! Background highlighting: requests go to a worker thread, responses come
//! back through a channel and are applied on the next tick.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use quire_engine::render::{HighlightRequest, HighlightResponse, Highlighter};
use uuid::Uuid;

/// Requests and responses are tagged with the session they belong to, so a
/// response that arrives after switching drafts is dropped.
type Tagged<T> = (Uuid, T);

pub struct HighlightWorker {
    requests: Option<Sender<Tagged<HighlightRequest>>>,
    responses: Receiver<Tagged<HighlightResponse>>,
    handle: Option<JoinHandle<()>>,
}

impl HighlightWorker {
    pub fn spawn(highlighter: impl Highlighter + Send + 'static) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<Tagged<HighlightRequest>>();
        let (response_tx, response_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            for (session, request) in request_rx {
                let response = request.run(&highlighter);
                if response_tx.send((session, response)).is_err() {
                    break;
                }
            }
            log::debug!("highlight worker stopped");
        });
        Self {
            requests: Some(request_tx),
            responses: response_rx,
            handle: Some(handle),
        }
    }

    pub fn submit(&self, session: Uuid, requests: Vec<HighlightRequest>) {
        let Some(sender) = &self.requests else {
            return;
        };
        for request in requests {
            if sender.send((session, request)).is_err() {
                log::warn!("highlight worker is gone, request dropped");
                return;
            }
        }
    }

    /// Responses that arrived since the last call, for `session` only.
    pub fn drain(&self, session: Uuid) -> Vec<HighlightResponse> {
        self.responses
            .try_iter()
            .filter_map(|(owner, response)| (owner == session).then_some(response))
            .collect()
    }
}

impl Drop for HighlightWorker {
    fn drop(&mut self) {
        // closing the channel ends the worker loop
        self.requests.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::warn!("highlight worker panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_engine::render::{BlockId, SimpleHighlighter};
    use std::time::{Duration, Instant};

    fn request(generation: u64) -> HighlightRequest {
        HighlightRequest {
            block: BlockId(1),
            generation,
            text: "let a".into(),
            language: "ts".into(),
        }
    }

    fn wait_for(worker: &HighlightWorker, session: Uuid, count: usize) -> Vec<HighlightResponse> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut out = Vec::new();
        while out.len() < count && Instant::now() < deadline {
            out.extend(worker.drain(session));
            thread::sleep(Duration::from_millis(5));
        }
        out
    }

    #[test]
    fn responses_come_back_in_order() {
        let worker = HighlightWorker::spawn(SimpleHighlighter::new());
        let session = Uuid::new_v4();
        worker.submit(session, vec![request(1), request(2)]);
        let responses = wait_for(&worker, session, 2);
        let generations: Vec<_> = responses.iter().map(|r| r.generation).collect();
        assert_eq!(generations, vec![1, 2]);
        assert!(responses.iter().all(|r| r.result.is_ok()));
    }

    #[test]
    fn other_sessions_are_filtered_out() {
        let worker = HighlightWorker::spawn(SimpleHighlighter::new());
        let (old, current) = (Uuid::new_v4(), Uuid::new_v4());
        worker.submit(old, vec![request(1)]);
        worker.submit(current, vec![request(7)]);
        let responses = wait_for(&worker, current, 1);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].generation, 7);
    }
}
