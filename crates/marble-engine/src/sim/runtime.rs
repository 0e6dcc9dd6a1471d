//! Native runtime: the executor on a dedicated OS thread behind channels.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{info, warn};

use crate::api::config::EngineConfig;
use crate::bridge::port::ExecutorPort;
use crate::bridge::protocol::{Request, Response};
use crate::sim::executor::Executor;

/// Handle to an executor running on its own thread.
///
/// Dropping the handle closes the request channel and joins the thread.
pub struct ExecutorThread {
    requests: Option<Sender<Request>>,
    responses: Receiver<Response>,
    handle: Option<JoinHandle<()>>,
}

impl ExecutorThread {
    pub fn spawn(config: EngineConfig) -> io::Result<Self> {
        let (request_tx, request_rx) = unbounded();
        let (response_tx, response_rx) = unbounded();

        let handle = thread::Builder::new()
            .name("marble-executor".into())
            .spawn(move || run(Executor::new(config), request_rx, response_tx))?;

        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            handle: Some(handle),
        })
    }

    /// Wait up to `timeout` for the next response.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Response> {
        self.responses.recv_timeout(timeout).ok()
    }
}

impl ExecutorPort for ExecutorThread {
    fn post(&mut self, request: Request) {
        let delivered = self
            .requests
            .as_ref()
            .is_some_and(|tx| tx.send(request).is_ok());
        if !delivered {
            warn!("executor thread is gone; request dropped");
        }
    }

    fn poll(&mut self) -> Vec<Response> {
        self.responses.try_iter().collect()
    }
}

impl Drop for ExecutorThread {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("executor thread panicked");
            }
        }
    }
}

/// Thread body. Blocks while idle, waits out the preview throttle with a
/// timeout, and polls between preview chunks.
fn run(mut executor: Executor, requests: Receiver<Request>, responses: Sender<Response>) {
    let started = Instant::now();
    let now_ms = || started.elapsed().as_secs_f64() * 1000.0;

    loop {
        let request = match executor.wake_in(now_ms()) {
            None => match requests.recv() {
                Ok(request) => Some(request),
                Err(_) => break,
            },
            Some(wait) if wait <= 0.0 => match requests.try_recv() {
                Ok(request) => Some(request),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            },
            Some(wait) => match requests.recv_timeout(Duration::from_secs_f64(wait / 1000.0)) {
                Ok(request) => Some(request),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
        };

        let mut out = match request {
            Some(request) => executor.handle(request, now_ms()),
            None => Vec::new(),
        };
        out.extend(executor.pump(now_ms()));

        if out.into_iter().any(|response| responses.send(response).is_err()) {
            break;
        }
    }

    info!("executor thread stopped");
}
