use std::collections::VecDeque;

use crate::bridge::protocol::{Request, Response};

/// One end of the ordered, reliable channel between the playback scheduler
/// and the executor.
pub trait ExecutorPort {
    /// Send a request to the executor.
    fn post(&mut self, request: Request);

    /// Collect every response that has arrived since the last poll, in order.
    fn poll(&mut self) -> Vec<Response>;
}

/// Buffers traffic for an external transport such as `postMessage`.
///
/// The host drains [`QueuePort::take_outgoing`] into the transport and feeds
/// arriving messages back through [`QueuePort::deliver`].
#[derive(Debug, Default)]
pub struct QueuePort {
    outgoing: VecDeque<Request>,
    incoming: VecDeque<Response>,
}

impl QueuePort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_outgoing(&mut self) -> Vec<Request> {
        self.outgoing.drain(..).collect()
    }

    pub fn deliver(&mut self, response: Response) {
        self.incoming.push_back(response);
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }
}

impl ExecutorPort for QueuePort {
    fn post(&mut self, request: Request) {
        self.outgoing.push_back(request);
    }

    fn poll(&mut self) -> Vec<Response> {
        self.incoming.drain(..).collect()
    }
}

#[cfg(feature = "physics")]
pub use loopback::LoopbackPort;

#[cfg(feature = "physics")]
mod loopback {
    use super::ExecutorPort;
    use crate::api::config::EngineConfig;
    use crate::bridge::protocol::{Request, Response};
    use crate::sim::executor::Executor;

    /// In-process port: requests are handled as they are posted, previews
    /// advance one chunk per poll. Time is a manual clock in milliseconds.
    pub struct LoopbackPort {
        executor: Executor,
        inbox: Vec<Response>,
        now_ms: f64,
    }

    impl LoopbackPort {
        pub fn new(config: EngineConfig) -> Self {
            Self {
                executor: Executor::new(config),
                inbox: Vec::new(),
                now_ms: 0.0,
            }
        }

        pub fn set_now(&mut self, now_ms: f64) {
            self.now_ms = now_ms;
        }

        pub fn advance_clock(&mut self, ms: f64) {
            self.now_ms += ms;
        }

        pub fn now_ms(&self) -> f64 {
            self.now_ms
        }

        pub fn executor(&self) -> &Executor {
            &self.executor
        }
    }

    impl ExecutorPort for LoopbackPort {
        fn post(&mut self, request: Request) {
            let responses = self.executor.handle(request, self.now_ms);
            self.inbox.extend(responses);
        }

        fn poll(&mut self) -> Vec<Response> {
            let mut responses = std::mem::take(&mut self.inbox);
            responses.extend(self.executor.pump(self.now_ms));
            responses
        }
    }
}
