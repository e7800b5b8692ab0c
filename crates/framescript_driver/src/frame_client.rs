// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frame-fetch client over a persistent duplex channel.
//!
//! The channel itself is abstracted behind [`FrameTransport`] and
//! [`FrameConnection`]. The client serializes requests over one connection,
//! reconnects after a fixed delay when the channel drops and re-issues the
//! outstanding request. A newer request for the same target supersedes an
//! older one still in flight.
//!
//! No transport ships with this crate and the export binary does not fetch
//! frames. Embedders supply a [`FrameTransport`] and a [`ReconnectPolicy`].

use crate::error::FrameError;
use crate::frame_protocol::{decode_frame_packet, DecodedFrame, FrameRequest};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// An open duplex channel
pub trait FrameConnection: Send {
    /// Send one request message
    fn send<'a>(&'a mut self, request: &'a FrameRequest) -> BoxFuture<'a, Result<(), FrameError>>;

    /// Receive the next binary packet
    fn recv(&mut self) -> BoxFuture<'_, Result<Vec<u8>, FrameError>>;
}

/// Opens channels to the frame server
pub trait FrameTransport: Send + Sync {
    /// Open a new channel
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn FrameConnection>, FrameError>>;
}

/// Ticket for one issued request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    target: String,
    seq: u64,
}

/// Tracks the latest request per target
#[derive(Debug, Default)]
pub struct RequestTracker {
    next: AtomicU64,
    latest: Mutex<HashMap<String, u64>>,
}

impl RequestTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket, superseding earlier tickets for the same target
    pub fn begin(&self, request: &FrameRequest) -> RequestTicket {
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        let target = request.target();
        self.latest.lock().insert(target.clone(), seq);
        RequestTicket { target, seq }
    }

    /// Whether `ticket` is still the newest for its target
    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.latest.lock().get(&ticket.target) == Some(&ticket.seq)
    }
}

/// Reconnect policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Fixed delay between attempts
    pub delay: Duration,
    /// Attempts before giving up
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
            max_attempts: 5,
        }
    }
}

/// Frame client with reconnect and last-request-wins
pub struct FrameClient<T: FrameTransport> {
    transport: T,
    policy: ReconnectPolicy,
    tracker: RequestTracker,
    connection: tokio::sync::Mutex<Option<Box<dyn FrameConnection>>>,
}

impl<T: FrameTransport> FrameClient<T> {
    /// Create a client; the channel opens lazily on the first fetch
    pub fn new(transport: T, policy: ReconnectPolicy) -> Self {
        Self {
            transport,
            policy,
            tracker: RequestTracker::new(),
            connection: tokio::sync::Mutex::new(None),
        }
    }

    /// Request tracker, shared by every fetch
    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    /// Fetch and decode one frame.
    ///
    /// A malformed packet fails only this request; the channel stays open.
    pub async fn fetch(&self, request: FrameRequest) -> Result<DecodedFrame, FrameError> {
        let ticket = self.tracker.begin(&request);
        let mut connection = self.connection.lock().await;
        let mut failures = 0u32;

        loop {
            if !self.tracker.is_current(&ticket) {
                return Err(FrameError::Superseded);
            }

            if connection.is_none() {
                match self.transport.connect().await {
                    Ok(conn) => *connection = Some(conn),
                    Err(err) => {
                        failures += 1;
                        self.back_off(failures, &err).await?;
                        continue;
                    }
                }
            }
            let Some(conn) = connection.as_mut() else {
                continue;
            };

            match exchange(conn.as_mut(), &request).await {
                Ok(packet) => {
                    if !self.tracker.is_current(&ticket) {
                        return Err(FrameError::Superseded);
                    }
                    return decode_frame_packet(&packet).map_err(|err| {
                        tracing::warn!("Rejected frame {} of {}: {}", request.frame, request.video, err);
                        err
                    });
                }
                Err(err) => {
                    *connection = None;
                    failures += 1;
                    self.back_off(failures, &err).await?;
                }
            }
        }
    }

    async fn back_off(&self, failures: u32, err: &FrameError) -> Result<(), FrameError> {
        if failures > self.policy.max_attempts {
            tracing::warn!("Frame channel gave up after {} attempts: {}", failures, err);
            return Err(FrameError::RetriesExhausted { attempts: failures });
        }
        tracing::warn!("Frame channel dropped ({}), reconnecting (attempt {})", err, failures);
        tokio::time::sleep(self.policy.delay).await;
        Ok(())
    }
}

async fn exchange(conn: &mut dyn FrameConnection, request: &FrameRequest) -> Result<Vec<u8>, FrameError> {
    conn.send(request).await?;
    conn.recv().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    enum Reply {
        Frame,
        Malformed,
        Drop,
        Slow(Duration),
    }

    #[derive(Default)]
    struct Script {
        connects: usize,
        refuse_connects: usize,
        replies: VecDeque<Reply>,
        sent: Vec<FrameRequest>,
    }

    #[derive(Clone, Default)]
    struct MockTransport {
        script: Arc<Mutex<Script>>,
    }

    impl MockTransport {
        fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Self {
            let transport = Self::default();
            transport.script.lock().replies.extend(replies);
            transport
        }
    }

    struct MockConnection {
        script: Arc<Mutex<Script>>,
        last: Option<FrameRequest>,
    }

    impl FrameTransport for MockTransport {
        fn connect(&self) -> BoxFuture<'_, Result<Box<dyn FrameConnection>, FrameError>> {
            Box::pin(async move {
                let mut script = self.script.lock();
                script.connects += 1;
                if script.refuse_connects > 0 {
                    script.refuse_connects -= 1;
                    return Err(FrameError::Channel("refused".to_string()));
                }
                Ok(Box::new(MockConnection {
                    script: Arc::clone(&self.script),
                    last: None,
                }) as Box<dyn FrameConnection>)
            })
        }
    }

    impl FrameConnection for MockConnection {
        fn send<'a>(
            &'a mut self,
            request: &'a FrameRequest,
        ) -> BoxFuture<'a, Result<(), FrameError>> {
            Box::pin(async move {
                self.script.lock().sent.push(request.clone());
                self.last = Some(request.clone());
                Ok(())
            })
        }

        fn recv(&mut self) -> BoxFuture<'_, Result<Vec<u8>, FrameError>> {
            Box::pin(async move {
                let reply = self.script.lock().replies.pop_front().unwrap_or(Reply::Frame);
                let request = self.last.clone().unwrap();
                let frame = DecodedFrame {
                    width: request.width,
                    height: request.height,
                    frame: request.frame,
                    rgba: vec![0; (request.width * request.height * 4) as usize],
                };
                match reply {
                    Reply::Frame => Ok(frame.to_packet()),
                    Reply::Malformed => {
                        let mut packet = frame.to_packet();
                        packet.pop();
                        Ok(packet)
                    }
                    Reply::Drop => Err(FrameError::Channel("closed".to_string())),
                    Reply::Slow(delay) => {
                        tokio::time::sleep(delay).await;
                        Ok(frame.to_packet())
                    }
                }
            })
        }
    }

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy {
            delay: Duration::from_millis(10),
            max_attempts: 3,
        }
    }

    #[tokio::test]
    async fn test_fetch_decodes_frame() {
        let transport = MockTransport::default();
        let client = FrameClient::new(transport.clone(), policy());

        let frame = client.fetch(FrameRequest::new("a.mp4", 2, 2, 5)).await.unwrap();
        assert_eq!(frame.frame, 5);
        assert_eq!(frame.rgba.len(), 16);
        assert_eq!(transport.script.lock().connects, 1);
    }

    #[tokio::test]
    async fn test_malformed_packet_keeps_channel() {
        let transport = MockTransport::with_replies([Reply::Malformed, Reply::Frame]);
        let client = FrameClient::new(transport.clone(), policy());

        let err = client.fetch(FrameRequest::new("a.mp4", 2, 2, 0)).await.unwrap_err();
        assert!(matches!(err, FrameError::SizeMismatch { .. }));

        assert!(client.fetch(FrameRequest::new("a.mp4", 2, 2, 1)).await.is_ok());
        assert_eq!(transport.script.lock().connects, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_reissues_request() {
        let transport = MockTransport::with_replies([Reply::Drop, Reply::Frame]);
        let client = FrameClient::new(transport.clone(), policy());

        let frame = client.fetch(FrameRequest::new("a.mp4", 1, 1, 9)).await.unwrap();
        assert_eq!(frame.frame, 9);

        let script = transport.script.lock();
        assert_eq!(script.connects, 2);
        assert_eq!(script.sent.len(), 2);
        assert_eq!(script.sent[0], script.sent[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted() {
        let transport = MockTransport::default();
        transport.script.lock().refuse_connects = 10;
        let client = FrameClient::new(transport.clone(), policy());

        let err = client.fetch(FrameRequest::new("a.mp4", 1, 1, 0)).await.unwrap_err();
        assert_eq!(err, FrameError::RetriesExhausted { attempts: 4 });
        assert_eq!(transport.script.lock().connects, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_request_supersedes() {
        let transport = MockTransport::with_replies([Reply::Slow(Duration::from_millis(50))]);
        let client = FrameClient::new(transport, policy());

        let (older, newer) = tokio::join!(
            client.fetch(FrameRequest::new("a.mp4", 1, 1, 1)),
            client.fetch(FrameRequest::new("a.mp4", 1, 1, 2)),
        );
        assert_eq!(older, Err(FrameError::Superseded));
        assert_eq!(newer.unwrap().frame, 2);
    }

    #[test]
    fn test_tracker_targets_are_independent() {
        let tracker = RequestTracker::new();
        let a = tracker.begin(&FrameRequest::new("a.mp4", 1, 1, 0));
        let b = tracker.begin(&FrameRequest::new("b.mp4", 1, 1, 0));
        assert!(tracker.is_current(&a));
        assert!(tracker.is_current(&b));

        let a2 = tracker.begin(&FrameRequest::new("a.mp4", 1, 1, 1));
        assert!(!tracker.is_current(&a));
        assert!(tracker.is_current(&a2));
        assert!(tracker.is_current(&b));
    }
}
