// ABOUTME: Suite-scoped context owning the server lifecycle for one test run

use chrono::{DateTime, Utc};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::compose::{ComposeBackend, ComposeCli};
use crate::config::HarnessConfig;
use crate::error::HarnessResult;
use crate::server::{ServerLifecycle, StartReport};

/// Explicit replacement for suite-wide globals: created before the first
/// scenario, closed after the last one.
#[derive(Debug)]
pub struct TestSession<B = ComposeCli> {
    id: Uuid,
    created_at: DateTime<Utc>,
    server: ServerLifecycle<B>,
    started: bool,
}

impl TestSession<ComposeCli> {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(ServerLifecycle::from_config(config))
    }
}

impl<B: ComposeBackend> TestSession<B> {
    pub fn new(server: ServerLifecycle<B>) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            server,
            started: false,
        };
        info!(session = %session.id, "Test session created");
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether a start was attempted and not yet followed by a stop
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn server(&self) -> &ServerLifecycle<B> {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut ServerLifecycle<B> {
        &mut self.server
    }

    /// Start the server and block until it is ready
    pub async fn start_server(&mut self) -> HarnessResult<StartReport> {
        // A failed start may still have left containers behind
        self.started = true;
        let span = info_span!("session", id = %self.id);
        self.server.start().instrument(span).await
    }

    /// Tear the server down; never fails
    pub async fn stop_server(&mut self) {
        let span = info_span!("session", id = %self.id);
        self.server.stop().instrument(span).await;
        self.started = false;
    }

    /// End the session, stopping the server if it was started
    pub async fn close(mut self) {
        if self.started {
            self.stop_server().await;
        }
        info!(session = %self.id, "Test session closed");
    }
}
