//! HTTP collaborators for the proctoring monitor
//!
//! - Environment configuration
//! - `reqwest` transport for the JSON and multipart log-activity variants
//! - Diagnostics (tracing + Sentry)
//!
use std::sync::Arc;

use anyhow::Context;
use proctor_core::{
    MonitorDeps, ProctoringMonitor, SessionContext, TokenProvider, camera::MediaDevices,
    platform::Document,
};

pub mod config;
pub mod http;
pub mod telemetry;

use config::EnvVars;
use http::HttpTransport;

/// Shared HTTP plumbing for every monitor a page creates.
#[derive(Clone)]
pub struct ProctorClient {
    pub env_vars: EnvVars,
    tokens: Arc<dyn TokenProvider>,
    transport: Arc<HttpTransport>,
}

impl ProctorClient {
    pub fn new(env_vars: EnvVars, tokens: Arc<dyn TokenProvider>) -> Self {
        let transport = Arc::new(HttpTransport::new(
            env_vars.api_base_url.clone(),
            Arc::clone(&tokens),
        ));
        Self {
            env_vars,
            tokens,
            transport,
        }
    }

    /// Loads `.env`, then the process environment.
    pub fn from_env(tokens: Arc<dyn TokenProvider>) -> Self {
        dotenvy::dotenv().ok();
        Self::new(EnvVars::new(), tokens)
    }

    pub fn transport(&self) -> Arc<HttpTransport> {
        Arc::clone(&self.transport)
    }

    /// Starts proctoring `context` against the configured backend.
    pub fn monitor(
        &self,
        context: SessionContext,
        document: Arc<dyn Document>,
        media: Arc<dyn MediaDevices>,
    ) -> anyhow::Result<ProctoringMonitor> {
        let deps = MonitorDeps::new(
            document,
            media,
            self.transport.clone(),
            Arc::clone(&self.tokens),
        );
        ProctoringMonitor::new(context, deps, self.env_vars.monitor_settings())
            .context("unable to start proctoring monitor")
    }
}
