//! Test fixtures for creating sample configurations and test data.

use hk_core::context::RunInstance;
use hk_core::emitter::{Emitter, EmitterOptions, EventMeta, Matcher, Payload};
use hk_core::errors::ErrorDomain;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

/// Create a temporary project directory with `.hivekit/config.toml`.
///
/// Returns a TempDir that must be kept alive for the test duration.
#[allow(dead_code)]
pub fn create_test_project(config_toml: &str) -> std::io::Result<TempDir> {
    let temp_dir = tempfile::tempdir()?;
    let hk_dir = temp_dir.path().join(".hivekit");
    std::fs::create_dir_all(&hk_dir)?;
    std::fs::write(hk_dir.join("config.toml"), config_toml)?;
    Ok(temp_dir)
}

/// A run owner with its own emitter, for driving `RunContext::enter` directly.
#[allow(dead_code)]
pub struct TestOwner {
    pub emitter: Emitter,
    pub domain: ErrorDomain,
}

impl TestOwner {
    #[allow(dead_code)]
    pub fn new(emitter: Emitter) -> Self {
        Self {
            emitter,
            domain: ErrorDomain::Framework,
        }
    }

    #[allow(dead_code)]
    pub fn with_domain(mut self, domain: ErrorDomain) -> Self {
        self.domain = domain;
        self
    }
}

impl RunInstance for TestOwner {
    fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    fn error_domain(&self) -> ErrorDomain {
        self.domain
    }
}

/// One delivered event as seen by a [`Recorder`].
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Recorded {
    pub tag: String,
    pub name: String,
    pub path: String,
    pub data: Value,
    pub run_id: Option<String>,
}

/// Collects deliveries from any number of listeners into one ordered log.
#[derive(Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<Recorded>>>,
}

impl Recorder {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a blocking listener on `emitter` that records under `tag`.
    #[allow(dead_code)]
    pub fn attach(&self, emitter: &Emitter, tag: &str, matcher: impl Into<Matcher>) {
        self.attach_with(emitter, tag, matcher, EmitterOptions::default());
    }

    #[allow(dead_code)]
    pub fn attach_with(
        &self,
        emitter: &Emitter,
        tag: &str,
        matcher: impl Into<Matcher>,
        options: EmitterOptions,
    ) {
        let log = self.log.clone();
        let tag = tag.to_string();
        emitter
            .on_match(
                matcher,
                move |data: Payload, meta: EventMeta| {
                    log.lock().push(Recorded {
                        tag: tag.clone(),
                        name: meta.name.clone(),
                        path: meta.path.clone(),
                        data: data.to_json(),
                        run_id: meta.trace.as_ref().map(|t| t.run_id.clone()),
                    });
                    async { Ok(()) }
                },
                options,
            )
            .expect("Failed to register recorder");
    }

    #[allow(dead_code)]
    pub fn entries(&self) -> Vec<Recorded> {
        self.log.lock().clone()
    }

    #[allow(dead_code)]
    pub fn names(&self) -> Vec<String> {
        self.log.lock().iter().map(|r| r.name.clone()).collect()
    }

    #[allow(dead_code)]
    pub fn paths(&self) -> Vec<String> {
        self.log.lock().iter().map(|r| r.path.clone()).collect()
    }

    #[allow(dead_code)]
    pub fn tags(&self) -> Vec<String> {
        self.log.lock().iter().map(|r| r.tag.clone()).collect()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    #[allow(dead_code)]
    pub fn clear(&self) {
        self.log.lock().clear();
    }
}
