use std::sync::Arc;

use mirrorgen_config::config::Config;
use mirrorgen_events::EventSinkHandle;

/// Configuration and event sink shared by every operation of a run.
#[derive(Clone)]
pub struct MirrorContext {
    inner: Arc<MirrorContextInner>,
}

struct MirrorContextInner {
    config: Config,
    events: EventSinkHandle,
}

impl MirrorContext {
    pub fn new(config: Config, events: EventSinkHandle) -> Self {
        Self {
            inner: Arc::new(MirrorContextInner {
                config,
                events,
            }),
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    #[inline]
    pub fn events(&self) -> &EventSinkHandle {
        &self.inner.events
    }
}
