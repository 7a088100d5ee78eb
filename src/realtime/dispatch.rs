//! Typed publish/subscribe table for inbound frames.
//!
//! Handlers for a type run in registration order. A failing or panicking
//! handler is logged and the remaining handlers still run.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use super::frame::Frame;

/// Frame handler; `off` matches on the identity of this `Arc`
pub type Handler = Arc<dyn Fn(&Frame) -> anyhow::Result<()> + Send + Sync>;

/// Outcome of dispatching one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub invoked: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<HashMap<String, Vec<Handler>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`; returns it for a later [`off`](Self::off)
    pub fn on(&self, kind: &str, handler: Handler) -> Handler {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(kind.to_string())
            .or_default()
            .push(Arc::clone(&handler));
        handler
    }

    pub fn on_fn<F>(&self, kind: &str, f: F) -> Handler
    where
        F: Fn(&Frame) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(kind, Arc::new(f))
    }

    /// Remove every registration of this exact handler; others for the same
    /// kind stay. Returns whether anything was removed.
    pub fn off(&self, kind: &str, handler: &Handler) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        let Some(list) = handlers.get_mut(kind) else {
            return false;
        };

        let before = list.len();
        list.retain(|h| !same_handler(h, handler));
        let removed = list.len() < before;
        if list.is_empty() {
            handlers.remove(kind);
        }
        removed
    }

    pub fn handler_count(&self, kind: &str) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(kind)
            .map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn dispatch(&self, frame: &Frame) -> DispatchReport {
        // Snapshot so handlers may call on/off
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&frame.kind)
            .cloned()
            .unwrap_or_default();

        let mut report = DispatchReport::default();
        for handler in handlers {
            report.invoked += 1;
            match catch_unwind(AssertUnwindSafe(|| handler(frame))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::warn!(frame_type = %frame.kind, error = %e, "Realtime handler failed");
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::error!(frame_type = %frame.kind, "Realtime handler panicked");
                }
            }
        }
        report
    }
}

fn same_handler(a: &Handler, b: &Handler) -> bool {
    // Compare data pointers only; vtable addresses are not stable
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Handler {
        let log = Arc::clone(log);
        Arc::new(move |_frame: &Frame| {
            log.lock().unwrap().push(name);
            Ok(())
        })
    }

    #[test]
    fn test_registration_order() {
        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        dispatcher.on("message", recorder(&log, "first"));
        dispatcher.on("message", recorder(&log, "second"));
        dispatcher.on("typing", recorder(&log, "other"));

        let report = dispatcher.dispatch(&Frame::new("message"));

        assert_eq!(report.invoked, 2);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_failures_are_isolated() {
        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        dispatcher.on_fn("message", |_| anyhow::bail!("bad payload"));
        dispatcher.on_fn("message", |_| panic!("handler bug"));
        dispatcher.on("message", recorder(&log, "survivor"));

        let report = dispatcher.dispatch(&Frame::new("message"));

        assert_eq!(report, DispatchReport { invoked: 3, failed: 2 });
        assert_eq!(*log.lock().unwrap(), vec!["survivor"]);
    }

    #[test]
    fn test_off_removes_only_that_handler() {
        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = dispatcher.on("message", recorder(&log, "a"));
        dispatcher.on("message", recorder(&log, "b"));

        assert!(dispatcher.off("message", &a));
        assert!(!dispatcher.off("message", &a));
        dispatcher.dispatch(&Frame::new("message"));

        assert_eq!(*log.lock().unwrap(), vec!["b"]);
        assert_eq!(dispatcher.handler_count("message"), 1);
    }

    #[test]
    fn test_same_handler_registered_twice() {
        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = recorder(&log, "h");
        dispatcher.on("typing", Arc::clone(&handler));
        dispatcher.on("typing", Arc::clone(&handler));

        let other = recorder(&log, "other");
        dispatcher.on("typing", Arc::clone(&other));

        assert!(dispatcher.off("typing", &handler));
        assert_eq!(dispatcher.handler_count("typing"), 1);
        dispatcher.dispatch(&Frame::new("typing"));

        assert_eq!(*log.lock().unwrap(), vec!["other"]);
        assert!(!dispatcher.off("typing", &handler));
    }
}
