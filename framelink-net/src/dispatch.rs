//! Typed message dispatch.
//!
//! A dispatcher maps the 16-bit envelope type code at the head of each
//! frame to a registered handler. Handlers receive the full frame, type
//! code included, so they may re-decode with their own payload type.
//!
//! Registries are populated before the server or client starts and are
//! read-only on the hot path. An unknown type code is logged and the frame
//! discarded; handler failures are logged and swallowed. Neither is fatal
//! to the connection.

use bytes::Bytes;
use framelink_wire::envelope;
use std::collections::HashMap;

use crate::error::NetError;

type Handler<E> = Box<dyn Fn(&E, &Bytes) -> Result<(), NetError> + Send + Sync>;

/// Registry of per-type-code frame handlers.
///
/// `E` is the endpoint a handler replies through: a session on servers, a
/// connection on clients, a sender address on datagram endpoints.
pub struct Dispatcher<E> {
    handlers: HashMap<i16, Handler<E>>,
}

impl<E> Dispatcher<E> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers a handler for a type code, replacing any previous one.
    pub fn register<F>(&mut self, kind: i16, handler: F)
    where
        F: Fn(&E, &Bytes) -> Result<(), NetError> + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
    }

    /// Routes one inbound frame to its handler.
    pub fn dispatch(&self, endpoint: &E, frame: &Bytes) {
        let kind = match envelope::peek_kind(frame) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!("Discarding malformed frame: {}", e);
                return;
            }
        };

        match self.handlers.get(&kind) {
            Some(handler) => {
                if let Err(e) = handler(endpoint, frame) {
                    tracing::error!("Handler for message type {} failed: {}", kind, e);
                }
            }
            None => {
                tracing::warn!("No handler registered for message type {}", kind);
            }
        }
    }

    pub fn contains(&self, kind: i16) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<E> Default for Dispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framelink_wire::{Envelope, WireEncode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn frame_of(kind: i16, payload: &str) -> Bytes {
        Bytes::from(Envelope::new(kind, payload.to_string()).to_bytes().into_vec())
    }

    #[test]
    fn test_dispatch_by_kind() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::<()>::new();

        let counted = hits.clone();
        dispatcher.register(7, move |_, frame| {
            // Handlers get the whole frame, type code included.
            assert_eq!(envelope::peek_kind(frame).unwrap(), 7);
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        dispatcher.dispatch(&(), &frame_of(7, "ping"));
        dispatcher.dispatch(&(), &frame_of(7, "pong"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unknown_kind_is_discarded() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::<()>::new();

        let counted = hits.clone();
        dispatcher.register(1, move |_, _| {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        dispatcher.dispatch(&(), &frame_of(2, "nobody home"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_short_frame_is_discarded() {
        let mut dispatcher = Dispatcher::<()>::new();
        dispatcher.register(0, |_, _| panic!("must not run"));

        dispatcher.dispatch(&(), &Bytes::from_static(&[0x01]));
        dispatcher.dispatch(&(), &Bytes::new());
    }

    #[test]
    fn test_handler_error_is_swallowed() {
        let mut dispatcher = Dispatcher::<()>::new();
        dispatcher.register(3, |_, _| Err(NetError::Handler("boom".into())));

        // Must not panic or propagate.
        dispatcher.dispatch(&(), &frame_of(3, "x"));
    }

    #[test]
    fn test_register_replaces() {
        let mut dispatcher = Dispatcher::<()>::new();
        dispatcher.register(1, |_, _| Ok(()));
        dispatcher.register(1, |_, _| Ok(()));
        assert_eq!(dispatcher.len(), 1);
        assert!(dispatcher.contains(1));
    }
}
