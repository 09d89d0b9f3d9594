//! Registration lifecycle: connections, idempotency, staleness.

use fancast::testing::{FnStream, RecordingStream};
use fancast::{ConnectionError, Registry, RegistryError, Stream, Value};
use std::sync::Arc;

mod common;
use common::{clicks, speak, speech};

#[test]
fn connection_tracks_registration_lifecycle() {
    let registry = Registry::new();
    let stream: Arc<dyn Stream> = Arc::new(RecordingStream::new(vec![speech()]));

    assert!(registry.connection_of(&stream).is_none());

    let connection = registry.register(stream.clone()).unwrap();
    assert!(connection.is_connected());
    assert!(registry.connection_of(&stream).is_some());
    assert_eq!(registry.members_of(speech()).len(), 1);

    registry.unregister(&stream);
    assert!(registry.connection_of(&stream).is_none());
    assert!(!connection.is_connected());
    assert!(registry.members_of(speech()).is_empty());

    // Unregistering again is a no-op.
    registry.unregister(&stream);
}

#[test]
fn registration_keeps_the_stream_alive_without_the_owner() {
    let registry = Registry::new();
    let proxy = registry.proxy().build(speech()).unwrap();

    let stream: Arc<dyn Stream> =
        Arc::new(RecordingStream::new(vec![speech()]).with_reply("live"));
    registry.register(stream.clone()).unwrap();
    drop(stream);

    // The registry owns the registrant until unregistration, so dropping
    // every external handle changes nothing.
    assert_eq!(proxy.dispatch(&speak()).unwrap(), Some(Value::from("live")));
    let members = registry.members_of(speech());
    assert_eq!(members.len(), 1);

    // A snapshot handle is enough to unregister and reclaim it.
    registry.unregister(&members[0]);
    assert!(registry.members_of(speech()).is_empty());
    assert_eq!(proxy.dispatch(&speak()).unwrap(), None);
}

#[test]
fn register_is_idempotent_while_live() {
    let registry = Registry::new();
    let stream: Arc<dyn Stream> = Arc::new(RecordingStream::new(vec![speech()]));

    let first = registry.register(stream.clone()).unwrap();
    let second = registry.register(stream.clone()).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.members_of(speech()).len(), 1);
}

#[test]
fn stream_without_interfaces_is_rejected() {
    let registry = Registry::new();
    let stream: Arc<dyn Stream> = Arc::new(FnStream::new(Vec::new(), |_, _| Ok(None)));

    let err = registry.register(stream.clone()).unwrap_err();
    assert!(matches!(err, RegistryError::NoInterface));
    assert!(registry.connection_of(&stream).is_none());
}

#[test]
fn reregistration_returns_fresh_connection_and_stales_the_old() {
    let registry = Registry::new();
    let a: Arc<dyn Stream> = Arc::new(RecordingStream::new(vec![speech()]));
    let b: Arc<dyn Stream> = Arc::new(RecordingStream::new(vec![speech()]));

    let stale = registry.register(a.clone()).unwrap();
    registry.register(b.clone()).unwrap();
    registry.unregister(&a);
    let fresh = registry.register(a.clone()).unwrap();

    assert!(!Arc::ptr_eq(&stale, &fresh));
    assert!(!stale.is_connected());
    assert!(fresh.is_connected());

    // A priority write through the stale handle is ignored: order stays
    // as re-registered (b before a), and the fresh connection still
    // reports the default priority.
    stale.set_priority(9, None).unwrap();
    let members = registry.members_of(speech());
    assert!(Arc::ptr_eq(&members[0], &b));
    assert!(Arc::ptr_eq(&members[1], &a));
    assert_eq!(fresh.priority(None).unwrap(), 0);
}

#[test]
fn multi_interface_connections_need_an_explicit_interface() {
    let registry = Registry::new();
    let stream: Arc<dyn Stream> = Arc::new(RecordingStream::new(vec![speech(), clicks()]));
    let connection = registry.register(stream.clone()).unwrap();

    assert!(matches!(
        connection.priority(None),
        Err(ConnectionError::AmbiguousInterface(2))
    ));
    assert!(matches!(
        connection.set_priority(1, None),
        Err(ConnectionError::AmbiguousInterface(2))
    ));
    assert!(matches!(
        connection.break_dispatch(None),
        Err(ConnectionError::AmbiguousInterface(2))
    ));

    connection.set_priority(3, Some(clicks())).unwrap();
    assert_eq!(connection.priority(Some(clicks())).unwrap(), 3);
    assert_eq!(connection.priority(Some(speech())).unwrap(), 0);
}

#[test]
fn rewriting_the_current_priority_leaves_the_order_alone() {
    let registry = Registry::new();
    let a: Arc<dyn Stream> = Arc::new(RecordingStream::new(vec![speech()]));
    let b: Arc<dyn Stream> = Arc::new(RecordingStream::new(vec![speech()]));
    registry.register(a.clone()).unwrap();
    let connection = registry.register(b.clone()).unwrap();

    connection.set_priority(1, None).unwrap();
    let members = registry.members_of(speech());
    assert!(Arc::ptr_eq(&members[0], &b));
    assert!(Arc::ptr_eq(&members[1], &a));

    // Writing the value already stored is a no-op; the established order
    // stands on the next snapshot.
    connection.set_priority(1, None).unwrap();
    let members = registry.members_of(speech());
    assert!(Arc::ptr_eq(&members[0], &b));
    assert!(Arc::ptr_eq(&members[1], &a));
}

#[test]
fn unknown_interface_is_rejected() {
    let registry = Registry::new();
    let stream: Arc<dyn Stream> = Arc::new(RecordingStream::new(vec![speech()]));
    let connection = registry.register(stream).unwrap();

    assert!(matches!(
        connection.priority(Some(clicks())),
        Err(ConnectionError::UnknownInterface(_))
    ));
    assert!(matches!(
        connection.set_priority(1, Some(clicks())),
        Err(ConnectionError::UnknownInterface(_))
    ));
}

#[test]
fn reset_clears_registrations_and_stales_connections() {
    let registry = Registry::new();
    let stream: Arc<dyn Stream> = Arc::new(RecordingStream::new(vec![speech()]));
    let connection = registry.register(stream.clone()).unwrap();

    registry.reset();
    assert!(registry.connection_of(&stream).is_none());
    assert!(registry.members_of(speech()).is_empty());
    assert!(!connection.is_connected());
}
