//! The default-stream fallback path.

use fancast::testing::RecordingStream;
use fancast::{
    BoxError, DispatchError, InterfaceId, MethodCall, Registry, Stream, Value,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

mod common;
use common::{Speech, speak, speech};

#[derive(Default)]
struct EchoDefault;

impl Stream for EchoDefault {
    fn interfaces(&self) -> Vec<InterfaceId> {
        vec![InterfaceId::of::<Speech>()]
    }

    fn invoke(
        &self,
        _interface: InterfaceId,
        _call: &MethodCall,
    ) -> Result<Option<Value>, BoxError> {
        Ok(Some("default".into()))
    }
}

#[test]
fn default_stream_answers_when_nobody_is_registered() {
    let registry = Registry::new();
    registry.defaults().register::<EchoDefault>().unwrap();

    let proxy = registry.proxy().build(speech()).unwrap();
    assert_eq!(
        proxy.dispatch(&speak()).unwrap(),
        Some(Value::from("default"))
    );
}

#[test]
fn default_path_bypasses_hooks_and_filter() {
    let registry = Registry::new();
    registry.defaults().register::<EchoDefault>().unwrap();

    let hook_calls = Arc::new(AtomicUsize::new(0));
    let proxy = {
        let before_calls = hook_calls.clone();
        let filter_calls = hook_calls.clone();
        registry
            .proxy()
            .before_dispatch(move |_, _, _| {
                before_calls.fetch_add(1, Ordering::SeqCst);
                true
            })
            .result_filter(move |_, _, _| {
                filter_calls.fetch_add(1, Ordering::SeqCst);
                None
            })
            .build(speech())
            .unwrap()
    };

    // The default's own result comes back untouched.
    assert_eq!(
        proxy.dispatch(&speak()).unwrap(),
        Some(Value::from("default"))
    );
    assert_eq!(hook_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn live_registrants_shadow_the_default() {
    let registry = Registry::new();
    registry.defaults().register::<EchoDefault>().unwrap();

    let stream: Arc<dyn Stream> = Arc::new(RecordingStream::new(vec![speech()]).with_reply("live"));
    registry.register(stream.clone()).unwrap();

    let proxy = registry.proxy().build(speech()).unwrap();
    assert_eq!(proxy.dispatch(&speak()).unwrap(), Some(Value::from("live")));

    // Once the registrant leaves, the default takes over again.
    registry.unregister(&stream);
    assert_eq!(
        proxy.dispatch(&speak()).unwrap(),
        Some(Value::from("default"))
    );
}

#[test]
fn factory_failure_surfaces_as_construction_error() {
    let registry = Registry::new();
    registry
        .defaults()
        .register_factory(speech(), || -> Result<Arc<dyn Stream>, BoxError> {
            Err("no constructor".into())
        });

    let proxy = registry.proxy().build(speech()).unwrap();
    let err = proxy.dispatch(&speak()).unwrap_err();
    assert!(matches!(err, DispatchError::DefaultConstruction { .. }));
}
