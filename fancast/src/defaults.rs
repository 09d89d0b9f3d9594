//! Default-stream fallback configuration and the weak instance cache.

use fancast_core::{BoxError, DispatchError, InterfaceId, RegistryError, Stream};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Constructs fallback stream instances on demand.
///
/// Closures of the matching signature implement this directly.
pub trait DefaultStreamFactory: Send + Sync + 'static {
    /// Build a fresh fallback instance.
    fn create(&self) -> Result<Arc<dyn Stream>, BoxError>;
}

impl<F> DefaultStreamFactory for F
where
    F: Fn() -> Result<Arc<dyn Stream>, BoxError> + Send + Sync + 'static,
{
    fn create(&self) -> Result<Arc<dyn Stream>, BoxError> {
        self()
    }
}

fn construct_default<D: Stream + Default>() -> Result<Arc<dyn Stream>, BoxError> {
    Ok(Arc::new(D::default()))
}

struct CacheState {
    factories: HashMap<InterfaceId, Arc<dyn DefaultStreamFactory>>,
    cached: HashMap<InterfaceId, Weak<dyn Stream>>,
}

/// Per-interface fallback instances, weakly cached.
///
/// When a dispatch finds no live registrants it asks this cache for a
/// default stream. Instances are cached behind weak handles: while
/// somebody holds the instance, repeated gets return it; once the last
/// strong reference drops, the next get constructs a new one. The weak
/// caching is memory hygiene, not a correctness requirement.
pub struct DefaultStreamCache {
    state: Mutex<CacheState>,
}

impl DefaultStreamCache {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(CacheState {
                factories: HashMap::new(),
                cached: HashMap::new(),
            }),
        }
    }

    /// Install `factory` as the fallback source for `interface`.
    /// Replaces any previous factory; the cached instance is dropped.
    pub fn register_factory(&self, interface: InterfaceId, factory: impl DefaultStreamFactory) {
        let mut state = self.lock_state();
        state.factories.insert(interface, Arc::new(factory));
        state.cached.remove(&interface);
    }

    /// Install `D` as the fallback for every interface it declares.
    ///
    /// A probe instance is constructed to read the declared set; each
    /// interface then gets a `D::default` factory. Fails with
    /// [`RegistryError::NoInterface`] when the set is empty.
    pub fn register<D: Stream + Default>(&self) -> Result<(), RegistryError> {
        let probe = D::default();
        let interfaces: Vec<InterfaceId> = probe
            .interfaces()
            .into_iter()
            .filter(|interface| !interface.is_control())
            .collect();
        if interfaces.is_empty() {
            return Err(RegistryError::NoInterface);
        }
        let mut state = self.lock_state();
        for interface in interfaces {
            state
                .factories
                .insert(interface, Arc::new(construct_default::<D>));
            state.cached.remove(&interface);
        }
        Ok(())
    }

    /// Remove the fallback for `interface`, dropping any cached instance.
    pub fn unregister(&self, interface: InterfaceId) {
        let mut state = self.lock_state();
        state.factories.remove(&interface);
        state.cached.remove(&interface);
    }

    /// Fallback instance for `interface`, constructing one if needed.
    ///
    /// Returns `Ok(None)` when no factory is registered. A factory failure
    /// surfaces as [`DispatchError::DefaultConstruction`]. Construction
    /// runs outside the cache lock, so a factory may call back into the
    /// cache and a slow constructor does not stall concurrent gets;
    /// callers racing to construct the same interface each build an
    /// instance and the last writer's ends up cached.
    pub fn get(&self, interface: InterfaceId) -> Result<Option<Arc<dyn Stream>>, DispatchError> {
        let factory = {
            let mut state = self.lock_state();
            let Some(factory) = state.factories.get(&interface).cloned() else {
                return Ok(None);
            };
            if let Some(live) = state.cached.get(&interface).and_then(Weak::upgrade) {
                return Ok(Some(live));
            }

            // Purge dead handles before caching a new one.
            state.cached.retain(|_, weak| weak.strong_count() > 0);
            factory
        };

        let instance = factory
            .create()
            .map_err(|source| DispatchError::DefaultConstruction { interface, source })?;

        let mut state = self.lock_state();
        state.cached.insert(interface, Arc::downgrade(&instance));
        Ok(Some(instance))
    }

    pub(crate) fn reset(&self) {
        let mut state = self.lock_state();
        state.factories.clear();
        state.cached.clear();
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::DefaultStreamCache;
    use fancast_core::{BoxError, InterfaceId, MethodCall, Stream, Value};
    use std::sync::Arc;

    struct Marker;

    fn interface() -> InterfaceId {
        InterfaceId::of::<Marker>()
    }

    #[derive(Default)]
    struct Fallback;

    impl Stream for Fallback {
        fn interfaces(&self) -> Vec<InterfaceId> {
            vec![interface()]
        }

        fn invoke(
            &self,
            _interface: InterfaceId,
            _call: &MethodCall,
        ) -> Result<Option<Value>, BoxError> {
            Ok(None)
        }
    }

    #[test]
    fn cached_while_alive_rebuilt_after_drop() {
        let cache = DefaultStreamCache::new();
        cache.register::<Fallback>().unwrap();

        let first = cache.get(interface()).unwrap().unwrap();
        let second = cache.get(interface()).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        drop(first);
        drop(second);
        let third = cache.get(interface()).unwrap().unwrap();
        // A fresh instance; nothing held the old one alive.
        assert_eq!(Arc::strong_count(&third), 1);
    }

    #[test]
    fn unregistered_interface_yields_nothing() {
        let cache = DefaultStreamCache::new();
        assert!(cache.get(interface()).unwrap().is_none());

        cache.register::<Fallback>().unwrap();
        assert!(cache.get(interface()).unwrap().is_some());

        cache.unregister(interface());
        assert!(cache.get(interface()).unwrap().is_none());
    }

    #[test]
    fn construction_failure_surfaces() {
        let cache = DefaultStreamCache::new();
        cache.register_factory(interface(), || -> Result<Arc<dyn Stream>, BoxError> {
            Err("no constructor".into())
        });
        let err = cache.get(interface()).unwrap_err();
        assert!(err.to_string().contains("default stream"));
    }

    #[test]
    fn factory_may_call_back_into_the_cache() {
        struct Nested;

        let cache = Arc::new(DefaultStreamCache::new());
        cache.register::<Fallback>().unwrap();

        let inner = cache.clone();
        cache.register_factory(
            InterfaceId::of::<Nested>(),
            move || -> Result<Arc<dyn Stream>, BoxError> {
                // Looks up another fallback while its own get is in flight.
                inner.get(interface())?;
                Ok(Arc::new(Fallback))
            },
        );

        assert!(cache.get(InterfaceId::of::<Nested>()).unwrap().is_some());
    }

    #[test]
    fn probe_with_no_interfaces_is_rejected() {
        #[derive(Default)]
        struct Bare;

        impl Stream for Bare {
            fn interfaces(&self) -> Vec<InterfaceId> {
                Vec::new()
            }

            fn invoke(
                &self,
                _interface: InterfaceId,
                _call: &MethodCall,
            ) -> Result<Option<Value>, BoxError> {
                Ok(None)
            }
        }

        let cache = DefaultStreamCache::new();
        assert!(cache.register::<Bare>().is_err());
    }
}
