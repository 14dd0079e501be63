use crate::engine::{Engine, EngineHandle, Request};
use crate::filter::FilterState;
use crate::local::LocalStore;

/// Process-wide state shared by the controller: the local filter store and
/// the engine handle.
///
/// [`AppContext::init`] is the single place where the local resolvers are
/// registered and the engine is started; [`AppContext::shutdown`] undoes
/// both. Create one context per process.
pub struct AppContext {
    store: LocalStore,
    engine: EngineHandle,
}

impl AppContext {
    pub fn init(engine: impl Engine, filters: FilterState) -> Self {
        let mut store = LocalStore::new(filters);
        store.register();
        let engine = engine.start();
        tracing::info!("context initialised");
        Self { store, engine }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut LocalStore {
        &mut self.store
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Stop the engine and drop the resolver registration.
    pub fn shutdown(mut self) {
        self.store.unregister();
        self.engine.send(Request::Shutdown);
        tracing::info!("context shut down");
    }
}
