//! Type-keyed registry of in-process clients.
//!
//! A provider publishes `Arc<dyn SomeApi>` once during `init`; consumers fetch it
//! by the same interface type with `hub.get::<dyn SomeApi>()`. Re-registering
//! replaces the previous value; Arcs already handed out stay valid.

use parking_lot::RwLock;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientHubError {
    #[error("client not registered: {type_name}")]
    NotFound { type_name: &'static str },
}

type Boxed = Box<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct ClientHub {
    map: RwLock<HashMap<TypeId, Boxed>>,
}

impl ClientHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// `T` is usually a trait object such as `dyn accounts::contract::client::AccountsApi`.
    pub fn register<T>(&self, client: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.map.write().insert(TypeId::of::<T>(), Box::new(client));
        tracing::debug!(client = std::any::type_name::<T>(), "client registered");
    }

    pub fn get<T>(&self) -> Result<Arc<T>, ClientHubError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.map
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<Arc<T>>())
            .cloned()
            .ok_or(ClientHubError::NotFound {
                type_name: std::any::type_name::<T>(),
            })
    }

    pub fn remove<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let boxed = self.map.write().remove(&TypeId::of::<T>())?;
        boxed.downcast::<Arc<T>>().ok().map(|b| *b)
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Directory: Send + Sync {
        fn name(&self) -> &'static str;
    }

    struct Primary;
    impl Directory for Primary {
        fn name(&self) -> &'static str {
            "primary"
        }
    }

    struct Replacement;
    impl Directory for Replacement {
        fn name(&self) -> &'static str {
            "replacement"
        }
    }

    #[test]
    fn clients_are_fetched_by_interface_type() {
        let hub = ClientHub::new();
        let api: Arc<dyn Directory> = Arc::new(Primary);
        hub.register::<dyn Directory>(api.clone());

        let got = hub.get::<dyn Directory>().unwrap();
        assert_eq!(got.name(), "primary");
        assert!(Arc::ptr_eq(&api, &got));
    }

    #[test]
    fn missing_client_names_the_type() {
        let hub = ClientHub::new();
        let err = hub.get::<dyn Directory>().err().unwrap();
        assert!(err.to_string().contains("Directory"));
    }

    #[test]
    fn re_registering_replaces_and_remove_empties() {
        let hub = ClientHub::new();
        hub.register::<dyn Directory>(Arc::new(Primary));
        let held = hub.get::<dyn Directory>().unwrap();
        hub.register::<dyn Directory>(Arc::new(Replacement));

        assert_eq!(held.name(), "primary");
        assert_eq!(hub.get::<dyn Directory>().unwrap().name(), "replacement");
        assert_eq!(hub.len(), 1);

        assert!(hub.remove::<dyn Directory>().is_some());
        assert!(hub.is_empty());
    }
}
