//! Type-safe registry of in-process clients.
//!
//! Providers register an implementation once under an interface type
//! (`hub.register::<dyn identity::contract::IdentityApi>(client)`); consumers fetch
//! it by the same type. Values are `Arc<T>` stored behind `dyn Any` and
//! downcast on read. Re-registering replaces the previous value; Arcs already
//! handed out stay valid.

use parking_lot::RwLock;
use std::{any::Any, collections::HashMap, sync::Arc};

/// Interface key: `type_name::<T>()`, which also works for `T = dyn Trait`.
type TypeKey = &'static str;

#[derive(Debug, thiserror::Error)]
pub enum ClientHubError {
    #[error("client not found: {type_key}")]
    NotFound { type_key: TypeKey },

    #[error("type mismatch in hub for {type_key}")]
    TypeMismatch { type_key: TypeKey },
}

type Boxed = Box<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct ClientHub {
    map: RwLock<HashMap<TypeKey, Boxed>>,
}

impl ClientHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&self, client: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = std::any::type_name::<T>();
        if self.map.write().insert(key, Box::new(client)).is_some() {
            tracing::debug!(client = key, "client replaced in hub");
        }
    }

    pub fn get<T>(&self) -> Result<Arc<T>, ClientHubError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let type_key = std::any::type_name::<T>();
        let r = self.map.read();
        let boxed = r
            .get(type_key)
            .ok_or(ClientHubError::NotFound { type_key })?;
        boxed
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(ClientHubError::TypeMismatch { type_key })
    }

    pub fn contains<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.map.read().contains_key(std::any::type_name::<T>())
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}
