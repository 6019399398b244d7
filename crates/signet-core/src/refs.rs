//! Named persistent refs.
//!
//! [`RefMap`] memoizes one [`RefHandle`] per name so a host can place the same
//! parameter node into every graph it declares and update it between renders:
//!
//! ```rust
//! use signet_core::{ops, props, RecordingTransport, RefMap, Renderer};
//!
//! let mut renderer = Renderer::new(RecordingTransport::new());
//! let mut refs = RefMap::new();
//!
//! let gain = refs
//!     .get_or_create(&mut renderer, "gain", "const", props! { "value" => 0.5 }, vec![])
//!     .unwrap();
//! renderer.render([ops::mul(ops::cycle(220.0), gain)]).unwrap();
//!
//! refs.update(&mut renderer, "gain", props! { "value" => 0.25 }).unwrap();
//! ```

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::error::GraphError;
use crate::node::Node;
use crate::props::Props;
use crate::renderer::{RefHandle, Renderer};
use crate::transport::Transport;

/// Registry mapping stable names to ref handles.
#[derive(Debug, Default, Clone)]
pub struct RefMap {
    refs: HashMap<String, RefHandle>,
}

impl RefMap {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node registered under `name`, creating the ref on first use.
    ///
    /// `kind`, `props` and `children` are only used on the first call for a
    /// name; later calls return the same node unchanged. An empty `kind` on
    /// first use fails with [`GraphError::EmptyKind`] and registers nothing.
    pub fn get_or_create<T: Transport>(
        &mut self,
        renderer: &mut Renderer<T>,
        name: &str,
        kind: &str,
        props: Props,
        children: Vec<Node>,
    ) -> Result<Node, GraphError> {
        let handle = match self.refs.entry(name.to_owned()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(renderer.create_ref(kind, props, children)?),
        };
        Ok(handle.node().clone())
    }

    /// Pushes new props to the ref registered under `name`.
    pub fn update<T: Transport>(
        &self,
        renderer: &mut Renderer<T>,
        name: &str,
        props: Props,
    ) -> Result<T::Ack, GraphError> {
        let handle = self
            .refs
            .get(name)
            .ok_or_else(|| GraphError::MissingRef(name.to_owned()))?;
        renderer.update_ref(handle, props)
    }

    /// The handle registered under `name`.
    pub fn get(&self, name: &str) -> Option<&RefHandle> {
        self.refs.get(name)
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.refs.contains_key(name)
    }

    /// Number of registered refs.
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    /// Returns `true` if no ref is registered.
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}
