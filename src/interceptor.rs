//! Routes entity changes into matching indexes.
//!
//! Called by the graph while it holds the store's write lock, after the store
//! itself has changed. An entry takes the change when it is OPERATIONAL or
//! its build cursor has already passed the entity; otherwise the builder will
//! read the current value when it gets there.

use crate::catalog::Catalog;
use crate::store::Properties;
use crate::types::{EntityId, EntityKind};
use serde_json::Value;

pub(crate) struct Interceptor<'a> {
    catalog: &'a Catalog,
}

impl<'a> Interceptor<'a> {
    pub(crate) fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// New entity: index every covered field it carries
    pub(crate) fn created(&self, owner: EntityKind, id: EntityId, tags: &[String], props: &Properties) {
        for tag in tags {
            self.label_added(owner, id, tag, props);
        }
    }

    /// One property set (`Some`) or removed (`None`)
    pub(crate) fn property_changed(
        &self,
        owner: EntityKind,
        id: EntityId,
        tags: &[String],
        field: &str,
        value: Option<&Value>,
    ) {
        for tag in tags {
            for entry in self.catalog.for_label(owner, tag) {
                if entry.field() == field && entry.intercepts(id) {
                    entry.apply(id, value);
                }
            }
        }
    }

    /// Whole property map replaced
    pub(crate) fn properties_replaced(&self, owner: EntityKind, id: EntityId, tags: &[String], props: &Properties) {
        for tag in tags {
            for entry in self.catalog.for_label(owner, tag) {
                if entry.intercepts(id) {
                    entry.apply(id, props.get(entry.field()));
                }
            }
        }
    }

    /// Entity joined a label (also used for creation)
    pub(crate) fn label_added(&self, owner: EntityKind, id: EntityId, label: &str, props: &Properties) {
        for entry in self.catalog.for_label(owner, label) {
            if !entry.intercepts(id) {
                continue;
            }
            if let Some(value) = props.get(entry.field()) {
                entry.apply(id, Some(value));
            }
        }
    }

    /// Entity left a label
    pub(crate) fn label_removed(&self, owner: EntityKind, id: EntityId, label: &str) {
        for entry in self.catalog.for_label(owner, label) {
            if entry.intercepts(id) {
                entry.apply(id, None);
            }
        }
    }

    pub(crate) fn deleted(&self, owner: EntityKind, id: EntityId, tags: &[String]) {
        for tag in tags {
            self.label_removed(owner, id, tag);
        }
    }
}
