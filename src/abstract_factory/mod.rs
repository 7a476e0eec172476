mod cached_factory;
mod factory_interface;
mod snapshot_store;

pub use cached_factory::CachedFactory;
pub use factory_interface::{
    ErrorDetails, ErrorLayer, Factory, FactoryError, LabelSelector, Result,
};
pub use snapshot_store::{load_snapshot_store, SnapshotStore};
