//! Data sources served by the provider.

pub mod ucmdb_list;
