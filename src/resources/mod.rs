//! Resources managed by the provider.

pub mod data_model_ci;
