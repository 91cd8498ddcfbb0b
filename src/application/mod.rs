// Application layer - replay engine use cases and the ports they depend on
pub mod checkpoint_store;
pub mod checkpoint_sync;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod time_series_source;
pub mod window_reader;

#[cfg(test)]
pub mod testing;
