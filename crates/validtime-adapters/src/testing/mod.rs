mod failing_store;

pub use failing_store::FailingKeyValueStore;
