mod clock;
mod key_value_store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key_value_store::{KeyValueStore, KeyValueStoreError};
