mod tracker;

pub use tracker::{TrackerActor, TrackerHandle};
