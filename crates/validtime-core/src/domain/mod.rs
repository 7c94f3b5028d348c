mod business_key;
mod visibility;

pub use business_key::BusinessKey;
pub use visibility::Visibility;
