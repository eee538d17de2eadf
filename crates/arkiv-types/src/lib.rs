pub mod error;
pub mod identity;
pub mod request;

pub use identity::ScopedName;
