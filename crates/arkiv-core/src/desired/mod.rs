mod builder;
mod model;

pub use self::builder::DesiredStateBuilder;
pub use self::model::{Container, DesiredState, Item, ItemSet, Policy};
