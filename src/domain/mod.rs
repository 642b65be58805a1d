//! Backend records, forms and the rules the admin client enforces on them
pub mod aggregates;
pub mod events;
pub mod validation;
pub mod value_objects;

pub use aggregates::*;
pub use events::AdminEvent;
pub use validation::FormErrors;
pub use value_objects::{Money, PriceRange};
