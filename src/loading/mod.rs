//! Eager loading - resolve a relation for a whole set of parents at once

mod eager_loader;

pub use eager_loader::eager_load;
