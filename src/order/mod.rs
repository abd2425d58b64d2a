pub mod job;
pub mod menu;
pub mod registry;

pub use job::{JobId, JobRecord, OrderStatus, PrepResult, Quantity};
pub use menu::{Dish, Menu};
pub use registry::{JobRegistry, Lookup, RegistryError};
