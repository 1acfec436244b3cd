pub mod handlers;
pub mod models;
pub mod serializer;
mod service;
pub mod validation;

pub use models::{Device, DeviceId, DevicePayload, NewDevice, OwnerScope, Platform};
pub use service::{Access, DevicesError, DevicesService};
