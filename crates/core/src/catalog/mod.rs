//! Static catalog of the services a branch offers.

mod types;

pub use types::{display_code, ServiceInfo, ServiceType, UnknownServiceType, SERVICE_CATALOG};
