// Domain layer: records, documents and the ports the adapters implement.

pub mod model;
pub mod ports;
