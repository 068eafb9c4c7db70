// Domain layer: API DTOs, batch report types and the ports the engine talks through.

pub mod model;
pub mod ports;
