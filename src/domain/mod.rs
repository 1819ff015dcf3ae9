// Domain layer: record shapes and the ports the pipeline drives.

pub mod model;
pub mod ports;
