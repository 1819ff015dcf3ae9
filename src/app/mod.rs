// Boundary layer: upload handling and response shaping around the core pipeline.

pub mod upload;
