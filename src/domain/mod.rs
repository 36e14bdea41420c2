// Domain layer: record model and collaborator ports.

pub mod model;
pub mod ports;
