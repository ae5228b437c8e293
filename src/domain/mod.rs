// Domain layer: models and ports. The core only talks to the outside through these traits.

pub mod model;
pub mod ports;
