// Domain layer: models, the cart and the ports the session talks through.

pub mod cart;
pub mod model;
pub mod ports;
