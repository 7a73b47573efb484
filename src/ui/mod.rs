//! Terminal presentation: the colored reply renderer and the waiting
//! indicator shown while a request is in flight.

pub mod render;
pub mod spinner;
