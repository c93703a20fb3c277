pub mod grid;
pub mod id;
pub mod model;
pub mod transform;

pub use grid::GridSnap;
pub use id::ElementId;
pub use model::*;
pub use transform::{to_model_coordinates, to_rendered_coordinates};
