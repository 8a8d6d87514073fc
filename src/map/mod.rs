pub mod geometry;
pub mod model;
pub mod renderer;
pub mod scale;
pub mod spatial;
pub mod transition;
pub mod view;

pub use model::MapModel;
pub use renderer::{MapLayers, MapRenderer};
pub use transition::Transition;
pub use view::{View, ViewState};
