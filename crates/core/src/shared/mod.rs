pub mod command;
pub mod constants;
pub mod emotion;
pub mod face_box;
pub mod frame;
pub mod model_resolver;
