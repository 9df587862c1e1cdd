pub mod command_capture;
pub mod image_decoder;
