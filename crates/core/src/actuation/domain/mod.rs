pub mod actuator_driver;
pub mod pin_map;
pub mod pin_writer;
