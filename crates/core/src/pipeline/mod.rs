pub mod cycle_logger;
pub mod detection_loop;
pub mod detection_result;
pub mod tick_schedule;
