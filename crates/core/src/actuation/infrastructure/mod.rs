pub mod dry_run_writer;
pub mod gpioset_writer;
