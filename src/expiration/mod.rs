mod sweeper;

pub use sweeper::start_request_sweeper;
