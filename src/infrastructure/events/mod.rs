mod log_publisher;

pub use log_publisher::LogEventPublisher;
