mod seconds;
pub use seconds::Seconds;

mod timestamp;
pub use timestamp::Timestamp;
