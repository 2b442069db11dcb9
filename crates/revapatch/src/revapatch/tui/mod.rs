pub mod pick;
pub mod progress;
