pub mod progress;
pub mod spinner;

pub use spinner::Spinner;
