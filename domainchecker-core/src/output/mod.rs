pub mod csv;
mod human;

pub use csv::{render_csv, write_csv, CSV_HEADERS};
pub use human::HumanFormatter;
