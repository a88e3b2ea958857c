pub mod median;

pub use median::{median_combine, median_stack};
