pub mod fits;
pub mod header;
pub mod preview;
pub mod sequence;

pub use fits::{read_fits, write_fits, write_mask_fits};
pub use header::FitsHeader;
pub use preview::save_preview_png;
pub use sequence::{load_frames_at, load_sequence, FrameTemplate, SequenceSpec};
