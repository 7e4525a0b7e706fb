pub mod processor;
pub mod skeleton;

pub use processor::FrameProcessor;
pub use skeleton::{draw_pose, OverlayStyle};
