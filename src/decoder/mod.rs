pub mod frame_data;
pub mod video;

pub use frame_data::FrameRecord;
pub use video::{VideoMeta, VideoSource};
