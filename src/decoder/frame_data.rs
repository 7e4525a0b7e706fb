use crate::pose::LandmarkSet;

/// One processed frame: where it sits in the stream and what was found in it.
///
/// Built right after inference, written out and dropped; nothing keeps it
/// across frames.
#[derive(Debug, Clone, Copy)]
pub struct FrameRecord {
    pub frame_idx: u64,
    pub time_sec: f64,
    pub landmarks: LandmarkSet,
}

impl FrameRecord {
    pub fn new(frame_idx: u64, time_sec: f64, landmarks: Option<LandmarkSet>) -> Self {
        Self {
            frame_idx,
            time_sec,
            landmarks: landmarks.unwrap_or_else(LandmarkSet::missing),
        }
    }

    pub fn detected(&self) -> bool {
        !self.landmarks.is_missing()
    }
}
