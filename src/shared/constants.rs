pub const APP_NAME: &str = "posecast";

pub const ERROR_LOG_FILE: &str = "error.log";
pub const DEBUG_LOG_FILE: &str = "debug.log";

/// Landmarks per frame, detected or not.
pub const NUM_LANDMARKS: usize = 33;
/// Values stored per landmark: x, y, z, visibility.
pub const VALUES_PER_LANDMARK: usize = 4;
/// frame_idx + time_sec + every landmark value.
pub const CSV_COLUMNS: usize = 2 + NUM_LANDMARKS * VALUES_PER_LANDMARK;

pub const OUTPUT_VIDEO_SUFFIX: &str = "_pose.mp4";
pub const OUTPUT_CSV_SUFFIX: &str = "_pose.csv";
pub const OUTPUT_FOURCC: [char; 4] = ['m', 'p', '4', 'v'];

// Used when the container reports 0 for a property
pub const DEFAULT_FPS: f64 = 30.0;
pub const DEFAULT_WIDTH: i32 = 640;
pub const DEFAULT_HEIGHT: i32 = 360;

pub const DEFAULT_VIS_THRESHOLD: f32 = 0.3;
pub const DEFAULT_ALPHA: f64 = 1.0;
pub const DEFAULT_THICKNESS: i32 = 2;
pub const DEFAULT_RADIUS: i32 = 3;

/// Skeleton color, BGR.
pub const SKELETON_COLOR: (f64, f64, f64) = (0.0, 255.0, 0.0);

/// Body topology drawn over the frame (unordered landmark index pairs).
pub const POSE_CONNECTIONS: [(usize, usize); 20] = [
    // shoulders and arms
    (11, 12),
    (11, 13),
    (13, 15),
    (12, 14),
    (14, 16),
    // torso
    (11, 23),
    (12, 24),
    (23, 24),
    // legs
    (23, 25),
    (25, 27),
    (27, 31),
    (24, 26),
    (26, 28),
    (28, 32),
    // hands
    (15, 17),
    (17, 19),
    (19, 21),
    (16, 18),
    (18, 20),
    (20, 22),
];

pub const DEFAULT_MODEL_DIR: &str = "models";
pub const MODEL_FILES: [&str; 3] = [
    "pose_landmark_lite.onnx",
    "pose_landmark_full.onnx",
    "pose_landmark_heavy.onnx",
];
/// Square input side of the landmark network.
pub const MODEL_INPUT_SIZE: u32 = 256;
/// Landmarks emitted by the network (33 body + 6 auxiliary ROI points).
pub const MODEL_LANDMARKS: usize = 39;
/// x, y, z, visibility, presence per network landmark.
pub const MODEL_VALUES_PER_LANDMARK: usize = 5;
pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_MIN_TRACKING_CONFIDENCE: f32 = 0.5;

/// Person detector that seeds the landmark crop when nothing is tracked.
pub const DETECTOR_MODEL_FILE: &str = "pose_detection.onnx";
pub const DETECTOR_INPUT_SIZE: u32 = 224;
/// SSD head strides. Consecutive equal strides share one anchor grid.
pub const DETECTOR_STRIDES: [u32; 5] = [8, 16, 32, 32, 32];
/// Anchors per grid cell contributed by each head.
pub const DETECTOR_ANCHORS_PER_LAYER: usize = 2;
pub const DETECTOR_ANCHORS: usize = 2254;
/// Box (cx, cy, w, h) then 4 keypoints (x, y) per anchor.
pub const DETECTOR_VALUES_PER_ANCHOR: usize = 12;
pub const DETECTOR_KEYPOINTS: usize = 4;
pub const DETECTOR_SCORE_CLIP: f32 = 100.0;

/// Growth applied to the body's alignment circle to get the crop side.
pub const ROI_SCALE: f32 = 1.25;

// One Euro filter parameters for normalized coordinates
pub const SMOOTH_MIN_CUTOFF: f32 = 1.0;
pub const SMOOTH_BETA: f32 = 10.0;
pub const SMOOTH_D_CUTOFF: f32 = 1.0;

/// Progress is logged every N frames when stderr is not a terminal.
pub const PROGRESS_LOG_EVERY: u64 = 100;
