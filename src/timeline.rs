//! Pure frame/position math for timeline rendering and click-to-seek.

/// Human-readable time assumes a fixed frame rate. The real source rate is not
/// plumbed through the protocol; displayed times are approximate for any video
/// not encoded at 30 fps. Known limitation, kept explicit rather than guessed.
pub const ASSUMED_FPS: f64 = 30.0;

/// Normalized position of a frame on the timeline, in `[0, 1]`.
/// Zero when no recording is loaded, to avoid division artifacts.
pub fn position(frame: u64, total_frames: u64) -> f64 {
    if total_frames == 0 {
        return 0.0;
    }
    frame as f64 / total_frames as f64
}

/// Translate a click at `offset_ratio` across the timeline into a frame.
pub fn frame_from_click_offset(offset_ratio: f64, total_frames: u64) -> u64 {
    let ratio = offset_ratio.clamp(0.0, 1.0);
    ((ratio * total_frames as f64).floor() as u64).min(total_frames)
}

pub fn frame_to_seconds(frame: u64) -> f64 {
    frame as f64 / ASSUMED_FPS
}

/// Format a seconds offset as `MM:SS`.
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
