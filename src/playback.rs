/// Playback position state and the reconciliation rules around it.
///
/// The synchronizer is the only writer of this state. User seeks are applied
/// optimistically and also sent to the backend; the backend's own
/// `frame_number` reports are the source of truth and overwrite the optimistic
/// value on arrival, so rapid seeks racing backend echoes cannot drift
/// permanently.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Playback {
    current_frame: u64,
    total_frames: u64,
    is_playing: bool,
}

impl Playback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Clamp a requested frame into `[0, total_frames]`, apply it locally and
    /// return the frame to request from the backend. Seeking before the total
    /// is known is a no-op.
    pub fn seek(&mut self, frame: i64) -> Option<u64> {
        if self.total_frames == 0 {
            return None;
        }
        let clamped = frame.clamp(0, self.total_frames as i64) as u64;
        self.current_frame = clamped;
        Some(clamped)
    }

    /// Flip play/pause and return the new playing state.
    pub fn toggle_play(&mut self) -> bool {
        self.is_playing = !self.is_playing;
        self.is_playing
    }

    /// Backend-reported position always wins over any optimistic local value.
    pub fn sync_frame(&mut self, frame: u64) {
        self.current_frame = frame;
    }

    /// Set once per loaded recording, from the terminal `complete` message.
    pub fn set_total_frames(&mut self, total: u64) {
        self.total_frames = total;
        self.is_playing = false;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
