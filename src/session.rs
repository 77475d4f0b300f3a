use crate::connection::ConnectionState;
use crate::events::{CountField, EventIndex};
use crate::playback::Playback;
use crate::protocol::{ClientMessage, CountEvent, ServerMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    Live,
    Playback,
}

/// What the session is counting from: the local camera, or a file the backend
/// already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    Camera,
    Uploaded(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    /// Tear down playback state and return to camera capture.
    SwitchToLive,
    /// Upload handshake finished; enter playback mode for this server-side file.
    VideoUploaded { filename: String },
    Seek { frame: i64 },
    TogglePlay,
}

/// The three event sources of a session, funneled through one reducer. Nothing
/// else mutates session state.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    User(UserAction),
    Server(ServerMessage),
    Connection(ConnectionState),
    /// One locally captured frame, base64 JPEG data URL (live mode only).
    CaptureTick { frame: String },
}

/// What a reducer step asks the outside world to do.
#[derive(Debug, Default, PartialEq)]
pub struct Outcome {
    pub outbound: Vec<ClientMessage>,
    /// Tear down the current channel and open a fresh one (mode switches).
    pub reopen_channel: bool,
}

impl Outcome {
    fn none() -> Self {
        Self::default()
    }

    fn send(msg: ClientMessage) -> Self {
        Self {
            outbound: vec![msg],
            reopen_channel: false,
        }
    }

    fn reopen() -> Self {
        Self {
            outbound: Vec::new(),
            reopen_channel: true,
        }
    }
}

/// One end-to-end counting run. Single writer: all mutation flows through
/// [`Session::handle`] on one task, so there is no update-ordering ambiguity
/// between the capture timer, user commands, and inbound protocol traffic.
#[derive(Debug)]
pub struct Session {
    mode: Mode,
    connection: ConnectionState,
    source: SourceRef,
    current_count: u32,
    /// Last annotated frame received from the backend.
    processed_frame: Option<String>,
    events: EventIndex,
    playback: Playback,
    /// `video_file` goes out once per channel open in playback mode.
    video_file_sent: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            mode: Mode::Live,
            connection: ConnectionState::Connecting,
            source: SourceRef::Camera,
            current_count: 0,
            processed_frame: None,
            events: EventIndex::new(),
            playback: Playback::new(),
            video_file_sent: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    pub fn current_count(&self) -> u32 {
        self.current_count
    }

    pub fn processed_frame(&self) -> Option<&str> {
        self.processed_frame.as_deref()
    }

    pub fn events(&self) -> &EventIndex {
        &self.events
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub fn find_by_count(&self, target: u64, field: CountField) -> Option<&CountEvent> {
        self.events.find_by_count(target, field)
    }

    /// The single reducer entry point.
    pub fn handle(&mut self, input: Input) -> Outcome {
        match input {
            Input::User(action) => self.handle_action(action),
            Input::Server(msg) => self.handle_message(msg),
            Input::Connection(state) => self.handle_connection(state),
            Input::CaptureTick { frame } => self.handle_capture(frame),
        }
    }

    fn handle_action(&mut self, action: UserAction) -> Outcome {
        match action {
            UserAction::SwitchToLive => {
                if self.mode == Mode::Live {
                    return Outcome::none();
                }
                log::info!("switching to live mode");
                self.mode = Mode::Live;
                self.source = SourceRef::Camera;
                self.reset_session_state();
                Outcome::reopen()
            }
            UserAction::VideoUploaded { filename } => {
                log::info!("entering playback mode for {}", filename);
                self.mode = Mode::Playback;
                self.source = SourceRef::Uploaded(filename);
                self.reset_session_state();
                Outcome::reopen()
            }
            UserAction::Seek { frame } => {
                if self.mode != Mode::Playback {
                    return Outcome::none();
                }
                match self.playback.seek(frame) {
                    Some(clamped) => Outcome::send(ClientMessage::Seek { frame: clamped }),
                    None => {
                        log::debug!("seek ignored, no recording loaded");
                        Outcome::none()
                    }
                }
            }
            UserAction::TogglePlay => {
                if self.mode != Mode::Playback {
                    return Outcome::none();
                }
                if self.playback.toggle_play() {
                    Outcome::send(ClientMessage::Play)
                } else {
                    Outcome::send(ClientMessage::Pause)
                }
            }
        }
    }

    /// Partial payloads update only the facets that are present.
    fn handle_message(&mut self, msg: ServerMessage) -> Outcome {
        match msg {
            ServerMessage::Detection {
                frame,
                count,
                events,
                frame_number,
            } => {
                if let Some(frame) = frame {
                    self.processed_frame = Some(frame);
                }
                if let Some(count) = count {
                    self.current_count = count;
                }
                if let Some(events) = events {
                    self.events.replace(events);
                }
                if let Some(frame_number) = frame_number {
                    self.playback.sync_frame(frame_number);
                }
            }
            ServerMessage::Complete {
                events,
                total_frames,
            } => {
                if let Some(events) = events {
                    self.events.replace(events);
                }
                if let Some(total_frames) = total_frames {
                    log::info!("playback pass complete, {} frames", total_frames);
                    self.playback.set_total_frames(total_frames);
                }
            }
        }
        Outcome::none()
    }

    fn handle_connection(&mut self, state: ConnectionState) -> Outcome {
        self.connection = state;
        match state {
            ConnectionState::Open => {
                // Entering playback with a loaded source starts backend-side
                // processing, exactly once per channel.
                if self.mode == Mode::Playback && !self.video_file_sent {
                    if let SourceRef::Uploaded(filename) = &self.source {
                        self.video_file_sent = true;
                        return Outcome::send(ClientMessage::VideoFile {
                            filename: filename.clone(),
                        });
                    }
                }
                Outcome::none()
            }
            ConnectionState::Closed => {
                // Backend-side state died with the channel; a later reopen
                // must restart processing.
                self.video_file_sent = false;
                Outcome::none()
            }
            ConnectionState::Connecting => Outcome::none(),
        }
    }

    fn handle_capture(&mut self, frame: String) -> Outcome {
        if self.mode != Mode::Live || self.connection != ConnectionState::Open {
            return Outcome::none();
        }
        Outcome::send(ClientMessage::Frame { frame })
    }

    /// Per-session data is discarded in full on mode switch or teardown.
    fn reset_session_state(&mut self) {
        self.current_count = 0;
        self.processed_frame = None;
        self.events.clear();
        self.playback.reset();
        self.video_file_sent = false;
    }
}
