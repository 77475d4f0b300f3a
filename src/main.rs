use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use counter_edge_rs::capture::{FrameSource, SyntheticCamera};
use counter_edge_rs::config::{ClientConfig, ConfigError};
use counter_edge_rs::connection::{backoff_delay, Connection, ConnectionEvent, ConnectionState};
use counter_edge_rs::events::CountField;
use counter_edge_rs::protocol::{CountEvent, Timestamp};
use counter_edge_rs::session::{Input, Mode, Outcome, Session, UserAction};
use counter_edge_rs::timeline;
use counter_edge_rs::upload::VideoUploader;

#[derive(Parser, Debug)]
#[command(
    name = "counter-edge",
    about = "Streams video to a people-counting backend: live webcam push or seekable recorded playback"
)]
struct Args {
    /// Backend base URL (overrides COUNTER_SERVER_URL)
    #[arg(long)]
    server: Option<Url>,
    /// Upload this video and start in playback mode
    #[arg(long, value_name = "PATH")]
    video: Option<PathBuf>,
    /// Live capture interval in milliseconds (overrides COUNTER_CAPTURE_INTERVAL_MS)
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Re-open the channel with capped exponential backoff after an unexpected close
    #[arg(long)]
    reconnect: bool,
    /// Synthetic camera frame width
    #[arg(long, default_value_t = 640)]
    width: u32,
    /// Synthetic camera frame height
    #[arg(long, default_value_t = 480)]
    height: u32,
}

/// Line commands on stdin, the interactive surface of the client.
#[derive(Debug)]
enum Command {
    Live,
    Load(PathBuf),
    Seek(i64),
    Play,
    Find(u64),
    FindTotal(u64),
    Status,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let command = match (parts.next()?, parts.next()) {
        ("live", _) => Command::Live,
        ("load", Some(path)) => Command::Load(PathBuf::from(path)),
        ("seek", Some(frame)) => Command::Seek(frame.parse().ok()?),
        ("play", _) | ("pause", _) => Command::Play,
        ("find", Some(count)) => Command::Find(count.parse().ok()?),
        ("findtotal", Some(count)) => Command::FindTotal(count.parse().ok()?),
        ("status", _) => Command::Status,
        ("quit", _) | ("exit", _) => Command::Quit,
        _ => return None,
    };
    Some(command)
}

fn describe_timestamp(timestamp: &Timestamp) -> String {
    match timestamp {
        // Live events carry ISO wall-clock stamps from the backend.
        Timestamp::WallClock(text) => text
            .parse::<chrono::NaiveDateTime>()
            .map(|dt| dt.format("%H:%M:%S").to_string())
            .unwrap_or_else(|_| text.clone()),
        Timestamp::Offset(seconds) => format!("{} into the video", timeline::format_time(*seconds)),
    }
}

fn describe_event(event: &CountEvent) -> String {
    let direction = if event.is_increase() { "up" } else { "down" };
    let frame = event
        .frame
        .map(|frame| format!(", frame {}", frame))
        .unwrap_or_default();
    format!(
        "count {} ({} from {}), total {}{}, at {}",
        event.count,
        direction,
        event.previous_count,
        event.total_count,
        frame,
        describe_timestamp(&event.timestamp)
    )
}

fn print_status(session: &Session) {
    println!(
        "mode: {} | connection: {} | count: {}",
        session.mode(),
        session.connection_state(),
        session.current_count()
    );
    let playback = session.playback();
    if session.mode() == Mode::Playback && playback.total_frames() > 0 {
        println!(
            "frame {} / {} ({:.0}%) | {} / {} | {}",
            playback.current_frame(),
            playback.total_frames(),
            timeline::position(playback.current_frame(), playback.total_frames()) * 100.0,
            timeline::format_time(timeline::frame_to_seconds(playback.current_frame())),
            timeline::format_time(timeline::frame_to_seconds(playback.total_frames())),
            if playback.is_playing() {
                "playing"
            } else {
                "paused"
            }
        );
    }
    println!("{} events in the log", session.events().len());
}

struct Runner {
    session: Session,
    connection: Option<Connection>,
    config: ClientConfig,
    ws_url: Url,
}

impl Runner {
    /// Open a channel, retrying with capped backoff when reconnect is
    /// enabled. Returns `None` when the attempt fails and retries are off;
    /// the session stays usable for local-only actions.
    async fn open_channel(&self) -> Option<Connection> {
        let mut attempt = 0u32;
        loop {
            match Connection::open(&self.ws_url).await {
                Ok(connection) => return Some(connection),
                Err(e) if self.config.reconnect => {
                    let delay = backoff_delay(attempt);
                    log::warn!(
                        "connect attempt {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(e) => {
                    eprintln!("connection failed: {}", e);
                    return None;
                }
            }
        }
    }

    /// Apply one reducer outcome: ship outbound messages, recreate the
    /// channel when the mode switch asks for it.
    async fn dispatch(&mut self, outcome: Outcome) {
        for msg in outcome.outbound {
            if let Some(connection) = &self.connection {
                connection.send(msg);
            } else {
                log::debug!("no channel, dropping outbound message");
            }
        }
        if outcome.reopen_channel {
            if let Some(connection) = self.connection.take() {
                connection.close();
                let outcome = self
                    .session
                    .handle(Input::Connection(ConnectionState::Closed));
                debug_assert!(outcome.outbound.is_empty());
            }
            self.connection = self.open_channel().await;
            if self.connection.is_none() {
                let _ = self
                    .session
                    .handle(Input::Connection(ConnectionState::Closed));
            }
        }
    }

    fn handle_find(&self, target: u64, field: CountField) -> Option<UserAction> {
        match self.session.find_by_count(target, field) {
            Some(event) => {
                println!("found: {}", describe_event(event));
                // Seekable events double as jump targets, like clicking a
                // timeline marker.
                event
                    .frame
                    .filter(|_| self.session.mode() == Mode::Playback)
                    .map(|frame| UserAction::Seek {
                        frame: frame as i64,
                    })
            }
            None => {
                println!("no event reaches {} {}", field, target);
                None
            }
        }
    }
}

#[tokio::main]
async fn main() -> counter_edge_rs::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = ClientConfig::load()?;
    if let Some(server) = args.server {
        config.server_url = server;
    }
    if let Some(interval_ms) = args.interval_ms {
        if interval_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "--interval-ms".to_string(),
                reason: "interval must be positive".to_string(),
            }
            .into());
        }
        config.capture_interval = std::time::Duration::from_millis(interval_ms);
    }
    if args.reconnect {
        config.reconnect = true;
    }

    let uploader = VideoUploader::new(&config.server_url)?;
    let mut camera = SyntheticCamera::new(args.width, args.height);
    let ws_url = config.ws_url()?;

    let mut runner = Runner {
        session: Session::new(),
        connection: None,
        config,
        ws_url,
    };

    println!("counter-edge, backend at {}", runner.config.server_url);
    println!("commands: live | load <path> | seek <frame> | play | find <count> | findtotal <count> | status | quit");

    // Upload-first startup goes straight to playback mode; otherwise the
    // session starts live and the channel opens for camera push.
    if let Some(path) = args.video {
        match uploader.upload(&path).await {
            Ok(filename) => {
                let outcome = runner
                    .session
                    .handle(Input::User(UserAction::VideoUploaded { filename }));
                runner.dispatch(outcome).await;
            }
            Err(e) => {
                eprintln!("upload failed: {}", e);
                return Err(e.into());
            }
        }
    } else {
        runner.connection = runner.open_channel().await;
    }

    let mut ticker = tokio::time::interval(runner.config.capture_interval);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if runner.session.mode() == Mode::Live
                    && runner.session.connection_state() == ConnectionState::Open
                {
                    match camera.capture() {
                        Ok(frame) => {
                            let outcome = runner.session.handle(Input::CaptureTick { frame });
                            runner.dispatch(outcome).await;
                        }
                        Err(e) => log::warn!("frame capture failed: {}", e),
                    }
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let Some(command) = parse_command(&line) else {
                    println!("unrecognized command: {}", line.trim());
                    continue;
                };
                match command {
                    Command::Quit => break,
                    Command::Status => print_status(&runner.session),
                    Command::Live => {
                        let outcome = runner.session.handle(Input::User(UserAction::SwitchToLive));
                        runner.dispatch(outcome).await;
                    }
                    Command::Load(path) => match uploader.upload(&path).await {
                        Ok(filename) => {
                            let outcome = runner
                                .session
                                .handle(Input::User(UserAction::VideoUploaded { filename }));
                            runner.dispatch(outcome).await;
                        }
                        Err(e) => eprintln!("upload failed: {}", e),
                    },
                    Command::Seek(frame) => {
                        let outcome = runner.session.handle(Input::User(UserAction::Seek { frame }));
                        runner.dispatch(outcome).await;
                    }
                    Command::Play => {
                        let outcome = runner.session.handle(Input::User(UserAction::TogglePlay));
                        runner.dispatch(outcome).await;
                    }
                    Command::Find(target) => {
                        if let Some(action) = runner.handle_find(target, CountField::Count) {
                            let outcome = runner.session.handle(Input::User(action));
                            runner.dispatch(outcome).await;
                        }
                    }
                    Command::FindTotal(target) => {
                        if let Some(action) = runner.handle_find(target, CountField::TotalCount) {
                            let outcome = runner.session.handle(Input::User(action));
                            runner.dispatch(outcome).await;
                        }
                    }
                }
            }

            event = async {
                match runner.connection.as_mut() {
                    Some(connection) => connection.next_event().await,
                    None => std::future::pending().await,
                }
            } => {
                match event {
                    Some(ConnectionEvent::State(state)) => {
                        if state == ConnectionState::Closed {
                            println!("connection lost");
                            runner.connection = None;
                        }
                        let outcome = runner.session.handle(Input::Connection(state));
                        runner.dispatch(outcome).await;
                        if state == ConnectionState::Closed && runner.config.reconnect {
                            runner.connection = runner.open_channel().await;
                        }
                    }
                    Some(ConnectionEvent::Message(msg)) => {
                        let count_before = runner.session.current_count();
                        let outcome = runner.session.handle(Input::Server(msg));
                        runner.dispatch(outcome).await;
                        if runner.session.current_count() != count_before {
                            println!("count: {}", runner.session.current_count());
                        }
                    }
                    Some(ConnectionEvent::BackendError(error)) => {
                        eprintln!("backend error: {}", error);
                    }
                    None => {
                        runner.connection = None;
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                log::info!("received Ctrl+C, shutting down");
                break;
            }
        }
    }

    if let Some(connection) = runner.connection.take() {
        connection.close();
    }
    println!("session closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse() {
        assert!(matches!(parse_command("live"), Some(Command::Live)));
        assert!(matches!(
            parse_command("seek -5"),
            Some(Command::Seek(-5))
        ));
        assert!(matches!(parse_command("find 4"), Some(Command::Find(4))));
        assert!(matches!(
            parse_command("findtotal 12"),
            Some(Command::FindTotal(12))
        ));
        assert!(matches!(parse_command("load a.mp4"), Some(Command::Load(_))));
        assert!(parse_command("seek").is_none());
        assert!(parse_command("bogus").is_none());
        assert!(parse_command("find nan").is_none());
    }

    #[test]
    fn events_describe_direction_and_origin() {
        let live = CountEvent {
            timestamp: Timestamp::WallClock("2024-05-01T12:00:00".to_string()),
            count: 3,
            previous_count: 1,
            total_count: 5,
            frame: None,
        };
        let text = describe_event(&live);
        assert!(text.contains("count 3"));
        assert!(text.contains("up"));
        assert!(!text.contains("frame"));

        let recorded = CountEvent {
            timestamp: Timestamp::Offset(90.0),
            count: 1,
            previous_count: 2,
            total_count: 5,
            frame: Some(2700),
        };
        let text = describe_event(&recorded);
        assert!(text.contains("down"));
        assert!(text.contains("frame 2700"));
        assert!(text.contains("01:30"));
    }
}
