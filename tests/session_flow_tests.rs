//! End-to-end reducer scenarios, driven through the wire codec the way the
//! connection pump does it: raw JSON in, outbound protocol messages out.

use counter_edge_rs::connection::ConnectionState;
use counter_edge_rs::events::CountField;
use counter_edge_rs::protocol::{decode_inbound, ClientMessage, Inbound};
use counter_edge_rs::session::{Input, Mode, Session, UserAction};
use counter_edge_rs::timeline;

fn feed(session: &mut Session, raw: &str) -> Vec<ClientMessage> {
    match decode_inbound(raw).expect("payload decodes") {
        Inbound::Message(msg) => session.handle(Input::Server(msg)).outbound,
        Inbound::Error(error) => panic!("unexpected backend error: {}", error),
    }
}

#[test_log::test]
fn recorded_video_pass_end_to_end() {
    let mut session = Session::new();

    // Upload handshake yielded a server-side filename; the session enters
    // playback mode and asks for a fresh channel.
    let outcome = session.handle(Input::User(UserAction::VideoUploaded {
        filename: "a.mp4".to_string(),
    }));
    assert!(outcome.reopen_channel);
    assert_eq!(session.mode(), Mode::Playback);

    // Channel opens: exactly one video_file goes out.
    let outcome = session.handle(Input::Connection(ConnectionState::Open));
    assert_eq!(
        outcome.outbound,
        vec![ClientMessage::VideoFile {
            filename: "a.mp4".to_string()
        }]
    );
    let outcome = session.handle(Input::Connection(ConnectionState::Open));
    assert!(outcome.outbound.is_empty());

    // Backend streams detections while decoding, then the terminal complete.
    let outbound = feed(
        &mut session,
        r#"{"type":"detection","count":2,"frame_number":10,
            "events":[{"timestamp":0.33,"count":2,"previous_count":0,"total_count":2,"frame":10}]}"#,
    );
    assert!(outbound.is_empty());
    assert_eq!(session.current_count(), 2);
    assert_eq!(session.playback().current_frame(), 10);

    let outbound = feed(
        &mut session,
        r#"{"type":"complete","total_frames":100,
            "events":[
                {"timestamp":0.33,"count":2,"previous_count":0,"total_count":2,"frame":10},
                {"timestamp":1.33,"count":5,"previous_count":2,"total_count":5,"frame":40}
            ]}"#,
    );
    assert!(outbound.is_empty());

    // The index holds exactly those two events, in arrival order.
    let events = session.events().events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].frame, Some(10));
    assert_eq!(events[1].frame, Some(40));
    assert_eq!(session.playback().total_frames(), 100);

    // Threshold search: a target between recorded counts resolves to the
    // first event reaching it.
    let hit = session.find_by_count(3, CountField::Count).expect("found");
    assert_eq!(hit.frame, Some(40));
    assert_eq!(hit.count, 5);
    assert!(session.find_by_count(6, CountField::Count).is_none());

    // The found event doubles as a seek target.
    let outcome = session.handle(Input::User(UserAction::Seek { frame: 40 }));
    assert_eq!(outcome.outbound, vec![ClientMessage::Seek { frame: 40 }]);

    // Timeline projection of the current position.
    let playback = session.playback();
    let position = timeline::position(playback.current_frame(), playback.total_frames());
    assert!((position - 0.4).abs() < f64::EPSILON);
}

#[test_log::test]
fn rapid_seeks_resolve_to_backend_position() {
    let mut session = Session::new();
    session.handle(Input::User(UserAction::VideoUploaded {
        filename: "a.mp4".to_string(),
    }));
    session.handle(Input::Connection(ConnectionState::Open));
    feed(&mut session, r#"{"type":"complete","total_frames":100}"#);

    // Two optimistic seeks race a stale backend echo; the echo wins.
    session.handle(Input::User(UserAction::Seek { frame: 80 }));
    session.handle(Input::User(UserAction::Seek { frame: 20 }));
    assert_eq!(session.playback().current_frame(), 20);

    feed(&mut session, r#"{"type":"detection","frame_number":80}"#);
    assert_eq!(session.playback().current_frame(), 80);
}

#[test_log::test]
fn mode_switch_discards_playback_session() {
    let mut session = Session::new();
    session.handle(Input::User(UserAction::VideoUploaded {
        filename: "a.mp4".to_string(),
    }));
    session.handle(Input::Connection(ConnectionState::Open));
    feed(
        &mut session,
        r#"{"type":"complete","total_frames":100,
            "events":[{"timestamp":0.33,"count":2,"previous_count":0,"frame":10}]}"#,
    );
    session.handle(Input::User(UserAction::TogglePlay));
    assert!(session.playback().is_playing());

    let outcome = session.handle(Input::User(UserAction::SwitchToLive));
    assert!(outcome.reopen_channel);
    assert_eq!(session.mode(), Mode::Live);
    assert_eq!(session.playback().current_frame(), 0);
    assert_eq!(session.playback().total_frames(), 0);
    assert!(!session.playback().is_playing());
    assert!(session.events().is_empty());

    // Live capture resumes once the fresh channel opens.
    session.handle(Input::Connection(ConnectionState::Open));
    let outcome = session.handle(Input::CaptureTick {
        frame: "data:image/jpeg;base64,zz".to_string(),
    });
    assert_eq!(outcome.outbound.len(), 1);
}

#[test_log::test]
fn live_ticks_replace_event_log_each_detection() {
    let mut session = Session::new();
    session.handle(Input::Connection(ConnectionState::Open));

    feed(
        &mut session,
        r#"{"type":"detection","count":1,
            "events":[{"timestamp":"2024-05-01T12:00:00","count":1,"previous_count":0}]}"#,
    );
    feed(
        &mut session,
        r#"{"type":"detection","count":3,
            "events":[
                {"timestamp":"2024-05-01T12:00:00","count":1,"previous_count":0},
                {"timestamp":"2024-05-01T12:00:04","count":3,"previous_count":1}
            ]}"#,
    );

    assert_eq!(session.current_count(), 3);
    assert_eq!(session.events().len(), 2);
    // Live events have no addressable frame.
    assert!(session.events().events().iter().all(|e| e.frame.is_none()));
}
