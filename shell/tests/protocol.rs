/// Integration tests for the control protocol
/// These tests verify that commands and responses serialize correctly
/// and can be sent over the control socket
use common::{
    Action, BackgroundKind, Command, Key, KeyPress, Modifiers, Response, TermError, WindowStatus,
};

#[test]
fn test_action_command_roundtrip() {
    let cmd = Command::Action(Action::SeekForward);

    let json = serde_json::to_string(&cmd).unwrap();
    let deserialized: Command = serde_json::from_str(&json).unwrap();

    assert!(matches!(deserialized, Command::Action(Action::SeekForward)));
}

#[test]
fn test_key_command_keeps_modifiers() {
    let press: KeyPress = "ctrl+shift+plus".parse().unwrap();
    let cmd = Command::Key(press);

    let json = serde_json::to_string(&cmd).unwrap();
    let deserialized: Command = serde_json::from_str(&json).unwrap();

    match deserialized {
        Command::Key(KeyPress { key, modifiers }) => {
            assert_eq!(key, Key::Char('+'));
            assert!(modifiers.ctrl && modifiers.shift);
            assert!(!modifiers.alt && !modifiers.logo);
        }
        _ => panic!("Wrong command type"),
    }
}

#[test]
fn test_unit_commands_are_plain_strings() {
    assert_eq!(serde_json::to_string(&Command::Ping).unwrap(), "\"Ping\"");
    assert_eq!(serde_json::to_string(&Command::Query).unwrap(), "\"Query\"");
    assert_eq!(serde_json::to_string(&Command::Close).unwrap(), "\"Close\"");
}

#[test]
fn test_struct_commands() {
    let json = r#"{"ActivateMenu":{"index":1}}"#;
    assert!(matches!(
        serde_json::from_str::<Command>(json).unwrap(),
        Command::ActivateMenu { index: 1 }
    ));

    let json = r#"{"Focus":{"active":false}}"#;
    assert!(matches!(
        serde_json::from_str::<Command>(json).unwrap(),
        Command::Focus { active: false }
    ));

    let cmd = Command::Snapshot {
        path: "/tmp/shot.png".to_string(),
    };
    let json = serde_json::to_string(&cmd).unwrap();
    match serde_json::from_str::<Command>(&json).unwrap() {
        Command::Snapshot { path } => assert_eq!(path, "/tmp/shot.png"),
        _ => panic!("Wrong command type"),
    }
}

#[test]
fn test_status_response() {
    let status = WindowStatus {
        version: "0.1.0".to_string(),
        uptime_secs: 42,
        background: BackgroundKind::Video("/home/user/rain.mpg".to_string()),
        video_time_secs: Some(1.5),
        video_duration_secs: Some(2.0),
        font_scale: 1.2,
        zoom_enabled: true,
        active: false,
    };

    let json = serde_json::to_string(&Response::Status(status)).unwrap();
    match serde_json::from_str::<Response>(&json).unwrap() {
        Response::Status(status) => {
            assert_eq!(status.uptime_secs, 42);
            assert_eq!(
                status.background,
                BackgroundKind::Video("/home/user/rain.mpg".to_string())
            );
            assert_eq!(status.video_time_secs, Some(1.5));
            assert_eq!(status.video_duration_secs, Some(2.0));
            assert!(!status.active);
        }
        _ => panic!("Wrong response type"),
    }
}

#[test]
fn test_response_types() {
    let responses = vec![
        Response::Ok,
        Response::Ignored,
        Response::Pong,
        Response::Menu(vec!["Zoom In".to_string(), "Close".to_string()]),
        Response::Error(TermError::NotFound("No menu entry 7".to_string())),
    ];

    for response in responses {
        let json = serde_json::to_string(&response).unwrap();
        let _: Response = serde_json::from_str(&json).unwrap();
    }
}

#[test]
fn test_error_message_survives_transport() {
    let response = Response::Error(TermError::Background("failed to decode clip.mpg".to_string()));
    let json = serde_json::to_string(&response).unwrap();

    match serde_json::from_str::<Response>(&json).unwrap() {
        Response::Error(e) => {
            assert_eq!(e.to_string(), "Background error: failed to decode clip.mpg")
        }
        _ => panic!("Wrong response type"),
    }
}

#[test]
fn test_modifier_defaults() {
    let json = r#"{"Key":{"key":"Escape","modifiers":{"ctrl":false,"shift":false,"alt":false,"logo":false}}}"#;
    match serde_json::from_str::<Command>(json).unwrap() {
        Command::Key(press) => {
            assert_eq!(press, KeyPress::new(Key::Escape, Modifiers::NONE));
        }
        _ => panic!("Wrong command type"),
    }
}
