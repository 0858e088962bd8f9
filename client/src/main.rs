use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use common::{Action, BackgroundKind, Command, KeyPress, Response};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

#[derive(Parser)]
#[command(name = "vesperctl")]
#[command(about = "Control a running vesper window", long_about = None)]
#[command(version)]
struct Cli {
    /// Control socket of the window (set inside vesper's child shell)
    #[arg(short, long, env = common::SOCKET_ENV)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Change the font zoom
    Zoom {
        #[arg(value_enum)]
        direction: ZoomDirection,
    },

    /// Seek the video background
    Seek {
        #[arg(value_enum)]
        direction: SeekDirection,
    },

    /// Send a key press through the window's shortcuts (e.g. ctrl+plus)
    Key { combo: String },

    /// List or activate context menu entries
    Menu {
        /// Activate the entry at this position
        #[arg(short, long)]
        activate: Option<usize>,
    },

    /// Mark the window active or inactive
    Focus {
        #[arg(value_enum)]
        state: FocusState,
    },

    /// Write the composited background to a PNG file
    Snapshot { path: PathBuf },

    /// Show window status
    Status,

    /// Ping the window to check if it's running
    Ping,

    /// Close the window
    Close,
}

#[derive(Clone, Copy, ValueEnum)]
enum ZoomDirection {
    In,
    Out,
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
enum SeekDirection {
    Forward,
    Backward,
    Start,
}

#[derive(Clone, Copy, ValueEnum)]
enum FocusState {
    On,
    Off,
}

fn build_command(command: Commands) -> Result<Command> {
    let command = match command {
        Commands::Zoom { direction } => Command::Action(match direction {
            ZoomDirection::In => Action::ZoomIn,
            ZoomDirection::Out => Action::ZoomOut,
            ZoomDirection::Reset => Action::ZoomReset,
        }),
        Commands::Seek { direction } => Command::Action(match direction {
            SeekDirection::Forward => Action::SeekForward,
            SeekDirection::Backward => Action::SeekBackward,
            SeekDirection::Start => Action::SeekStart,
        }),
        Commands::Key { combo } => {
            let press: KeyPress = combo
                .parse()
                .with_context(|| format!("Invalid key '{}'", combo))?;
            Command::Key(press)
        }
        Commands::Menu { activate: None } => Command::Menu,
        Commands::Menu {
            activate: Some(index),
        } => Command::ActivateMenu { index },
        Commands::Focus { state } => Command::Focus {
            active: matches!(state, FocusState::On),
        },
        Commands::Snapshot { path } => {
            let path = if path.is_absolute() {
                path
            } else {
                std::env::current_dir()?.join(path)
            };
            Command::Snapshot {
                path: path.to_string_lossy().to_string(),
            }
        }
        Commands::Status => Command::Query,
        Commands::Ping => Command::Ping,
        Commands::Close => Command::Close,
    };
    Ok(command)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let socket_path = cli.socket.unwrap_or_else(common::get_socket_path);
    let command = build_command(cli.command)?;

    match send_command(&socket_path, command).await {
        Ok(response) => {
            handle_response(response);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!(
                "\nIs a vesper window listening on {}? Run vesperctl inside one, or pass --socket.",
                socket_path.display()
            );
            std::process::exit(1);
        }
    }
}

async fn send_command(socket_path: &Path, command: Command) -> Result<Response> {
    let stream = UnixStream::connect(socket_path).await?;
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    // Send command
    let command_json = serde_json::to_string(&command)?;
    writer.write_all(command_json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;

    // Read response
    let mut response_line = String::new();
    reader.read_line(&mut response_line).await?;

    let response: Response = serde_json::from_str(&response_line)?;
    Ok(response)
}

fn handle_response(response: Response) {
    match response {
        Response::Ok => {
            println!("✓ Success");
        }
        Response::Ignored => {
            println!("- No effect");
        }
        Response::Error(e) => {
            eprintln!("✗ Error: {}", e);
            std::process::exit(1);
        }
        Response::Status(status) => {
            println!("Window Status:");
            println!("  Version: {}", status.version);
            println!("  Uptime: {}s", status.uptime_secs);
            match status.background {
                BackgroundKind::None => println!("  Background: none"),
                BackgroundKind::Image(path) => println!("  Background: image {}", path),
                BackgroundKind::Video(path) => println!("  Background: video {}", path),
            }
            match (status.video_time_secs, status.video_duration_secs) {
                (Some(t), Some(length)) => println!("  Video time: {:.2}s / {:.2}s", t, length),
                (Some(t), None) => println!("  Video time: {:.2}s", t),
                _ => {}
            }
            println!(
                "  Font scale: {:.2}{}",
                status.font_scale,
                if status.zoom_enabled { "" } else { " (zoom disabled)" }
            );
            println!("  Active: {}", if status.active { "yes" } else { "no" });
        }
        Response::Menu(labels) => {
            println!("Menu:");
            for (index, label) in labels.iter().enumerate() {
                println!("  {}: {}", index, label);
            }
        }
        Response::Pong => {
            println!("✓ Window is running");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("vesperctl").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_zoom_and_seek_map_to_actions() {
        let cmd = build_command(parse(&["zoom", "in"]).command).unwrap();
        assert!(matches!(cmd, Command::Action(Action::ZoomIn)));

        let cmd = build_command(parse(&["seek", "start"]).command).unwrap();
        assert!(matches!(cmd, Command::Action(Action::SeekStart)));
    }

    #[test]
    fn test_key_is_parsed() {
        let cmd = build_command(parse(&["key", "ctrl+minus"]).command).unwrap();
        assert!(matches!(cmd, Command::Key(press) if press.to_string() == "ctrl+minus"));

        assert!(build_command(parse(&["key", "hyper+x"]).command).is_err());
    }

    #[test]
    fn test_menu_variants() {
        assert!(matches!(
            build_command(parse(&["menu"]).command).unwrap(),
            Command::Menu
        ));
        assert!(matches!(
            build_command(parse(&["menu", "--activate", "2"]).command).unwrap(),
            Command::ActivateMenu { index: 2 }
        ));
    }

    #[test]
    fn test_snapshot_path_made_absolute() {
        let cmd = build_command(parse(&["snapshot", "shot.png"]).command).unwrap();
        match cmd {
            Command::Snapshot { path } => assert!(Path::new(&path).is_absolute()),
            _ => panic!("expected snapshot"),
        }
    }

    #[test]
    fn test_explicit_socket() {
        let cli = parse(&["--socket", "/tmp/vesper-1.sock", "ping"]);
        assert_eq!(cli.socket, Some(PathBuf::from("/tmp/vesper-1.sock")));
    }
}
