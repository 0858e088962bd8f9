use anyhow::{Context, Result};
use common::{Command, Response, TermError};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot, watch};

/// A command plus the channel its response goes back on
pub type Request = (Command, oneshot::Sender<Response>);

/// Accept controller connections until `shutdown` flips to true.
///
/// Commands needing the window are forwarded over `request_tx`; the window
/// state itself never leaves the host loop.
pub async fn start(
    socket_path: PathBuf,
    request_tx: mpsc::Sender<Request>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    // Remove old socket if it exists
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }

    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("Failed to bind {}", socket_path.display()))?;
    log::info!("Control socket listening on: {}", socket_path.display());

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    let tx = request_tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, tx).await {
                            log::error!("Error handling client: {}", e);
                        }
                    });
                }
                Err(e) => log::error!("Error accepting connection: {}", e),
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    // Clean up socket
    let _ = std::fs::remove_file(&socket_path);
    log::info!("Control socket closed");
    Ok(())
}

async fn handle_client(stream: UnixStream, request_tx: mpsc::Sender<Request>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<Command>(&line) {
            Ok(command) => handle_command(command, &request_tx).await,
            Err(e) => {
                log::warn!("Invalid command: {}", e);
                Response::Error(TermError::Ipc(format!("Invalid command: {}", e)))
            }
        };

        let response_json = serde_json::to_string(&response)?;
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        line.clear();
    }

    Ok(())
}

async fn handle_command(command: Command, request_tx: &mpsc::Sender<Request>) -> Response {
    log::debug!("Handling command: {:?}", command);

    match &command {
        Command::Ping => return Response::Pong,
        Command::Snapshot { path } if !Path::new(path).is_absolute() => {
            return Response::Error(TermError::Io(format!(
                "Snapshot path must be absolute: {}",
                path
            )));
        }
        _ => {}
    }

    let (reply_tx, reply_rx) = oneshot::channel();
    if let Err(e) = request_tx.send((command, reply_tx)).await {
        return Response::Error(TermError::Ipc(format!(
            "Failed to send command to window: {}",
            e
        )));
    }

    reply_rx.await.unwrap_or_else(|_| {
        Response::Error(TermError::Unavailable(
            "Window closed before replying".to_string(),
        ))
    })
}
