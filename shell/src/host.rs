//! Headless host loop
//!
//! Stands in for the toolkit main loop: one task on a current-thread runtime
//! multiplexes the frame clock, control requests, the child's exit and
//! termination signals, and owns the window context throughout.

use anyhow::{Context, Result};
use common::{Command, Response, TermError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::context::WindowContext;
use crate::ipc_server::{self, Request};
use crate::log_and_continue;
use crate::spawn;
use crate::widget::{HeadlessTerminal, TerminalWidget};

/// Apply one control command to the window
pub fn handle_request(ctx: &mut WindowContext<HeadlessTerminal>, command: Command) -> Response {
    let handled = |done: bool| if done { Response::Ok } else { Response::Ignored };

    match command {
        Command::Ping => Response::Pong,
        Command::Query => Response::Status(ctx.status()),
        Command::Action(action) => handled(ctx.perform(action)),
        Command::Key(press) => handled(ctx.handle_key(&press)),
        Command::Menu => Response::Menu(ctx.menu().labels()),
        Command::ActivateMenu { index } => match ctx.activate_menu(index) {
            Some(done) => handled(done),
            None => Response::Error(TermError::NotFound(format!("No menu entry {}", index))),
        },
        Command::Focus { active } => {
            log::debug!("Window {}", if active { "activated" } else { "deactivated" });
            ctx.widget_mut().set_active(active);
            Response::Ok
        }
        Command::Snapshot { path } => match ctx.snapshot(Path::new(&path)) {
            Ok(()) => Response::Ok,
            Err(e) => Response::Error(TermError::Background(format!("{:#}", e))),
        },
        Command::Close => {
            ctx.request_close();
            Response::Ok
        }
    }
}

/// Run the window until it closes and return the process exit status
pub async fn run(mut ctx: WindowContext<HeadlessTerminal>, exec: Vec<String>) -> Result<ExitCode> {
    let socket_path: PathBuf = common::get_socket_path();

    let (request_tx, mut request_rx) = mpsc::channel::<Request>(32);
    let (stop_tx, stop_rx) = watch::channel(false);
    let server = tokio::spawn(ipc_server::start(socket_path.clone(), request_tx, stop_rx));

    let mut child = spawn::child_command(ctx.config(), &exec, ctx.background_active(), &socket_path)?
        .spawn()
        .context("Failed to spawn child process")?;
    log::info!("Spawned child process {:?}", child.id());
    let mut child_running = true;

    let period = Duration::from_secs(1) / ctx.config().window.refresh_rate.max(1);
    let mut frame_clock = tokio::time::interval(period);
    frame_clock.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to set up SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to set up SIGINT handler")?;

    while !ctx.close_requested() {
        tokio::select! {
            tick = frame_clock.tick() => {
                ctx.on_frame(tick.into_std());
                let requested = ctx.widget_mut().take_redraw();
                log_and_continue!(ctx.render(requested), "repaint background");
            }
            Some((command, reply)) = request_rx.recv() => {
                let response = handle_request(&mut ctx, command);
                let _ = reply.send(response);
            }
            status = child.wait(), if child_running => {
                child_running = false;
                match status {
                    Ok(status) => ctx.child_exited(status.code()),
                    Err(e) => {
                        log::error!("Failed to wait for child: {}", e);
                        ctx.child_exited(None);
                    }
                }
            }
            _ = sigterm.recv() => {
                log::info!("Received SIGTERM, shutting down");
                ctx.request_close();
            }
            _ = sigint.recv() => {
                log::info!("Received SIGINT, shutting down");
                ctx.request_close();
            }
        }
    }

    ctx.shutdown();

    if child_running {
        log_and_continue!(child.kill().await, "stop child process");
    }

    let _ = stop_tx.send(true);
    match server.await {
        Ok(result) => log_and_continue!(result, "stop control socket"),
        Err(e) => log::error!("Control socket task failed: {}", e),
    }

    Ok(spawn::exit_code(ctx.child_exit_code()))
}
