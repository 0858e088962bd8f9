//! Child process spawning

use anyhow::{Result, bail};
use common::{BACKGROUND_ENV, SOCKET_ENV};
use std::ffi::OsString;
use std::path::Path;
use std::process::ExitCode;
use tokio::process::Command;

use crate::config::Config;

const FALLBACK_SHELL: &str = "/bin/sh";

/// Configured shell, then `$SHELL`, then `/bin/sh`
pub fn find_shell(configured: Option<&str>, env_shell: Option<String>) -> String {
    configured
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| env_shell.filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| FALLBACK_SHELL.to_string())
}

/// Variables added to the child's environment.
///
/// An inherited background flag is left untouched.
fn child_env(
    background_active: bool,
    socket: &Path,
    inherited_background: Option<OsString>,
) -> Vec<(&'static str, OsString)> {
    let mut env = Vec::new();
    if inherited_background.is_none() {
        let flag = if background_active { "1" } else { "0" };
        env.push((BACKGROUND_ENV, OsString::from(flag)));
    }
    env.push((SOCKET_ENV, socket.as_os_str().to_os_string()));
    env
}

/// Build the command for the child.
///
/// A non-empty `exec` argv is looked up on `PATH`; otherwise the user's
/// shell runs, as a login shell when configured.
pub fn child_command(
    config: &Config,
    exec: &[String],
    background_active: bool,
    socket: &Path,
) -> Result<Command> {
    let mut cmd = match exec.split_first() {
        Some((program, args)) => {
            if program.is_empty() {
                bail!("Empty command");
            }
            let mut cmd = Command::new(program);
            cmd.args(args);
            cmd
        }
        None => {
            let shell = find_shell(
                config.general.shell.as_deref(),
                std::env::var("SHELL").ok(),
            );
            let mut cmd = Command::new(&shell);
            if config.general.login_shell {
                cmd.arg0(format!("-{}", shell));
            }
            cmd
        }
    };

    for (key, value) in child_env(
        background_active,
        socket,
        std::env::var_os(BACKGROUND_ENV),
    ) {
        cmd.env(key, value);
    }
    cmd.kill_on_drop(true);

    Ok(cmd)
}

/// Process exit status for the child's exit code.
///
/// A window closed before the child reported a code counts as failure.
pub fn exit_code(child: Option<i32>) -> ExitCode {
    match child {
        Some(0) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_find_shell_order() {
        assert_eq!(
            find_shell(Some("/bin/zsh"), Some("/bin/bash".into())),
            "/bin/zsh"
        );
        assert_eq!(find_shell(Some("  "), Some("/bin/bash".into())), "/bin/bash");
        assert_eq!(find_shell(None, Some("".into())), "/bin/sh");
        assert_eq!(find_shell(None, None), "/bin/sh");
    }

    #[test]
    fn test_child_env_sets_flag() {
        let socket = PathBuf::from("/run/user/1000/vesper-1.sock");

        let env = child_env(true, &socket, None);
        assert!(env.contains(&(BACKGROUND_ENV, OsString::from("1"))));
        assert!(env.contains(&(SOCKET_ENV, OsString::from("/run/user/1000/vesper-1.sock"))));

        let env = child_env(false, &socket, None);
        assert!(env.contains(&(BACKGROUND_ENV, OsString::from("0"))));
    }

    #[test]
    fn test_child_env_keeps_inherited_flag() {
        let socket = PathBuf::from("/tmp/vesper.sock");
        let env = child_env(true, &socket, Some(OsString::from("0")));
        assert!(env.iter().all(|(key, _)| *key != BACKGROUND_ENV));
    }

    #[test]
    fn test_exec_argv() {
        let exec = vec!["htop".to_string(), "-d".to_string(), "10".to_string()];
        let cmd = child_command(&Config::default(), &exec, false, Path::new("/tmp/s")).unwrap();
        let std_cmd = cmd.as_std();

        assert_eq!(std_cmd.get_program(), "htop");
        let args: Vec<_> = std_cmd.get_args().collect();
        assert_eq!(args, ["-d", "10"]);
    }

    #[test]
    fn test_configured_shell() {
        let mut config = Config::default();
        config.general.shell = Some("/usr/bin/fish".to_string());
        let cmd = child_command(&config, &[], true, Path::new("/tmp/s")).unwrap();
        assert_eq!(cmd.as_std().get_program(), "/usr/bin/fish");
    }

    #[test]
    fn test_exit_code_translation() {
        assert_eq!(exit_code(Some(0)), ExitCode::SUCCESS);
        assert_eq!(exit_code(Some(1)), ExitCode::FAILURE);
        assert_eq!(exit_code(None), ExitCode::FAILURE);
    }
}
