//! Shell resolution and session environment policy.
//!
//! Sessions without an explicit command run the user's login shell. Every
//! spawned process inherits the parent environment with three adjustments:
//!
//! - `CLAUDECODE` is removed so a resumable agent launched inside a session
//!   does not detect itself as nested inside another orchestrator
//! - a UTF-8 `LANG` is supplied when no locale variable is set at all
//! - `TERM` is pinned to `xterm-256color`

use portable_pty::CommandBuilder;
use std::path::Path;

/// Environment variable a resumable agent uses to detect that it is already
/// running under an orchestrator. Must not leak into spawned sessions.
const NESTED_AGENT_VAR: &str = "CLAUDECODE";

/// Locale variables checked before injecting a UTF-8 default.
const LOCALE_VARS: &[&str] = &["LANG", "LC_ALL", "LC_CTYPE"];

/// Resolve the user's login shell.
///
/// Uses `$SHELL` when set, otherwise the platform default.
pub fn login_shell() -> String {
    if let Ok(shell) = std::env::var("SHELL") {
        if !shell.is_empty() {
            return shell;
        }
    }

    #[cfg(windows)]
    {
        "powershell.exe".to_string()
    }
    #[cfg(not(windows))]
    {
        "/bin/sh".to_string()
    }
}

/// File name component of a command path, used to decide whether the spawned
/// binary really is the resumable agent before appending its flags.
pub fn command_file_name(command: &str) -> &str {
    Path::new(command)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(command)
}

/// Apply the session environment policy to a command about to be spawned.
///
/// `extra` holds per-session variables (project and session identifiers)
/// injected on top of the inherited environment.
pub fn apply_session_env(cmd: &mut CommandBuilder, extra: &[(String, String)]) {
    cmd.env_remove(NESTED_AGENT_VAR);
    cmd.env("TERM", "xterm-256color");

    let has_locale = LOCALE_VARS
        .iter()
        .any(|var| std::env::var(var).map(|v| !v.is_empty()).unwrap_or(false));
    if !has_locale {
        cmd.env("LANG", "en_US.UTF-8");
    }

    for (key, value) in extra {
        cmd.env(key, value);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_shell_env<F: FnOnce()>(shell: Option<&str>, f: F) {
        let _guard = ENV_LOCK.lock().unwrap();
        let prev = env::var("SHELL").ok();

        match shell {
            Some(value) => env::set_var("SHELL", value),
            None => env::remove_var("SHELL"),
        }

        f();

        match prev {
            Some(value) => env::set_var("SHELL", value),
            None => env::remove_var("SHELL"),
        }
    }

    #[test]
    fn login_shell_prefers_shell_var() {
        with_shell_env(Some("/usr/local/bin/fish"), || {
            assert_eq!(login_shell(), "/usr/local/bin/fish");
        });
    }

    #[test]
    #[cfg(unix)]
    fn login_shell_falls_back_when_unset() {
        with_shell_env(None, || {
            assert_eq!(login_shell(), "/bin/sh");
        });
    }

    #[test]
    fn login_shell_falls_back_when_empty() {
        with_shell_env(Some(""), || {
            assert!(!login_shell().is_empty());
        });
    }

    #[test]
    fn command_file_name_strips_directories() {
        assert_eq!(command_file_name("/usr/local/bin/claude"), "claude");
        assert_eq!(command_file_name("claude"), "claude");
        assert_eq!(command_file_name("/bin/zsh"), "zsh");
    }

    #[test]
    fn apply_session_env_sets_extra_vars() {
        let mut cmd = CommandBuilder::new("/bin/sh");
        apply_session_env(
            &mut cmd,
            &[("CCT_SESSION_ID".to_string(), "abc".to_string())],
        );
        // CommandBuilder does not expose a getter for individual vars, but
        // the call must at least not panic and leave the command intact.
        assert_eq!(cmd.get_argv()[0], "/bin/sh");
    }
}
