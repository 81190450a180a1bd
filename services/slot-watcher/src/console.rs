//! Terminal notifier: prints alerts to stderr when running interactively

use std::io::{IsTerminal, Write};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::notifier::{Notification, Notifier, Permission};

type Output = Box<dyn Write + Send>;

/// Prints notifications to the terminal.
///
/// Permission starts undetermined and is granted on request only when
/// there is a terminal to show the notification on.
pub struct ConsoleNotifier {
    permission: Mutex<Permission>,
    interactive: bool,
    out: Mutex<Output>,
}

impl std::fmt::Debug for ConsoleNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleNotifier")
            .field("interactive", &self.interactive)
            .finish()
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new(std::io::stderr().is_terminal(), Box::new(std::io::stderr()))
    }
}

impl ConsoleNotifier {
    pub fn new(interactive: bool, out: Output) -> Self {
        Self {
            permission: Mutex::new(Permission::Undetermined),
            interactive,
            out: Mutex::new(out),
        }
    }

    fn current(&self) -> Permission {
        self.permission
            .lock()
            .map(|p| *p)
            .unwrap_or(Permission::Denied)
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn type_name(&self) -> &str {
        "console"
    }

    async fn permission(&self) -> Permission {
        self.current()
    }

    async fn request_permission(&self) -> Permission {
        let Ok(mut permission) = self.permission.lock() else {
            return Permission::Denied;
        };
        if *permission == Permission::Undetermined {
            *permission = if self.interactive {
                Permission::Granted
            } else {
                Permission::Denied
            };
            tracing::debug!("Console notification permission: {:?}", *permission);
        }
        *permission
    }

    async fn notify(&self, notification: &Notification) -> crate::Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| crate::WatcherError::Notifier("console output poisoned".to_string()))?;
        writeln!(out, "*** {} ***", notification.title)?;
        writeln!(out, "{}", notification.message)?;
        out.flush()?;
        Ok(())
    }
}
