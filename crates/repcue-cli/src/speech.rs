//! Speech through an external text-to-speech program.

use std::process::{Child, Command, Stdio};

use repcue_core::SpeechAnnouncer;
use tracing::{debug, warn};

/// Runs `program [args..] <text>` once per utterance.
///
/// A new utterance kills the previous one. If the program cannot be started
/// speech is reported unavailable from then on.
pub struct CommandAnnouncer {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
    available: bool,
}

impl CommandAnnouncer {
    /// `command` is split on whitespace; the first word is the program.
    pub fn new(command: &str) -> Self {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next().unwrap_or_default();
        let available = !program.is_empty();
        Self {
            program,
            args: words.collect(),
            child: None,
            available,
        }
    }
}

impl SpeechAnnouncer for CommandAnnouncer {
    fn speak(&mut self, text: &str) -> bool {
        if !self.available {
            return false;
        }
        self.cancel();
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(child) => {
                self.child = Some(child);
                true
            }
            Err(e) => {
                warn!(program = %self.program, error = %e, "speech command unavailable");
                self.available = false;
                false
            }
        }
    }

    fn is_speaking(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) => {
                self.child = None;
                false
            }
            Err(e) => {
                debug!(error = %e, "lost track of speech process");
                self.child = None;
                false
            }
        }
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for CommandAnnouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
