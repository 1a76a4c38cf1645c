//! Shared helpers: a recording reporter and `sh`-based fake engines.

use std::sync::Mutex;

use scanmon::engine::{EngineCommand, ProgressReporter};

/// One reporter callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Started(String, u64),
    Progress(u64, u8),
    Finding(String),
    Warning(String),
    UpdateStarted,
    Heartbeat,
    Finished,
}

/// Reporter that records every callback in order.
#[derive(Default)]
pub struct Recording {
    pub events: Mutex<Vec<Event>>,
}

impl Recording {
    fn push(&self, event: Event) {
        self.events.lock().expect("lock").push(event);
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("lock").clone()
    }

    /// Last progress event, if any.
    pub fn last_progress(&self) -> Option<(u64, u8)> {
        self.events().into_iter().rev().find_map(|e| match e {
            Event::Progress(observed, percent) => Some((observed, percent)),
            _ => None,
        })
    }

    /// All finding lines.
    pub fn findings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Finding(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    /// All warning lines.
    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Warning(line) => Some(line),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for Recording {
    fn scan_started(&self, label: &str, expected: u64) {
        self.push(Event::Started(label.to_string(), expected));
    }
    fn scan_progress(&self, observed: u64, percent: u8) {
        self.push(Event::Progress(observed, percent));
    }
    fn finding(&self, line: &str) {
        self.push(Event::Finding(line.to_string()));
    }
    fn warning(&self, line: &str) {
        self.push(Event::Warning(line.to_string()));
    }
    fn update_started(&self) {
        self.push(Event::UpdateStarted);
    }
    fn heartbeat(&self) {
        self.push(Event::Heartbeat);
    }
    fn finished(&self) {
        self.push(Event::Finished);
    }
}

/// What: Fake scan engine running `script` under `sh`.
///
/// Details:
/// - The target path arrives as `$1`, just as it would for the real engine.
pub fn fake_scanner(script: &str) -> EngineCommand {
    EngineCommand {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string(), "fake-clamscan".to_string()],
        infected_exit_code: None,
        own_process_group: true,
    }
}

/// Fake updater running `script` under `sh`.
pub fn fake_updater(script: &str) -> EngineCommand {
    EngineCommand {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        infected_exit_code: None,
        own_process_group: false,
    }
}

/// What: Whether a process id still refers to a live (or zombie) process.
#[cfg(unix)]
pub fn process_exists(pid: i32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
}

/// What: Whether `pid` is still running, treating zombies as gone.
///
/// Details:
/// - Orphans are reaped by whatever adopted them, which may lag; polls for up
///   to one second before reporting the process as alive.
#[cfg(unix)]
pub async fn still_running(pid: i32) -> bool {
    for _ in 0..20 {
        let zombie = std::fs::read_to_string(format!("/proc/{pid}/stat"))
            .ok()
            .and_then(|stat| {
                stat.rsplit_once(") ")
                    .and_then(|(_, rest)| rest.chars().next())
            })
            .is_some_and(|state| state == 'Z');
        if zombie || !process_exists(pid) {
            return false;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    true
}
