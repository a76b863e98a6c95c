use crate::error::Result;
use chrono::{DateTime, Local};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use strum::{Display, IntoStaticStr};

pub const SESSION_HEADER: &str = "timestamp\tevent\tid\tname\tdetail";

/// Kind of line in a session log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SessionEvent {
    CheckSent,
    ItemReceived,
    GoalSent,
}

/// Timestamped TSV log of one client session.
pub struct SessionLog {
    base_dir: PathBuf,
    current_session: Option<PathBuf>,
}

impl SessionLog {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            current_session: None,
        }
    }

    /// Create `<base>/<date>/session_<time>.tsv` and write the header.
    pub fn start_session(&mut self) -> Result<PathBuf> {
        let now: DateTime<Local> = Local::now();
        let session_dir = self.base_dir.join(now.format("%Y-%m-%d").to_string());
        fs::create_dir_all(&session_dir)?;

        let session_file = session_dir.join(format!("session_{}.tsv", now.format("%H%M%S")));
        self.current_session = Some(session_file.clone());
        self.append_line(SESSION_HEADER)?;

        Ok(session_file)
    }

    pub fn record(&self, event: SessionEvent, id: i64, name: &str, detail: &str) -> Result<()> {
        let now: DateTime<Local> = Local::now();
        self.append_line(&format!(
            "{}\t{}\t{}\t{}\t{}",
            now.format("%Y-%m-%d %H:%M:%S"),
            event,
            id,
            sanitize(name),
            sanitize(detail)
        ))
    }

    pub fn append_line(&self, line: &str) -> Result<()> {
        if let Some(ref path) = self.current_session {
            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    pub fn current_session_path(&self) -> Option<&Path> {
        self.current_session.as_deref()
    }
}

fn sanitize(field: &str) -> String {
    field.replace(['\t', '\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_no_session_is_noop() {
        let log = SessionLog::new("unused");
        log.record(SessionEvent::CheckSent, 1, "a", "").unwrap();
        assert!(log.current_session_path().is_none());
    }

    #[test]
    fn test_session_lines() {
        let dir = TempDir::new().unwrap();
        let mut log = SessionLog::new(dir.path());
        let path = log.start_session().unwrap();
        assert!(path.starts_with(dir.path()));

        log.record(SessionEvent::CheckSent, 5000000, "Ship Part 1", "")
            .unwrap();
        log.record(SessionEvent::ItemReceived, 77, "Red\tPikmin", "from player 2")
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], SESSION_HEADER);
        assert!(lines[1].ends_with("\tcheck_sent\t5000000\tShip Part 1\t"));
        assert!(lines[2].ends_with("\titem_received\t77\tRed Pikmin\tfrom player 2"));
    }
}
