//! Serialized console output shared by all race threads.

use colored::Colorize;
use std::io::Write;
use std::sync::Mutex;

/// Writes whole lines to stdout under one lock, so lines from different
/// worker threads never interleave mid-line. The race hands one shared
/// reporter to every worker.
pub struct Reporter {
    lock: Mutex<()>,
    quiet: bool,
}

impl Reporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            lock: Mutex::new(()),
            quiet,
        }
    }

    /// Per-runner progress line. Suppressed in quiet mode.
    pub fn progress(&self, line: &str) {
        if self.quiet {
            return;
        }
        self.write_line(line);
    }

    /// Winner announcement. Suppressed in quiet mode.
    pub fn winner(&self, team_name: &str) {
        if self.quiet {
            return;
        }
        self.write_line(&format!(
            "\nTeam {} is the WINNER!\n",
            team_name.green().bold()
        ));
    }

    fn write_line(&self, line: &str) {
        let _guard = self.lock.lock().expect("print lock poisoned");
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        // A failed console write is not worth killing a runner thread over.
        let _ = writeln!(handle, "{line}");
    }
}
