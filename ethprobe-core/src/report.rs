//! Human-readable report output
//!
//! All user-facing text goes through a [`Reporter`]. Whether ANSI colors are
//! emitted is decided once at startup and injected as a [`Palette`].

use std::io::{IsTerminal, Write};

use crate::beacon::BeaconStatus;
use crate::diagnosis::Severity;
use crate::execution::ExecutionStatus;

const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    Ansi,
    Plain,
}

impl Palette {
    /// Colors are used only when enabled in config, `NO_COLOR` is unset and
    /// stdout is a terminal.
    pub fn detect(color_enabled: bool) -> Self {
        let no_color_env = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        if color_enabled && !no_color_env && std::io::stdout().is_terminal() {
            Palette::Ansi
        } else {
            Palette::Plain
        }
    }

    fn paint(&self, color: Color, text: &str) -> String {
        match self {
            Palette::Plain => text.to_string(),
            Palette::Ansi => format!("{}{}\x1b[0m", color.code(), text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightCyan,
}

impl Color {
    fn code(&self) -> &'static str {
        match self {
            Color::Red => "\x1b[31m",
            Color::Green => "\x1b[32m",
            Color::Yellow => "\x1b[33m",
            Color::Blue => "\x1b[34m",
            Color::Magenta => "\x1b[35m",
            Color::Cyan => "\x1b[36m",
            Color::White => "\x1b[37m",
            Color::BrightCyan => "\x1b[1;36m",
        }
    }
}

/// Kind of a timestamped log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Performance,
    Critical,
}

impl Status {
    fn style(&self) -> (Color, &'static str) {
        match self {
            Status::Success => (Color::Green, "✅"),
            Status::Error => (Color::Red, "❌"),
            Status::Warning => (Color::Yellow, "⚠️"),
            Status::Info => (Color::Blue, "ℹ️"),
            Status::Performance => (Color::Magenta, "⚡"),
            Status::Critical => (Color::Red, "🚨"),
        }
    }
}

impl From<Severity> for Status {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Success => Status::Success,
            Severity::Warning => Status::Warning,
            Severity::Error => Status::Error,
            Severity::Critical => Status::Critical,
        }
    }
}

/// Overall state of one node as shown in the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeHealth {
    Optimal,
    Functional,
    Critical,
}

impl NodeHealth {
    pub fn from_flags(healthy: bool, synced: Option<bool>) -> Self {
        match (healthy, synced) {
            (false, _) => NodeHealth::Critical,
            (true, Some(true)) => NodeHealth::Optimal,
            (true, _) => NodeHealth::Functional,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeHealth::Optimal => "OPTIMAL",
            NodeHealth::Functional => "FUNCTIONAL",
            NodeHealth::Critical => "CRITICAL",
        }
    }
}

pub struct Reporter<W: Write> {
    out: W,
    palette: Palette,
    write_failed: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, palette: Palette) -> Self {
        Self {
            out,
            palette,
            write_failed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text) {
            self.write_error(e);
        }
    }

    /// Warn once; later write errors on the same output are dropped
    fn write_error(&mut self, e: std::io::Error) {
        if !self.write_failed {
            tracing::warn!("Failed to write report output: {}", e);
            self.write_failed = true;
        }
    }

    fn colored(&mut self, color: Color, text: &str) {
        let painted = self.palette.paint(color, text);
        self.emit(&painted);
    }

    pub fn line(&mut self, text: &str) {
        self.emit(text);
    }

    /// Overwrite the current terminal line without a trailing newline
    pub fn progress(&mut self, text: &str) {
        if let Err(e) = write!(self.out, "\r{}", text).and_then(|_| self.out.flush()) {
            self.write_error(e);
        }
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            self.write_error(e);
        }
    }

    pub fn banner(&mut self, title: &str) {
        let rule = "=".repeat(RULE_WIDTH);
        self.colored(Color::Blue, &format!("\n{}", rule));
        self.colored(Color::Cyan, &format!("🚀 {}", title));
        self.colored(Color::Blue, &rule);
    }

    pub fn section(&mut self, title: &str) {
        self.colored(Color::Yellow, &format!("\n📋 {}", title));
        self.colored(Color::Yellow, &"-".repeat(title.chars().count()));
    }

    pub fn log(&mut self, status: Status, message: &str) {
        self.log_with_details(status, message, &[]);
    }

    /// Timestamped `[HH:MM:SS] icon message` line followed by indented details
    pub fn log_with_details(&mut self, status: Status, message: &str, details: &[String]) {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let (color, icon) = status.style();
        self.colored(color, &format!("[{}] {} {}", timestamp, icon, message));
        for detail in details {
            self.colored(Color::White, &format!("    └─ {}", detail));
        }
    }

    /// Print the summary block and return whether both nodes are healthy
    pub fn summary(
        &mut self,
        beacon: &BeaconStatus,
        execution: &ExecutionStatus,
        network_name: &str,
    ) -> bool {
        self.colored(Color::BrightCyan, "\n📊 HEALTH SUMMARY");
        self.colored(Color::Cyan, &"-".repeat(16));

        let beacon_healthy = beacon.is_healthy();
        let execution_healthy = execution.is_healthy();

        match beacon.health() {
            NodeHealth::Optimal => {
                self.colored(Color::Green, "🟢 Beacon Chain: OPTIMAL (healthy & synced)")
            }
            NodeHealth::Functional => {
                self.colored(Color::Yellow, "🟡 Beacon Chain: FUNCTIONAL (healthy, syncing)")
            }
            NodeHealth::Critical => {
                self.colored(Color::Red, "🔴 Beacon Chain: CRITICAL (offline/unhealthy)")
            }
        }

        match execution.health() {
            NodeHealth::Optimal => self.colored(
                Color::Green,
                &format!("🟢 {} RPC: OPTIMAL (reachable & synced)", network_name),
            ),
            NodeHealth::Functional => self.colored(
                Color::Yellow,
                &format!("🟡 {} RPC: FUNCTIONAL (reachable, syncing)", network_name),
            ),
            NodeHealth::Critical => self.colored(
                Color::Red,
                &format!("🔴 {} RPC: CRITICAL (unreachable/unresponsive)", network_name),
            ),
        }

        self.colored(Color::Blue, "\n📈 KEY METRICS:");
        let execution_peers_label = format!("{} Peers", network_name);
        let rows = [
            ("Beacon Peers", display_or_na(beacon.peer_count)),
            (
                "Beacon Version",
                beacon.version.clone().unwrap_or_else(|| "N/A".to_string()),
            ),
            ("Beacon Head Slot", display_or_na(beacon.head_slot.map(format_thousands))),
            ("Beacon Sync Distance", display_or_na(beacon.sync_distance)),
            (
                execution_peers_label.as_str(),
                display_or_na(execution.peer_count),
            ),
            ("Chain ID", display_or_na(execution.chain_id)),
            (
                "Latest Block",
                display_or_na(execution.latest_block.map(format_thousands)),
            ),
            (
                "Block Age",
                display_or_na(execution.block_age_secs.map(|s| format!("{}s", s))),
            ),
        ];
        let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in rows.iter() {
            self.emit(&format!("   • {:<width$} : {}", key, value, width = width));
        }

        let issues: Vec<&String> = beacon.issues.iter().chain(execution.issues.iter()).collect();
        if !issues.is_empty() {
            self.colored(Color::Red, "\n🚨 IDENTIFIED ISSUES:");
            for (i, issue) in issues.iter().enumerate() {
                self.colored(Color::Red, &format!("   {}. {}", i + 1, issue));
            }

            if !beacon.reachable || !execution.reachable {
                self.colored(Color::Yellow, "\n🔧 QUICK FIXES:");
            }
            if !beacon.reachable {
                self.emit("   Beacon Issues:");
                self.emit("   • sudo systemctl status lighthouse-bn");
                self.emit("   • sudo systemctl restart lighthouse-bn");
                self.emit("   • sudo ufw allow 5052");
            }
            if !execution.reachable {
                self.emit(&format!("   {} Issues:", network_name));
                self.emit("   • sudo systemctl status geth");
                self.emit("   • sudo systemctl restart geth");
                self.emit("   • sudo ufw allow 8545");
            }
        }

        beacon_healthy && execution_healthy
    }

    pub fn footer(&mut self, all_healthy: bool) {
        let rule = "=".repeat(RULE_WIDTH);
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        self.colored(Color::Blue, &format!("\n{}", rule));
        if all_healthy {
            self.colored(
                Color::Green,
                &format!("🎉 All systems healthy! Last checked: {}", now),
            );
        } else {
            self.colored(
                Color::Yellow,
                &format!("⚠️ Issues detected. Last checked: {}", now),
            );
        }
        self.colored(Color::Blue, &rule);
    }
}

fn display_or_na<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// `7123456` -> `7,123,456`
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render<F: FnOnce(&mut Reporter<Vec<u8>>)>(f: F) -> String {
        let mut reporter = Reporter::new(Vec::new(), Palette::Plain);
        f(&mut reporter);
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(7_123_456), "7,123,456");
    }

    #[test]
    fn test_node_health_flags() {
        assert_eq!(NodeHealth::from_flags(true, Some(true)), NodeHealth::Optimal);
        assert_eq!(NodeHealth::from_flags(true, Some(false)), NodeHealth::Functional);
        assert_eq!(NodeHealth::from_flags(true, None), NodeHealth::Functional);
        assert_eq!(NodeHealth::from_flags(false, Some(true)), NodeHealth::Critical);
    }

    #[test]
    fn test_plain_palette_has_no_escapes() {
        let out = render(|r| r.log(Status::Success, "Beacon node is healthy"));
        assert!(out.contains("✅ Beacon node is healthy"));
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn test_ansi_palette_wraps_lines() {
        let mut reporter = Reporter::new(Vec::new(), Palette::Ansi);
        reporter.log(Status::Error, "boom");
        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(out.starts_with("\x1b[31m["));
        assert!(out.trim_end().ends_with("\x1b[0m"));
    }

    /// Accepts writes but fails every flush
    struct FailingFlush;

    impl Write for FailingFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_flush_error_is_recorded() {
        let mut reporter = Reporter::new(FailingFlush, Palette::Plain);
        reporter.line("still fine");
        assert!(!reporter.write_failed);
        reporter.flush();
        assert!(reporter.write_failed);

        let mut reporter = Reporter::new(FailingFlush, Palette::Plain);
        reporter.progress("Next check in 5 seconds...");
        assert!(reporter.write_failed);
    }

    #[test]
    fn test_details_are_indented() {
        let details = vec!["first".to_string(), "second".to_string()];
        let out = render(|r| r.log_with_details(Status::Warning, "Connection test complete", &details));
        assert!(out.contains("    └─ first\n"));
        assert!(out.contains("    └─ second\n"));
    }

    #[test]
    fn test_summary_beacon_down_execution_optimal() {
        let beacon = BeaconStatus {
            issues: vec!["Port closed or service not responding".to_string()],
            ..Default::default()
        };
        let execution = ExecutionStatus {
            reachable: true,
            responding: true,
            synced: Some(true),
            chain_id: Some(11_155_111),
            peer_count: Some(10),
            latest_block: Some(7_123_456),
            ..Default::default()
        };

        let mut healthy = true;
        let out = render(|r| healthy = r.summary(&beacon, &execution, "Sepolia"));

        assert!(!healthy);
        assert!(out.contains("Beacon Chain: CRITICAL"));
        assert!(out.contains("Sepolia RPC: OPTIMAL"));
        assert!(out.contains("Sepolia Peers"));
        assert!(out.contains(": 10\n"));
        assert!(out.contains("7,123,456"));
        assert!(out.contains("1. Port closed or service not responding"));
        assert!(out.contains("sudo systemctl status lighthouse-bn"));
        assert!(!out.contains("sudo systemctl status geth"));
    }
}
