//! WHOIS lookup through the system's `whois` program.
//!
//! WHOIS responses are unstructured text; this module only fetches them.
//! Interpretation happens in [`crate::parser`].

use crate::error::ExporterError;
use crate::types::Target;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Default deadline for one lookup.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default program used for lookups.
pub const DEFAULT_COMMAND: &str = "whois";

/// WHOIS client that shells out to a whois-compatible program.
///
/// The program is executed directly with the target as its own argument
/// after a `--`, never through a shell. The child is killed if the lookup future is
/// dropped, which covers both the deadline and a cancelled request.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    /// Deadline for a single lookup
    timeout: Duration,
    /// Program to run (looked up in `PATH`)
    command: String,
    /// Optional server passed as `-h <server>`
    server: Option<String>,
}

impl WhoisClient {
    /// Create a new WHOIS client with default settings.
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            command: DEFAULT_COMMAND.to_string(),
            server: None,
        }
    }

    /// Create a new WHOIS client with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::new()
        }
    }

    /// Use a different program in place of `whois`.
    pub fn command<C: Into<String>>(mut self, command: C) -> Self {
        self.command = command.into();
        self
    }

    /// Query a specific server with `-h <server>` instead of letting the
    /// program pick one.
    pub fn server<S: Into<String>>(mut self, server: Option<S>) -> Self {
        self.server = server.map(Into::into);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one lookup and return the raw response text.
    ///
    /// # Errors
    ///
    /// - `LookupTimeout` if the program does not exit within the deadline
    ///   (the process is killed)
    /// - `LookupFailed` if it cannot be started or exits unsuccessfully
    pub async fn lookup(&self, target: &Target) -> Result<String, ExporterError> {
        match tokio::time::timeout(self.timeout, self.execute_whois_command(target)).await {
            Ok(result) => result,
            Err(_) => Err(ExporterError::lookup_timeout(target.as_str(), self.timeout)),
        }
    }

    fn build_command(&self, target: &Target) -> Command {
        let mut command = Command::new(&self.command);

        if let Some(server) = &self.server {
            command.arg("-h").arg(server);
        }

        command
            .arg("--")
            .arg(target.as_str())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        command
    }

    async fn execute_whois_command(&self, target: &Target) -> Result<String, ExporterError> {
        let output = self.build_command(target).output().await.map_err(|e| {
            ExporterError::lookup_failed(
                target.as_str(),
                format!(
                    "Failed to execute {} command: {}. Make sure it is installed.",
                    self.command, e
                ),
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.command, output.status)
            } else {
                format!("{} exited with {}: {}", self.command, output.status, stderr)
            };
            return Err(ExporterError::lookup_failed(target.as_str(), message));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(domain = %target, "{} {}\n{}", self.command, target, text);

        Ok(text)
    }
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn target(raw: &str) -> Target {
        Target::parse(raw, false).unwrap()
    }

    #[test]
    fn test_whois_client_creation() {
        let client = WhoisClient::new();
        assert_eq!(client.timeout(), Duration::from_secs(5));
        assert_eq!(client.command, "whois");
        assert!(client.server.is_none());

        let custom_client = WhoisClient::with_timeout(Duration::from_secs(10))
            .command("rwhois")
            .server(Some("whois.tcinet.ru"));
        assert_eq!(custom_client.timeout(), Duration::from_secs(10));
        assert_eq!(custom_client.command, "rwhois");
        assert_eq!(custom_client.server.as_deref(), Some("whois.tcinet.ru"));
    }

    #[test]
    fn test_target_is_a_single_argument() {
        let client = WhoisClient::new().server(Some("whois.tcinet.ru"));
        let command = client.build_command(&target("example.ru; rm -rf /"));
        let std_command = command.as_std();

        assert_eq!(std_command.get_program(), "whois");
        let args: Vec<_> = std_command.get_args().collect();
        assert_eq!(args, ["-h", "whois.tcinet.ru", "--", "example.ru; rm -rf /"]);
    }

    #[test]
    fn test_options_end_before_target() {
        let command = WhoisClient::new().build_command(&target("example.ru"));
        let args: Vec<_> = command.as_std().get_args().collect();
        assert_eq!(args, ["--", "example.ru"]);
    }

    #[tokio::test]
    async fn test_lookup_returns_stdout() {
        let client = WhoisClient::new().command("printf");
        let text = tokio_test::assert_ok!(client.lookup(&target("$(id) example.ru")).await);
        // No shell expansion happens
        assert_eq!(text, "$(id) example.ru");
    }

    #[tokio::test]
    async fn test_lookup_non_zero_exit() {
        let client = WhoisClient::new().command("false");
        let err = tokio_test::assert_err!(client.lookup(&target("example.ru")).await);
        assert!(matches!(err, ExporterError::LookupFailed { .. }));
    }

    #[tokio::test]
    async fn test_lookup_missing_program() {
        let client = WhoisClient::new().command("definitely-not-a-whois-binary");
        let err = client.lookup(&target("example.ru")).await.unwrap_err();
        match err {
            ExporterError::LookupFailed { domain, message } => {
                assert_eq!(domain, "example.ru");
                assert!(message.contains("definitely-not-a-whois-binary"));
            }
            other => panic!("expected LookupFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lookup_timeout() {
        let client = WhoisClient::with_timeout(Duration::from_millis(200)).command("sleep");
        let start = Instant::now();
        let err = client.lookup(&target("10")).await.unwrap_err();

        assert!(matches!(err, ExporterError::LookupTimeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    /// Whether a live process has `arg` on its command line. A killed child
    /// that is not yet reaped has an empty cmdline and does not count.
    #[cfg(target_os = "linux")]
    fn running_with_arg(arg: &str) -> bool {
        let Ok(entries) = std::fs::read_dir("/proc") else {
            return false;
        };
        entries.flatten().any(|entry| {
            std::fs::read(entry.path().join("cmdline"))
                .map(|cmdline| cmdline.split(|b| *b == 0).any(|part| part == arg.as_bytes()))
                .unwrap_or(false)
        })
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_lookup_timeout_kills_child() {
        // Unique duration so the child can be found in /proc
        let seconds = format!("30.{}7", std::process::id());
        let client = WhoisClient::with_timeout(Duration::from_millis(500)).command("sleep");

        let lookup = tokio::spawn({
            let target = target(&seconds);
            async move { client.lookup(&target).await }
        });

        let mut seen = false;
        for _ in 0..25 {
            if running_with_arg(&seconds) {
                seen = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(seen, "sleep {} never started", seconds);

        let err = lookup.await.unwrap().unwrap_err();
        assert!(matches!(err, ExporterError::LookupTimeout { .. }));

        let mut gone = false;
        for _ in 0..100 {
            if !running_with_arg(&seconds) {
                gone = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(gone, "sleep {} outlived the deadline", seconds);
    }
}
