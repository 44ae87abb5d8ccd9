use crate::{Result, config::RuntimeConfig, error::Error};
use std::io::Write;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Duration, sleep};
use tracing::{info, warn};

/// Drives the external Ollama runtime: install, launch, and model pull.
pub struct OllamaRuntime {
    binary: String,
    install_command: String,
    settle_delay: Duration,
}

impl OllamaRuntime {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            install_command: config.install_command.clone(),
            settle_delay: Duration::from_secs(config.settle_delay_secs),
        }
    }

    /// Runs the full startup sequence: install the binary if absent, launch
    /// the server if no serve process is found, then pull the given model.
    pub async fn ensure_ready(&self, model: &str) -> Result<()> {
        if !self.is_installed().await {
            info!("{} is not installed, installing now", self.binary);
            self.install().await?;
            info!("{} installation complete", self.binary);
        }

        if !self.is_serving().await {
            info!("Starting {} server", self.binary);
            self.start_server()?;
            sleep(self.settle_delay).await;
        }

        info!("Pulling model '{}'", model);
        self.pull_model(model).await?;

        Ok(())
    }

    /// Checks whether the runtime binary is present by running its version
    /// query. Spawn failures and non-zero exits both count as "not installed".
    pub async fn is_installed(&self) -> bool {
        match tokio::process::Command::new(&self.binary)
            .arg("--version")
            .status()
            .await
        {
            Ok(status) => status.success(),
            Err(_) => false,
        }
    }

    /// Runs the vendor install script via a shell. A non-zero exit is fatal
    /// to startup.
    pub async fn install(&self) -> Result<()> {
        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.install_command)
            .status()
            .await
            .map_err(|e| Error::install(format!("Failed to run install script: {}", e)))?;

        if !status.success() {
            return Err(Error::install(format!(
                "Install script exited with {}",
                status
            )));
        }

        Ok(())
    }

    /// Checks the process table for a running serve process.
    pub async fn is_serving(&self) -> bool {
        self.probe_serve_process("pgrep").await
    }

    async fn probe_serve_process(&self, pgrep: &str) -> bool {
        let pattern = format!("{} serve", self.binary);

        match tokio::process::Command::new(pgrep)
            .arg("-f")
            .arg(&pattern)
            .output()
            .await
        {
            // pgrep prints matching pids; empty output means no match
            Ok(output) => !output.stdout.is_empty(),
            Err(e) => {
                warn!("Failed to inspect process table: {}", e);
                false
            }
        }
    }

    /// Starts the serve process detached in its own process group with stdio
    /// disconnected. No handle to the child is retained and readiness is not
    /// confirmed; the caller waits out the settling delay instead.
    pub fn start_server(&self) -> Result<()> {
        let mut command = std::process::Command::new(&self.binary);
        command
            .arg("serve")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        command
            .spawn()
            .map_err(|e| Error::runtime(format!("Failed to start {} serve: {}", self.binary, e)))?;

        Ok(())
    }

    /// Pulls the named model, echoing the runtime's progress output to the
    /// console line by line until the pull process exits.
    pub async fn pull_model(&self, model: &str) -> Result<()> {
        if model.is_empty() {
            return Err(Error::runtime("Model name must not be empty"));
        }

        let mut stdout = std::io::stdout();
        self.pull_model_to(model, &mut stdout).await
    }

    async fn pull_model_to<W: Write>(&self, model: &str, sink: &mut W) -> Result<()> {
        let mut child = tokio::process::Command::new(&self.binary)
            .arg("pull")
            .arg(model)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::runtime(format!("Failed to run {} pull: {}", self.binary, e)))?;

        let pull_output = child
            .stdout
            .take()
            .ok_or_else(|| Error::runtime("Pull process has no stdout handle"))?;

        let mut lines = BufReader::new(pull_output).lines();
        while let Some(line) = lines.next_line().await? {
            writeln!(sink, "{}", line)?;
            sink.flush()?;
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(Error::runtime(format!(
                "'{} pull {}' exited with {}",
                self.binary, model, status
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn runtime_for_binary(binary: impl Into<String>) -> OllamaRuntime {
        OllamaRuntime {
            binary: binary.into(),
            install_command: "exit 0".to_string(),
            settle_delay: Duration::from_secs(0),
        }
    }

    fn write_script(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();

        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();

        path
    }

    #[tokio::test]
    async fn is_installed_true_when_version_query_succeeds() {
        let runtime = runtime_for_binary("true");
        assert!(runtime.is_installed().await);
    }

    #[tokio::test]
    async fn is_installed_false_when_version_query_fails() {
        let runtime = runtime_for_binary("false");
        assert!(!runtime.is_installed().await);
    }

    #[tokio::test]
    async fn is_installed_false_when_binary_is_absent() {
        let runtime = runtime_for_binary("/nonexistent/ollama-relay-test-binary");
        assert!(!runtime.is_installed().await);
    }

    #[tokio::test]
    async fn install_succeeds_on_zero_exit() {
        let mut runtime = runtime_for_binary("true");
        runtime.install_command = "exit 0".to_string();
        assert!(runtime.install().await.is_ok());
    }

    #[tokio::test]
    async fn install_fails_on_non_zero_exit() {
        let mut runtime = runtime_for_binary("true");
        runtime.install_command = "exit 7".to_string();

        let err = runtime.install().await.unwrap_err();
        assert!(matches!(err, Error::Install(_)));
    }

    #[tokio::test]
    async fn probe_failure_is_treated_as_not_running() {
        let runtime = runtime_for_binary("ollama");
        assert!(
            !runtime
                .probe_serve_process("/nonexistent/pgrep-test-binary")
                .await
        );
    }

    #[tokio::test]
    async fn is_serving_false_without_matching_process() {
        let runtime = runtime_for_binary("ollama-relay-test-no-such-process");
        assert!(!runtime.is_serving().await);
    }

    #[tokio::test]
    async fn started_server_is_visible_in_process_table() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "ollama-stub", "#!/bin/sh\nsleep 3\n");

        let runtime = runtime_for_binary(script.to_string_lossy().to_string());
        runtime.start_server().unwrap();

        // The detached child carries "<script> serve" on its command line.
        sleep(Duration::from_millis(200)).await;
        assert!(runtime.is_serving().await);
    }

    #[tokio::test]
    async fn pull_forwards_progress_lines_in_order() {
        let dir = TempDir::new().unwrap();
        let script = write_script(
            &dir,
            "ollama-stub",
            "#!/bin/sh\necho '10%'\necho '50%'\necho '100%'\n",
        );

        let runtime = runtime_for_binary(script.to_string_lossy().to_string());
        let mut sink = Vec::new();
        runtime.pull_model_to("llama3.2", &mut sink).await.unwrap();

        assert_eq!(String::from_utf8(sink).unwrap(), "10%\n50%\n100%\n");
    }

    #[tokio::test]
    async fn pull_surfaces_non_zero_exit_after_forwarding_output() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "ollama-stub", "#!/bin/sh\necho 'pulling'\nexit 3\n");

        let runtime = runtime_for_binary(script.to_string_lossy().to_string());
        let mut sink = Vec::new();
        let err = runtime
            .pull_model_to("llama3.2", &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Runtime(_)));
        assert_eq!(String::from_utf8(sink).unwrap(), "pulling\n");
    }

    #[tokio::test]
    async fn pull_rejects_empty_model_name() {
        let runtime = runtime_for_binary("true");
        assert!(runtime.pull_model("").await.is_err());
    }

    #[tokio::test]
    async fn ensure_ready_stops_at_failed_install() {
        let mut runtime = runtime_for_binary("/nonexistent/ollama-relay-test-binary");
        runtime.install_command = "exit 1".to_string();

        let err = runtime.ensure_ready("llama3.2").await.unwrap_err();
        assert!(matches!(err, Error::Install(_)));
    }
}
