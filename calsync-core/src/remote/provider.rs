//! Provider subprocess transport.
//!
//! Providers are executables named `calsync-provider-{name}` on PATH. Each
//! call spawns the binary, writes one request line, and reads one response
//! line. Providers manage their own credentials; we only pass the calendar's
//! config parameters through.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command as ProcessCommand, Stdio};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{trace, warn};
use wait_timeout::ChildExt;

use crate::error::{SyncError, SyncResult};
use crate::remote::protocol::{Command, ProviderCommand, Request, Response};

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct Provider {
    name: String,
    binary_path: PathBuf,
    timeout: Duration,
}

impl Provider {
    /// Locate `calsync-provider-{name}` on PATH.
    pub fn from_name(name: &str) -> SyncResult<Self> {
        let binary_name = format!("calsync-provider-{name}");
        let binary_path = which::which(&binary_name)
            .map_err(|_| SyncError::ProviderNotInstalled(binary_name.clone()))?;
        Ok(Self::with_binary(name, binary_path))
    }

    /// Use an explicit executable instead of searching PATH.
    pub fn with_binary(name: &str, binary_path: impl Into<PathBuf>) -> Self {
        Provider {
            name: name.to_string(),
            binary_path: binary_path.into(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call a typed provider command and return the result.
    pub fn call<C: ProviderCommand>(&self, cmd: C) -> SyncResult<C::Response> {
        self.call_raw(C::command(), cmd)
    }

    fn call_raw<P: Serialize, R: DeserializeOwned>(&self, command: Command, params: P) -> SyncResult<R> {
        let params =
            serde_json::to_value(params).map_err(|e| SyncError::Serialization(e.to_string()))?;
        let request_json = serde_json::to_string(&Request { command, params })
            .map_err(|e| SyncError::Serialization(e.to_string()))?;

        trace!(provider = %self.name, ?command, "Calling provider");

        let mut child = ProcessCommand::new(&self.binary_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                SyncError::Provider(format!(
                    "Failed to spawn {}: {}",
                    self.binary_path.display(),
                    e
                ))
            })?;

        let (Some(mut stdin), Some(mut stdout)) = (child.stdin.take(), child.stdout.take()) else {
            kill_and_reap(&mut child);
            return Err(SyncError::Provider("provider stdio unavailable".into()));
        };

        // Both pipe ends are serviced off this thread, so neither a provider
        // that never reads its input nor a large response can block us past
        // the timeout.
        let reader = thread::spawn(move || {
            let mut buf = String::new();
            stdout.read_to_string(&mut buf).map(|_| buf)
        });
        let writer = thread::spawn(move || stdin.write_all(format!("{request_json}\n").as_bytes()));

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                warn!(provider = %self.name, timeout_secs = self.timeout.as_secs(), "Provider timed out, killing process");
                kill_and_reap(&mut child);
                return Err(SyncError::ProviderTimeout(self.timeout.as_secs()));
            }
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(e.into());
            }
        };

        // The child has exited; both threads finish once its pipes close.
        let sent = writer
            .join()
            .map_err(|_| SyncError::Provider("provider input writer panicked".into()))?;
        let output = reader
            .join()
            .map_err(|_| SyncError::Provider("provider output reader panicked".into()))??;

        if !status.success() {
            return Err(SyncError::Provider(format!(
                "Provider exited with status: {}",
                status.code().unwrap_or(-1)
            )));
        }

        if let Err(e) = sent {
            return Err(SyncError::Provider(format!("Provider did not read the request: {e}")));
        }

        let line = output.lines().find(|l| !l.trim().is_empty()).ok_or_else(|| {
            SyncError::Provider("Provider returned no response".into())
        })?;

        let response: Response<R> = serde_json::from_str(line)
            .map_err(|e| SyncError::Provider(format!("Failed to parse response: {}", e)))?;

        match response {
            Response::Success { data } => Ok(data),
            Response::Error { error } => Err(SyncError::Provider(error)),
        }
    }
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
