use tracing::{debug, info};

use super::process::host_address;
use super::{MemoryBridge, ProcessHandle};
use crate::error::{Error, Result};

/// Which process the bridge attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessTarget {
    /// First process whose name matches a Dolphin build
    #[default]
    Auto,
    /// A fixed process id
    Pid(u32),
}

/// [`MemoryBridge`] over a running Dolphin emulator.
#[derive(Debug, Default)]
pub struct DolphinBridge {
    target: ProcessTarget,
    process: Option<ProcessHandle>,
    /// Last attach failure, logged only when it changes
    last_failure: Option<String>,
}

impl DolphinBridge {
    pub fn new(target: ProcessTarget) -> Self {
        Self {
            target,
            process: None,
            last_failure: None,
        }
    }

    /// Process id of the current attachment
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().map(|p| p.pid)
    }

    fn process(&self) -> Result<&ProcessHandle> {
        self.process.as_ref().ok_or(Error::AttachLost)
    }
}

impl MemoryBridge for DolphinBridge {
    fn attach(&mut self) -> bool {
        if self.process.is_some() {
            return true;
        }

        let opened = match self.target {
            ProcessTarget::Auto => ProcessHandle::find_and_open(),
            ProcessTarget::Pid(pid) => ProcessHandle::open(pid),
        };

        match opened {
            Ok(process) => {
                info!(
                    "Attached to Dolphin (pid {}, MEM1 at {:#x})",
                    process.pid, process.mem1_base
                );
                self.process = Some(process);
                self.last_failure = None;
                true
            }
            Err(e) => {
                let message = e.to_string();
                if self.last_failure.as_deref() != Some(message.as_str()) {
                    debug!("Attach failed: {}", message);
                    self.last_failure = Some(message);
                }
                false
            }
        }
    }

    fn detach(&mut self) {
        if let Some(process) = self.process.take() {
            debug!("Detached from pid {}", process.pid);
        }
    }

    fn is_attached(&self) -> bool {
        self.process.is_some()
    }

    fn read(&self, address: u32, length: usize) -> Result<Vec<u8>> {
        let process = self.process()?;
        let host = host_address(process, address, length)?;
        let mut buf = vec![0u8; length];
        process.read_bytes(host, &mut buf)?;
        Ok(buf)
    }

    fn write(&mut self, address: u32, bytes: &[u8]) -> Result<()> {
        let process = self.process()?;
        let host = host_address(process, address, bytes.len())?;
        process.write_bytes(host, bytes)
    }
}
