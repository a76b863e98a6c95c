//! Dolphin process lookup and raw host memory access.
//!
//! Windows uses the Win32 process APIs; Linux goes through `/proc`. Other
//! platforms compile but never find a process.

use tracing::debug;

use super::layout::mem1;
use crate::error::{Error, Result};

/// Executable names Dolphin ships under, compared case-insensitively.
///
/// Linux truncates `comm` to 15 bytes, so matching is by prefix.
pub const DOLPHIN_PROCESS_NAMES: [&str; 5] = [
    "dolphin.exe",
    "dolphinqt2.exe",
    "dolphin-emu",
    "dolphin-emu-qt2",
    "dolphin-emu-nogui",
];

const LINUX_COMM_LEN: usize = 15;

/// Whether a process name looks like a Dolphin build.
pub fn is_dolphin_process_name(name: &str) -> bool {
    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() {
        return false;
    }
    DOLPHIN_PROCESS_NAMES.iter().any(|candidate| {
        name == *candidate || (name.len() == LINUX_COMM_LEN && candidate.starts_with(&name))
    })
}

/// Find the MEM1 view in the text of `/proc/<pid>/maps`.
///
/// Dolphin backs emulated RAM with a shared-memory file; MEM1 is the mapping
/// of that file at offset 0 with the full 32 MiB view size.
pub fn find_mem1_in_maps(maps: &str) -> Option<u64> {
    for line in maps.lines() {
        let mut fields = line.split_whitespace();
        let (Some(range), Some(_perms), Some(offset), Some(_dev), Some(_inode)) = (
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
        ) else {
            continue;
        };
        let path = fields.next().unwrap_or("");
        if !(path.starts_with("/dev/shm/dolphinmem") || path.starts_with("/dev/shm/dolphin-emu"))
        {
            continue;
        }
        if u64::from_str_radix(offset, 16).ok() != Some(0) {
            continue;
        }
        let Some((start, end)) = range.split_once('-') else {
            continue;
        };
        let (Ok(start), Ok(end)) = (u64::from_str_radix(start, 16), u64::from_str_radix(end, 16))
        else {
            continue;
        };
        if end.saturating_sub(start) == mem1::HOST_VIEW_SIZE as u64 {
            return Some(start);
        }
    }
    None
}

/// An open Dolphin process with its MEM1 view located.
pub struct ProcessHandle {
    pub pid: u32,
    /// Host address of emulated physical address 0
    pub mem1_base: u64,
    inner: platform::Handle,
}

impl ProcessHandle {
    /// Find the first running Dolphin process and open it.
    pub fn find_and_open() -> Result<Self> {
        let pid = platform::find_dolphin_pid()?;
        Self::open(pid)
    }

    /// Open a specific process id.
    pub fn open(pid: u32) -> Result<Self> {
        let inner = platform::Handle::open(pid)?;
        let mem1_base = inner.find_mem1()?;
        debug!("Opened pid {} (MEM1 view at {:#x})", pid, mem1_base);
        Ok(Self {
            pid,
            mem1_base,
            inner,
        })
    }

    /// Fill `buf` from the host address `address`.
    pub fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        self.inner.read(address, buf)
    }

    /// Write `data` at the host address `address`.
    pub fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        self.inner.write(address, data)
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("mem1_base", &format_args!("{:#x}", self.mem1_base))
            .finish()
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use std::fs::{self, File, OpenOptions};
    use std::os::unix::fs::FileExt;

    use super::{find_mem1_in_maps, is_dolphin_process_name};
    use crate::error::{Error, Result};

    pub struct Handle {
        pid: u32,
        mem: File,
    }

    pub fn find_dolphin_pid() -> Result<u32> {
        for entry in fs::read_dir("/proc")?.flatten() {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u32>().ok())
            else {
                continue;
            };
            let Ok(comm) = fs::read_to_string(format!("/proc/{}/comm", pid)) else {
                continue;
            };
            if is_dolphin_process_name(&comm) {
                return Ok(pid);
            }
        }
        Err(Error::ProcessNotFound("Dolphin".to_string()))
    }

    impl Handle {
        pub fn open(pid: u32) -> Result<Self> {
            let mem = OpenOptions::new()
                .read(true)
                .write(true)
                .open(format!("/proc/{}/mem", pid))
                .map_err(|e| Error::ProcessOpenFailed(format!("pid {}: {}", pid, e)))?;
            Ok(Self { pid, mem })
        }

        pub fn find_mem1(&self) -> Result<u64> {
            let maps = fs::read_to_string(format!("/proc/{}/maps", self.pid))
                .map_err(|e| Error::ProcessOpenFailed(format!("pid {}: {}", self.pid, e)))?;
            find_mem1_in_maps(&maps).ok_or_else(|| {
                Error::ProcessOpenFailed(format!(
                    "pid {}: emulated memory not mapped (is a game running?)",
                    self.pid
                ))
            })
        }

        pub fn read(&self, address: u64, buf: &mut [u8]) -> Result<()> {
            self.mem
                .read_exact_at(buf, address)
                .map_err(|_| Error::AttachLost)
        }

        pub fn write(&self, address: u64, data: &[u8]) -> Result<()> {
            self.mem
                .write_all_at(data, address)
                .map_err(|_| Error::AttachLost)
        }
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use std::ffi::c_void;
    use std::mem::size_of;

    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
    use windows::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
        TH32CS_SNAPPROCESS,
    };
    use windows::Win32::System::Memory::{MEM_MAPPED, MEMORY_BASIC_INFORMATION, VirtualQueryEx};
    use windows::Win32::System::ProcessStatus::{
        PSAPI_WORKING_SET_EX_INFORMATION, QueryWorkingSetEx,
    };
    use windows::Win32::System::Threading::{
        OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION, PROCESS_VM_READ,
        PROCESS_VM_WRITE,
    };

    use super::is_dolphin_process_name;
    use crate::error::{Error, Result};
    use crate::memory::layout::mem1;

    pub struct Handle(HANDLE);

    // SAFETY: a process handle is a kernel object reference usable from any thread.
    unsafe impl Send for Handle {}

    impl Drop for Handle {
        fn drop(&mut self) {
            // SAFETY: the handle was returned by OpenProcess and is closed once.
            unsafe {
                let _ = CloseHandle(self.0);
            }
        }
    }

    pub fn find_dolphin_pid() -> Result<u32> {
        // SAFETY: snapshot creation has no preconditions.
        let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
            .map_err(|e| Error::ProcessNotFound(format!("process snapshot failed: {e}")))?;

        let mut entry = PROCESSENTRY32W {
            dwSize: size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };

        let mut found = None;
        // SAFETY: entry.dwSize is initialized as the API requires.
        let mut ok = unsafe { Process32FirstW(snapshot, &mut entry) }.is_ok();
        while ok {
            let len = entry
                .szExeFile
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(entry.szExeFile.len());
            let name = String::from_utf16_lossy(&entry.szExeFile[..len]);
            if is_dolphin_process_name(&name) {
                found = Some(entry.th32ProcessID);
                break;
            }
            // SAFETY: same snapshot and entry as above.
            ok = unsafe { Process32NextW(snapshot, &mut entry) }.is_ok();
        }

        // SAFETY: the snapshot handle is owned here and closed once.
        unsafe {
            let _ = CloseHandle(snapshot);
        }

        found.ok_or_else(|| Error::ProcessNotFound("Dolphin".to_string()))
    }

    impl Handle {
        pub fn open(pid: u32) -> Result<Self> {
            let access = PROCESS_QUERY_INFORMATION
                | PROCESS_VM_OPERATION
                | PROCESS_VM_READ
                | PROCESS_VM_WRITE;
            // SAFETY: OpenProcess only reads its arguments.
            let handle = unsafe { OpenProcess(access, false, pid) }
                .map_err(|e| Error::ProcessOpenFailed(format!("pid {pid}: {e}")))?;
            Ok(Self(handle))
        }

        /// Walk the address space for the 32 MiB mapped view backed by
        /// physical memory.
        ///
        /// Several mapped views can share that size; only the emulated RAM one
        /// has a valid working-set entry.
        pub fn find_mem1(&self) -> Result<u64> {
            let mut address: usize = 0;
            let mut info = MEMORY_BASIC_INFORMATION::default();
            loop {
                // SAFETY: `info` is a valid out-buffer of the size passed.
                let written = unsafe {
                    VirtualQueryEx(
                        self.0,
                        Some(address as *const c_void),
                        &mut info,
                        size_of::<MEMORY_BASIC_INFORMATION>(),
                    )
                };
                if written == 0 {
                    break;
                }

                if info.RegionSize == mem1::HOST_VIEW_SIZE && info.Type == MEM_MAPPED {
                    let mut ws = PSAPI_WORKING_SET_EX_INFORMATION {
                        VirtualAddress: info.BaseAddress,
                        ..Default::default()
                    };
                    // SAFETY: `ws` is a single valid entry of the size passed.
                    let queried = unsafe {
                        QueryWorkingSetEx(
                            self.0,
                            &mut ws as *mut _ as *mut c_void,
                            size_of::<PSAPI_WORKING_SET_EX_INFORMATION>() as u32,
                        )
                    };
                    // SAFETY: the union is fully initialized by QueryWorkingSetEx.
                    let valid = queried.is_ok() && unsafe { ws.VirtualAttributes.Flags } & 1 == 1;
                    if valid {
                        return Ok(info.BaseAddress as u64);
                    }
                }

                address = info.BaseAddress as usize + info.RegionSize;
            }

            Err(Error::ProcessOpenFailed(
                "emulated memory not mapped (is a game running?)".to_string(),
            ))
        }

        pub fn read(&self, address: u64, buf: &mut [u8]) -> Result<()> {
            let mut read = 0usize;
            // SAFETY: `buf` is a valid writable buffer of `buf.len()` bytes.
            unsafe {
                ReadProcessMemory(
                    self.0,
                    address as *const c_void,
                    buf.as_mut_ptr().cast(),
                    buf.len(),
                    Some(&mut read as *mut usize),
                )
            }
            .map_err(|_| Error::AttachLost)?;
            if read != buf.len() {
                return Err(Error::AttachLost);
            }
            Ok(())
        }

        pub fn write(&self, address: u64, data: &[u8]) -> Result<()> {
            let mut written = 0usize;
            // SAFETY: `data` is a valid readable buffer of `data.len()` bytes.
            unsafe {
                WriteProcessMemory(
                    self.0,
                    address as *const c_void,
                    data.as_ptr().cast(),
                    data.len(),
                    Some(&mut written as *mut usize),
                )
            }
            .map_err(|_| Error::AttachLost)?;
            if written != data.len() {
                return Err(Error::AttachLost);
            }
            Ok(())
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
mod platform {
    use crate::error::{Error, Result};

    pub struct Handle;

    pub fn find_dolphin_pid() -> Result<u32> {
        Err(Error::ProcessNotFound(
            "process memory access is only supported on Windows and Linux".to_string(),
        ))
    }

    impl Handle {
        pub fn open(pid: u32) -> Result<Self> {
            Err(Error::ProcessOpenFailed(format!(
                "pid {pid}: unsupported platform"
            )))
        }

        pub fn find_mem1(&self) -> Result<u64> {
            Err(Error::AttachLost)
        }

        pub fn read(&self, _address: u64, _buf: &mut [u8]) -> Result<()> {
            Err(Error::AttachLost)
        }

        pub fn write(&self, _address: u64, _data: &[u8]) -> Result<()> {
            Err(Error::AttachLost)
        }
    }
}

/// Map an emulated address range to its host address for `process`.
pub(crate) fn host_address(process: &ProcessHandle, address: u32, length: usize) -> Result<u64> {
    if !super::layout::in_mem1(address, length) {
        return Err(Error::InvalidAddress { address, length });
    }
    Ok(process.mem1_base + super::layout::physical_offset(address) as u64)
}
