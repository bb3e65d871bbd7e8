//! Host Platform Detection
//!
//! Picks which upstream chat executable can run on this machine:
//! 1. macOS: Apple silicon or Intel (`uname -m` catches Rosetta translation)
//! 2. Linux: x86_64 only
//! 3. Windows: x86_64 only
//! Anything else is rejected before touching the network.

use std::process::Command;

use crate::error::BridgeError;

const EXECUTABLE_BASE_URL: &str = "https://github.com/nomic-ai/gpt4all/blob/main/chat";

/// Platform classification for executable selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacArm,
    MacIntel,
    LinuxX86,
    WindowsX64,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::MacArm => "macos-arm64",
            Platform::MacIntel => "macos-x86_64",
            Platform::LinuxX86 => "linux-x86_64",
            Platform::WindowsX64 => "windows-x86_64",
        }
    }

    /// Upstream file name, also used as the cached file name
    pub fn executable_name(&self) -> &'static str {
        match self {
            Platform::MacArm => "gpt4all-lora-quantized-OSX-m1",
            Platform::MacIntel => "gpt4all-lora-quantized-OSX-intel",
            Platform::LinuxX86 => "gpt4all-lora-quantized-linux-x86",
            Platform::WindowsX64 => "gpt4all-lora-quantized-win64.exe",
        }
    }

    pub fn executable_url(&self) -> String {
        format!("{}/{}?raw=true", EXECUTABLE_BASE_URL, self.executable_name())
    }

    /// Classify an OS/arch pair as reported by `std::env::consts`
    pub fn from_parts(os: &str, arch: &str) -> Result<Self, BridgeError> {
        match (os, arch) {
            ("macos", "aarch64") => Ok(Platform::MacArm),
            ("macos", "x86_64") => Ok(Platform::MacIntel),
            ("linux", "x86_64") => Ok(Platform::LinuxX86),
            ("windows", "x86_64") => Ok(Platform::WindowsX64),
            _ => Err(BridgeError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
        }
    }
}

/// Detect the host platform
pub fn detect_platform() -> Result<Platform, BridgeError> {
    let os = std::env::consts::OS;
    let mut arch = std::env::consts::ARCH.to_string();

    // An x86_64 build running under Rosetta still sits on an M1
    if os == "macos" {
        if let Some(machine) = uname_machine() {
            if machine == "arm64" {
                arch = "aarch64".to_string();
            }
        }
    }

    let platform = Platform::from_parts(os, &arch)?;
    tracing::debug!(platform = platform.as_str(), "Detected host platform");
    Ok(platform)
}

fn uname_machine() -> Option<String> {
    let output = Command::new("uname").arg("-m").output().ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let machine = stdout.trim();
    if machine.is_empty() {
        None
    } else {
        Some(machine.to_string())
    }
}
