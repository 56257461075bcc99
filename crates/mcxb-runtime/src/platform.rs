use crate::extract::ArchiveKind;
use mcxb_types::StrategyError;
use std::path::PathBuf;

const ADOPTIUM_BINARY_BASE: &str = "https://api.adoptium.net/v3/binary/latest";

pub const DEFAULT_JAVA_VERSION: u32 = 17;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    LinuxAmd64,
    LinuxArm64,
    MacosAmd64,
    MacosArm64,
    WindowsAmd64,
}

impl Platform {
    pub fn detect() -> Result<Self, StrategyError> {
        #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
        return Ok(Platform::LinuxAmd64);

        #[cfg(all(target_os = "linux", target_arch = "aarch64"))]
        return Ok(Platform::LinuxArm64);

        #[cfg(all(target_os = "macos", target_arch = "x86_64"))]
        return Ok(Platform::MacosAmd64);

        #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
        return Ok(Platform::MacosArm64);

        #[cfg(all(target_os = "windows", target_arch = "x86_64"))]
        return Ok(Platform::WindowsAmd64);

        #[cfg(not(any(
            all(target_os = "linux", target_arch = "x86_64"),
            all(target_os = "linux", target_arch = "aarch64"),
            all(target_os = "macos", target_arch = "x86_64"),
            all(target_os = "macos", target_arch = "aarch64"),
            all(target_os = "windows", target_arch = "x86_64"),
        )))]
        Err(StrategyError::Failed("Unsupported platform for runtime bundle".into()))
    }

    pub fn adoptium_os(&self) -> &'static str {
        match self {
            Platform::LinuxAmd64 | Platform::LinuxArm64 => "linux",
            Platform::MacosAmd64 | Platform::MacosArm64 => "mac",
            Platform::WindowsAmd64 => "windows",
        }
    }

    pub fn adoptium_arch(&self) -> &'static str {
        match self {
            Platform::LinuxAmd64 | Platform::MacosAmd64 | Platform::WindowsAmd64 => "x64",
            Platform::LinuxArm64 | Platform::MacosArm64 => "aarch64",
        }
    }

    pub fn archive_kind(&self) -> ArchiveKind {
        match self {
            Platform::WindowsAmd64 => ArchiveKind::Zip,
            _ => ArchiveKind::TarGz,
        }
    }

    pub fn java_binary_name(&self) -> &'static str {
        match self {
            Platform::WindowsAmd64 => "java.exe",
            _ => "java",
        }
    }

    /// Location of the executable inside an extracted bundle root. macOS
    /// bundles nest the JRE under `Contents/Home`.
    pub fn java_relative_paths(&self) -> Vec<PathBuf> {
        let bin = PathBuf::from("bin").join(self.java_binary_name());
        match self {
            Platform::MacosAmd64 | Platform::MacosArm64 => {
                vec![bin.clone(), PathBuf::from("Contents/Home").join(bin)]
            }
            _ => vec![bin],
        }
    }

    pub fn bundle_url(&self, java_version: u32) -> String {
        format!(
            "{}/{}/ga/{}/{}/jre/hotspot/normal/eclipse",
            ADOPTIUM_BINARY_BASE,
            java_version,
            self.adoptium_os(),
            self.adoptium_arch()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_detection() {
        let platform = Platform::detect();
        assert!(platform.is_ok());
    }

    #[test]
    fn test_bundle_url() {
        let url = Platform::LinuxAmd64.bundle_url(17);
        assert_eq!(
            url,
            "https://api.adoptium.net/v3/binary/latest/17/ga/linux/x64/jre/hotspot/normal/eclipse"
        );
        assert!(Platform::MacosArm64.bundle_url(21).contains("/21/ga/mac/aarch64/"));
    }

    #[test]
    fn test_binary_layout() {
        assert_eq!(Platform::LinuxAmd64.java_binary_name(), "java");
        assert_eq!(Platform::WindowsAmd64.java_binary_name(), "java.exe");
        assert_eq!(Platform::WindowsAmd64.archive_kind(), ArchiveKind::Zip);
        assert_eq!(Platform::LinuxArm64.archive_kind(), ArchiveKind::TarGz);
        assert_eq!(Platform::MacosAmd64.java_relative_paths().len(), 2);
    }
}
