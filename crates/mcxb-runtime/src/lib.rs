#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod extract;
pub mod fetcher;
pub mod platform;
pub mod process;
pub mod provisioner;
pub mod strategies;

pub use extract::{ensure_executable, extract_archive, resolve_executable, ArchiveKind};
pub use fetcher::{partial_path, ArtifactFetcher};
pub use platform::{Platform, DEFAULT_JAVA_VERSION};
pub use process::{spawn_child, ChildSpec, ForwardSignal, RunningChild};
pub use provisioner::{ProvisionStrategy, RuntimeProbe, RuntimeProvisioner};
pub use strategies::{default_package_commands, BundleStrategy, PackageManagerStrategy};
