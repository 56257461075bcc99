mod cancellation;
mod core;
mod types;

pub use cancellation::CancellationToken;
pub use self::core::{write_child_config, ChildSupervisor};
pub use types::*;
