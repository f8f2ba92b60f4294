pub mod sync;

pub use sync::{init_config, run_sync, DependencyExport};
