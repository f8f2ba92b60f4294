pub mod finder;
pub mod properties;
pub mod version;

pub use finder::ProjectFiles;
pub use version::{FixedVersion, VersionResolver, WrapperVersionResolver};
