mod constraint;
mod desired;
mod error;
mod extra;
mod observed;
mod ports;
mod scope;
mod state_file;
mod version;

pub use constraint::{normalize_constraint_text, Clause, Constraint, Operator};
pub use desired::{validate_tool_name, DesiredSpec};
pub use error::ToolError;
pub use extra::{ExtraRequirement, RawExtra};
pub use observed::{normalize_package_name, ObservedTool};
pub use ports::{
    ActionExecutor, InstallRequest, Observer, UpgradeAllRequest, UpgradeRequest, VersionResolver,
};
pub use scope::Scope;
pub use state_file::{parse_optional_constraint, StateFile, ToolEntry, ToolState};
pub use version::ToolVersion;
