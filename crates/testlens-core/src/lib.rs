pub mod cancel;
pub mod config;
pub mod discovery;
pub mod index;
pub mod model;
pub mod reporter;
pub mod service;

pub use cancel::CancellationToken;
pub use config::{Config, ConfigError, DiscoveryConfig, WorkspaceConfig};
pub use discovery::{DiscoveryError, TestDefinition, TestFramework, TestSearcher};
pub use index::{IndexError, SearchStatus, WorkspaceIndex};
pub use model::{TestKind, TestLevel, TestNode, TestTree};
pub use reporter::{ResultAnalyzer, TestReporter};
pub use service::{ServiceError, TestService};
