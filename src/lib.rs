//! gh-monitor - GitHub project monitoring and local repository mirroring
//!
//! Two independent modes share one remote inventory:
//!
//! - **Monitoring**: collect per-repository metrics (last commit, open pull
//!   requests, branches without pull requests, pages, CI health) and render
//!   them as TOON, Markdown, HTML and a plain name list.
//! - **Syncing**: mirror every recently pushed repository into a local
//!   directory, cloning what is missing and fast-forwarding clean checkouts
//!   that are behind, without ever touching local changes.
//!
//! ## Modules
//!
//! - [`discovery`]: remote inventory port, recency and exclusion filters
//! - [`github`]: `gh` CLI client implementing the inventory and metadata ports
//! - [`git`]: local git port and checkout prober
//! - [`sync`]: sync decision engine and report
//! - [`monitor`]: metric collection for monitoring mode
//! - [`render`]: report renderers
//! - [`publish`]: pages branch publishing
//! - [`config`]: YAML configuration

pub mod config;
pub mod discovery;
pub mod error;
pub mod git;
pub mod github;
pub mod health;
pub mod models;
pub mod monitor;
pub mod progress;
pub mod publish;
pub mod render;
pub mod sync;

pub use config::Config;
pub use discovery::{ExcludeFilter, Inventory, RemoteRepoRef};
pub use error::{PublishError, QueryError, RenderError, SyncError, SyncToolError};
pub use git::{GitCli, GitOps, LocalRepoState, Prober};
pub use github::{GhCli, RepositoryMetadata};
pub use health::Diagnostics;
pub use models::{CiStatus, MonitorReport, MonitoredRepository};
pub use monitor::ProjectMonitor;
pub use progress::{CancelFlag, ProgressFn};
pub use publish::PagesPublisher;
pub use render::OutputFormat;
pub use sync::{GitSyncer, SyncOptions, SyncOutcome, SyncReport, SyncResult};
