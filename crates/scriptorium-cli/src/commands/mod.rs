//! Built-in management commands.
//!
//! Each command implements the
//! [`ManagementCommand`](crate::command::ManagementCommand) trait and exposes
//! its core behavior as a public function so other commands (notably the
//! project's initialization command) can compose the same steps.

pub mod collectstatic;
pub mod compilemessages;
pub mod compress;
pub mod flush;
pub mod loaddata;
pub mod migrate;
pub mod showmigrations;

pub use collectstatic::CollectstaticCommand;
pub use compilemessages::CompilemessagesCommand;
pub use compress::CompressCommand;
pub use flush::FlushCommand;
pub use loaddata::LoaddataCommand;
pub use migrate::MigrateCommand;
pub use showmigrations::ShowmigrationsCommand;

use crate::command::CommandRegistry;

/// Registers all built-in management commands into the given registry.
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(MigrateCommand));
    registry.register(Box::new(FlushCommand));
    registry.register(Box::new(LoaddataCommand));
    registry.register(Box::new(CollectstaticCommand));
    registry.register(Box::new(CompressCommand));
    registry.register(Box::new(CompilemessagesCommand));
    registry.register(Box::new(ShowmigrationsCommand));
}
