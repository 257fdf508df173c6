//! Project management commands.
//!
//! Commands specific to the scriptorium project, registered alongside the
//! built-ins from `scriptorium-cli`.

pub mod init;
pub mod transpile;

pub use init::InitCommand;
pub use transpile::TranspileCommand;

use scriptorium_cli::command::CommandRegistry;

/// Registers the project commands into the given registry.
pub fn register_project_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(InitCommand));
    registry.register(Box::new(TranspileCommand));
}
