//! Management command framework.
//!
//! A [`ManagementCommand`] is one administrative action (migrate the
//! database, load a fixture, collect static files). The [`CommandRegistry`]
//! owns all registered commands, renders them as clap subcommands and
//! dispatches an invocation to the right handler.
//!
//! ## Defining a Custom Command
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use scriptorium_cli::command::ManagementCommand;
//! use scriptorium_core::{ScriptoriumError, Settings};
//!
//! struct GreetCommand;
//!
//! #[async_trait]
//! impl ManagementCommand for GreetCommand {
//!     fn name(&self) -> &str { "greet" }
//!     fn help(&self) -> &str { "Say hello" }
//!
//!     async fn handle(
//!         &self,
//!         _matches: &clap::ArgMatches,
//!         _settings: &Settings,
//!     ) -> Result<(), ScriptoriumError> {
//!         println!("Hello from scriptorium!");
//!         Ok(())
//!     }
//! }
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use scriptorium_core::{ScriptoriumError, Settings};

/// An administrative action invocable through the CLI.
///
/// Implementations provide a name, a one-line help text, optionally their
/// own arguments, and the async handler. `Send + Sync` is required so a
/// registry can be shared across tasks.
#[async_trait]
pub trait ManagementCommand: Send + Sync {
    /// The subcommand name.
    fn name(&self) -> &str;

    /// A one-line description shown in `--help`.
    fn help(&self) -> &str;

    /// Contributes command-specific arguments.
    ///
    /// The default implementation adds none.
    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    /// Runs the command.
    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), ScriptoriumError>;
}

/// The set of registered management commands.
///
/// Commands are kept in name order, so help output and dispatch are
/// deterministic.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Box<dyn ManagementCommand>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command, replacing any previous command of the same name.
    pub fn register(&mut self, command: Box<dyn ManagementCommand>) {
        self.commands.insert(command.name().to_string(), command);
    }

    /// Looks up a command by name.
    pub fn get(&self, name: &str) -> Option<&dyn ManagementCommand> {
        self.commands.get(name).map(AsRef::as_ref)
    }

    /// Returns all command names, sorted.
    pub fn list_commands(&self) -> Vec<&str> {
        self.commands.keys().map(String::as_str).collect()
    }

    /// Returns the number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Renders the registry as the top-level clap command.
    ///
    /// Every registered command becomes a subcommand; the `--settings`
    /// option is global so it can appear before or after the subcommand.
    pub fn build_cli(&self) -> clap::Command {
        let mut app = clap::Command::new("scriptorium")
            .about("scriptorium management utility")
            .arg(
                clap::Arg::new("settings")
                    .long("settings")
                    .global(true)
                    .default_value("settings.toml")
                    .help("Path to the settings file"),
            )
            .subcommand_required(true);

        for (name, command) in &self.commands {
            // clap wants &'static str names; commands are registered once at
            // startup, so leaking them is bounded.
            let static_name: &'static str = Box::leak(name.clone().into_boxed_str());
            let subcommand =
                clap::Command::new(static_name).about(command.help().to_string());
            app = app.subcommand(command.add_arguments(subcommand));
        }

        app
    }

    /// Dispatches parsed argument matches to the matching command.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no or an unknown subcommand was
    /// given, and whatever the command's handler returns otherwise.
    pub async fn execute(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), ScriptoriumError> {
        let (name, sub_matches) = matches.subcommand().ok_or_else(|| {
            ScriptoriumError::ConfigurationError("No subcommand specified".to_string())
        })?;
        let command = self.get(name).ok_or_else(|| {
            ScriptoriumError::ConfigurationError(format!("Unknown command: {name}"))
        })?;

        let span = scriptorium_core::logging::command_span(name);
        let _guard = span.enter();
        command.handle(sub_matches, settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopCommand {
        cmd_name: String,
    }

    impl NoopCommand {
        fn new(name: &str) -> Self {
            Self {
                cmd_name: name.to_string(),
            }
        }
    }

    #[async_trait]
    impl ManagementCommand for NoopCommand {
        fn name(&self) -> &str {
            &self.cmd_name
        }

        fn help(&self) -> &'static str {
            "Do nothing"
        }

        fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
            cmd.arg(
                clap::Arg::new("dry-run")
                    .long("dry-run")
                    .action(clap::ArgAction::SetTrue),
            )
        }

        async fn handle(
            &self,
            _matches: &clap::ArgMatches,
            _settings: &Settings,
        ) -> Result<(), ScriptoriumError> {
            Ok(())
        }
    }

    struct BrokenCommand;

    #[async_trait]
    impl ManagementCommand for BrokenCommand {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn help(&self) -> &'static str {
            "Always fails"
        }

        async fn handle(
            &self,
            _matches: &clap::ArgMatches,
            _settings: &Settings,
        ) -> Result<(), ScriptoriumError> {
            Err(ScriptoriumError::CommandError("broken on purpose".to_string()))
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = CommandRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("migrate").is_none());
    }

    #[test]
    fn test_register_get_and_order() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(NoopCommand::new("transpile")));
        registry.register(Box::new(NoopCommand::new("init")));
        registry.register(Box::new(NoopCommand::new("migrate")));

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.list_commands(), vec!["init", "migrate", "transpile"]);
        assert_eq!(registry.get("init").unwrap().help(), "Do nothing");
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(NoopCommand::new("init")));
        registry.register(Box::new(NoopCommand::new("init")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_build_cli_parses_command_arguments() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(NoopCommand::new("sync")));

        let matches = registry
            .build_cli()
            .try_get_matches_from(["scriptorium", "sync", "--dry-run"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "sync");
        assert!(sub.get_flag("dry-run"));
    }

    #[test]
    fn test_settings_arg_is_global() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(NoopCommand::new("sync")));

        let matches = registry
            .build_cli()
            .try_get_matches_from(["scriptorium", "sync", "--settings", "prod.toml"])
            .unwrap();
        assert_eq!(
            matches.get_one::<String>("settings").map(String::as_str),
            Some("prod.toml")
        );
    }

    #[tokio::test]
    async fn test_execute_dispatches() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(NoopCommand::new("sync")));
        registry.register(Box::new(BrokenCommand));

        let settings = Settings::default();

        let matches = registry
            .build_cli()
            .try_get_matches_from(["scriptorium", "sync"])
            .unwrap();
        assert!(registry.execute(&matches, &settings).await.is_ok());

        let matches = registry
            .build_cli()
            .try_get_matches_from(["scriptorium", "broken"])
            .unwrap();
        let result = registry.execute(&matches, &settings).await;
        assert!(matches!(result, Err(ScriptoriumError::CommandError(_))));
    }
}
