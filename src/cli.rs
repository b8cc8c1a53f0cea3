use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{home_dir, Settings, StorePaths};
use crate::state::{Journal, RecoveryReport, ServerManager};
use crate::store::{EntryStore, ServerDefinition, StoreResult};
use crate::tui::{render, Menu, Painter, THEME};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_REVISION"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser, Debug)]
#[command(
    name = "ccmcp",
    version,
    long_version = LONG_VERSION,
    about = "🔧 Enable and disable Claude Code MCP servers without losing their definitions",
    long_about = None
)]
pub struct Cli {
    /// Claude config file holding `mcpServers` (default: ~/.claude.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub host_config: Option<PathBuf>,

    /// Document holding disabled servers (default: ~/.ccmcp/disabled.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub disabled_store: Option<PathBuf>,

    /// Move journal (default: ~/.ccmcp/journal.jsonl)
    #[arg(long, global = true, value_name = "PATH")]
    pub journal: Option<PathBuf>,

    /// Disable coloured output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List enabled and disabled servers
    List {
        /// Output format (text/json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show one server's definition
    Show {
        name: String,

        /// Output format (text/json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Enable a disabled server, or disable an enabled one
    Toggle { name: String },

    /// Enable a server (no-op if already enabled)
    Enable { name: String },

    /// Disable a server (no-op if already disabled)
    Disable { name: String },

    /// Add a new enabled server
    Add {
        name: String,

        /// Environment variable for the server (repeatable)
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// Transport type, e.g. stdio
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<String>,

        /// Startup timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Tool that never needs approval (repeatable)
        #[arg(long = "always-allow", value_name = "TOOL")]
        always_allow: Vec<String>,

        /// Command and arguments (after --)
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Finish interrupted moves and remove duplicate entries
    Recover,

    /// Interactive menu (default when attached to a terminal)
    Menu,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let settings = Settings::discover()?;
        let paths = self.resolve_paths(&settings)?;
        let painter = Painter::new(self.color_enabled(&settings));
        let manager = Arc::new(ServerManager::new(
            EntryStore::new(&paths.host_config, &paths.disabled_store),
            Journal::new(&paths.journal),
        ));

        let report = blocking(&manager, |m| m.recover()).await?;
        if matches!(self.command, Some(Commands::Recover)) {
            print_recovery(&report, painter, true);
            return Ok(());
        }
        print_recovery(&report, painter, false);

        match &self.command {
            Some(command) => self.execute_command(command, manager, painter, &settings).await,
            None if is_interactive() => self.execute_menu(manager, painter, &settings).await,
            None => print_list(&manager, "text", painter).await,
        }
    }

    async fn execute_command(
        &self,
        command: &Commands,
        manager: Arc<ServerManager>,
        painter: Painter,
        settings: &Settings,
    ) -> Result<()> {
        match command {
            Commands::List { format } => print_list(&manager, format, painter).await,
            Commands::Show { name, format } => {
                let name = name.clone();
                let server = blocking(&manager, move |m| m.get(&name)).await?;
                if format == "json" {
                    println!("{}", serde_json::to_string_pretty(&server)?);
                } else {
                    for line in render::server_detail(&server, painter, &THEME) {
                        println!("{}", line);
                    }
                }
                Ok(())
            }
            Commands::Toggle { name } => {
                let target = name.clone();
                let enabled = blocking(&manager, move |m| m.toggle(&target)).await?;
                print_state(name, enabled, painter);
                Ok(())
            }
            Commands::Enable { name } => {
                let target = name.clone();
                blocking(&manager, move |m| m.enable(&target)).await?;
                print_state(name, true, painter);
                Ok(())
            }
            Commands::Disable { name } => {
                let target = name.clone();
                blocking(&manager, move |m| m.disable(&target)).await?;
                print_state(name, false, painter);
                Ok(())
            }
            Commands::Add {
                name,
                env,
                kind,
                timeout,
                always_allow,
                command,
            } => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(anyhow!("server name must not be empty"));
                }
                let definition = build_definition(command, env, kind, *timeout, always_allow)?;
                let summary = definition.summary();
                let target = name.clone();
                blocking(&manager, move |m| m.add_server(&target, definition)).await?;
                println!(
                    "{} {}",
                    painter.fg(&format!("✓ Server '{}' added:", name), THEME.success),
                    summary
                );
                Ok(())
            }
            Commands::Recover => Ok(()),
            Commands::Menu => self.execute_menu(manager, painter, settings).await,
        }
    }

    async fn execute_menu(
        &self,
        manager: Arc<ServerManager>,
        painter: Painter,
        settings: &Settings,
    ) -> Result<()> {
        if !std::io::stdout().is_terminal() {
            return Err(anyhow!("interactive mode requires a TTY; stdout is not a terminal"));
        }
        let confirm = settings.display.confirm_toggle.unwrap_or(true);
        tokio::task::spawn_blocking(move || {
            Menu::new(&manager, painter, &THEME)
                .confirm_toggle(confirm)
                .run()
        })
        .await??;
        println!("{}", painter.fg("👋 Goodbye!", THEME.success));
        Ok(())
    }

    fn resolve_paths(&self, settings: &Settings) -> Result<StorePaths> {
        let mut paths = settings.store_paths(&home_dir()?);
        if let Some(path) = &self.host_config {
            paths.host_config = path.clone();
        }
        if let Some(path) = &self.disabled_store {
            paths.disabled_store = path.clone();
        }
        if let Some(path) = &self.journal {
            paths.journal = path.clone();
        }
        Ok(paths)
    }

    fn color_enabled(&self, settings: &Settings) -> bool {
        !self.no_color
            && settings.display.color.unwrap_or(true)
            && std::env::var_os("NO_COLOR").is_none()
            && std::io::stdout().is_terminal()
    }
}

/// Runs a store operation on the blocking pool.
async fn blocking<T, F>(manager: &Arc<ServerManager>, op: F) -> Result<T>
where
    F: FnOnce(&ServerManager) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let manager = Arc::clone(manager);
    Ok(tokio::task::spawn_blocking(move || op(manager.as_ref())).await??)
}

async fn print_list(manager: &Arc<ServerManager>, format: &str, painter: Painter) -> Result<()> {
    let servers = blocking(manager, |m| m.list_servers()).await?;
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&servers)?);
        return Ok(());
    }
    for line in render::server_list(&servers, painter, &THEME) {
        println!("{}", line);
    }
    Ok(())
}

fn print_state(name: &str, enabled: bool, painter: Painter) {
    let (word, color) = if enabled {
        ("enabled", THEME.enabled)
    } else {
        ("disabled", THEME.disabled)
    };
    println!("✓ Server '{}' {}", name, painter.fg(word, color));
}

fn print_recovery(report: &RecoveryReport, painter: Painter, explicit: bool) {
    if report.is_empty() {
        if explicit {
            println!("Nothing to recover");
        }
        return;
    }
    for pending in &report.replayed {
        eprintln!(
            "{}",
            painter.fg(
                &format!(
                    "Finished interrupted {} of '{}' (started {})",
                    pending.direction.as_str(),
                    pending.name,
                    pending.at
                ),
                THEME.conflict
            )
        );
    }
    for (pending, reason) in &report.failed {
        eprintln!(
            "{}",
            painter.fg(
                &format!(
                    "Could not finish {} of '{}': {}",
                    pending.direction.as_str(),
                    pending.name,
                    reason
                ),
                THEME.error
            )
        );
    }
    for name in &report.reconciled {
        eprintln!(
            "{}",
            painter.fg(
                &format!("Removed disabled duplicate of enabled server '{}'", name),
                THEME.conflict
            )
        );
    }
}

fn is_interactive() -> bool {
    std::env::var("CI").map(|v| v != "true").unwrap_or(true) && std::io::stdout().is_terminal()
}

fn build_definition(
    command: &[String],
    env: &[String],
    kind: &Option<String>,
    timeout: Option<u64>,
    always_allow: &[String],
) -> Result<ServerDefinition> {
    let mut iter = command.iter();
    let program = iter
        .next()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| anyhow!("add requires a command after --"))?;
    let mut definition = ServerDefinition::new(program.clone(), iter.cloned().collect());

    if !env.is_empty() {
        let mut vars = IndexMap::new();
        for pair in env {
            let (key, value) = pair
                .split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| anyhow!("invalid --env '{}', expected KEY=VALUE", pair))?;
            vars.insert(key.to_string(), value.to_string());
        }
        definition = definition.with_env(vars);
    }
    if let Some(kind) = kind {
        definition = definition.with_kind(kind.clone());
    }
    if let Some(timeout) = timeout {
        definition = definition.with_timeout(timeout);
    }
    if !always_allow.is_empty() {
        let mut tools: Vec<String> = Vec::new();
        for tool in always_allow {
            if !tools.contains(tool) {
                tools.push(tool.clone());
            }
        }
        definition = definition.with_always_allow(tools);
    }
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_add_with_trailing_command() {
        let cli = Cli::try_parse_from([
            "ccmcp", "add", "fs", "--env", "ROOT=/tmp", "--type", "stdio", "--", "npx", "-y",
            "@mcp/fs",
        ])
        .expect("parse");
        let Some(Commands::Add {
            name,
            env,
            kind,
            command,
            ..
        }) = cli.command
        else {
            panic!("expected add");
        };
        assert_eq!(name, "fs");
        assert_eq!(env, strings(&["ROOT=/tmp"]));
        assert_eq!(kind.as_deref(), Some("stdio"));
        assert_eq!(command, strings(&["npx", "-y", "@mcp/fs"]));
    }

    #[test]
    fn global_path_flags_apply_after_subcommand() {
        let cli = Cli::try_parse_from(["ccmcp", "toggle", "a", "--host-config", "/tmp/c.json"])
            .expect("parse");
        assert_eq!(cli.host_config, Some(PathBuf::from("/tmp/c.json")));
        assert!(matches!(cli.command, Some(Commands::Toggle { ref name }) if name == "a"));
    }

    #[test]
    fn add_requires_a_command() {
        assert!(Cli::try_parse_from(["ccmcp", "add", "fs"]).is_err());
    }

    #[test]
    fn build_definition_collects_options() {
        let def = build_definition(
            &strings(&["node", "server.js"]),
            &strings(&["A=1", "B=x=y"]),
            &Some("stdio".to_string()),
            Some(30),
            &strings(&["read", "read", "write"]),
        )
        .expect("definition");
        assert_eq!(def.command(), Some("node"));
        assert_eq!(def.args(), strings(&["server.js"]));
        let value = def.as_value();
        assert_eq!(value["env"]["A"], "1");
        assert_eq!(value["env"]["B"], "x=y");
        assert_eq!(value["type"], "stdio");
        assert_eq!(value["timeout"], 30);
        assert_eq!(def.always_allow(), strings(&["read", "write"]));
    }

    #[test]
    fn build_definition_rejects_bad_env() {
        let err = build_definition(&strings(&["node"]), &strings(&["=1"]), &None, None, &[])
            .expect_err("bad env");
        assert!(err.to_string().contains("KEY=VALUE"));
        assert!(build_definition(&strings(&["node"]), &strings(&["NOEQ"]), &None, None, &[])
            .is_err());
    }

    #[test]
    fn build_definition_omits_unset_options() {
        let def = build_definition(&strings(&["uvx", "srv"]), &[], &None, None, &[])
            .expect("definition");
        let keys: Vec<&String> = def.as_value().as_object().expect("object").keys().collect();
        assert_eq!(keys, ["command", "args"]);
    }
}
