//! CLI route: single route table and run context. Dispatches to the store facade and presentation.

use crate::api::Niwa;
use crate::cli::help::{command_name, is_read_only};
use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::*;
use crate::config::{write_default_config, ConfigLoader, NiwaConfig};
use crate::error::{NiwaError, StorageError};
use crate::occ::EditStrategy;
use crate::resolution::Resolution;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, info_span};

/// Runtime context for CLI execution: workspace, loaded config and the opened store.
pub struct RunContext {
    niwa: Niwa,
    config: NiwaConfig,
    workspace_root: PathBuf,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, NiwaError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Self::with_config(workspace_root, config)
    }

    pub fn with_config(workspace_root: PathBuf, config: NiwaConfig) -> Result<Self, NiwaError> {
        let niwa = Niwa::open(&workspace_root, &config)?;
        Ok(Self {
            niwa,
            config,
            workspace_root,
        })
    }

    pub fn niwa(&self) -> &Niwa {
        &self.niwa
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, NiwaError> {
        let name = command_name(command);
        let span = info_span!("command", name, read_only = is_read_only(command));
        let _entered = span.enter();

        let started = Instant::now();
        let result = self.execute_inner(command);
        info!(
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, NiwaError> {
        match command {
            Commands::Init => {
                let mut out = if self.niwa.init()? {
                    "Initialized empty document.".to_string()
                } else {
                    "A document already exists.".to_string()
                };
                if let Some(path) = write_default_config(&self.workspace_root)? {
                    out.push_str(&format!("\nWrote default config to {}", path.display()));
                }
                Ok(out)
            }
            Commands::Load { file, replace } => {
                let markdown = read_file(file)?;
                let report = self.niwa.load(&markdown, *replace)?;
                Ok(format_load_report(&report))
            }
            Commands::Add {
                parent,
                title,
                agent,
                content,
                file,
            } => {
                let body = match (content, file) {
                    (Some(text), _) => text.clone(),
                    (None, Some(path)) => read_file(path)?,
                    (None, None) => String::new(),
                };
                let node = self.niwa.add_node(parent, title, &body, agent)?;
                Ok(format!("Added [{}] {} under {}", node.id, node.title, parent))
            }
            Commands::Tree { format } => {
                let tree = self.niwa.tree()?;
                Ok(match format {
                    OutputFormat::Text => format_outline_text(&tree),
                    OutputFormat::Json => format_outline_json(&tree),
                })
            }
            Commands::Peek { node_id, format } => {
                let node = self.niwa.node(node_id)?;
                Ok(render(*format, || format_node_text(&node), || format_node_json(&node)))
            }
            Commands::Read {
                node_id,
                agent,
                format,
            } => {
                let node = self.niwa.read_node(node_id, agent)?;
                Ok(render(*format, || format_node_text(&node), || format_node_json(&node)))
            }
            Commands::Edit {
                node_id,
                agent,
                content,
                file,
                message,
                strategy,
                dry_run,
                format,
            } => {
                let strategy: EditStrategy = strategy.parse()?;
                let new_content = read_content(content, file)?;
                if *dry_run {
                    let report = self.niwa.dry_run_edit(node_id, agent, &new_content)?;
                    return Ok(render(
                        *format,
                        || format_dry_run_text(node_id, &report),
                        || format_dry_run_json(node_id, &report),
                    ));
                }
                let outcome = self
                    .niwa
                    .edit_with_strategy(node_id, agent, &new_content, message, strategy)?;
                Ok(render(
                    *format,
                    || format_edit_outcome_text(node_id, &outcome),
                    || format_edit_outcome_json(node_id, &outcome),
                ))
            }
            Commands::Resolve {
                node_id,
                resolution,
                agent,
                content,
                file,
                format,
            } => {
                let resolution: Resolution = resolution.parse()?;
                let manual = if resolution == Resolution::ManualMerge {
                    Some(read_content(content, file)?)
                } else {
                    None
                };
                let outcome =
                    self.niwa
                        .resolve(node_id, agent, resolution, manual.as_deref())?;
                Ok(render(
                    *format,
                    || format_edit_outcome_text(node_id, &outcome),
                    || format_edit_outcome_json(node_id, &outcome),
                ))
            }
            Commands::Title {
                node_id,
                title,
                agent,
            } => {
                let node = self.niwa.set_title(node_id, title, agent)?;
                Ok(format!("Renamed [{}] to '{}'", node.id, node.title))
            }
            Commands::Summarize {
                node_id,
                summary,
                agent,
                clear,
            } => {
                let summary = if *clear {
                    None
                } else {
                    let text = summary.clone().ok_or_else(|| {
                        NiwaError::InvalidInput("give a summary or pass --clear".to_string())
                    })?;
                    Some(text)
                };
                let node = self.niwa.set_summary(node_id, summary.as_deref(), agent)?;
                Ok(match node.summary {
                    Some(_) => format!("Summary set for [{}]", node.id),
                    None => format!("Summary cleared for [{}]", node.id),
                })
            }
            Commands::Export { output } => {
                let markdown = self.niwa.export()?;
                match output {
                    Some(path) => {
                        std::fs::write(path, &markdown).map_err(StorageError::IoError)?;
                        Ok(format!(
                            "Exported {} bytes to {}",
                            markdown.len(),
                            path.display()
                        ))
                    }
                    None => Ok(markdown),
                }
            }
            Commands::Status { agent, format } => {
                let status = self.niwa.agent_status(agent)?;
                Ok(render(
                    *format,
                    || format_agent_status_text(&status),
                    || format_agent_status_json(&status),
                ))
            }
            Commands::Conflicts { agent, format } => {
                let conflicts = self.niwa.open_conflicts(agent.as_deref())?;
                Ok(render(
                    *format,
                    || format_conflicts_text(&conflicts),
                    || format_conflicts_json(&conflicts),
                ))
            }
            Commands::Agents { format } => {
                let agents = self.niwa.agents()?;
                Ok(render(
                    *format,
                    || format_agents_text(&agents),
                    || format_agents_json(&agents),
                ))
            }
            Commands::Whoami => {
                let name = self.niwa.suggest_agent_name()?;
                Ok(format!("Suggested agent name: {}", name))
            }
            Commands::Check { format } => {
                let report = self.niwa.health()?;
                let path = self.niwa.store().path();
                Ok(render(
                    *format,
                    || format_health_text(&report, path),
                    || format_health_json(&report, path),
                ))
            }
            Commands::Search {
                query,
                case_sensitive,
                format,
            } => {
                let hits = self.niwa.search(query, *case_sensitive)?;
                Ok(render(
                    *format,
                    || format_search_text(query, &hits),
                    || format_search_json(query, &hits),
                ))
            }
            Commands::History {
                node_id,
                full,
                format,
            } => {
                let records = self.niwa.history(node_id)?;
                Ok(render(
                    *format,
                    || format_history_text(node_id, &records, *full),
                    || format_history_json(node_id, &records),
                ))
            }
            Commands::Rollback {
                node_id,
                version,
                agent,
            } => {
                let new_version = self.niwa.rollback(node_id, *version, agent)?;
                Ok(format!(
                    "Restored v{} of {} as v{}",
                    version, node_id, new_version
                ))
            }
            Commands::Cleanup { format } => {
                let report = self.niwa.cleanup()?;
                let registry = &self.config.registry;
                let days = registry.expiry_enabled.then_some(registry.stale_after_days);
                Ok(render(
                    *format,
                    || format_cleanup_text(&report, days),
                    || format_cleanup_json(&report),
                ))
            }
        }
    }
}

fn render(
    format: OutputFormat,
    text: impl FnOnce() -> String,
    json: impl FnOnce() -> String,
) -> String {
    match format {
        OutputFormat::Text => text(),
        OutputFormat::Json => json(),
    }
}

fn read_file(path: &Path) -> Result<String, NiwaError> {
    std::fs::read_to_string(path)
        .map_err(|e| NiwaError::InvalidInput(format!("cannot read {}: {}", path.display(), e)))
}

/// Content from `--content`, `--file`, or stdin, in that order.
fn read_content(content: &Option<String>, file: &Option<PathBuf>) -> Result<String, NiwaError> {
    if let Some(text) = content {
        return Ok(text.clone());
    }
    if let Some(path) = file {
        return read_file(path);
    }
    debug!("Reading content from stdin");
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .map_err(StorageError::IoError)?;
    Ok(text)
}
