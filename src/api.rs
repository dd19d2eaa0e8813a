//! Document store API
//!
//! [`Niwa`] is the entry point for agents. Every method is one store transaction; write
//! transactions are retried on commit conflicts according to the store options.

use crate::config::{NiwaConfig, RegistryConfig};
use crate::error::NiwaError;
use crate::health::{self, HealthReport};
use crate::ledger::{self, VersionRecord, CREATED_MESSAGE};
use crate::occ::{self, DryRun, EditOutcome, EditStrategy};
use crate::registry::{self, AgentStatus, AgentSummary, CleanupReport, Conflict, PendingRead};
use crate::resolution::{self, Resolution};
use crate::search::{self, SearchHit};
use crate::store::{keys, Store, StoreOptions, Txn};
use crate::tree::node::{normalize_title, now_millis, validate_agent_id, Node, MAX_LEVEL, ROOT_ID};
use crate::tree::{persist, render_outline, serialize, Tree, TreeBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Result of loading a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub node_count: usize,
    /// Heading ids in document order.
    pub node_ids: Vec<String>,
    pub replaced: bool,
}

#[derive(Clone)]
pub struct Niwa {
    store: Arc<Store>,
    registry: RegistryConfig,
}

impl Niwa {
    /// Open the store configured for `workspace_root`.
    pub fn open(workspace_root: &Path, config: &NiwaConfig) -> Result<Self, NiwaError> {
        if let Err(errors) = config.validate() {
            let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Err(NiwaError::ConfigError(joined.join("; ")));
        }
        let path = config.store.resolve_path(workspace_root);
        Self::open_at(&path, config.store.to_options(), config.registry.clone())
    }

    pub fn open_at(
        path: &Path,
        options: StoreOptions,
        registry: RegistryConfig,
    ) -> Result<Self, NiwaError> {
        let store = Store::open(path, options)?;
        info!(path = %path.display(), "Store opened");
        Ok(Self {
            store: Arc::new(store),
            registry,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn write<T, F>(&self, f: F) -> Result<T, NiwaError>
    where
        F: FnMut(&mut Txn<'_>) -> Result<T, NiwaError>,
    {
        self.store.write(f)
    }

    fn read<T, F>(&self, f: F) -> Result<T, NiwaError>
    where
        F: FnMut(&mut Txn<'_>) -> Result<T, NiwaError>,
    {
        self.store.read(f)
    }

    // Document lifecycle

    /// Parse `markdown` into nodes, each with a v1 ledger entry by the system agent.
    ///
    /// Fails with `AlreadyLoaded` when a document exists and `replace` is false. A
    /// replacing load drops nodes, history, pending reads and conflicts but keeps the id
    /// counter, so new ids never reuse old ones.
    #[instrument(skip_all, fields(bytes = markdown.len()))]
    pub fn load(&self, markdown: &str, replace: bool) -> Result<LoadReport, NiwaError> {
        let report = self.write(|txn| {
            let exists = txn.get(&keys::node(ROOT_ID))?.is_some();
            if exists && !replace {
                return Err(NiwaError::AlreadyLoaded);
            }
            if exists {
                txn.delete_prefix(&keys::all_nodes())?;
                txn.delete_prefix(&keys::all_ledger())?;
                txn.delete_prefix(&keys::all_pending())?;
                txn.delete_prefix(&keys::all_conflicts())?;
            }

            let now = now_millis();
            let built = TreeBuilder::with_first_index(persist::next_index(txn)?)
                .at(now)
                .build(markdown);
            let mut node_ids = Vec::new();
            for node in built.tree.walk() {
                persist::put_node(txn, node)?;
                ledger::append(
                    txn,
                    &node.id,
                    node.version,
                    &node.content,
                    &node.last_agent,
                    CREATED_MESSAGE,
                    now,
                )?;
                if !node.is_root() {
                    node_ids.push(node.id.clone());
                }
            }
            persist::set_next_index(txn, built.next_index)?;

            Ok(LoadReport {
                node_count: built.tree.len(),
                node_ids,
                replaced: exists,
            })
        })?;
        info!(node_count = report.node_count, replaced = report.replaced, "Document loaded");
        Ok(report)
    }

    /// Create an empty document (just the root) if none exists.
    pub fn init(&self) -> Result<bool, NiwaError> {
        match self.load("", false) {
            Ok(_) => Ok(true),
            Err(NiwaError::AlreadyLoaded) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Append a new heading under `parent_id`, one level deeper.
    #[instrument(skip_all, fields(parent_id = %parent_id, agent_id = %agent))]
    pub fn add_node(
        &self,
        parent_id: &str,
        title: &str,
        content: &str,
        agent: &str,
    ) -> Result<Node, NiwaError> {
        validate_agent_id(agent)?;
        let title = normalize_title(title)?;
        let node = self.write(|txn| {
            let mut parent = persist::get_node(txn, parent_id)?;
            let level = parent.level + 1;
            if level > MAX_LEVEL {
                return Err(NiwaError::InvalidInput(format!(
                    "{parent_id} is at level {}; headings cannot nest deeper than {MAX_LEVEL}",
                    parent.level
                )));
            }
            ensure_unique_title(txn, &parent, &title, None)?;

            let now = now_millis();
            let index = persist::allocate_index(txn)?;
            let mut node = Node::heading(index, level, title.clone(), parent.id.clone(), now);
            node.content = content.to_string();
            node.last_agent = agent.to_string();
            ledger::append(txn, &node.id, 1, content, agent, CREATED_MESSAGE, now)?;
            persist::put_node(txn, &node)?;

            parent.children.push(node.id.clone());
            persist::put_node(txn, &parent)?;
            Ok(node)
        })?;
        info!(node_id = %node.id, level = node.level, "Node added");
        Ok(node)
    }

    /// Rename a heading. Content and version are untouched.
    #[instrument(skip_all, fields(node_id = %node_id, agent_id = %agent))]
    pub fn set_title(&self, node_id: &str, title: &str, agent: &str) -> Result<Node, NiwaError> {
        validate_agent_id(agent)?;
        let title = normalize_title(title)?;
        self.write(|txn| {
            let mut node = persist::get_node(txn, node_id)?;
            if let Some(parent_id) = node.parent_id.clone() {
                let parent = persist::get_node(txn, &parent_id)?;
                ensure_unique_title(txn, &parent, &title, Some(node_id))?;
            }
            node.title = title.clone();
            node.updated_at = now_millis();
            node.last_agent = agent.to_string();
            persist::put_node(txn, &node)?;
            Ok(node)
        })
    }

    /// Set or clear (`None` or blank) a node's summary. Does not bump the version.
    #[instrument(skip_all, fields(node_id = %node_id, agent_id = %agent))]
    pub fn set_summary(
        &self,
        node_id: &str,
        summary: Option<&str>,
        agent: &str,
    ) -> Result<Node, NiwaError> {
        validate_agent_id(agent)?;
        let summary = summary
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        self.write(|txn| {
            let mut node = persist::get_node(txn, node_id)?;
            node.summary = summary.clone();
            node.updated_at = now_millis();
            node.last_agent = agent.to_string();
            persist::put_node(txn, &node)?;
            Ok(node)
        })
    }

    // Reading

    /// Current node without registering a read.
    pub fn node(&self, node_id: &str) -> Result<Node, NiwaError> {
        self.read(|txn| persist::get_node(txn, node_id))
    }

    /// Current node, registering that `agent` has seen this version.
    #[instrument(skip_all, fields(node_id = %node_id, agent_id = %agent))]
    pub fn read_node(&self, node_id: &str, agent: &str) -> Result<Node, NiwaError> {
        let node = self.write(|txn| occ::read(txn, node_id, agent, now_millis()))?;
        info!(version = node.version, "Node read");
        Ok(node)
    }

    pub fn tree(&self) -> Result<Tree, NiwaError> {
        self.read(|txn| {
            persist::load_tree(txn)?.ok_or_else(|| NiwaError::NodeNotFound(ROOT_ID.to_string()))
        })
    }

    pub fn outline(&self) -> Result<String, NiwaError> {
        Ok(render_outline(&self.tree()?))
    }

    /// The whole document as markdown.
    pub fn export(&self) -> Result<String, NiwaError> {
        Ok(serialize(&self.tree()?))
    }

    pub fn search(&self, query: &str, case_sensitive: bool) -> Result<Vec<SearchHit>, NiwaError> {
        if query.is_empty() {
            return Err(NiwaError::InvalidInput("search query cannot be empty".to_string()));
        }
        Ok(search::search(&self.tree()?, query, case_sensitive))
    }

    pub fn history(&self, node_id: &str) -> Result<Vec<VersionRecord>, NiwaError> {
        self.read(|txn| {
            persist::get_node(txn, node_id)?;
            ledger::history(txn, node_id)
        })
    }

    // Writing

    /// Submit new content, checked against the version `agent` last read. A stale read
    /// is reported as a conflict.
    pub fn edit(
        &self,
        node_id: &str,
        agent: &str,
        content: &str,
        message: &str,
    ) -> Result<EditOutcome, NiwaError> {
        self.edit_with_strategy(node_id, agent, content, message, EditStrategy::Prompt)
    }

    /// `edit` with an explicit policy for stale reads.
    #[instrument(skip_all, fields(node_id = %node_id, agent_id = %agent, strategy = %strategy))]
    pub fn edit_with_strategy(
        &self,
        node_id: &str,
        agent: &str,
        content: &str,
        message: &str,
        strategy: EditStrategy,
    ) -> Result<EditOutcome, NiwaError> {
        let outcome = self.write(|txn| {
            occ::attempt_edit(txn, node_id, agent, content, message, strategy, now_millis())
        })?;
        log_outcome(&outcome);
        Ok(outcome)
    }

    /// What `edit` would do now. Writes nothing.
    pub fn dry_run_edit(
        &self,
        node_id: &str,
        agent: &str,
        content: &str,
    ) -> Result<DryRun, NiwaError> {
        self.read(|txn| occ::dry_run(txn, node_id, agent, content))
    }

    /// Settle `agent`'s open conflict on `node_id`.
    ///
    /// If the node moved since the conflict was recorded, the conflict is recomputed and
    /// stored, and `StaleConflict` is returned with the fresh analysis.
    #[instrument(skip_all, fields(node_id = %node_id, agent_id = %agent, resolution = %resolution))]
    pub fn resolve(
        &self,
        node_id: &str,
        agent: &str,
        resolution: Resolution,
        manual_content: Option<&str>,
    ) -> Result<EditOutcome, NiwaError> {
        let resolved = self.write(|txn| {
            resolution::resolve(txn, node_id, agent, resolution, manual_content, now_millis())
        })?;
        let outcome = resolved.into_result()?;
        log_outcome(&outcome);
        Ok(outcome)
    }

    /// Write the content of an earlier version as a new version.
    #[instrument(skip_all, fields(node_id = %node_id, agent_id = %agent))]
    pub fn rollback(&self, node_id: &str, version: u64, agent: &str) -> Result<u64, NiwaError> {
        validate_agent_id(agent)?;
        let new_version = self.write(|txn| {
            let node = persist::get_node(txn, node_id)?;
            let target = ledger::record(txn, node_id, version)?;
            let message = format!("Rollback to v{version}");
            occ::apply_write(txn, node, &target.content, agent, &message, now_millis())
        })?;
        info!(version = new_version, restored = version, "Rolled back");
        Ok(new_version)
    }

    // Registry

    pub fn pending_reads(&self, agent: &str) -> Result<Vec<PendingRead>, NiwaError> {
        self.read(|txn| registry::pending_reads(txn, agent))
    }

    pub fn open_conflicts(&self, agent: Option<&str>) -> Result<Vec<Conflict>, NiwaError> {
        self.read(|txn| registry::open_conflicts(txn, agent))
    }

    pub fn conflict(&self, node_id: &str, agent: &str) -> Result<Option<Conflict>, NiwaError> {
        self.read(|txn| registry::get_conflict(txn, node_id, agent))
    }

    pub fn agents(&self) -> Result<Vec<AgentSummary>, NiwaError> {
        self.read(registry::agents)
    }

    pub fn agent_status(&self, agent: &str) -> Result<AgentStatus, NiwaError> {
        validate_agent_id(agent)?;
        self.read(|txn| registry::agent_status(txn, agent))
    }

    pub fn suggest_agent_name(&self) -> Result<String, NiwaError> {
        self.read(registry::suggest_agent_name)
    }

    /// Expire pending reads and conflicts older than the configured horizon.
    pub fn cleanup(&self) -> Result<CleanupReport, NiwaError> {
        self.cleanup_at(now_millis())
    }

    #[instrument(skip(self))]
    pub fn cleanup_at(&self, now: u64) -> Result<CleanupReport, NiwaError> {
        let horizon = self.registry.horizon_ms();
        let report = self.write(|txn| registry::cleanup(txn, now, horizon))?;
        info!(
            pending_removed = report.pending_removed,
            conflicts_removed = report.conflicts_removed,
            "Cleanup finished"
        );
        Ok(report)
    }

    pub fn health(&self) -> Result<HealthReport, NiwaError> {
        self.read(health::check)
    }
}

fn ensure_unique_title(
    txn: &mut Txn<'_>,
    parent: &Node,
    title: &str,
    except: Option<&str>,
) -> Result<(), NiwaError> {
    let wanted = title.to_lowercase();
    for child_id in &parent.children {
        if Some(child_id.as_str()) == except {
            continue;
        }
        let child = persist::get_node(txn, child_id)?;
        if child.title.to_lowercase() == wanted {
            return Err(NiwaError::DuplicateTitle {
                parent_id: parent.id.clone(),
                title: title.to_string(),
                existing_id: child.id,
            });
        }
    }
    Ok(())
}

fn log_outcome(outcome: &EditOutcome) {
    match outcome {
        EditOutcome::Applied { version } => info!(version, "Edit applied"),
        EditOutcome::Unchanged { version } => info!(version, "Edit left node unchanged"),
        EditOutcome::ConflictDetected(conflict) => info!(
            base_version = conflict.base_version,
            theirs_version = conflict.theirs_version,
            auto_merge = conflict.auto_merge_suggestion.is_some(),
            "Edit conflicted"
        ),
    }
}
