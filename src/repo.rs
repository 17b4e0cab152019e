//! Repository façade: one schema, one committed tree, one candidate.
//!
//! A [`Repository`] moves through `Uninitialized → Ready → (Editing →
//! Ready)*`. Reads are served from the running tree. An edit parses the
//! candidate into the editing tree, reports its diff against the running
//! tree, and commits it.
//!
//! Commits are staged: the candidate is serialized and written next to the
//! data file, synced to disk, renamed over it, and only then swapped in as
//! the running tree. A failed serialization or write leaves both memory and
//! disk at the previous commit. After a crash the data file holds either the
//! previous or the new document in full. The rename itself is not followed
//! by a directory sync, so a crash right after it may still surface the
//! previous document.
//!
//! There is no internal locking. Share a repository across threads by
//! wrapping it in a `Mutex`.

use crate::diff::{compute_diff, Diff, DiffConfig};
use crate::error::RepoError;
use crate::output::{format_diff, OutputFormat, OutputOptions};
use crate::parser::{parse_data, parse_value};
use crate::query::resolve;
use crate::schema::{load_schema_file, Schema};
use crate::serializer::dump;
use crate::tree::{DataTree, NodeRef};
use serde_json::Value;
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lifecycle state of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    Uninitialized,
    Ready,
    Editing,
}

type DiffObserver = Box<dyn FnMut(&Diff<'_>) + Send>;

struct Context {
    schema: Arc<Schema>,
    running: DataTree,
    editing: Option<DataTree>,
    data_path: PathBuf,
}

/// Schema-governed data repository.
#[derive(Default)]
pub struct Repository {
    ctx: Option<Context>,
    config: DiffConfig,
    observer: Option<DiffObserver>,
}

impl Repository {
    /// Creates an uninitialized repository.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DiffConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Registers a callback that receives the diff of every edit before it
    /// is committed.
    pub fn on_diff(&mut self, observer: impl FnMut(&Diff<'_>) + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Loads the schema and the initial running tree.
    ///
    /// Replaces any previous context. On failure the repository is left
    /// uninitialized.
    pub fn init(
        &mut self,
        schema_path: impl AsRef<Path>,
        data_path: impl AsRef<Path>,
    ) -> Result<(), RepoError> {
        self.ctx = None;

        let schema_path = schema_path.as_ref();
        let data_path = data_path.as_ref();
        let schema = Arc::new(load_schema_file(schema_path)?);
        let text = fs::read_to_string(data_path).map_err(|e| RepoError::io(data_path, e))?;
        let running = parse_data(&schema, &text)?;

        tracing::info!(
            schema = %schema_path.display(),
            data = %data_path.display(),
            nodes = running.len(),
            "repository initialized"
        );
        self.ctx = Some(Context {
            schema,
            running,
            editing: None,
            data_path: data_path.to_path_buf(),
        });
        Ok(())
    }

    /// Releases the schema and both trees.
    pub fn teardown(&mut self) {
        if self.ctx.take().is_some() {
            tracing::info!("repository torn down");
        }
    }

    pub fn state(&self) -> RepoState {
        match &self.ctx {
            None => RepoState::Uninitialized,
            Some(ctx) if ctx.editing.is_some() => RepoState::Editing,
            Some(_) => RepoState::Ready,
        }
    }

    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.ctx.as_ref().map(|ctx| &ctx.schema)
    }

    pub fn running(&self) -> Option<&DataTree> {
        self.ctx.as_ref().map(|ctx| &ctx.running)
    }

    pub fn data_path(&self) -> Option<&Path> {
        self.ctx.as_ref().map(|ctx| ctx.data_path.as_path())
    }

    /// Resolves a path against the running tree.
    pub fn get(&self, path: &str) -> Result<NodeRef<'_>, RepoError> {
        let ctx = self.ctx.as_ref().ok_or(RepoError::Uninitialized)?;
        Ok(resolve(&ctx.running, path)?)
    }

    /// Serializes the running tree.
    pub fn dump(&self) -> Result<String, RepoError> {
        let ctx = self.ctx.as_ref().ok_or(RepoError::Uninitialized)?;
        Ok(dump(&ctx.running)?)
    }

    /// Parses a candidate document and commits it.
    pub fn edit(&mut self, text: &str) -> Result<(), RepoError> {
        let ctx = self.ctx.as_ref().ok_or(RepoError::Uninitialized)?;
        let candidate = parse_data(&ctx.schema, text).inspect_err(|e| {
            tracing::warn!(error = %e, "rejected edit");
        })?;
        self.commit(candidate)
    }

    /// Same as [`Repository::edit`] for an already parsed document.
    pub fn edit_value(&mut self, document: &Value) -> Result<(), RepoError> {
        let ctx = self.ctx.as_ref().ok_or(RepoError::Uninitialized)?;
        let candidate = parse_value(&ctx.schema, document).inspect_err(|e| {
            tracing::warn!(error = %e, "rejected edit");
        })?;
        self.commit(candidate)
    }

    fn commit(&mut self, candidate: DataTree) -> Result<(), RepoError> {
        let Repository {
            ctx,
            config,
            observer,
        } = self;
        let ctx = ctx.as_mut().ok_or(RepoError::Uninitialized)?;
        let editing = ctx.editing.insert(candidate);

        match compute_diff(&ctx.schema, &ctx.running, editing, config) {
            Ok(diff) => {
                report_diff(&diff);
                if let Some(observer) = observer.as_mut() {
                    observer(&diff);
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not diff edit against running tree"),
        }

        let staged = dump(editing)
            .map_err(RepoError::from)
            .and_then(|text| persist(&ctx.data_path, &text));
        let editing = ctx.editing.take();
        staged?;

        if let Some(editing) = editing {
            ctx.running = editing;
        }
        tracing::info!(data = %ctx.data_path.display(), "edit committed");
        Ok(())
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("state", &self.state())
            .field("data_path", &self.data_path())
            .field("config", &self.config)
            .finish()
    }
}

fn report_diff(diff: &Diff<'_>) {
    if diff.is_empty() {
        tracing::info!("edit has no changes");
        return;
    }

    let options = OutputOptions::default();
    match format_diff(diff, &OutputFormat::Plain, &options) {
        Ok(report) => tracing::info!(
            added = diff.stats.added,
            removed = diff.stats.removed,
            modified = diff.stats.modified,
            "edit diff\n{}",
            report
        ),
        Err(e) => tracing::warn!(error = %e, "could not format diff"),
    }
}

/// Writes `text` to a sibling temp file, syncs it, and renames it over
/// `path`.
fn persist(path: &Path, text: &str) -> Result<(), RepoError> {
    let mut staged = OsString::from(path.as_os_str());
    staged.push(".tmp");
    let staged = PathBuf::from(staged);

    write_synced(&staged, text).map_err(|e| RepoError::persist(&staged, e))?;
    fs::rename(&staged, path).map_err(|e| {
        let _ = fs::remove_file(&staged);
        RepoError::persist(path, e)
    })
}

fn write_synced(path: &Path, text: &str) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(text.as_bytes())?;
    file.sync_all()
}
