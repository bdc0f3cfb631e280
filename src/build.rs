//! Page assembly orchestration.
//!
//! Coordinates retrieval, extraction and widget assembly for one page.
//!
//! # Architecture
//!
//! ```text
//! Builder::init(page)
//!     │
//!     ├── resolve_data_path() ──► host substitution + page file name
//!     │
//!     ├── extract() ──► field store + widget records
//!     │       (authoring: retrieved data document; published: the page)
//!     │
//!     └── assemble
//!             │
//!             ├── authoring: retrieve template ─► <file> placeholders ─►
//!             │   inline fragments ─► keep snapshot ─► fill widgets
//!             │
//!             └── published: adopt embedded template ─► fill widgets
//!                 ─► release record list
//!
//! host container children := assembled template children
//! ```
//!
//! Retrievals run strictly one after another; `<file>` replacements land
//! in document order because each one completes before the next starts.

use crate::{
    cli::AssembleArgs,
    config::{BinderyConfig, ConfigError},
    data::{extract, FieldMap, FieldStore, WidgetRecord},
    dom::{Document, NodeId},
    fetch::{Fetcher, FsFetcher},
    log,
    template::{fill_widgets, inline_fragments, AssemblyContext},
};
use anyhow::{bail, Context, Result};
use std::{fs, path::Path};

/// External file placeholder tag in authoring templates.
const FILE_TAG: &str = "file";
/// Attribute naming the fragment mapping entry of a placeholder.
const TARGET_FILE_ATTR: &str = "data-target-file";
/// Attribute locating the embedded working template.
const TITLE_ATTR: &str = "data-title";
/// Class of the element wrapping the embedded template in a published page.
const EMBEDDED_TEMPLATE_CLASS: &str = "_appTemplate";

/// Assembly mode, fixed for the builder's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Retrieve template and data through the fetcher; keep an
    /// exportable snapshot of the resolved template.
    Authoring,
    /// Use the template and data embedded in the host page; release the
    /// record list after assembly.
    Published,
}

/// One page build: host document in, assembled host document out.
pub struct Builder<'a> {
    config: &'a BinderyConfig,
    mode: BuildMode,
    fetcher: Box<dyn Fetcher>,
    host: Document,
    store: FieldStore,
    records: Vec<WidgetRecord>,
    snapshot: Option<String>,
    ready: bool,
}

impl<'a> Builder<'a> {
    /// Refuses authoring mode without a configured template source.
    pub fn new(
        config: &'a BinderyConfig,
        mode: BuildMode,
        fetcher: Box<dyn Fetcher>,
        host: Document,
    ) -> Result<Self> {
        if mode == BuildMode::Authoring && config.template.source.is_none() {
            bail!(ConfigError::Validation(
                "[template.source] is required in authoring mode".into()
            ));
        }
        Ok(Self {
            config,
            mode,
            fetcher,
            host,
            store: FieldStore::new(),
            records: Vec::new(),
            snapshot: None,
            ready: false,
        })
    }

    /// Run retrieval, extraction and assembly for the page at `page`.
    /// Readiness flips only once the whole pass has completed.
    pub fn init(&mut self, page: &Path) -> Result<()> {
        let data_path = self.resolve_data_path(page);

        match self.mode {
            BuildMode::Authoring => {
                let bytes = self
                    .fetcher
                    .fetch(&data_path)
                    .with_context(|| format!("Failed to retrieve data document `{data_path}`"))?;
                let source = Document::parse(&bytes)
                    .with_context(|| format!("Failed to parse data document `{data_path}`"))?;
                self.records = extract(&source, &mut self.store);
                log!("data"; "widgets in this page: {}", serde_json::to_string(&self.records)?);
                self.assemble_authoring(&source)?;
            }
            BuildMode::Published => {
                self.records = extract(&self.host, &mut self.store);
                self.assemble_published()?;
            }
        }

        self.ready = true;
        Ok(())
    }

    /// Current in-memory record list. Empty after a published build has
    /// released it.
    pub fn widgets_data(&self) -> &[WidgetRecord] {
        &self.records
    }

    /// Resolved template snapshot, fragments inlined and widgets still
    /// unfilled. `None` until an authoring build completes.
    pub fn exportable_template(&self) -> Option<&str> {
        self.snapshot.as_deref()
    }

    /// Whether [`Builder::init`] has completed for this page.
    #[allow(dead_code)]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Host page, assembled in place by [`Builder::init`].
    pub fn host(&self) -> &Document {
        &self.host
    }

    /// Data document location for a page: the configured path template
    /// with the production host substituted for the first `localhost`
    /// occurrence when this build is not on a local-development host,
    /// plus the page's file name.
    fn resolve_data_path(&self, page: &Path) -> String {
        let data = &self.config.data;
        let mut path = if data.local_hosts.iter().any(|h| h == &data.host) {
            data.path.clone()
        } else {
            data.path.replacen("localhost", &data.host, 1)
        };
        let segment = page.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        path.push('/');
        path.push_str(segment);
        path
    }

    // ========================================================================
    // Authoring mode
    // ========================================================================

    fn assemble_authoring(&mut self, source: &Document) -> Result<()> {
        // presence checked at construction
        let Some(template_source) = self.config.template.source.clone() else {
            bail!("no template source configured");
        };

        let bytes = self
            .fetcher
            .fetch(&template_source)
            .with_context(|| format!("Failed to retrieve template `{template_source}`"))?;
        let mut work = Document::parse(&bytes)
            .with_context(|| format!("Failed to parse template `{template_source}`"))?;

        self.replace_file_placeholders(&mut work)?;
        let root = work.root();
        inline_fragments(&mut work, root);

        // Export snapshot: everything inlined, nothing filled yet
        self.snapshot = Some(String::from_utf8(work.serialize()?)?);

        let mut ctx = AssemblyContext {
            work: &mut work,
            template_root: root,
            source,
            store: &self.store,
            global: FieldMap::new(),
        };
        fill_widgets(&mut ctx, &self.records);

        self.install(&work, root)
    }

    /// Substitute `<file data-target-file>` placeholders with their
    /// mapped resources, one at a time in document order. Unmapped
    /// placeholders are dropped.
    fn replace_file_placeholders(&self, work: &mut Document) -> Result<()> {
        for placeholder in work.elements_by_tag(work.root(), FILE_TAG) {
            let target = work
                .attr(placeholder, TARGET_FILE_ATTR)
                .unwrap_or_default()
                .to_string();
            let Some(location) = self.config.template.fragments.get(&target) else {
                log!("template"; "no fragment mapped for `{target}`, dropping the placeholder");
                work.detach(placeholder);
                continue;
            };

            let bytes = self
                .fetcher
                .fetch(location)
                .with_context(|| format!("Failed to retrieve fragment `{location}`"))?;
            let fetched = Document::parse(&bytes)
                .with_context(|| format!("Failed to parse fragment `{location}`"))?;

            // each fetched tree lands inside its own div wrapper
            let wrapper = work.create_element("div");
            for child in fetched.children(fetched.root()).to_vec() {
                let copy = work.import_subtree(&fetched, child);
                work.append_child(wrapper, copy);
            }
            work.insert_before(wrapper, placeholder);
            work.detach(placeholder);
        }
        Ok(())
    }

    // ========================================================================
    // Published mode
    // ========================================================================

    fn assemble_published(&mut self) -> Result<()> {
        let embedded = self
            .host
            .elements_with_class(self.host.root(), EMBEDDED_TEMPLATE_CLASS)
            .into_iter()
            .next()
            .context("no embedded template in the host page")?;

        let mut work = Document::new();
        let work_root = work.root();
        for child in self.host.children(embedded).to_vec() {
            let copy = work.import_subtree(&self.host, child);
            work.append_child(work_root, copy);
        }
        self.host.detach(embedded);

        let title = &self.config.template.embedded_title;
        let template_root = work
            .elements_with_attr_value(work_root, TITLE_ATTR, title)
            .into_iter()
            .next()
            .with_context(|| format!("embedded template `{title}` not found"))?;

        let mut ctx = AssemblyContext {
            work: &mut work,
            template_root,
            source: &self.host,
            store: &self.store,
            global: FieldMap::new(),
        };
        fill_widgets(&mut ctx, &self.records);

        self.install(&work, template_root)?;
        self.records = Vec::new();
        Ok(())
    }

    // ========================================================================
    // Common tail
    // ========================================================================

    /// Replace the host container's children with the assembled
    /// template's children.
    fn install(&mut self, work: &Document, template_root: NodeId) -> Result<()> {
        let container_class = &self.config.output.container;
        let container = self
            .host
            .elements_with_class(self.host.root(), container_class)
            .into_iter()
            .next()
            .with_context(|| format!("no `.{container_class}` container in the host page"))?;

        self.host.clear_children(container);
        for child in work.children(template_root).to_vec() {
            let copy = self.host.import_subtree(work, child);
            self.host.append_child(container, copy);
        }
        Ok(())
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Assemble a page and write it into the output directory.
pub fn assemble_page(
    config: &'static BinderyConfig,
    args: &AssembleArgs,
    output: Option<&Path>,
) -> Result<()> {
    let builder = run_build(config, args)?;
    let out_path = match output {
        Some(path) => path.to_path_buf(),
        None => config.output.dir.join(page_file_name(&args.page)?),
    };

    write_output(&out_path, &builder.host().serialize()?)?;
    log!("build"; "assembled `{}`", out_path.display());
    Ok(())
}

/// Print the page's extracted widget records as JSON.
pub fn inspect_page(config: &'static BinderyConfig, args: &AssembleArgs) -> Result<()> {
    let builder = run_build(config, args)?;
    println!("{}", serde_json::to_string_pretty(builder.widgets_data())?);
    Ok(())
}

/// Write the resolved template, named after the page's file name.
pub fn export_page(
    config: &'static BinderyConfig,
    args: &AssembleArgs,
    output: Option<&Path>,
) -> Result<()> {
    let builder = run_build(config, args)?;
    let snapshot = builder
        .exportable_template()
        .context("nothing to export; the template snapshot is kept by authoring builds only")?;
    let out_path = match output {
        Some(path) => path.to_path_buf(),
        None => config.output.dir.join(page_file_name(&args.page)?),
    };

    write_output(&out_path, snapshot.as_bytes())?;
    log!("export"; "template saved to `{}`", out_path.display());
    Ok(())
}

fn run_build(config: &'static BinderyConfig, args: &AssembleArgs) -> Result<Builder<'static>> {
    let mode = if args.published {
        BuildMode::Published
    } else {
        BuildMode::Authoring
    };

    let page_path = config.get_root().join(&args.page);
    let bytes = fs::read(&page_path)
        .with_context(|| format!("Failed to read {}", page_path.display()))?;
    let host = Document::parse(&bytes)
        .with_context(|| format!("Failed to parse {}", page_path.display()))?;

    let fetcher = Box::new(FsFetcher::new(config.get_root()));
    let mut builder = Builder::new(config, mode, fetcher, host)?;
    builder.init(&args.page)?;
    Ok(builder)
}

fn page_file_name(page: &Path) -> Result<&std::ffi::OsStr> {
    page.file_name()
        .with_context(|| format!("page path `{}` has no file name", page.display()))
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

// ============================================================================
// Tests
// ============================================================================
