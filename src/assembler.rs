use crate::annotation::{AnnotationError, AnnotationParser};
use crate::api_doc::ApiDoc;
use crate::catalog::{FsModuleLoader, TypeCatalog};
use crate::error::{Error, Result};
use crate::parser::RustFrontend;
use crate::source::{Decl, ModuleLayout, UnitId};
use crate::struct_walker::StructWalker;
use crate::type_resolver::TypeResolver;
use log::{debug, info};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// What to scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanConfig {
    /// Directory whose source files carry the annotations
    pub root: PathBuf,
    /// Source directories of other crates, by crate name
    pub externs: HashMap<String, PathBuf>,
}

impl ScanConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            externs: HashMap::new(),
        }
    }

    pub fn with_extern(mut self, name: &str, dir: impl Into<PathBuf>) -> Self {
        self.externs.insert(name.to_string(), dir.into());
        self
    }
}

/// Turns the annotated operations of a scanned tree into API documents.
pub struct DocumentAssembler {
    walker: StructWalker,
}

impl DocumentAssembler {
    pub fn new(catalog: TypeCatalog) -> Self {
        Self {
            walker: StructWalker::new(TypeResolver::new(catalog)),
        }
    }

    /// Indexes the tree described by `config` with the Rust front-end.
    ///
    /// # Errors
    ///
    /// Returns an error if the root does not exist or a scanned file cannot be read or parsed.
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        let root = fs::canonicalize(&config.root).map_err(|e| {
            Error::InvalidArgument(format!("{}: {}", config.root.display(), e))
        })?;
        let layout = ModuleLayout::discover(&root);
        debug!("Module root: {}", layout.src_root().display());

        let loader = FsModuleLoader::new(layout.clone(), config.externs.clone());
        let mut catalog = TypeCatalog::new(Box::new(RustFrontend), Box::new(loader));
        catalog.index(&root, &layout)?;

        Ok(Self::new(catalog))
    }

    /// Builds the documents of every scanned file, in file path order.
    ///
    /// Within a file, documents follow declaration order, inline modules included, and are
    /// numbered from 1.
    ///
    /// # Errors
    ///
    /// Returns a [`Error::GrammarError`] for the first malformed annotation line.
    pub fn assemble(mut self) -> Result<Vec<ApiDoc>> {
        let mut docs = Vec::new();
        for file in self.scanned_files() {
            let Some(&root) = file.first() else {
                continue;
            };
            let source = self.walker.resolver().catalog().unit(root);
            debug!("Parsing comments of {}", source.path.display());

            let mut state = FileState {
                units: &file,
                general: ApiDoc::new(),
                order: 1,
            };
            self.assemble_unit(root, &mut state, &mut docs)?;
        }
        info!("Generated {} API documents", docs.len());
        Ok(docs)
    }

    /// Scanned units grouped by file; the file's top-level unit comes first in each group.
    fn scanned_files(&self) -> Vec<Vec<UnitId>> {
        let catalog = self.walker.resolver().catalog();
        let mut files: Vec<Vec<UnitId>> = Vec::new();
        let mut current: Option<PathBuf> = None;
        for unit in catalog.scanned_units() {
            let path = catalog.unit(unit).path.clone();
            match files.last_mut() {
                Some(file) if current.as_ref() == Some(&path) => file.push(unit),
                _ => {
                    files.push(vec![unit]);
                    current = Some(path);
                }
            }
        }
        files
    }

    fn assemble_unit(
        &mut self,
        unit: UnitId,
        state: &mut FileState<'_>,
        docs: &mut Vec<ApiDoc>,
    ) -> Result<()> {
        let source = self.walker.resolver().catalog().unit(unit);

        for decl in &source.decls {
            match decl {
                Decl::General { docs: lines } => {
                    let general = std::mem::take(&mut state.general);
                    let mut parser = AnnotationParser::new(general).with_types(&mut self.walker, unit);
                    for line in lines {
                        parser
                            .apply_line("", line)
                            .map_err(|e| grammar_error(&source.path, "", e))?;
                    }
                    state.general = parser.into_doc();
                }
                Decl::Operation { name, docs: lines } => {
                    let mut parser = AnnotationParser::new(ApiDoc::seeded(&state.general))
                        .with_types(&mut self.walker, unit);
                    for line in lines {
                        debug!("  > {}(): {}", name, line);
                        parser
                            .apply_line(name, line)
                            .map_err(|e| grammar_error(&source.path, name, e))?;
                    }

                    let mut doc = parser.into_doc();
                    if doc.is_invalid() {
                        debug!("Skipping {}(): no title or url", name);
                        continue;
                    }
                    doc.order = state.order;
                    state.order += 1;
                    info!("Generated document ({}) {}", doc.order, doc.name());
                    docs.push(doc);
                }
                Decl::Module { module_path } => {
                    let catalog = self.walker.resolver().catalog();
                    let nested = state
                        .units
                        .iter()
                        .copied()
                        .find(|&id| catalog.unit(id).module_path == *module_path);
                    if let Some(nested) = nested {
                        self.assemble_unit(nested, state, docs)?;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Annotation state shared by every unit of one file.
struct FileState<'a> {
    units: &'a [UnitId],
    general: ApiDoc,
    order: u32,
}

/// Scans `config.root` and assembles its documents.
///
/// # Errors
///
/// See [`DocumentAssembler::from_config`] and [`DocumentAssembler::assemble`].
pub fn generate(config: &ScanConfig) -> Result<Vec<ApiDoc>> {
    DocumentAssembler::from_config(config)?.assemble()
}

fn grammar_error(file: &Path, operation: &str, err: AnnotationError) -> Error {
    Error::GrammarError {
        file: file.to_path_buf(),
        operation: operation.to_string(),
        line: err.line,
        message: err.message,
    }
}
