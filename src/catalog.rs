//! Registry of every type declaration the pipeline knows about.
//!
//! The catalog is filled in two ways: eagerly with every file under the scanned tree, and
//! lazily with modules the resolver asks for through a [`ModuleLoader`]. Declarations are
//! indexed three ways:
//!
//! - per module path, for lookups like "type `Book` in `crate::model::book`",
//! - by the unique key `<last module segment>::<Name>`, kept only while it is unambiguous,
//! - by [`UnitId`], so the resolver can reach the imports of the unit a field was declared in.

use crate::error::{Error, Result};
use crate::scanner::FileScanner;
use crate::source::{
    last_segment, LoadedSource, ModuleLayout, SourceFrontend, SourceUnit, TypeBody, UnitId,
    PATH_SEPARATOR,
};
use anyhow::{bail, Context};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Index of a [`TypeDecl`] inside the catalog.
pub type DeclId = usize;

/// A type declaration together with where it was declared.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub module_path: String,
    pub body: TypeBody,
    /// Unit holding the declaration, whose imports scope its field types
    pub unit: UnitId,
}

impl TypeDecl {
    /// `crate::model::book::Book`
    pub fn full_path(&self) -> String {
        format!("{}{}{}", self.module_path, PATH_SEPARATOR, self.name)
    }

    /// `book::Book`
    pub fn unique_key(&self) -> String {
        unique_key(last_segment(&self.module_path), &self.name)
    }
}

pub fn unique_key(module_name: &str, type_name: &str) -> String {
    format!("{}{}{}", module_name, PATH_SEPARATOR, type_name)
}

/// Materializes the source of a module on demand.
pub trait ModuleLoader {
    /// Returns the files defining `module_path`. A module declared inline is returned as the
    /// file holding it, with that file's own module path.
    fn load(&self, module_path: &str) -> anyhow::Result<Vec<LoadedSource>>;
}

/// Loads modules from the file system using the usual crate layout.
///
/// `crate::a::b` is looked up as `a/b.rs` then `a/b/mod.rs` under the crate's module root.
/// Other crates are found through the `externs` table mapping a crate name to its module root.
pub struct FsModuleLoader {
    layout: ModuleLayout,
    externs: HashMap<String, PathBuf>,
}

impl FsModuleLoader {
    pub fn new(layout: ModuleLayout, externs: HashMap<String, PathBuf>) -> Self {
        Self { layout, externs }
    }

    fn crate_root(&self, crate_name: &str) -> anyhow::Result<PathBuf> {
        if crate_name == "crate" {
            return Ok(self.layout.src_root().to_path_buf());
        }
        let dir = self
            .externs
            .get(crate_name)
            .with_context(|| format!("No source directory known for crate `{}`", crate_name))?;
        Ok(ModuleLayout::discover(dir).src_root().to_path_buf())
    }
}

impl ModuleLoader for FsModuleLoader {
    fn load(&self, module_path: &str) -> anyhow::Result<Vec<LoadedSource>> {
        let segments: Vec<&str> = module_path.split(PATH_SEPARATOR).collect();
        let Some((crate_name, rest)) = segments.split_first() else {
            bail!("Empty module path");
        };
        let root = self.crate_root(crate_name)?;

        let candidates = if rest.is_empty() {
            vec![root.join("lib.rs"), root.join("main.rs")]
        } else {
            let base: PathBuf = rest.iter().collect();
            vec![root.join(&base).with_extension("rs"), root.join(&base).join("mod.rs")]
        };

        for candidate in candidates {
            if candidate.is_file() {
                let content = fs::read_to_string(&candidate)
                    .with_context(|| format!("Failed to read file: {}", candidate.display()))?;
                return Ok(vec![LoadedSource {
                    path: candidate,
                    module_path: module_path.to_string(),
                    content,
                }]);
            }
        }

        // `mod name { ... }` declared inline in the parent module
        if let Some((parent, _)) = module_path.rsplit_once(PATH_SEPARATOR) {
            return self.load(parent);
        }

        bail!("Module file not found for `{}`", module_path)
    }
}

/// The registry of type declarations.
pub struct TypeCatalog {
    frontend: Box<dyn SourceFrontend>,
    loader: Box<dyn ModuleLoader>,
    units: Vec<Rc<SourceUnit>>,
    scanned: Vec<UnitId>,
    decls: Vec<Rc<TypeDecl>>,
    modules: HashMap<String, HashMap<String, DeclId>>,
    unique: HashMap<String, DeclId>,
    ambiguous: HashSet<String>,
    attempted: HashSet<String>,
    loaded_files: HashSet<PathBuf>,
}

impl TypeCatalog {
    pub fn new(frontend: Box<dyn SourceFrontend>, loader: Box<dyn ModuleLoader>) -> Self {
        Self {
            frontend,
            loader,
            units: Vec::new(),
            scanned: Vec::new(),
            decls: Vec::new(),
            modules: HashMap::new(),
            unique: HashMap::new(),
            ambiguous: HashSet::new(),
            attempted: HashSet::new(),
            loaded_files: HashSet::new(),
        }
    }

    /// Parses every source file under `root` and registers its declarations.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be walked, a file cannot be read, or a file is not
    /// syntactically valid.
    pub fn index(&mut self, root: &Path, layout: &ModuleLayout) -> Result<()> {
        let scan = FileScanner::new(root.to_path_buf(), self.frontend.extension()).scan()?;

        for path in &scan.source_files {
            let content = fs::read_to_string(path)?;
            let module_path = layout.module_path_for(path);
            let units = self
                .frontend
                .parse_source(path, &module_path, &content)
                .map_err(|e| Error::ParseError {
                    file: path.clone(),
                    message: format!("{:#}", e),
                })?;

            self.loaded_files.insert(path.clone());
            for unit in units {
                self.attempted.insert(unit.module_path.clone());
                let id = self.add_unit(unit);
                self.scanned.push(id);
            }
        }

        debug!(
            "Indexed {} files, {} types, {} unique keys",
            scan.source_files.len(),
            self.decls.len(),
            self.unique.len()
        );

        Ok(())
    }

    /// Registers already lowered units, as if they had been scanned.
    pub fn add_scanned(&mut self, units: Vec<SourceUnit>) {
        for unit in units {
            self.attempted.insert(unit.module_path.clone());
            let id = self.add_unit(unit);
            self.scanned.push(id);
        }
    }

    fn add_unit(&mut self, unit: SourceUnit) -> UnitId {
        let id = self.units.len();
        for def in &unit.types {
            self.register(TypeDecl {
                name: def.name.clone(),
                module_path: unit.module_path.clone(),
                body: def.body.clone(),
                unit: id,
            });
        }
        self.units.push(Rc::new(unit));
        id
    }

    fn register(&mut self, decl: TypeDecl) {
        debug!("Collecting type: {}", decl.full_path());

        let module = self.modules.entry(decl.module_path.clone()).or_default();
        if module.contains_key(&decl.name) {
            return;
        }

        let key = decl.unique_key();
        let module_path = decl.module_path.clone();
        let id = self.decls.len();
        module.insert(decl.name.clone(), id);
        self.decls.push(Rc::new(decl));

        if self.ambiguous.contains(&key) {
            return;
        }
        let existing = self.unique.get(&key).copied();
        match existing {
            Some(other) if self.decls[other].module_path != module_path => {
                debug!("Unique key {} is ambiguous, dropping it", key);
                self.unique.remove(&key);
                self.ambiguous.insert(key);
            }
            Some(_) => {}
            None => {
                self.unique.insert(key, id);
            }
        }
    }

    /// Makes sure the declarations of `module_path` are present, loading them if needed.
    ///
    /// Each module path is attempted at most once; load failures are logged and otherwise
    /// ignored, leaving the module empty.
    pub fn ensure_module(&mut self, module_path: &str) {
        if !self.attempted.insert(module_path.to_string()) {
            return;
        }

        debug!("Loading module: {}", module_path);
        let sources = match self.loader.load(module_path) {
            Ok(sources) => sources,
            Err(e) => {
                debug!("Module {} not loaded: {:#}", module_path, e);
                return;
            }
        };

        for source in sources {
            if !self.loaded_files.insert(source.path.clone()) {
                continue;
            }
            match self
                .frontend
                .parse_source(&source.path, &source.module_path, &source.content)
            {
                Ok(units) => {
                    for unit in units {
                        self.attempted.insert(unit.module_path.clone());
                        self.add_unit(unit);
                    }
                }
                Err(e) => warn!("Skipping module {}: {:#}", module_path, e),
            }
        }
    }

    pub fn unit(&self, id: UnitId) -> Rc<SourceUnit> {
        Rc::clone(&self.units[id])
    }

    pub fn decl(&self, id: DeclId) -> Rc<TypeDecl> {
        Rc::clone(&self.decls[id])
    }

    /// Units from the scanned tree, ordered by file path.
    pub fn scanned_units(&self) -> Vec<UnitId> {
        let mut ids = self.scanned.clone();
        ids.sort_by(|a, b| self.units[*a].path.cmp(&self.units[*b].path));
        ids
    }

    pub fn unique(&self, key: &str) -> Option<DeclId> {
        self.unique.get(key).copied()
    }

    pub fn find_in_module(&self, module_path: &str, name: &str) -> Option<DeclId> {
        self.modules.get(module_path)?.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}
