//! Language-neutral view of scanned source files.
//!
//! The catalog, the resolver and the struct walker never look at a syntax tree directly. A
//! [`SourceFrontend`] lowers each file into one or more [`SourceUnit`]s that expose exactly what
//! the rest of the pipeline needs:
//!
//! - the unit's imports (with aliases and glob markers),
//! - the type declarations it contains, with their fields,
//! - the documented declarations, in source order, with their raw doc-comment lines.
//!
//! [`ModuleLayout`] maps file paths to module paths (`crate::a::b`).

use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};

/// Index of a [`SourceUnit`] inside the catalog.
pub type UnitId = usize;

/// Separator between module path segments.
pub const PATH_SEPARATOR: &str = "::";

/// One lowered module of a source file.
///
/// A file yields one unit for its top level plus one unit per inline `mod name { ... }` block,
/// each with its own module path and imports.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Path of the file the unit comes from
    pub path: PathBuf,
    /// Absolute module path, e.g. `crate::model::book`
    pub module_path: String,
    /// `use` declarations, normalised to absolute paths
    pub imports: Vec<Import>,
    /// Type declarations
    pub types: Vec<TypeDef>,
    /// Documented declarations in source order
    pub decls: Vec<Decl>,
}

impl SourceUnit {
    pub fn new(path: &Path, module_path: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            module_path: module_path.to_string(),
            imports: Vec::new(),
            types: Vec::new(),
            decls: Vec::new(),
        }
    }

    /// Last segment of the module path (`book` for `crate::model::book`).
    pub fn module_name(&self) -> &str {
        last_segment(&self.module_path)
    }
}

/// A single imported path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Absolute path of the imported item, or of the module for glob imports
    pub path: String,
    /// `as` rename, if any
    pub alias: Option<String>,
    /// Whether this is a `path::*` import
    pub glob: bool,
}

impl Import {
    pub fn named(path: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            path: path.into(),
            alias,
            glob: false,
        }
    }

    pub fn glob(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alias: None,
            glob: true,
        }
    }

    /// Name the import binds in the importing module.
    pub fn local_name(&self) -> &str {
        self.alias
            .as_deref()
            .unwrap_or_else(|| last_segment(&self.path))
    }

    pub fn is_aliased(&self) -> bool {
        self.alias.is_some()
    }
}

/// A documented top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    /// Doc comments of a type, constant, impl block, or the file's inner docs
    General { docs: Vec<String> },
    /// Doc comments of a function or method
    Operation { name: String, docs: Vec<String> },
    /// An inline `mod` block of the same file, lowered into its own unit
    Module { module_path: String },
}

/// A declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub body: TypeBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeBody {
    /// A record with named fields (the only composite body)
    Struct(Vec<FieldDecl>),
    /// A type alias, newtype or transparent wrapper around another type
    Alias(TypeExpr),
    /// A unit-only enum, serialized as one of its variant names
    Enum(Vec<String>),
}

/// A struct field as seen by the struct walker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldDecl {
    /// Declared identifier
    pub ident: String,
    /// Serialized name after `rename` / `rename_all`
    pub name: String,
    /// Field type with `Option` and smart pointers removed
    pub ty: TypeExpr,
    /// A field attribute mentions `required`
    pub required: bool,
    /// Serialized through a string codec
    pub as_text: bool,
    /// `#[serde(flatten)]`
    pub flatten: bool,
    /// `#[serde(skip)]` or `#[serde(skip_serializing)]`
    pub skip: bool,
    /// Doc comment text of the field
    pub comment: String,
}

/// Structural shape of a field type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TypeExpr {
    /// A named type, possibly qualified (`book::Book`, `i64`)
    Named(String),
    /// A sequence of elements
    Array(Box<TypeExpr>),
    /// A key/value map
    Map(Box<TypeExpr>, Box<TypeExpr>),
    /// A dynamically typed value (`serde_json::Value`)
    Any,
    /// Anything the front-end cannot describe (tuples, function pointers, ...)
    #[default]
    Unknown,
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into())
    }

    pub fn array(element: TypeExpr) -> Self {
        TypeExpr::Array(Box::new(element))
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => write!(f, "{}", name),
            TypeExpr::Array(element) => write!(f, "Vec<{}>", element),
            TypeExpr::Map(key, value) => write!(f, "Map<{}, {}>", key, value),
            TypeExpr::Any => write!(f, "Value"),
            TypeExpr::Unknown => Ok(()),
        }
    }
}

/// A source file as handed over by a module loader.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub path: PathBuf,
    pub module_path: String,
    pub content: String,
}

/// Capability seam between the pipeline and a concrete source grammar.
pub trait SourceFrontend {
    /// File extension (without the dot) of the files this front-end understands.
    fn extension(&self) -> &str;

    /// Lowers one file into its units. The first unit is the file's top level.
    fn parse_source(&self, path: &Path, module_path: &str, content: &str) -> Result<Vec<SourceUnit>>;
}

/// Maps file paths under a crate to module paths.
#[derive(Debug, Clone)]
pub struct ModuleLayout {
    src_root: PathBuf,
}

impl ModuleLayout {
    /// Uses `src_root` as the directory holding the crate root module.
    pub fn new(src_root: PathBuf) -> Self {
        Self { src_root }
    }

    /// Finds the module root for a scanned directory.
    ///
    /// The nearest ancestor holding a `Cargo.toml` is the crate directory and its `src/` is the
    /// module root. Without a manifest the scanned directory itself is the module root.
    pub fn discover(root: &Path) -> Self {
        for dir in root.ancestors() {
            if dir.join("Cargo.toml").is_file() {
                return Self::new(dir.join("src"));
            }
        }
        Self::new(root.to_path_buf())
    }

    pub fn src_root(&self) -> &Path {
        &self.src_root
    }

    /// Module path of a file, e.g. `src/model/book.rs` -> `crate::model::book`.
    ///
    /// `lib.rs`, `main.rs` and binaries under `src/bin/` are crate roots; `mod.rs` names its
    /// directory. Files outside the module root belong to `crate`.
    pub fn module_path_for(&self, file: &Path) -> String {
        let Ok(relative) = file.strip_prefix(&self.src_root) else {
            return "crate".to_string();
        };

        let mut segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();

        let Some(file_name) = segments.pop() else {
            return "crate".to_string();
        };

        if segments.first().map(String::as_str) == Some("bin") {
            // src/bin/x.rs and src/bin/x/main.rs are separate crate roots
            segments.remove(0);
            if !segments.is_empty() {
                segments.remove(0);
            } else {
                return "crate".to_string();
            }
        }

        let stem = Path::new(&file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let is_root_file = segments.is_empty() && (stem == "lib" || stem == "main");
        if stem != "mod" && !is_root_file {
            segments.push(stem);
        }

        let mut module_path = String::from("crate");
        for segment in segments {
            module_path.push_str(PATH_SEPARATOR);
            module_path.push_str(&segment);
        }
        module_path
    }
}

/// Last `::` segment of a path.
pub fn last_segment(path: &str) -> &str {
    path.rsplit(PATH_SEPARATOR).next().unwrap_or(path)
}

/// Splits `a::b::Name` into `(Some("a::b"), "Name")`.
pub fn split_qualified(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once(PATH_SEPARATOR) {
        Some((qualifier, name)) => (Some(qualifier), name),
        None => (None, path),
    }
}

/// Joins a module path and a relative path.
pub fn join_path(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{}{}{}", base, PATH_SEPARATOR, rest),
    }
}

/// Resolves `crate`, `self` and `super` prefixes of `path` against `module_path`.
///
/// `crate` is the first segment of `module_path`, so paths inside external crates stay inside
/// that crate. Paths without such a prefix are returned unchanged.
pub fn absolutize(path: &str, module_path: &str) -> String {
    let mut segments = path.split(PATH_SEPARATOR).peekable();
    let mut base: Vec<&str> = module_path.split(PATH_SEPARATOR).collect();

    match segments.peek().copied() {
        Some("crate") => {
            segments.next();
            base.truncate(1);
        }
        Some("self") => {
            segments.next();
        }
        Some("super") => {
            while segments.peek().copied() == Some("super") {
                segments.next();
                if base.len() > 1 {
                    base.pop();
                }
            }
        }
        _ => return path.to_string(),
    }

    base.extend(segments);
    base.join(PATH_SEPARATOR)
}
