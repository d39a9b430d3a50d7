use crate::catalog::{unique_key, DeclId, TypeCatalog};
use crate::source::{absolutize, join_path, split_qualified, SourceUnit, UnitId, PATH_SEPARATOR};
use log::debug;
use std::collections::HashMap;

/// Type resolver - finds the declaration a type reference denotes, from inside a given unit
pub struct TypeResolver {
    catalog: TypeCatalog,
    /// Successful resolutions, keyed by the referencing unit and the reference text
    cache: HashMap<(UnitId, String), DeclId>,
}

impl TypeResolver {
    pub fn new(catalog: TypeCatalog) -> Self {
        debug!("Initializing TypeResolver with {} types", catalog.len());
        Self {
            catalog,
            cache: HashMap::new(),
        }
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Resolve a type reference written in `unit`.
    ///
    /// An unqualified name `X` is tried, in order, as the unique key `<own module>::X`, as a
    /// declaration of the unit's own module, through a direct `use` of `X`, then through each
    /// glob import.
    ///
    /// A qualified name `q::X` is tried as `crate`/`self`/`super` relative path, through a
    /// `use ... as q` alias, as the unique key `q::X`, through a plain `use` whose last segment
    /// is `q`, and finally as a module path written out in full. Modules are loaded on demand
    /// along the way.
    pub fn resolve(&mut self, type_name: &str, unit: UnitId) -> Option<DeclId> {
        let type_name = type_name.trim().trim_start_matches(PATH_SEPARATOR);
        if type_name.is_empty() {
            return None;
        }

        let cache_key = (unit, type_name.to_string());
        if let Some(&id) = self.cache.get(&cache_key) {
            return Some(id);
        }

        let source = self.catalog.unit(unit);
        let resolved = match split_qualified(type_name) {
            (Some(qualifier), name) => self.resolve_qualified(qualifier, name, &source),
            (None, name) => self.resolve_unqualified(name, &source),
        };

        match resolved {
            Some(id) => {
                debug!(
                    "Resolved {} in {} to {}",
                    type_name,
                    source.module_path,
                    self.catalog.decl(id).full_path()
                );
                self.cache.insert(cache_key, id);
            }
            None => debug!("Unresolved type {} in {}", type_name, source.module_path),
        }
        resolved
    }

    fn resolve_unqualified(&mut self, name: &str, unit: &SourceUnit) -> Option<DeclId> {
        if let Some(id) = self.catalog.unique(&unique_key(unit.module_name(), name)) {
            return Some(id);
        }

        if let Some(id) = self.catalog.find_in_module(&unit.module_path, name) {
            return Some(id);
        }

        for import in unit.imports.iter().filter(|i| !i.glob) {
            if import.local_name() != name {
                continue;
            }
            if let (Some(module), item) = split_qualified(&import.path) {
                if let Some(id) = self.find_in(module, item) {
                    return Some(id);
                }
            }
        }

        for import in unit.imports.iter().filter(|i| i.glob) {
            if let Some(id) = self.find_in(&import.path, name) {
                return Some(id);
            }
        }

        None
    }

    fn resolve_qualified(&mut self, qualifier: &str, name: &str, unit: &SourceUnit) -> Option<DeclId> {
        let (head, tail) = match qualifier.split_once(PATH_SEPARATOR) {
            Some((head, tail)) => (head, tail),
            None => (qualifier, ""),
        };

        if matches!(head, "crate" | "self" | "super") {
            let module = absolutize(qualifier, &unit.module_path);
            return self.find_in(&module, name);
        }

        let aliased = unit
            .imports
            .iter()
            .find(|i| !i.glob && i.alias.as_deref() == Some(head));
        if let Some(import) = aliased {
            return self.find_in(&join_path(&import.path, tail), name);
        }

        if tail.is_empty() {
            if let Some(id) = self.catalog.unique(&unique_key(head, name)) {
                return Some(id);
            }
        }

        let imported = unit
            .imports
            .iter()
            .find(|i| !i.glob && !i.is_aliased() && i.local_name() == head);
        if let Some(import) = imported {
            if let Some(id) = self.find_in(&join_path(&import.path, tail), name) {
                return Some(id);
            }
        }

        // A child module of the current one, or a path starting at a crate name
        if let Some(id) = self.find_in(&join_path(&unit.module_path, qualifier), name) {
            return Some(id);
        }
        self.find_in(qualifier, name)
    }

    fn find_in(&mut self, module_path: &str, name: &str) -> Option<DeclId> {
        if let Some(id) = self.catalog.find_in_module(module_path, name) {
            return Some(id);
        }
        self.catalog.ensure_module(module_path);
        self.catalog.find_in_module(module_path, name)
    }
}
