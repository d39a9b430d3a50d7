use crate::source::{
    absolutize, join_path, Decl, FieldDecl, Import, SourceFrontend, SourceUnit, TypeBody,
    TypeDef, TypeExpr,
};
use anyhow::{Context, Result};
use log::debug;
use std::collections::HashSet;
use std::path::Path;
use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::{
    AttrStyle, Attribute, Expr, ExprLit, Fields, GenericArgument, ImplItem, Item, ItemEnum,
    ItemMod, ItemStruct, Lit, Meta, MetaNameValue, PathArguments, PathSegment, Token, Type,
    UseTree,
};

/// Containers that serialize as a sequence of their element type.
const SEQUENCE_TYPES: &[&str] = &[
    "Vec",
    "VecDeque",
    "LinkedList",
    "HashSet",
    "BTreeSet",
    "BinaryHeap",
    "IndexSet",
    "SmallVec",
];

const MAP_TYPES: &[&str] = &["HashMap", "BTreeMap", "IndexMap"];

/// Pointer-like wrappers that serialize as their content.
const WRAPPER_TYPES: &[&str] = &["Box", "Rc", "Arc", "Cow", "RefCell", "Cell", "Mutex", "RwLock"];

/// Front-end for Rust source files, built on `syn`.
///
/// The `RustFrontend` parses a file into a syntax tree and lowers it into [`SourceUnit`]s:
///
/// - `use` trees become [`Import`]s with `crate`/`self`/`super` resolved,
/// - structs, enums and type aliases become [`TypeDef`]s, with serde attributes applied,
/// - free functions and impl methods with doc comments become operations,
/// - doc comments on every other item (and `//!` inner docs) become general declarations.
///
/// Inline `mod name { ... }` blocks produce extra units; `#[cfg(test)]` modules are ignored.
///
/// # Example
///
/// ```
/// use apidoc_from_source::parser::RustFrontend;
/// use apidoc_from_source::source::SourceFrontend;
/// use std::path::Path;
///
/// let units = RustFrontend
///     .parse_source(Path::new("src/lib.rs"), "crate", "/// @url GET /ping\npub fn ping() {}")
///     .unwrap();
/// assert_eq!(units[0].decls.len(), 1);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct RustFrontend;

impl SourceFrontend for RustFrontend {
    fn extension(&self) -> &str {
        "rs"
    }

    /// Parses Rust source text and lowers it.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid Rust syntax.
    fn parse_source(&self, path: &Path, module_path: &str, content: &str) -> Result<Vec<SourceUnit>> {
        debug!("Parsing file: {}", path.display());

        let syntax_tree = syn::parse_file(content)
            .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display()))?;

        let mut units = Vec::new();
        lower_module(path, module_path, &syntax_tree.attrs, &syntax_tree.items, &mut units);

        debug!(
            "Successfully parsed file: {} ({} modules)",
            path.display(),
            units.len()
        );

        Ok(units)
    }
}

fn lower_module(
    path: &Path,
    module_path: &str,
    inner_attrs: &[Attribute],
    items: &[Item],
    units: &mut Vec<SourceUnit>,
) {
    let mut unit = SourceUnit::new(path, module_path);
    push_general(&mut unit, inner_attrs);

    let children: HashSet<String> = items
        .iter()
        .filter_map(|item| match item {
            Item::Mod(m) => Some(m.ident.unraw().to_string()),
            _ => None,
        })
        .collect();

    let mut nested: Vec<&ItemMod> = Vec::new();

    for item in items {
        match item {
            Item::Use(item_use) => {
                let mut prefix = Vec::new();
                collect_imports(
                    &item_use.tree,
                    &mut prefix,
                    module_path,
                    &children,
                    &mut unit.imports,
                );
            }
            Item::Struct(item_struct) => unit.types.push(lower_struct(item_struct)),
            Item::Enum(item_enum) => unit.types.push(lower_enum(item_enum)),
            Item::Type(item_type) => unit.types.push(TypeDef {
                name: item_type.ident.unraw().to_string(),
                body: TypeBody::Alias(lower_type(&item_type.ty)),
            }),
            Item::Fn(item_fn) => {
                if !is_test_only(&item_fn.attrs) {
                    push_operation(&mut unit, &item_fn.sig.ident, &item_fn.attrs);
                }
                continue;
            }
            Item::Impl(item_impl) => {
                push_general(&mut unit, &item_impl.attrs);
                for impl_item in &item_impl.items {
                    if let ImplItem::Fn(method) = impl_item {
                        push_operation(&mut unit, &method.sig.ident, &method.attrs);
                    }
                }
                continue;
            }
            Item::Mod(item_mod) => {
                if is_test_only(&item_mod.attrs) {
                    continue;
                }
                let outer: Vec<Attribute> = item_mod
                    .attrs
                    .iter()
                    .filter(|attr| matches!(attr.style, AttrStyle::Outer))
                    .cloned()
                    .collect();
                push_general(&mut unit, &outer);
                if item_mod.content.is_some() {
                    unit.decls.push(Decl::Module {
                        module_path: join_path(module_path, &item_mod.ident.unraw().to_string()),
                    });
                    nested.push(item_mod);
                }
                continue;
            }
            _ => {}
        }
        push_general(&mut unit, item_attrs(item));
    }

    units.push(unit);

    for item_mod in nested {
        let Some((_, items)) = &item_mod.content else {
            continue;
        };
        let inner: Vec<Attribute> = item_mod
            .attrs
            .iter()
            .filter(|attr| matches!(attr.style, AttrStyle::Inner(_)))
            .cloned()
            .collect();
        let child_path = join_path(module_path, &item_mod.ident.unraw().to_string());
        lower_module(path, &child_path, &inner, items, units);
    }
}

fn push_general(unit: &mut SourceUnit, attrs: &[Attribute]) {
    let docs = doc_lines(attrs);
    if !docs.is_empty() {
        unit.decls.push(Decl::General { docs });
    }
}

fn push_operation(unit: &mut SourceUnit, ident: &syn::Ident, attrs: &[Attribute]) {
    let docs = doc_lines(attrs);
    if !docs.is_empty() {
        unit.decls.push(Decl::Operation {
            name: ident.unraw().to_string(),
            docs,
        });
    }
}

fn item_attrs(item: &Item) -> &[Attribute] {
    match item {
        Item::Const(i) => &i.attrs,
        Item::Enum(i) => &i.attrs,
        Item::ExternCrate(i) => &i.attrs,
        Item::ForeignMod(i) => &i.attrs,
        Item::Macro(i) => &i.attrs,
        Item::Static(i) => &i.attrs,
        Item::Struct(i) => &i.attrs,
        Item::Trait(i) => &i.attrs,
        Item::TraitAlias(i) => &i.attrs,
        Item::Type(i) => &i.attrs,
        Item::Union(i) => &i.attrs,
        Item::Use(i) => &i.attrs,
        _ => &[],
    }
}

/// Raw doc-comment lines, one entry per source line.
fn doc_lines(attrs: &[Attribute]) -> Vec<String> {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let Meta::NameValue(name_value) = &attr.meta {
            if let Some(text) = lit_str(&name_value.value) {
                lines.extend(text.lines().map(str::to_string));
            }
        }
    }
    lines
}

fn is_test_only(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| {
        attr.path().is_ident("test")
            || (attr.path().is_ident("cfg")
                && matches!(&attr.meta, Meta::List(list) if list.tokens.to_string().trim() == "test"))
    })
}

fn collect_imports(
    tree: &UseTree,
    prefix: &mut Vec<String>,
    module_path: &str,
    children: &HashSet<String>,
    imports: &mut Vec<Import>,
) {
    match tree {
        UseTree::Path(use_path) => {
            prefix.push(use_path.ident.unraw().to_string());
            collect_imports(&use_path.tree, prefix, module_path, children, imports);
            prefix.pop();
        }
        UseTree::Name(use_name) => {
            let name = use_name.ident.unraw().to_string();
            if let Some(path) = named_import_path(prefix, &name, module_path, children) {
                imports.push(Import::named(path, None));
            }
        }
        UseTree::Rename(use_rename) => {
            let rename = use_rename.rename.unraw().to_string();
            if rename == "_" {
                return;
            }
            let name = use_rename.ident.unraw().to_string();
            if let Some(path) = named_import_path(prefix, &name, module_path, children) {
                imports.push(Import::named(path, Some(rename)));
            }
        }
        UseTree::Glob(_) => {
            if !prefix.is_empty() {
                imports.push(Import::glob(import_path(prefix, module_path, children)));
            }
        }
        UseTree::Group(group) => {
            for item in &group.items {
                collect_imports(item, prefix, module_path, children, imports);
            }
        }
    }
}

fn named_import_path(
    prefix: &[String],
    name: &str,
    module_path: &str,
    children: &HashSet<String>,
) -> Option<String> {
    if name == "self" {
        // `use a::b::{self}` imports the module `a::b`
        if prefix.is_empty() {
            return None;
        }
        return Some(import_path(prefix, module_path, children));
    }
    let mut segments = prefix.to_vec();
    segments.push(name.to_string());
    Some(import_path(&segments, module_path, children))
}

/// Makes a `use` path absolute. Paths starting at a child module of the current one are
/// relative to it.
fn import_path(segments: &[String], module_path: &str, children: &HashSet<String>) -> String {
    let path = segments.join("::");
    match segments.first() {
        Some(first) if children.contains(first) => join_path(module_path, &path),
        _ => absolutize(&path, module_path),
    }
}

fn lower_struct(item: &ItemStruct) -> TypeDef {
    let container = SerdeAttrs::parse(&item.attrs);

    let body = match &item.fields {
        Fields::Named(named) => {
            let fields: Vec<FieldDecl> = named
                .named
                .iter()
                .map(|field| lower_field(field, container.rename_all))
                .collect();
            if container.transparent {
                match fields.iter().find(|f| !f.skip) {
                    Some(inner) if inner.as_text => TypeBody::Alias(TypeExpr::named("String")),
                    Some(inner) => TypeBody::Alias(inner.ty.clone()),
                    None => TypeBody::Struct(fields),
                }
            } else {
                TypeBody::Struct(fields)
            }
        }
        Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
            let inner = unnamed.unnamed.first().map(|f| lower_type(&f.ty));
            TypeBody::Alias(inner.unwrap_or_default())
        }
        // Tuple structs serialize as arrays
        Fields::Unnamed(_) => TypeBody::Alias(TypeExpr::array(TypeExpr::Unknown)),
        Fields::Unit => TypeBody::Struct(Vec::new()),
    };

    TypeDef {
        name: item.ident.unraw().to_string(),
        body,
    }
}

fn lower_field(field: &syn::Field, rename_all: Option<RenameRule>) -> FieldDecl {
    let ident = field
        .ident
        .as_ref()
        .map(|ident| ident.unraw().to_string())
        .unwrap_or_default();
    let serde = SerdeAttrs::parse(&field.attrs);
    let ty = lower_type(&field.ty);

    let name = match (serde.rename, rename_all) {
        (Some(rename), _) => rename,
        (None, Some(rule)) => rule.apply_to_field(&ident),
        (None, None) => ident.clone(),
    };

    let comment = doc_lines(&field.attrs)
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    FieldDecl {
        ident,
        name,
        ty,
        required: mentions_required(&field.attrs),
        as_text: serde.as_text,
        flatten: serde.flatten,
        skip: serde.skip,
        comment,
    }
}

fn lower_enum(item: &ItemEnum) -> TypeDef {
    let container = SerdeAttrs::parse(&item.attrs);

    let unit_only = item
        .variants
        .iter()
        .all(|variant| matches!(variant.fields, Fields::Unit));

    let body = if unit_only {
        let variants = item
            .variants
            .iter()
            .filter_map(|variant| {
                let attrs = SerdeAttrs::parse(&variant.attrs);
                if attrs.skip {
                    return None;
                }
                let ident = variant.ident.unraw().to_string();
                Some(match (attrs.rename, container.rename_all) {
                    (Some(rename), _) => rename,
                    (None, Some(rule)) => rule.apply_to_variant(&ident),
                    (None, None) => ident,
                })
            })
            .collect();
        TypeBody::Enum(variants)
    } else {
        TypeBody::Alias(TypeExpr::Any)
    };

    TypeDef {
        name: item.ident.unraw().to_string(),
        body,
    }
}

fn type_args(segment: &PathSegment) -> Vec<&Type> {
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn lower_type(ty: &Type) -> TypeExpr {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => lower_path(&type_path.path),
        Type::Reference(reference) => lower_type(&reference.elem),
        Type::Slice(slice) => TypeExpr::array(lower_type(&slice.elem)),
        Type::Array(array) => TypeExpr::array(lower_type(&array.elem)),
        Type::Paren(paren) => lower_type(&paren.elem),
        Type::Group(group) => lower_type(&group.elem),
        _ => TypeExpr::Unknown,
    }
}

fn lower_path(path: &syn::Path) -> TypeExpr {
    let Some(last) = path.segments.last() else {
        return TypeExpr::Unknown;
    };
    let ident = last.ident.unraw().to_string();
    let args = type_args(last);
    let first_arg = || args.first().map(|ty| lower_type(ty)).unwrap_or_default();

    match ident.as_str() {
        "Option" => first_arg(),
        name if WRAPPER_TYPES.contains(&name) => first_arg(),
        name if SEQUENCE_TYPES.contains(&name) => TypeExpr::array(first_arg()),
        name if MAP_TYPES.contains(&name) => {
            let value = args.get(1).map(|ty| lower_type(ty)).unwrap_or_default();
            TypeExpr::Map(Box::new(first_arg()), Box::new(value))
        }
        "Value" if path.segments.iter().any(|s| s.ident == "serde_json") => TypeExpr::Any,
        _ => TypeExpr::Named(
            path.segments
                .iter()
                .map(|segment| segment.ident.unraw().to_string())
                .collect::<Vec<_>>()
                .join("::"),
        ),
    }
}

/// Whether any list-style attribute of the field mentions `required`,
/// e.g. `#[validate(required)]`.
fn mentions_required(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| match &attr.meta {
        Meta::List(list) => list.tokens.to_string().contains("required"),
        _ => false,
    })
}

fn lit_str(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Some(s.value()),
        _ => None,
    }
}

/// The serde attributes that change how a type is serialized.
#[derive(Debug, Default)]
struct SerdeAttrs {
    rename: Option<String>,
    rename_all: Option<RenameRule>,
    skip: bool,
    flatten: bool,
    transparent: bool,
    as_text: bool,
}

impl SerdeAttrs {
    fn parse(attrs: &[Attribute]) -> Self {
        let mut parsed = Self::default();

        for attr in attrs {
            if attr.path().is_ident("serde_as") {
                // #[serde_as(as = "DisplayFromStr")]
                if let Meta::List(list) = &attr.meta {
                    if list.tokens.to_string().contains("DisplayFromStr") {
                        parsed.as_text = true;
                    }
                }
                continue;
            }
            if !attr.path().is_ident("serde") {
                continue;
            }
            let Ok(metas) = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
            else {
                continue;
            };
            for meta in &metas {
                parsed.apply(meta);
            }
        }

        parsed
    }

    fn apply(&mut self, meta: &Meta) {
        match meta {
            Meta::Path(path) => {
                if path.is_ident("skip") || path.is_ident("skip_serializing") {
                    self.skip = true;
                } else if path.is_ident("flatten") {
                    self.flatten = true;
                } else if path.is_ident("transparent") {
                    self.transparent = true;
                }
            }
            Meta::NameValue(name_value) => {
                let Some(value) = lit_str(&name_value.value) else {
                    return;
                };
                if name_value.path.is_ident("rename") {
                    self.rename = Some(value);
                } else if name_value.path.is_ident("rename_all") {
                    self.rename_all = RenameRule::from_str(&value);
                } else if name_value.path.is_ident("with") || name_value.path.is_ident("serialize_with") {
                    self.as_text |= is_text_codec(&value);
                }
            }
            Meta::List(list) => {
                // rename(serialize = "..", deserialize = "..")
                let Ok(pairs) =
                    list.parse_args_with(Punctuated::<MetaNameValue, Token![,]>::parse_terminated)
                else {
                    return;
                };
                for pair in &pairs {
                    if !pair.path.is_ident("serialize") {
                        continue;
                    }
                    let Some(value) = lit_str(&pair.value) else {
                        continue;
                    };
                    if list.path.is_ident("rename") {
                        self.rename = Some(value);
                    } else if list.path.is_ident("rename_all") {
                        self.rename_all = RenameRule::from_str(&value);
                    }
                }
            }
        }
    }
}

fn is_text_codec(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.contains("string") || lower.contains("display")
}

/// `rename_all` case conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn from_str(rule: &str) -> Option<Self> {
        match rule {
            "lowercase" => Some(RenameRule::Lower),
            "UPPERCASE" => Some(RenameRule::Upper),
            "PascalCase" => Some(RenameRule::Pascal),
            "camelCase" => Some(RenameRule::Camel),
            "snake_case" => Some(RenameRule::Snake),
            "SCREAMING_SNAKE_CASE" => Some(RenameRule::ScreamingSnake),
            "kebab-case" => Some(RenameRule::Kebab),
            "SCREAMING-KEBAB-CASE" => Some(RenameRule::ScreamingKebab),
            _ => None,
        }
    }

    /// Applies the rule to a `snake_case` field name.
    fn apply_to_field(self, field: &str) -> String {
        match self {
            RenameRule::Lower | RenameRule::Snake => field.to_string(),
            RenameRule::Upper | RenameRule::ScreamingSnake => field.to_ascii_uppercase(),
            RenameRule::Pascal => {
                let mut pascal = String::new();
                let mut capitalize = true;
                for ch in field.chars() {
                    if ch == '_' {
                        capitalize = true;
                    } else if capitalize {
                        pascal.push(ch.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        pascal.push(ch);
                    }
                }
                pascal
            }
            RenameRule::Camel => lower_first(&RenameRule::Pascal.apply_to_field(field)),
            RenameRule::Kebab => field.replace('_', "-"),
            RenameRule::ScreamingKebab => field.to_ascii_uppercase().replace('_', "-"),
        }
    }

    /// Applies the rule to a `PascalCase` variant name.
    fn apply_to_variant(self, variant: &str) -> String {
        match self {
            RenameRule::Pascal => variant.to_string(),
            RenameRule::Lower => variant.to_ascii_lowercase(),
            RenameRule::Upper => variant.to_ascii_uppercase(),
            RenameRule::Camel => lower_first(variant),
            RenameRule::Snake => {
                let mut snake = String::new();
                for (i, ch) in variant.char_indices() {
                    if i > 0 && ch.is_uppercase() {
                        snake.push('_');
                    }
                    snake.push(ch.to_ascii_lowercase());
                }
                snake
            }
            RenameRule::ScreamingSnake => RenameRule::Snake.apply_to_variant(variant).to_ascii_uppercase(),
            RenameRule::Kebab => RenameRule::Snake.apply_to_variant(variant).replace('_', "-"),
            RenameRule::ScreamingKebab => RenameRule::ScreamingSnake
                .apply_to_variant(variant)
                .replace('_', "-"),
        }
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
