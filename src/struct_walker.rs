use crate::api_doc::CoarseType;
use crate::catalog::DeclId;
use crate::source::{last_segment, FieldDecl, TypeBody, TypeExpr, UnitId};
use crate::type_resolver::TypeResolver;
use log::debug;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// One field of an expanded struct.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Serialized name
    pub name: String,
    pub coarse: CoarseType,
    /// Type as written in source, after unwrapping `Option` and pointers
    pub type_name: String,
    pub required: bool,
    /// Synthesized example value, as text
    pub value: String,
    pub remark: String,
    /// Fields of a nested struct, or of an array's element struct
    pub children: Vec<Field>,
}

/// The expansion of a struct: its fields and an example JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTree {
    pub fields: Vec<Field>,
    pub example: Map<String, Value>,
}

impl FieldTree {
    /// All fields depth-first, nested ones named `parent.child`.
    pub fn all_fields(&self) -> Vec<Field> {
        let mut flat = Vec::new();
        flatten_into(&mut flat, "", &self.fields);
        flat
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.example.clone())
    }

    /// Adds a field; a field with the same name is replaced in place.
    fn push(&mut self, field: Field, example: Value) {
        self.example.insert(field.name.clone(), example);
        match self.fields.iter().position(|f| f.name == field.name) {
            Some(pos) => self.fields[pos] = field,
            None => self.fields.push(field),
        }
    }

    fn splice(&mut self, other: FieldTree) {
        let FieldTree { fields, mut example } = other;
        for field in fields {
            let value = example.remove(&field.name).unwrap_or(Value::Null);
            self.push(field, value);
        }
    }
}

fn flatten_into(flat: &mut Vec<Field>, prefix: &str, fields: &[Field]) {
    for field in fields {
        let name = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{}.{}", prefix, field.name)
        };
        let children = field.children.clone();
        flat.push(Field {
            name: name.clone(),
            children: Vec::new(),
            ..field.clone()
        });
        flatten_into(flat, &name, &children);
    }
}

/// What a named type turned out to be.
enum Target {
    Struct(DeclId),
    Alias {
        ty: TypeExpr,
        unit: UnitId,
        path: String,
    },
    Enum(Vec<String>),
    Missing,
}

/// Per-field facts that do not depend on the field's type.
struct Slot {
    name: String,
    required: bool,
    remark: String,
}

impl Slot {
    fn field(&self, coarse: CoarseType, type_name: String, value: &str) -> Field {
        Field {
            name: self.name.clone(),
            coarse,
            type_name,
            required: self.required,
            value: value.to_string(),
            remark: self.remark.clone(),
            children: Vec::new(),
        }
    }
}

/// Struct walker - expands structs into field trees with example values
pub struct StructWalker {
    resolver: TypeResolver,
    /// Full paths of the types currently being expanded, outermost first
    expanding: Vec<String>,
}

impl StructWalker {
    pub fn new(resolver: TypeResolver) -> Self {
        Self {
            resolver,
            expanding: Vec::new(),
        }
    }

    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    /// Resolves `type_name` from `unit` and expands it.
    pub fn expand_named(&mut self, type_name: &str, unit: UnitId) -> Option<FieldTree> {
        let id = self.resolver.resolve(type_name, unit)?;
        self.expand(id)
    }

    /// Expands a struct declaration. Returns `None` for anything that is not a struct.
    pub fn expand(&mut self, id: DeclId) -> Option<FieldTree> {
        let decl = self.resolver.catalog().decl(id);
        let TypeBody::Struct(fields) = &decl.body else {
            debug!("{} is not a struct", decl.full_path());
            return None;
        };

        let full_path = decl.full_path();
        debug!("Expanding struct: {}", full_path);
        self.expanding.push(full_path);

        let mut tree = FieldTree::default();
        for field in fields.iter().filter(|f| !f.skip) {
            if field.flatten {
                if let Some(nested) = self.expand_flattened(&field.ty, decl.unit) {
                    tree.splice(nested);
                }
                continue;
            }
            let (field, example) = self.build_field(field, decl.unit, &decl.name);
            tree.push(field, example);
        }

        self.expanding.pop();
        Some(tree)
    }

    fn is_expanding(&self, id: DeclId) -> bool {
        let path = self.resolver.catalog().decl(id).full_path();
        self.expanding.contains(&path)
    }

    fn expand_flattened(&mut self, ty: &TypeExpr, unit: UnitId) -> Option<FieldTree> {
        let TypeExpr::Named(name) = ty else {
            return None;
        };
        match self.resolve_target(name, unit) {
            Target::Struct(id) if !self.is_expanding(id) => self.expand(id),
            Target::Alias { ty, unit, path } if !self.expanding.contains(&path) => {
                self.expanding.push(path);
                let nested = self.expand_flattened(&ty, unit);
                self.expanding.pop();
                nested
            }
            _ => None,
        }
    }

    fn build_field(&mut self, field: &FieldDecl, unit: UnitId, owner: &str) -> (Field, Value) {
        let slot = Slot {
            name: field.name.clone(),
            required: field.required,
            remark: field.comment.clone(),
        };
        if field.as_text {
            let (mut built, example) = self.build(&slot, &TypeExpr::named("String"), unit, owner);
            built.type_name = field.ty.to_string();
            return (built, example);
        }
        self.build(&slot, &field.ty, unit, owner)
    }

    fn build(&mut self, slot: &Slot, ty: &TypeExpr, unit: UnitId, owner: &str) -> (Field, Value) {
        match ty {
            TypeExpr::Named(name) if CoarseType::is_primitive(name) => scalar(slot, name),
            TypeExpr::Named(name) => self.build_named(slot, name, unit, owner),
            TypeExpr::Array(element) => self.build_array(slot, ty, element, unit, owner),
            TypeExpr::Map(..) => (
                slot.field(CoarseType::Object, ty.to_string(), ""),
                json!({}),
            ),
            TypeExpr::Any | TypeExpr::Unknown => (
                slot.field(CoarseType::Object, ty.to_string(), ""),
                Value::String(slot.remark.clone()),
            ),
        }
    }

    fn build_named(&mut self, slot: &Slot, name: &str, unit: UnitId, owner: &str) -> (Field, Value) {
        match self.resolve_target(name, unit) {
            Target::Struct(id) => {
                let mut field = slot.field(CoarseType::Object, name.to_string(), "");
                if self.is_expanding(id) {
                    debug!("Cycle through {}, leaving it opaque", name);
                    return (field, json!({}));
                }
                match self.expand(id) {
                    Some(tree) => {
                        field.children = tree.fields;
                        (field, Value::Object(tree.example))
                    }
                    None => (field, json!({})),
                }
            }
            Target::Alias { ty, unit, path } if !self.expanding.contains(&path) => {
                self.expanding.push(path);
                let (mut field, example) = self.build(slot, &ty, unit, owner);
                self.expanding.pop();
                field.type_name = name.to_string();
                (field, example)
            }
            Target::Enum(variants) => {
                let example = if slot.remark.is_empty() {
                    variants.first().cloned().unwrap_or_default()
                } else {
                    slot.remark.clone()
                };
                (
                    slot.field(CoarseType::String, name.to_string(), ""),
                    Value::String(example),
                )
            }
            Target::Alias { .. } | Target::Missing => (
                slot.field(CoarseType::classify(name), name.to_string(), ""),
                Value::String(slot.remark.clone()),
            ),
        }
    }

    fn build_array(
        &mut self,
        slot: &Slot,
        ty: &TypeExpr,
        element: &TypeExpr,
        unit: UnitId,
        owner: &str,
    ) -> (Field, Value) {
        let mut field = slot.field(CoarseType::Array, ty.to_string(), "");

        let example = match element {
            TypeExpr::Named(name) if CoarseType::is_primitive(name) => json!([zero(name)]),
            TypeExpr::Named(name) if last_segment(name) == owner => json!([]),
            TypeExpr::Named(name) => match self.resolve_target(name, unit) {
                Target::Struct(id) if !self.is_expanding(id) => match self.expand(id) {
                    Some(tree) => {
                        field.children = tree.fields;
                        json!([Value::Object(tree.example)])
                    }
                    None => json!([]),
                },
                Target::Alias { ty, unit, path } if !self.expanding.contains(&path) => {
                    self.expanding.push(path);
                    let (nested, example) = self.build(slot, &ty, unit, owner);
                    self.expanding.pop();
                    field.children = nested.children;
                    json!([example])
                }
                Target::Enum(variants) => json!([variants.first().cloned().unwrap_or_default()]),
                _ => json!([]),
            },
            TypeExpr::Array(_) => {
                let (nested, example) = self.build(slot, element, unit, owner);
                field.children = nested.children;
                json!([example])
            }
            TypeExpr::Map(..) => json!([{}]),
            TypeExpr::Any | TypeExpr::Unknown => json!([]),
        };

        (field, example)
    }

    fn resolve_target(&mut self, name: &str, unit: UnitId) -> Target {
        let Some(id) = self.resolver.resolve(name, unit) else {
            return Target::Missing;
        };
        let decl = self.resolver.catalog().decl(id);
        match &decl.body {
            TypeBody::Struct(_) => Target::Struct(id),
            TypeBody::Alias(ty) => Target::Alias {
                ty: ty.clone(),
                unit: decl.unit,
                path: decl.full_path(),
            },
            TypeBody::Enum(variants) => Target::Enum(variants.clone()),
        }
    }
}

/// Scalar field: text value plus JSON example.
fn scalar(slot: &Slot, type_name: &str) -> (Field, Value) {
    let coarse = CoarseType::classify(type_name);
    let (value, example) = match coarse {
        CoarseType::Int | CoarseType::Long => ("0", json!(0)),
        CoarseType::Number => ("0.0", json!(0.0)),
        CoarseType::Boolean => ("false", json!(false)),
        _ => ("", Value::String(slot.remark.clone())),
    };
    (slot.field(coarse, type_name.to_string(), value), example)
}

/// Zero element of an array of primitives.
fn zero(type_name: &str) -> Value {
    match CoarseType::classify(type_name) {
        CoarseType::Int | CoarseType::Long => json!(0),
        CoarseType::Number => json!(0.0),
        CoarseType::Boolean => json!(false),
        _ => json!(""),
    }
}
