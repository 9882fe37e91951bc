use std::collections::HashMap;

use serde::Serialize;

use crate::element::Annotations;

/// Handle of a node in a [TypeTable].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const BOOL:   TypeId = TypeId(0);
    /// `byte` and `i8` are the same type.
    pub const BYTE:   TypeId = TypeId(1);
    pub const I16:    TypeId = TypeId(2);
    pub const I32:    TypeId = TypeId(3);
    pub const I64:    TypeId = TypeId(4);
    pub const DOUBLE: TypeId = TypeId(5);
    pub const STRING: TypeId = TypeId(6);
    pub const BINARY: TypeId = TypeId(7);
    pub const VOID:   TypeId = TypeId(8);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Position of a program in [Schema::programs](crate::Schema::programs),
/// which is also its place in include order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProgramId(pub u32);

impl ProgramId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A definition inside a program: the index into the program's list of
/// enums, structs, services or typedefs, depending on the node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DefRef {
    pub program: ProgramId,
    pub index:   usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BuiltinType {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
    Void,
}

const BUILTINS: [(BuiltinType, &str); 9] = [
    (BuiltinType::Bool, "bool"),
    (BuiltinType::Byte, "byte"),
    (BuiltinType::I16, "i16"),
    (BuiltinType::I32, "i32"),
    (BuiltinType::I64, "i64"),
    (BuiltinType::Double, "double"),
    (BuiltinType::String, "string"),
    (BuiltinType::Binary, "binary"),
    (BuiltinType::Void, "void"),
];

impl BuiltinType {
    /// The fixed id for a builtin type name, if `name` is one.
    pub fn lookup(name: &str) -> Option<TypeId> {
        let name = if name == "i8" { "byte" } else { name };
        BUILTINS
            .iter()
            .position(|(_, builtin)| *builtin == name)
            .map(|index| TypeId(index as u32))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TypeKind {
    Builtin(BuiltinType),
    List(TypeId),
    Set(TypeId),
    Map { key: TypeId, value: TypeId },
    Enum(DefRef),
    /// Structs, unions and exceptions.
    Struct(DefRef),
    Service(DefRef),
    Typedef { def: DefRef, old: TypeId },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeNode {
    pub name:        String,
    /// The defining program; `None` for builtins and containers.
    pub program:     Option<ProgramId>,
    pub kind:        TypeKind,
    pub annotations: Annotations,
    /// Set on annotated copies: the unannotated node this one was made from.
    pub original:    Option<TypeId>,
}

/// Arena of every type in a schema. Builtins sit at the fixed ids on
/// [TypeId]; unannotated containers are interned by structure so that two
/// `list<i32>` references share one node.
#[derive(Debug, Clone, Serialize)]
pub struct TypeTable {
    nodes:      Vec<TypeNode>,
    #[serde(skip)]
    containers: HashMap<TypeKind, TypeId>,
}

impl Default for TypeTable {
    fn default() -> TypeTable {
        TypeTable::new()
    }
}

impl TypeTable {
    pub fn new() -> TypeTable {
        let nodes = BUILTINS
            .iter()
            .map(|(builtin, name)| TypeNode {
                name:        (*name).to_owned(),
                program:     None,
                kind:        TypeKind::Builtin(*builtin),
                annotations: Annotations::new(),
                original:    None,
            })
            .collect();
        TypeTable {
            nodes,
            containers: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: TypeId) -> &TypeNode {
        &self.nodes[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (TypeId(index as u32), node))
    }

    fn push(&mut self, node: TypeNode) -> TypeId {
        let id = TypeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Adds a user-defined enum, struct, service or typedef.
    pub(crate) fn define(&mut self, name: &str, program: ProgramId, kind: TypeKind) -> TypeId {
        self.push(TypeNode {
            name: name.to_owned(),
            program: Some(program),
            kind,
            annotations: Annotations::new(),
            original: None,
        })
    }

    /// Also updates annotated copies made before the target was known.
    pub(crate) fn set_typedef_target(&mut self, id: TypeId, target: TypeId) {
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if index != id.index() && node.original != Some(id) {
                continue;
            }
            if let TypeKind::Typedef { old, .. } = &mut node.kind {
                *old = target;
            }
        }
    }

    /// `list<T>`, `set<T>` or `map<K,V>`, reusing an existing node for the
    /// same structure.
    pub(crate) fn container(&mut self, kind: TypeKind) -> TypeId {
        if let Some(id) = self.containers.get(&kind) {
            return *id;
        }
        let name = match &kind {
            TypeKind::List(element) => format!("list<{}>", self.get(*element).name),
            TypeKind::Set(element) => format!("set<{}>", self.get(*element).name),
            TypeKind::Map { key, value } => {
                format!("map<{},{}>", self.get(*key).name, self.get(*value).name)
            }
            other => format!("{:?}", other),
        };
        let id = self.push(TypeNode {
            name,
            program: None,
            kind: kind.clone(),
            annotations: Annotations::new(),
            original: None,
        });
        self.containers.insert(kind, id);
        id
    }

    /// A copy of `id` carrying `annotations`, or `id` itself when there are
    /// none.
    pub(crate) fn annotate(&mut self, id: TypeId, annotations: &Annotations) -> TypeId {
        if annotations.is_empty() {
            return id;
        }
        let mut node = self.get(id).clone();
        node.annotations.extend(annotations.iter().map(|(k, v)| (k.clone(), v.clone())));
        node.original = Some(self.unannotated(id));
        self.push(node)
    }

    /// Strips annotated copies back to the node they were made from.
    pub fn unannotated(&self, id: TypeId) -> TypeId {
        self.get(id).original.unwrap_or(id)
    }

    /// Follows typedefs until a non-typedef type is reached. A cyclic chain
    /// stops after visiting every node once; such schemas never load.
    ///
    /// Example usage:
    ///
    /// ```
    /// use brine_thrift_compiler::{TypeId, TypeTable};
    ///
    /// let types = TypeTable::new();
    /// assert_eq!(types.true_type(TypeId::I32), TypeId::I32);
    /// assert_eq!(types.type_name(TypeId::BYTE), "byte");
    /// ```
    ///
    pub fn true_type(&self, id: TypeId) -> TypeId {
        let mut current = self.unannotated(id);
        for _ in 0..self.nodes.len() {
            match self.get(current).kind {
                TypeKind::Typedef { old, .. } => current = self.unannotated(old),
                _ => break,
            }
        }
        current
    }

    pub fn type_name(&self, id: TypeId) -> &str {
        &self.get(id).name
    }

    pub fn is_builtin(&self, id: TypeId) -> bool {
        matches!(self.get(id).kind, TypeKind::Builtin(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_have_fixed_ids() {
        let types = TypeTable::new();
        assert_eq!(BuiltinType::lookup("i32"), Some(TypeId::I32));
        assert_eq!(BuiltinType::lookup("i8"), Some(TypeId::BYTE));
        assert_eq!(BuiltinType::lookup("byte"), Some(TypeId::BYTE));
        assert_eq!(BuiltinType::lookup("void"), Some(TypeId::VOID));
        assert_eq!(BuiltinType::lookup("Point"), None);
        assert_eq!(types.get(TypeId::BINARY).kind, TypeKind::Builtin(BuiltinType::Binary));
        assert_eq!(types.len(), 9);
    }

    #[test]
    fn containers_are_interned() {
        let mut types = TypeTable::new();
        let a = types.container(TypeKind::List(TypeId::I32));
        let b = types.container(TypeKind::List(TypeId::I32));
        let c = types.container(TypeKind::Set(TypeId::I32));
        let m = types.container(TypeKind::Map { key: TypeId::STRING, value: a });
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(types.type_name(m), "map<string,list<i32>>");
    }

    #[test]
    fn typedef_chains_and_annotations() {
        let mut types = TypeTable::new();
        let program = ProgramId(0);
        let inner = types.define("Inner", program, TypeKind::Typedef {
            def: DefRef { program, index: 0 },
            old: TypeId::VOID,
        });
        let outer = types.define("Outer", program, TypeKind::Typedef {
            def: DefRef { program, index: 1 },
            old: inner,
        });
        let mut annotations = Annotations::new();
        annotations.insert("note".to_owned(), "x".to_owned());
        let annotated_i64 = types.annotate(TypeId::I64, &annotations);
        types.set_typedef_target(inner, annotated_i64);

        assert_ne!(annotated_i64, TypeId::I64);
        assert_eq!(types.get(annotated_i64).annotations["note"], "x");
        assert_eq!(types.true_type(outer), TypeId::I64);
        assert_eq!(types.annotate(TypeId::I64, &Annotations::new()), TypeId::I64);
    }

    #[test]
    fn annotated_copies_see_late_typedef_targets() {
        let mut types = TypeTable::new();
        let program = ProgramId(0);
        let def = DefRef { program, index: 0 };
        let alias = types.define("B", program, TypeKind::Typedef { def, old: TypeId::VOID });
        let mut annotations = Annotations::new();
        annotations.insert("x".to_owned(), "1".to_owned());
        let annotated = types.annotate(alias, &annotations);
        types.set_typedef_target(alias, TypeId::I32);

        assert_eq!(types.get(annotated).kind, TypeKind::Typedef { def, old: TypeId::I32 });
        assert_eq!(types.get(annotated).original, Some(alias));
    }

    #[test]
    fn cyclic_typedef_terminates() {
        let mut types = TypeTable::new();
        let program = ProgramId(0);
        let def = DefRef { program, index: 0 };
        let looped = types.define("Loop", program, TypeKind::Typedef { def, old: TypeId::VOID });
        types.set_typedef_target(looped, looped);
        assert_eq!(types.true_type(looped), looped);
    }
}
