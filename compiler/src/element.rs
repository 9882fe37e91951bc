//! Parse-level elements. These mirror the source text of one file: names are
//! raw strings and type references are unresolved. They are built once by the
//! parser and never modified.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::location::Location;

/// `(key = "value", ...)` lists. A bare key maps to an empty string.
pub type Annotations = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThriftFileElement {
    pub location:     Location,
    pub namespaces:   Vec<NamespaceElement>,
    pub includes:     Vec<IncludeElement>,
    pub cpp_includes: Vec<IncludeElement>,
    pub typedefs:     Vec<TypedefElement>,
    pub enums:        Vec<EnumElement>,
    pub structs:      Vec<StructElement>,
    pub services:     Vec<ServiceElement>,
    pub constants:    Vec<ConstElement>,
}

impl ThriftFileElement {
    pub fn new(location: Location) -> ThriftFileElement {
        ThriftFileElement {
            location,
            namespaces:   Vec::new(),
            includes:     Vec::new(),
            cpp_includes: Vec::new(),
            typedefs:     Vec::new(),
            enums:        Vec::new(),
            structs:      Vec::new(),
            services:     Vec::new(),
            constants:    Vec::new(),
        }
    }
}

/// The language a `namespace` statement applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum NamespaceScope {
    All,
    Cpp,
    Java,
    Py,
    PyTwisted,
    Perl,
    Rb,
    Cocoa,
    Csharp,
    Netstd,
    Php,
    Js,
    Go,
    Lua,
    Swift,
    Kotlin,
    Dart,
    Delphi,
    Haxe,
    Rs,
    Json,
    Smalltalk,
    Xsd,
    /// A scope this toolchain doesn't know; the raw name is kept.
    Unknown(String),
}

impl NamespaceScope {
    pub fn from_name(name: &str) -> NamespaceScope {
        match name {
            "*"          => NamespaceScope::All,
            "cpp"        => NamespaceScope::Cpp,
            "java"       => NamespaceScope::Java,
            "py"         => NamespaceScope::Py,
            "py.twisted" => NamespaceScope::PyTwisted,
            "perl"       => NamespaceScope::Perl,
            "rb"         => NamespaceScope::Rb,
            "cocoa"      => NamespaceScope::Cocoa,
            "csharp"     => NamespaceScope::Csharp,
            "netstd"     => NamespaceScope::Netstd,
            "php"        => NamespaceScope::Php,
            "js"         => NamespaceScope::Js,
            "go"         => NamespaceScope::Go,
            "lua"        => NamespaceScope::Lua,
            "swift"      => NamespaceScope::Swift,
            "kotlin"     => NamespaceScope::Kotlin,
            "dart"       => NamespaceScope::Dart,
            "delphi"     => NamespaceScope::Delphi,
            "haxe"       => NamespaceScope::Haxe,
            "rs"         => NamespaceScope::Rs,
            "json"       => NamespaceScope::Json,
            "st"         => NamespaceScope::Smalltalk,
            "xsd"        => NamespaceScope::Xsd,
            other        => NamespaceScope::Unknown(other.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceElement {
    pub location:    Location,
    pub scope:       NamespaceScope,
    pub namespace:   String,
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncludeElement {
    pub location: Location,
    pub path:     String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeElementKind {
    /// A builtin or user type name, possibly qualified as `prefix.Name`.
    Named(String),
    List(Box<TypeElement>),
    Set(Box<TypeElement>),
    Map(Box<TypeElement>, Box<TypeElement>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeElement {
    pub location:    Location,
    pub kind:        TypeElementKind,
    pub annotations: Annotations,
}

impl TypeElement {
    /// The type as it would be written in source, e.g. `map<string,list<i32>>`.
    pub fn name(&self) -> String {
        match &self.kind {
            TypeElementKind::Named(name) => name.clone(),
            TypeElementKind::List(element) => format!("list<{}>", element.name()),
            TypeElementKind::Set(element) => format!("set<{}>", element.name()),
            TypeElementKind::Map(key, value) => format!("map<{},{}>", key.name(), value.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedefElement {
    pub location:      Location,
    pub documentation: String,
    pub old_type:      TypeElement,
    pub new_name:      String,
    pub annotations:   Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMemberElement {
    pub location:      Location,
    pub documentation: String,
    pub name:          String,
    /// Explicit, or one more than the previous member (0 for the first).
    pub value:         i64,
    pub annotations:   Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumElement {
    pub location:      Location,
    pub documentation: String,
    pub name:          String,
    pub members:       Vec<EnumMemberElement>,
    pub annotations:   Annotations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StructKind {
    Struct,
    Union,
    Exception,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Requiredness {
    Required,
    Optional,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldElement {
    pub location:      Location,
    pub documentation: String,
    pub field_id:      i64,
    /// True when the source omitted the id and one was assigned.
    pub implicit_id:   bool,
    pub requiredness:  Requiredness,
    pub field_type:    TypeElement,
    pub name:          String,
    pub const_value:   Option<ConstValueElement>,
    pub annotations:   Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructElement {
    pub location:      Location,
    pub documentation: String,
    pub kind:          StructKind,
    pub name:          String,
    pub fields:        Vec<FieldElement>,
    pub annotations:   Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionElement {
    pub location:      Location,
    pub documentation: String,
    pub name:          String,
    pub one_way:       bool,
    pub return_type:   TypeElement,
    pub params:        Vec<FieldElement>,
    pub exceptions:    Vec<FieldElement>,
    pub annotations:   Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceElement {
    pub location:      Location,
    pub documentation: String,
    pub name:          String,
    pub extends:       Option<TypeElement>,
    pub functions:     Vec<FunctionElement>,
    pub annotations:   Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstValueKind {
    Integer(i64),
    Double(f64),
    Literal(String),
    Identifier(String),
    List(Vec<ConstValueElement>),
    Map(Vec<(ConstValueElement, ConstValueElement)>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstValueElement {
    pub location: Location,
    pub kind:     ConstValueKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstElement {
    pub location:      Location,
    pub documentation: String,
    pub const_type:    TypeElement,
    pub name:          String,
    pub value:         ConstValueElement,
}
