//! The resolved schema. Every type reference is a [TypeId] into the schema's
//! [TypeTable]; programs refer to each other by [ProgramId].

use serde::Serialize;

use crate::element::{Annotations, ConstValueElement, NamespaceScope, Requiredness, StructKind};
use crate::location::Location;
use crate::reporter::Report;
use crate::types::{DefRef, ProgramId, TypeId, TypeKind, TypeNode, TypeTable};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Namespace {
    pub location:  Location,
    pub scope:     NamespaceScope,
    pub namespace: String,
}

/// One `.thrift` file after resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub id:           ProgramId,
    /// File name without the `.thrift` extension; the prefix other programs
    /// use to refer to this one.
    pub name:         String,
    pub location:     Location,
    pub namespaces:   Vec<Namespace>,
    pub includes:     Vec<ProgramId>,
    pub cpp_includes: Vec<String>,
    pub enums:        Vec<EnumType>,
    pub structs:      Vec<StructType>,
    pub services:     Vec<Service>,
    pub typedefs:     Vec<Typedef>,
    pub constants:    Vec<Constant>,
}

impl Program {
    pub fn namespace(&self, scope: &NamespaceScope) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|namespace| namespace.scope == *scope)
            .map(|namespace| namespace.namespace.as_str())
    }

    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.iter().find(|constant| constant.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMember {
    pub name:          String,
    pub value:         i32,
    pub location:      Location,
    pub documentation: String,
    pub annotations:   Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumType {
    pub type_id:       TypeId,
    pub name:          String,
    pub location:      Location,
    pub documentation: String,
    pub members:       Vec<EnumMember>,
    pub annotations:   Annotations,
}

impl EnumType {
    pub fn member(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|member| member.name == name)
    }

    pub fn member_by_value(&self, value: i32) -> Option<&EnumMember> {
        self.members.iter().find(|member| member.value == value)
    }
}

/// How a field's value is hidden when the containing struct is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Redaction {
    None,
    /// Replaced entirely.
    Total,
    /// Replaced by a hash or a size, depending on the type.
    Obfuscate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub id:            i16,
    /// The name after the loader's [FieldNamingPolicy](crate::FieldNamingPolicy).
    pub name:          String,
    /// The name as written in the source.
    pub thrift_name:   String,
    pub type_id:       TypeId,
    pub requiredness:  Requiredness,
    pub default_value: Option<ConstValueElement>,
    pub annotations:   Annotations,
    pub redaction:     Redaction,
    pub documentation: String,
    pub location:      Location,
    pub implicit_id:   bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructType {
    pub type_id:       TypeId,
    pub name:          String,
    pub kind:          StructKind,
    pub location:      Location,
    pub documentation: String,
    pub fields:        Vec<Field>,
    pub annotations:   Annotations,
}

impl StructType {
    pub fn field(&self, id: i16) -> Option<&Field> {
        self.fields.iter().find(|field| field.id == id)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name || field.thrift_name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceMethod {
    pub name:          String,
    pub location:      Location,
    pub documentation: String,
    pub return_type:   TypeId,
    pub parameters:    Vec<Field>,
    pub exceptions:    Vec<Field>,
    pub oneway:        bool,
    pub annotations:   Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub type_id:       TypeId,
    pub name:          String,
    pub location:      Location,
    pub documentation: String,
    /// The parent service's type.
    pub extends:       Option<TypeId>,
    pub methods:       Vec<ServiceMethod>,
    pub annotations:   Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Typedef {
    pub type_id:       TypeId,
    pub name:          String,
    pub location:      Location,
    pub documentation: String,
    pub old_type:      TypeId,
    pub annotations:   Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constant {
    pub name:          String,
    pub location:      Location,
    pub documentation: String,
    pub type_id:       TypeId,
    pub value:         ConstValueElement,
}

/// A fully loaded and validated set of programs. Produced by
/// [Loader::load](crate::Loader::load) and never modified afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    programs: Vec<Program>,
    types:    TypeTable,
    warnings: Vec<Report>,
}

impl Schema {
    pub(crate) fn new(programs: Vec<Program>, types: TypeTable) -> Schema {
        Schema {
            programs,
            types,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn with_warnings(mut self, warnings: Vec<Report>) -> Schema {
        self.warnings = warnings;
        self
    }

    /// Every program, included files before the files that include them.
    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn program(&self, id: ProgramId) -> &Program {
        &self.programs[id.index()]
    }

    pub fn program_named(&self, name: &str) -> Option<&Program> {
        self.programs.iter().find(|program| program.name == name)
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumType> {
        self.programs.iter().flat_map(|program| program.enums.iter())
    }

    fn structs_of_kind(&self, kind: StructKind) -> impl Iterator<Item = &StructType> {
        self.programs
            .iter()
            .flat_map(|program| program.structs.iter())
            .filter(move |s| s.kind == kind)
    }

    pub fn structs(&self) -> impl Iterator<Item = &StructType> {
        self.structs_of_kind(StructKind::Struct)
    }

    pub fn unions(&self) -> impl Iterator<Item = &StructType> {
        self.structs_of_kind(StructKind::Union)
    }

    pub fn exceptions(&self) -> impl Iterator<Item = &StructType> {
        self.structs_of_kind(StructKind::Exception)
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.programs.iter().flat_map(|program| program.services.iter())
    }

    pub fn typedefs(&self) -> impl Iterator<Item = &Typedef> {
        self.programs.iter().flat_map(|program| program.typedefs.iter())
    }

    pub fn constants(&self) -> impl Iterator<Item = &Constant> {
        self.programs.iter().flat_map(|program| program.constants.iter())
    }

    pub fn get_type(&self, id: TypeId) -> &TypeNode {
        self.types.get(id)
    }

    pub fn true_type(&self, id: TypeId) -> TypeId {
        self.types.true_type(id)
    }

    pub fn type_name(&self, id: TypeId) -> &str {
        self.types.type_name(id)
    }

    /// Looks a user type up by `program.Name`.
    pub fn find_type(&self, qualified: &str) -> Option<TypeId> {
        let (program, name) = qualified.rsplit_once('.')?;
        self.types
            .iter()
            .find(|(_, node)| {
                node.name == name
                    && node.original.is_none()
                    && node.program.map(|id| self.program(id).name.as_str()) == Some(program)
            })
            .map(|(id, _)| id)
    }

    /// The enum behind `id`, looking through typedefs.
    pub fn enum_type(&self, id: TypeId) -> Option<&EnumType> {
        match self.get_type(self.true_type(id)).kind {
            TypeKind::Enum(def) => Some(self.enum_def(def)),
            _ => None,
        }
    }

    /// The struct, union or exception behind `id`, looking through typedefs.
    pub fn struct_type(&self, id: TypeId) -> Option<&StructType> {
        match self.get_type(self.true_type(id)).kind {
            TypeKind::Struct(def) => Some(self.struct_def(def)),
            _ => None,
        }
    }

    pub fn service(&self, id: TypeId) -> Option<&Service> {
        match self.get_type(self.types.unannotated(id)).kind {
            TypeKind::Service(def) => Some(&self.program(def.program).services[def.index]),
            _ => None,
        }
    }

    pub fn typedef(&self, id: TypeId) -> Option<&Typedef> {
        match self.get_type(self.types.unannotated(id)).kind {
            TypeKind::Typedef { def, .. } => Some(&self.program(def.program).typedefs[def.index]),
            _ => None,
        }
    }

    fn enum_def(&self, def: DefRef) -> &EnumType {
        &self.program(def.program).enums[def.index]
    }

    fn struct_def(&self, def: DefRef) -> &StructType {
        &self.program(def.program).structs[def.index]
    }

    /// Non-fatal diagnostics from loading, e.g. unknown namespace scopes.
    pub fn warnings(&self) -> &[Report] {
        &self.warnings
    }
}
