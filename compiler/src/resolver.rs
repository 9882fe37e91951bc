//! Turns parsed files into [Program]s whose type references are [TypeId]s.
//! Files arrive in include order, so every program a file refers to has
//! already been resolved when its turn comes.

use std::collections::HashMap;

use tracing::debug;

use crate::element::*;
use crate::location::Location;
use crate::naming::FieldNamingPolicy;
use crate::reporter::ErrorReporter;
use crate::schema::*;
use crate::types::{BuiltinType, DefRef, ProgramId, TypeId, TypeKind, TypeTable};
use crate::utils::quote;

pub const MAX_FIELD_ID: i64 = i16::MAX as i64;

const REDACTED: [&str; 2] = ["redacted", "thrifty.redacted"];
const OBFUSCATED: [&str; 2] = ["obfuscated", "thrifty.obfuscated"];

/// A parsed file waiting to be resolved.
pub(crate) struct SourceFile {
    pub element:  ThriftFileElement,
    /// File stem, e.g. `common` for `idl/common.thrift`.
    pub name:     String,
    /// Indexes of the included files in the list handed to [resolve].
    pub includes: Vec<usize>,
}

/// Where a type reference appears; decides whether `void` and service names
/// are acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Usage {
    Value,
    Return,
    Extends,
}

/// Type ids of one program's definitions, in source order.
#[derive(Default)]
struct Declared {
    structs:  Vec<TypeId>,
    typedefs: Vec<TypeId>,
    services: Vec<TypeId>,
}

struct Resolver<'a> {
    policy:   FieldNamingPolicy,
    reporter: &'a mut ErrorReporter,
    types:    TypeTable,
    programs: Vec<Program>,
    /// Per program: user type names to their nodes.
    scopes:   Vec<HashMap<String, TypeId>>,
}

pub(crate) fn resolve(
    files: &[SourceFile],
    policy: FieldNamingPolicy,
    reporter: &mut ErrorReporter,
) -> (Vec<Program>, TypeTable) {
    let mut resolver = Resolver {
        policy,
        reporter,
        types: TypeTable::new(),
        programs: Vec::with_capacity(files.len()),
        scopes: Vec::with_capacity(files.len()),
    };
    for (index, file) in files.iter().enumerate() {
        let id = ProgramId(index as u32);
        debug!(program = %file.name, "resolving");
        let declared = resolver.register(id, file);
        resolver.resolve_program(id, file, declared);
    }
    (resolver.programs, resolver.types)
}

impl<'a> Resolver<'a> {
    fn declare(&mut self, program: ProgramId, name: &str, location: &Location, kind: TypeKind) -> TypeId {
        if BuiltinType::lookup(name).is_some() {
            self.reporter.error(location, format!("{} is a builtin type name", quote(name)));
        }
        let id = self.types.define(name, program, kind);
        let scope = &mut self.scopes[program.index()];
        if scope.contains_key(name) {
            self.reporter.error(location, format!("Duplicate type name {}", quote(name)));
        } else {
            scope.insert(name.to_owned(), id);
        }
        id
    }

    /// Creates the program and a type node for every definition in it, so
    /// that definitions can refer to each other regardless of order.
    fn register(&mut self, id: ProgramId, file: &SourceFile) -> Declared {
        let element = &file.element;
        self.scopes.push(HashMap::new());
        self.programs.push(Program {
            id,
            name: file.name.clone(),
            location: element.location.clone(),
            namespaces: element
                .namespaces
                .iter()
                .map(|namespace| Namespace {
                    location:  namespace.location.clone(),
                    scope:     namespace.scope.clone(),
                    namespace: namespace.namespace.clone(),
                })
                .collect(),
            includes: file.includes.iter().map(|index| ProgramId(*index as u32)).collect(),
            cpp_includes: element.cpp_includes.iter().map(|include| include.path.clone()).collect(),
            enums: Vec::new(),
            structs: Vec::new(),
            services: Vec::new(),
            typedefs: Vec::new(),
            constants: Vec::new(),
        });

        for (index, enum_element) in element.enums.iter().enumerate() {
            let def = DefRef { program: id, index };
            let type_id = self.declare(id, &enum_element.name, &enum_element.location, TypeKind::Enum(def));
            let members = enum_element
                .members
                .iter()
                .map(|member| EnumMember {
                    name:          member.name.clone(),
                    value:         self.enum_value(enum_element, member),
                    location:      member.location.clone(),
                    documentation: member.documentation.clone(),
                    annotations:   member.annotations.clone(),
                })
                .collect();
            self.programs[id.index()].enums.push(EnumType {
                type_id,
                name: enum_element.name.clone(),
                location: enum_element.location.clone(),
                documentation: enum_element.documentation.clone(),
                members,
                annotations: enum_element.annotations.clone(),
            });
        }
        let mut declared = Declared::default();
        for (index, struct_element) in element.structs.iter().enumerate() {
            let def = DefRef { program: id, index };
            let kind = TypeKind::Struct(def);
            declared.structs.push(self.declare(id, &struct_element.name, &struct_element.location, kind));
        }
        for (index, typedef) in element.typedefs.iter().enumerate() {
            let def = DefRef { program: id, index };
            let kind = TypeKind::Typedef { def, old: TypeId::VOID };
            declared.typedefs.push(self.declare(id, &typedef.new_name, &typedef.location, kind));
        }
        for (index, service) in element.services.iter().enumerate() {
            let def = DefRef { program: id, index };
            let kind = TypeKind::Service(def);
            declared.services.push(self.declare(id, &service.name, &service.location, kind));
        }
        declared
    }

    fn enum_value(&mut self, enum_element: &EnumElement, member: &EnumMemberElement) -> i32 {
        i32::try_from(member.value).unwrap_or_else(|_| {
            self.reporter.error(
                &member.location,
                format!(
                    "Value {} of {}.{} does not fit in 32 bits",
                    member.value, enum_element.name, member.name
                ),
            );
            0
        })
    }

    fn resolve_program(&mut self, id: ProgramId, file: &SourceFile, declared: Declared) {
        let element = &file.element;

        for (typedef, type_id) in element.typedefs.iter().zip(declared.typedefs) {
            let old_type = if typedef.old_type.kind == TypeElementKind::Named("void".to_owned()) {
                self.reporter.error(
                    &typedef.location,
                    format!("Typedef {} cannot alias void", quote(&typedef.new_name)),
                );
                TypeId::VOID
            } else {
                self.resolve_type(id, &typedef.old_type, Usage::Value)
                    .unwrap_or(TypeId::VOID)
            };
            self.types.set_typedef_target(type_id, old_type);
            self.programs[id.index()].typedefs.push(Typedef {
                type_id,
                name: typedef.new_name.clone(),
                location: typedef.location.clone(),
                documentation: typedef.documentation.clone(),
                old_type,
                annotations: typedef.annotations.clone(),
            });
        }

        for (struct_element, type_id) in element.structs.iter().zip(declared.structs) {
            let fields = self.resolve_fields(id, &struct_element.fields);
            self.programs[id.index()].structs.push(StructType {
                type_id,
                name: struct_element.name.clone(),
                kind: struct_element.kind,
                location: struct_element.location.clone(),
                documentation: struct_element.documentation.clone(),
                fields,
                annotations: struct_element.annotations.clone(),
            });
        }

        for (service, type_id) in element.services.iter().zip(declared.services) {
            let extends = service
                .extends
                .as_ref()
                .and_then(|parent| self.resolve_type(id, parent, Usage::Extends));
            let methods = service
                .functions
                .iter()
                .map(|function| self.resolve_method(id, function))
                .collect();
            self.programs[id.index()].services.push(Service {
                type_id,
                name: service.name.clone(),
                location: service.location.clone(),
                documentation: service.documentation.clone(),
                extends,
                methods,
                annotations: service.annotations.clone(),
            });
        }

        for constant in &element.constants {
            if self.programs[id.index()].constant(&constant.name).is_some() {
                self.reporter.error(
                    &constant.location,
                    format!("Duplicate constant name {}", quote(&constant.name)),
                );
                continue;
            }
            let type_id = self
                .resolve_type(id, &constant.const_type, Usage::Value)
                .unwrap_or(TypeId::VOID);
            self.programs[id.index()].constants.push(Constant {
                name: constant.name.clone(),
                location: constant.location.clone(),
                documentation: constant.documentation.clone(),
                type_id,
                value: constant.value.clone(),
            });
        }
    }

    fn resolve_method(&mut self, id: ProgramId, function: &FunctionElement) -> ServiceMethod {
        let return_type = self
            .resolve_type(id, &function.return_type, Usage::Return)
            .unwrap_or(TypeId::VOID);
        ServiceMethod {
            name: function.name.clone(),
            location: function.location.clone(),
            documentation: function.documentation.clone(),
            return_type,
            parameters: self.resolve_fields(id, &function.params),
            exceptions: self.resolve_fields(id, &function.exceptions),
            oneway: function.one_way,
            annotations: function.annotations.clone(),
        }
    }

    fn resolve_fields(&mut self, id: ProgramId, elements: &[FieldElement]) -> Vec<Field> {
        let mut fields = Vec::with_capacity(elements.len());
        for element in elements {
            if element.field_id < 1 || element.field_id > MAX_FIELD_ID {
                self.reporter.error(
                    &element.location,
                    format!(
                        "Field id {} of {} is out of range 1..={}",
                        element.field_id,
                        quote(&element.name),
                        MAX_FIELD_ID
                    ),
                );
                continue;
            }
            if element.implicit_id {
                self.reporter.warn(
                    &element.location,
                    format!(
                        "Field {} has no explicit id, assigned id {}",
                        quote(&element.name),
                        element.field_id
                    ),
                );
            }
            let type_id = match self.resolve_type(id, &element.field_type, Usage::Value) {
                Some(type_id) => type_id,
                None => continue,
            };

            fields.push(Field {
                id: element.field_id as i16,
                name: self.policy.apply(&element.name),
                thrift_name: element.name.clone(),
                type_id,
                requiredness: element.requiredness,
                default_value: element.const_value.clone(),
                annotations: element.annotations.clone(),
                redaction: self.redaction(element),
                documentation: element.documentation.clone(),
                location: element.location.clone(),
                implicit_id: element.implicit_id,
            });
        }
        fields
    }

    fn redaction(&mut self, element: &FieldElement) -> Redaction {
        let marked = |keys: &[&str; 2], tag: &str| {
            keys.iter().any(|key| {
                element.annotations.contains_key(*key)
                    || element.field_type.annotations.contains_key(*key)
            }) || element.documentation.contains(tag)
        };
        match (marked(&REDACTED, "@redacted"), marked(&OBFUSCATED, "@obfuscated")) {
            (true, true) => {
                self.reporter.error(
                    &element.location,
                    format!("Field {} cannot be both redacted and obfuscated", quote(&element.name)),
                );
                Redaction::None
            }
            (true, false) => Redaction::Total,
            (false, true) => Redaction::Obfuscate,
            (false, false) => Redaction::None,
        }
    }

    fn resolve_type(&mut self, id: ProgramId, element: &TypeElement, usage: Usage) -> Option<TypeId> {
        let resolved = match &element.kind {
            TypeElementKind::Named(name) => self.resolve_name(id, name, &element.location, usage)?,
            TypeElementKind::List(inner) => {
                let inner = self.resolve_type(id, inner, Usage::Value)?;
                self.types.container(TypeKind::List(inner))
            }
            TypeElementKind::Set(inner) => {
                let inner = self.resolve_type(id, inner, Usage::Value)?;
                self.types.container(TypeKind::Set(inner))
            }
            TypeElementKind::Map(key, value) => {
                let key = self.resolve_type(id, key, Usage::Value);
                let value = self.resolve_type(id, value, Usage::Value);
                self.types.container(TypeKind::Map { key: key?, value: value? })
            }
        };
        Some(self.types.annotate(resolved, &element.annotations))
    }

    fn resolve_name(&mut self, id: ProgramId, name: &str, location: &Location, usage: Usage) -> Option<TypeId> {
        if let Some(builtin) = BuiltinType::lookup(name) {
            return match (builtin, usage) {
                (TypeId::VOID, Usage::Return) => Some(builtin),
                (TypeId::VOID, _) => {
                    self.reporter.error(location, "void is only allowed as a method return type");
                    None
                }
                (_, Usage::Extends) => {
                    self.reporter.error(location, format!("{} is not a service", quote(name)));
                    None
                }
                _ => Some(builtin),
            };
        }

        let found = match name.rsplit_once('.') {
            Some((prefix, local)) => {
                let included = self.programs[id.index()]
                    .includes
                    .iter()
                    .find(|included| self.programs[included.index()].name == prefix)
                    .copied();
                match included {
                    Some(included) => self.scopes[included.index()].get(local).copied(),
                    None => {
                        self.reporter.error(
                            location,
                            format!("Unknown include prefix {} in {}", quote(prefix), quote(name)),
                        );
                        return None;
                    }
                }
            }
            None => self.scopes[id.index()].get(name).copied(),
        };

        let type_id = match found {
            Some(type_id) => type_id,
            None => {
                self.reporter.error(location, format!("Unknown type {}", quote(name)));
                return None;
            }
        };

        let is_service = matches!(self.types.get(type_id).kind, TypeKind::Service(_));
        match (is_service, usage) {
            (true, Usage::Extends) | (false, Usage::Value) | (false, Usage::Return) => Some(type_id),
            (false, Usage::Extends) => {
                self.reporter.error(location, format!("{} is not a service", quote(name)));
                None
            }
            (true, _) => {
                self.reporter.error(
                    location,
                    format!("Service {} cannot be used as a value type", quote(name)),
                );
                None
            }
        }
    }
}
