//! Checks that run once every reference in a schema has been resolved.

use std::collections::{HashMap, HashSet};

use crate::element::{ConstValueElement, ConstValueKind, Requiredness, StructKind};
use crate::reporter::ErrorReporter;
use crate::schema::{EnumType, Field, Schema, Service};
use crate::types::{BuiltinType, ProgramId, TypeId, TypeKind};
use crate::utils::quote;

/// Reports every problem in `schema` to `reporter`.
pub fn verify_schema(schema: &Schema, reporter: &mut ErrorReporter) {
    let mut verifier = Verifier { schema, reporter };
    verifier.check_typedef_cycles();
    for program in schema.programs() {
        for enum_type in &program.enums {
            verifier.check_enum_values(enum_type);
        }
        for struct_type in &program.structs {
            let owner = format!("{} {}", kind_name(struct_type.kind), quote(&struct_type.name));
            verifier.check_fields(program.id, &struct_type.fields, &owner);
            if struct_type.kind == StructKind::Union {
                verifier.check_union(&struct_type.name, &struct_type.fields);
            }
        }
        for service in &program.services {
            verifier.check_service(program.id, service);
        }
        for constant in &program.constants {
            let what = format!("constant {}", quote(&constant.name));
            verifier.check_value(program.id, constant.type_id, &constant.value, &what);
        }
    }
}

fn kind_name(kind: StructKind) -> &'static str {
    match kind {
        StructKind::Struct => "struct",
        StructKind::Union => "union",
        StructKind::Exception => "exception",
    }
}

struct Verifier<'a> {
    schema:   &'a Schema,
    reporter: &'a mut ErrorReporter,
}

impl<'a> Verifier<'a> {
    fn check_typedef_cycles(&mut self) {
        let types = self.schema.types();
        for typedef in self.schema.typedefs() {
            let start = typedef.type_id;
            let mut chain = vec![start];
            let mut current = types.unannotated(typedef.old_type);
            while let TypeKind::Typedef { old, .. } = types.get(current).kind {
                if current == start {
                    // One report per cycle, from its lowest node.
                    if chain.iter().all(|id| *id >= start) {
                        let mut names: Vec<&str> = chain.iter().map(|id| types.type_name(*id)).collect();
                        names.push(types.type_name(start));
                        self.reporter.error(
                            &typedef.location,
                            format!("Circular typedef detected: {}", names.join(" -> ")),
                        );
                    }
                    break;
                }
                if chain.contains(&current) {
                    // A cycle further down the chain; reported from there.
                    break;
                }
                chain.push(current);
                current = types.unannotated(old);
            }
        }
    }

    fn check_enum_values(&mut self, enum_type: &EnumType) {
        let mut seen: HashMap<i32, &str> = HashMap::new();
        for member in &enum_type.members {
            if let Some(previous) = seen.insert(member.value, &member.name) {
                self.reporter.warn(
                    &member.location,
                    format!(
                        "{}.{} has the same value ({}) as {}.{}",
                        enum_type.name, member.name, member.value, enum_type.name, previous
                    ),
                );
            }
        }
    }

    /// Ids and names unique within one struct, parameter list or throws
    /// list; default values compatible with their field types.
    fn check_fields(&mut self, program: ProgramId, fields: &[Field], owner: &str) {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for field in fields {
            if !ids.insert(field.id) {
                self.reporter.error(
                    &field.location,
                    format!("Duplicate field id {} in {}", field.id, owner),
                );
            }
            if !names.insert(field.name.as_str()) {
                self.reporter.error(
                    &field.location,
                    format!("Duplicate field name {} in {}", quote(&field.name), owner),
                );
            }
            if let Some(default) = &field.default_value {
                let what = format!("default value of field {}", quote(&field.name));
                self.check_value(program, field.type_id, default, &what);
            }
        }
    }

    fn check_union(&mut self, name: &str, fields: &[Field]) {
        let mut defaults = 0;
        for field in fields {
            if field.requiredness == Requiredness::Required {
                self.reporter.error(
                    &field.location,
                    format!("Union {} cannot have required field {}", quote(name), quote(&field.name)),
                );
            }
            if field.default_value.is_some() {
                defaults += 1;
                if defaults > 1 {
                    self.reporter.error(
                        &field.location,
                        format!("Union {} can have at most one field with a default value", quote(name)),
                    );
                }
            }
        }
    }

    fn check_service(&mut self, program: ProgramId, service: &Service) {
        // Inheritance: walk parents until the chain ends or comes back.
        let mut visited = vec![service.type_id];
        let mut parent = service.extends;
        while let Some(parent_id) = parent {
            if parent_id == service.type_id {
                self.reporter.error(
                    &service.location,
                    format!("Circular inheritance detected for service {}", quote(&service.name)),
                );
                break;
            }
            if visited.contains(&parent_id) {
                break;
            }
            visited.push(parent_id);
            parent = self.schema.service(parent_id).and_then(|parent| parent.extends);
        }

        let mut names = HashSet::new();
        for method in &service.methods {
            let owner = format!("{}.{}", service.name, method.name);
            if !names.insert(method.name.as_str()) {
                self.reporter.error(
                    &method.location,
                    format!("Duplicate method name {} in service {}", quote(&method.name), quote(&service.name)),
                );
            }

            if method.oneway {
                if method.return_type != TypeId::VOID {
                    self.reporter.error(
                        &method.location,
                        format!("Oneway method {} must return void", owner),
                    );
                }
                if !method.exceptions.is_empty() {
                    self.reporter.error(
                        &method.location,
                        format!("Oneway method {} cannot declare exceptions", owner),
                    );
                }
            }

            self.check_fields(program, &method.parameters, &format!("parameters of {}", owner));
            self.check_fields(program, &method.exceptions, &format!("exceptions of {}", owner));
            for exception in &method.exceptions {
                let is_exception = self
                    .schema
                    .struct_type(exception.type_id)
                    .map_or(false, |s| s.kind == StructKind::Exception);
                if !is_exception {
                    self.reporter.error(
                        &exception.location,
                        format!(
                            "{} in the throws list of {} is not an exception",
                            quote(self.schema.type_name(exception.type_id)),
                            owner
                        ),
                    );
                }
            }
        }
    }

    fn incompatible(&mut self, type_id: TypeId, value: &ConstValueElement, what: &str) {
        self.reporter.error(
            &value.location,
            format!(
                "Value {} of {} is not compatible with type {}",
                describe(value),
                what,
                quote(self.schema.type_name(type_id))
            ),
        );
    }

    /// Whether `value` may initialize a `type_id`. `program` is where the
    /// value was written, for resolving constant references.
    fn check_value(&mut self, program: ProgramId, type_id: TypeId, value: &ConstValueElement, what: &str) {
        let schema = self.schema;
        let true_type = schema.true_type(type_id);

        if let ConstValueKind::Identifier(name) = &value.kind {
            if self.identifier_matches(program, true_type, name) {
                return;
            }
        }

        let ok = match (&schema.get_type(true_type).kind, &value.kind) {
            (TypeKind::Builtin(BuiltinType::Bool), ConstValueKind::Integer(v)) => *v == 0 || *v == 1,
            (TypeKind::Builtin(BuiltinType::Bool), ConstValueKind::Identifier(v)) => v == "true" || v == "false",
            (TypeKind::Builtin(BuiltinType::Byte), ConstValueKind::Integer(v)) => i8::try_from(*v).is_ok(),
            (TypeKind::Builtin(BuiltinType::I16), ConstValueKind::Integer(v)) => i16::try_from(*v).is_ok(),
            (TypeKind::Builtin(BuiltinType::I32), ConstValueKind::Integer(v)) => i32::try_from(*v).is_ok(),
            (TypeKind::Builtin(BuiltinType::I64), ConstValueKind::Integer(_)) => true,
            (TypeKind::Builtin(BuiltinType::Double), ConstValueKind::Integer(_))
            | (TypeKind::Builtin(BuiltinType::Double), ConstValueKind::Double(_)) => true,
            (TypeKind::Builtin(BuiltinType::String), ConstValueKind::Literal(_))
            | (TypeKind::Builtin(BuiltinType::Binary), ConstValueKind::Literal(_)) => true,
            (TypeKind::Enum(_), ConstValueKind::Integer(v)) => schema
                .enum_type(true_type)
                .map_or(false, |e| i32::try_from(*v).ok().and_then(|v| e.member_by_value(v)).is_some()),
            (TypeKind::List(element), ConstValueKind::List(values))
            | (TypeKind::Set(element), ConstValueKind::List(values)) => {
                for item in values {
                    self.check_value(program, *element, item, what);
                }
                true
            }
            (TypeKind::Map { key, value: value_type }, ConstValueKind::Map(entries)) => {
                for (k, v) in entries {
                    self.check_value(program, *key, k, what);
                    self.check_value(program, *value_type, v, what);
                }
                true
            }
            (TypeKind::Struct(_), ConstValueKind::Map(entries)) => {
                self.check_struct_value(program, true_type, entries, what);
                true
            }
            _ => false,
        };

        if !ok {
            self.incompatible(type_id, value, what);
        }
    }

    fn check_struct_value(
        &mut self,
        program: ProgramId,
        struct_id: TypeId,
        entries: &[(ConstValueElement, ConstValueElement)],
        what: &str,
    ) {
        let schema = self.schema;
        let struct_type = match schema.struct_type(struct_id) {
            Some(struct_type) => struct_type,
            None => return,
        };
        for (key, value) in entries {
            let field = match &key.kind {
                ConstValueKind::Literal(name) => struct_type.field_by_name(name),
                _ => None,
            };
            match field {
                Some(field) => self.check_value(program, field.type_id, value, what),
                None => self.reporter.error(
                    &key.location,
                    format!("{} in {} is not a field of {}", describe(key), what, quote(&struct_type.name)),
                ),
            }
        }
    }

    /// An identifier is an enum member (`Enum.MEMBER`, optionally prefixed by
    /// a program name) or a reference to a constant of the same true type.
    fn identifier_matches(&self, program: ProgramId, true_type: TypeId, name: &str) -> bool {
        let schema = self.schema;

        if let Some(enum_type) = schema.enum_type(true_type) {
            if let Some((prefix, member)) = name.rsplit_once('.') {
                let enum_name = prefix.rsplit('.').next().unwrap_or(prefix);
                if enum_name == enum_type.name && enum_type.member(member).is_some() {
                    return true;
                }
            }
        }

        match self.find_constant(program, name) {
            Some(constant_type) => schema.true_type(constant_type) == true_type,
            None => false,
        }
    }

    fn find_constant(&self, program: ProgramId, name: &str) -> Option<TypeId> {
        let current = self.schema.program(program);
        let (owner, local) = match name.rsplit_once('.') {
            Some((prefix, local)) => {
                let included = current
                    .includes
                    .iter()
                    .map(|id| self.schema.program(*id))
                    .find(|included| included.name == prefix)?;
                (included, local)
            }
            None => (current, name),
        };
        owner.constant(local).map(|constant| constant.type_id)
    }
}

fn describe(value: &ConstValueElement) -> String {
    match &value.kind {
        ConstValueKind::Integer(v) => v.to_string(),
        ConstValueKind::Double(v) => format!("{:?}", v),
        ConstValueKind::Literal(v) => quote(v),
        ConstValueKind::Identifier(v) => v.clone(),
        ConstValueKind::List(_) => "[...]".to_owned(),
        ConstValueKind::Map(_) => "{...}".to_owned(),
    }
}
