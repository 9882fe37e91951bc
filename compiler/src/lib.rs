//! brine-thrift-compiler
//!
//! Loads Thrift IDL into a resolved, validated [Schema]:
//!  1) A tokenizer + parser turning one `.thrift` file into a [ThriftFileElement],
//!  2) A [Loader] that follows includes (rejecting cycles) and orders files,
//!  3) A resolver linking every type reference into a [TypeTable],
//!  4) A verifier for the rules that need the whole schema,
//!  5) Error types ([ThriftError], [LoadError]) and the [ErrorReporter].
//!
//! Example usage:
//!
//! ```
//! use brine_thrift_compiler::Loader;
//!
//! let dir = std::env::temp_dir().join("brine-thrift-doc");
//! std::fs::create_dir_all(&dir).unwrap();
//! std::fs::write(dir.join("point.thrift"), "typedef i32 Coord\nstruct Point { 1: Coord x; 2: Coord y }").unwrap();
//!
//! let schema = Loader::new().add_thrift_file(dir.join("point.thrift")).load().unwrap();
//! let point = schema.structs().next().unwrap();
//! assert_eq!(schema.type_name(schema.true_type(point.fields[0].type_id)), "i32");
//! ```

pub mod element;
pub mod error;
pub mod loader;
pub mod location;
pub mod naming;
pub mod parser;
pub mod reporter;
pub mod schema;
pub mod tokenizer;
pub mod types;
pub mod utils;
pub mod verifier;

mod resolver;

pub use element::*;
pub use error::{LoadError, ThriftError};
pub use loader::Loader;
pub use location::Location;
pub use naming::FieldNamingPolicy;
pub use parser::parse_thrift_file;
pub use reporter::{ErrorReporter, Level, Report};
pub use schema::*;
pub use types::{BuiltinType, DefRef, ProgramId, TypeId, TypeKind, TypeNode, TypeTable};
