use clap::{ArgAction, Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use brine_thrift::{
    decode_to_json, schema_to_json, DecodeOptions, Error, FieldNamingPolicy, Loader, ProtocolKind,
    Schema, TType,
};

#[derive(Parser)]
#[command(name = "bthrift")]
#[command(about = "Check and dump Thrift schemas, or inspect Thrift payloads", long_about = None)]
struct Cli {
    /// More logging on stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SchemaArgs {
    /// `.thrift` files or directories of them; without any, every file under
    /// the include paths is loaded
    files: Vec<PathBuf>,

    /// Directory searched for includes (repeatable)
    #[arg(short = 'I', long = "include")]
    include: Vec<PathBuf>,

    /// Field naming policy: `default` or `java`
    #[arg(long, default_value = "default", value_parser = parse_naming)]
    naming: FieldNamingPolicy,
}

#[derive(Subcommand)]
enum Commands {
    /// Load schemas and report warnings and errors
    Check(SchemaArgs),

    /// Load schemas and print the resolved IR as JSON
    Dump(SchemaArgs),

    /// Decode a payload without a schema and print it as JSON
    Inspect {
        /// File holding the encoded payload
        payload: PathBuf,

        /// Wire encoding: binary, compact or json
        #[arg(short, long, default_value = "binary")]
        protocol: ProtocolKind,

        /// The payload is length-prefixed frames
        #[arg(long)]
        framed: bool,

        /// The payload starts with a message envelope
        #[arg(long)]
        message: bool,

        /// Wire type of the top-level value: struct, list, map, set, string, i32, ...
        #[arg(long = "type", default_value = "struct", value_parser = parse_ttype)]
        root: TType,
    },
}

fn parse_naming(name: &str) -> Result<FieldNamingPolicy, String> {
    FieldNamingPolicy::from_name(name)
        .ok_or_else(|| format!("unknown naming policy {:?}, expected default or java", name))
}

fn parse_ttype(name: &str) -> Result<TType, String> {
    TType::from_name(name).ok_or_else(|| format!("unknown wire type {:?}", name))
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(args: &SchemaArgs) -> Result<Schema, Error> {
    let mut loader = Loader::new().field_naming_policy(args.naming);
    for file in &args.files {
        loader = loader.add_thrift_file(file);
    }
    for dir in &args.include {
        loader = loader.add_include_path(dir);
    }

    match loader.load() {
        Ok(schema) => Ok(schema),
        Err(err) => {
            // Warnings were already logged as they were found.
            for report in err.reporter().errors() {
                eprintln!("{}", report);
            }
            Err(err.into())
        }
    }
}

fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Check(args) => {
            let schema = load(args)?;
            println!(
                "OK: {} program(s), {} warning(s)",
                schema.programs().len(),
                schema.warnings().len()
            );
            Ok(())
        }

        Commands::Dump(args) => {
            let schema = load(args)?;
            info!(programs = schema.programs().len(), "dumping schema");
            println!("{}", schema_to_json(&schema)?);
            Ok(())
        }

        Commands::Inspect {
            payload,
            protocol,
            framed,
            message,
            root,
        } => {
            let data = fs::read(payload)?;
            debug!(bytes = data.len(), %protocol, "decoding payload");
            let options = DecodeOptions {
                protocol: *protocol,
                framed:   *framed,
                message:  *message,
                root:     *root,
            };
            println!("{}", decode_to_json(&data, &options)?);
            Ok(())
        }
    }
}
