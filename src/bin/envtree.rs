//! envtree CLI: inspect how the environment resolves against a schema.

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use envtree_rs::config::Settings;
use envtree_rs::resolver::{DEFAULT_MAX_DEPTH, DEFAULT_SEPARATOR, ResolveOptions};
use envtree_rs::schema::{FieldDefault, FieldSpec, FieldType, Schema};
use envtree_rs::telemetry::{TelemetryConfig, init_telemetry};
use envtree_rs::tree::EnvTree;
use envtree_rs::{Value, resolve_with_diagnostics};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "envtree", about = "Typed configuration from environment variables")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct EnvArgs {
    /// Environment variable prefix (e.g. "APP_")
    #[arg(long, default_value = "")]
    prefix: String,
    /// Field word separator; doubled, it marks nesting
    #[arg(long, default_value = DEFAULT_SEPARATOR)]
    separator: String,
    /// Env file layered under the process environment
    #[arg(long, conflicts_with = "no_env_file")]
    env_file: Option<PathBuf>,
    /// Do not read any env file
    #[arg(long)]
    no_env_file: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a schema file against the environment
    Resolve {
        /// TOML schema definition
        #[arg(long)]
        schema: PathBuf,
        #[command(flatten)]
        env: EnvArgs,
        /// Deepest nesting level instantiated as a nested schema
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,
        /// Top-level fallback, as FIELD=VALUE (repeatable)
        #[arg(long = "default", value_name = "FIELD=VALUE")]
        defaults: Vec<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Print sensitive values unmasked
        #[arg(long)]
        reveal: bool,
    },
    /// Print the env tree built from the environment
    Tree {
        #[command(flatten)]
        env: EnvArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Toml,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env();

    init_telemetry(TelemetryConfig {
        level: settings.log_level.clone(),
        compact: true,
    })?;

    match cli.command {
        Command::Resolve {
            schema,
            env,
            max_depth,
            defaults,
            format,
            reveal,
        } => cmd_resolve(settings, schema, env, max_depth, defaults, format, reveal),
        Command::Tree { env } => cmd_tree(settings, env),
    }
}

fn cmd_resolve(
    settings: Settings,
    schema_path: PathBuf,
    env: EnvArgs,
    max_depth: usize,
    defaults: Vec<String>,
    format: Format,
    reveal: bool,
) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&schema_path)
        .with_context(|| format!("reading {}", schema_path.display()))?;
    let file: SchemaFile = toml::from_str(&source)
        .with_context(|| format!("parsing {}", schema_path.display()))?;
    let schema = SchemaLoader::new(&file.schemas).load(&file.root)?;

    let mut options = ResolveOptions::new(&env.prefix)
        .separator(&env.separator)
        .max_depth(max_depth);
    for pair in &defaults {
        let (field, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid default '{pair}', expected FIELD=VALUE"))?;
        options = options.default_value(field, parse_default(raw));
    }

    let settings = env_settings(settings, &env);
    let snapshot = settings.snapshot(&options.prefix)?;
    let (config, diagnostics) = resolve_with_diagnostics(schema, &snapshot, &options)?;
    for diagnostic in &diagnostics {
        eprintln!("warning: {diagnostic}");
    }

    let dump = if reveal { config.dump() } else { config.printable() };
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&dump)?),
        Format::Toml => print!("{}", render_toml(dump)?),
    }
    Ok(())
}

fn cmd_tree(settings: Settings, env: EnvArgs) -> anyhow::Result<()> {
    let settings = env_settings(settings, &env);
    let snapshot = settings.snapshot(&env.prefix)?;
    let tree = EnvTree::build(&snapshot, &env.separator.repeat(2));
    println!("{}", serde_json::to_string_pretty(&tree)?);
    Ok(())
}

fn env_settings(mut settings: Settings, env: &EnvArgs) -> Settings {
    if env.no_env_file {
        settings.env_file = None;
    } else if let Some(path) = &env.env_file {
        settings.env_file = Some(path.clone());
    }
    settings
}

/// TOML has no null: unset fields are left out of the document.
fn render_toml(dump: serde_json::Map<String, serde_json::Value>) -> anyhow::Result<String> {
    let table = strip_nulls(serde_json::Value::Object(dump));
    Ok(toml::to_string_pretty(&table)?)
}

fn strip_nulls(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Json::Object(map) => Json::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Json::Array(items) => Json::Array(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(strip_nulls)
                .collect(),
        ),
        other => other,
    }
}

/// Command-line defaults: booleans and numbers when they parse, else strings.
fn parse_default(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        return Value::Bool(b);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Int(n);
    }
    if let Ok(x) = raw.parse::<f64>() {
        return Value::Float(x);
    }
    Value::from(raw)
}

// ---------------------------------------------------------------------------
// Schema files
// ---------------------------------------------------------------------------

/// ```toml
/// root = "database"
///
/// [schemas.database]
/// fields = [
///   { name = "host", type = "string", default = "localhost" },
///   { name = "pool", type = "pool", nested_default = true },
/// ]
///
/// [schemas.pool]
/// fields = [{ name = "max_size", type = "int", default = 10 }]
/// ```
#[derive(Deserialize)]
struct SchemaFile {
    root: String,
    schemas: HashMap<String, SchemaDef>,
}

#[derive(Deserialize)]
struct SchemaDef {
    fields: Vec<FieldDef>,
}

#[derive(Deserialize)]
struct FieldDef {
    name: String,
    /// A scalar type name, or the name of another schema in the file.
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    optional: bool,
    default: Option<toml::Value>,
    #[serde(default)]
    nested_default: bool,
}

/// Turns schema definitions into `'static` schemas.
///
/// Schemas are leaked: they live until the process exits.
struct SchemaLoader<'a> {
    defs: &'a HashMap<String, SchemaDef>,
    built: HashMap<String, &'static Schema>,
    visiting: HashSet<String>,
}

impl<'a> SchemaLoader<'a> {
    fn new(defs: &'a HashMap<String, SchemaDef>) -> Self {
        Self {
            defs,
            built: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    fn load(&mut self, name: &str) -> anyhow::Result<&'static Schema> {
        if let Some(schema) = self.built.get(name).copied() {
            return Ok(schema);
        }
        let defs = self.defs;
        let def = defs
            .get(name)
            .ok_or_else(|| anyhow!("unknown schema '{name}'"))?;
        if !self.visiting.insert(name.to_string()) {
            bail!("schema '{name}' refers to itself");
        }

        let mut fields = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            fields.push(
                self.field(field)
                    .with_context(|| format!("schema '{name}', field '{}'", field.name))?,
            );
        }
        self.visiting.remove(name);

        let schema: &'static Schema = Box::leak(Box::new(Schema::new(leak_str(name), fields.leak())));
        self.built.insert(name.to_string(), schema);
        Ok(schema)
    }

    fn field(&mut self, def: &FieldDef) -> anyhow::Result<FieldSpec> {
        let base = match def.ty.as_str() {
            "bool" | "boolean" => FieldType::Bool,
            "int" | "integer" => FieldType::Int,
            "float" => FieldType::Float,
            "str" | "string" => FieldType::Str,
            "list" => FieldType::StrList,
            other => FieldType::Nested(self.load(other)?),
        };
        let ty = if def.optional {
            FieldType::Optional(Box::leak(Box::new(base)))
        } else {
            base
        };

        let spec = FieldSpec::new(leak_str(&def.name), ty);
        if def.nested_default {
            return Ok(spec.default(FieldDefault::Nested));
        }
        match &def.default {
            Some(value) => Ok(spec.default(default_from_toml(value)?)),
            None => Ok(spec),
        }
    }
}

fn default_from_toml(value: &toml::Value) -> anyhow::Result<FieldDefault> {
    Ok(match value {
        toml::Value::Boolean(b) => FieldDefault::Bool(*b),
        toml::Value::Integer(n) => FieldDefault::Int(*n),
        toml::Value::Float(x) => FieldDefault::Float(*x),
        toml::Value::String(s) => FieldDefault::Str(leak_str(s)),
        toml::Value::Array(items) => {
            let items = items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(leak_str)
                        .ok_or_else(|| anyhow!("list defaults must contain strings"))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            FieldDefault::StrList(items.leak())
        }
        other => bail!("unsupported default value: {other}"),
    })
}

fn leak_str(s: &str) -> &'static str {
    Box::leak(s.to_owned().into_boxed_str())
}
