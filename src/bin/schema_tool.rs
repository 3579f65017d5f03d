use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use modelschema::cast::{CastContext, DEFAULT_DATE_FORMAT, cast_for_storage, cast_from_storage};
use modelschema::{CastType, Model, ModelDefinition, SchemaEntry, Value};
use serde_json::{Value as JsonValue, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "schema-tool")]
#[command(about = "Inspect model schemas and try payloads against them")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the casts, rules and attribute sets derived from a schema file.
    Inspect {
        #[arg(long)]
        schema: PathBuf,
        /// Derive for a stored model instead of a new one.
        #[arg(long)]
        existing: bool,
        /// Write the report to a file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Fill a JSON payload into a model and run the saving validation.
    Validate {
        #[arg(long)]
        schema: PathBuf,
        #[arg(long)]
        payload: PathBuf,
        #[arg(long)]
        existing: bool,
    },
    /// Show how a value is stored and read back for a cast.
    Cast {
        #[arg(long)]
        cast: String,
        /// JSON literal, e.g. `true`, `"2024-01-31"` or `[1,2]`.
        #[arg(long)]
        value: String,
        #[arg(long, default_value = DEFAULT_DATE_FORMAT)]
        date_format: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect {
            schema,
            existing,
            out,
        } => inspect(&schema, existing, out.as_deref()),
        Command::Validate {
            schema,
            payload,
            existing,
        } => validate(&schema, &payload, existing),
        Command::Cast {
            cast,
            value,
            date_format,
        } => cast_value(&cast, &value, &date_format),
    }
}

fn load_definition(path: &Path) -> Result<Arc<ModelDefinition>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema file '{}'", path.display()))?;
    ModelDefinition::from_json_str(&content)
        .with_context(|| format!("Invalid model definition in '{}'", path.display()))
}

fn model_for(definition: Arc<ModelDefinition>, existing: bool) -> Model {
    if existing {
        Model::from_storage(definition, Default::default())
    } else {
        Model::new(definition)
    }
}

fn pairs_to_json(pairs: Vec<(String, String)>) -> JsonValue {
    JsonValue::Object(
        pairs
            .into_iter()
            .map(|(name, value)| (name, JsonValue::String(value)))
            .collect(),
    )
}

fn inspect(schema: &Path, existing: bool, out: Option<&Path>) -> Result<()> {
    let definition = load_definition(schema)?;
    let model = model_for(Arc::clone(&definition), existing);

    let defaults: serde_json::Map<String, JsonValue> = definition
        .schema()
        .defaults()
        .into_iter()
        .map(|(name, value)| (name, value.to_json()))
        .collect();

    let report = json!({
        "model": definition.name(),
        "table": definition.table(),
        "key": definition.key_name(),
        "attributes": model.valid_attributes(),
        "casts": pairs_to_json(model.get_casts()),
        "rules": pairs_to_json(model.get_attribute_rules()),
        "fillable": model.get_fillable()?,
        "guarded": model.get_guarded()?,
        "hidden": model.get_hidden()?,
        "visible": model.get_visible()?,
        "auth": pairs_to_json(definition.schema().text_values(SchemaEntry::Auth)),
        "defaults": defaults,
    });
    let rendered = serde_json::to_string_pretty(&report)?;

    match out {
        Some(out) => {
            ensure_parent_dir(out)?;
            fs::write(out, rendered)
                .with_context(|| format!("Failed to write report to '{}'", out.display()))?;
            println!("Wrote schema report: {}", out.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn validate(schema: &Path, payload: &Path, existing: bool) -> Result<()> {
    let definition = load_definition(schema)?;
    let content = fs::read_to_string(payload)
        .with_context(|| format!("Failed to read payload '{}'", payload.display()))?;
    let document: JsonValue = serde_json::from_str(&content)
        .with_context(|| format!("Payload '{}' is not valid JSON", payload.display()))?;
    let JsonValue::Object(fields) = document else {
        return Err(anyhow!("Payload must be a JSON object"));
    };

    let mut model = model_for(definition, existing);
    model.fill(fields.iter().map(|(key, value)| (key.as_str(), Value::from_json(value))))?;

    let skipped: Vec<&String> = fields
        .keys()
        .filter(|key| !model.is_dirty(key))
        .collect();
    if !skipped.is_empty() {
        println!("Not mass assignable: {:?}", skipped);
    }

    if model.saving_validation()? {
        println!("Payload is valid");
        return Ok(());
    }

    let errors = serde_json::to_string_pretty(&model.get_invalid_attributes())?;
    println!("{}", errors);
    Err(anyhow!(
        "Validation failed with {} message(s)",
        model.get_invalid_message().len()
    ))
}

fn cast_value(cast: &str, value: &str, date_format: &str) -> Result<()> {
    let cast = CastType::parse(cast);
    let literal: JsonValue = serde_json::from_str(value)
        .with_context(|| format!("'{}' is not a JSON literal", value))?;
    let ctx = CastContext { date_format };

    let stored = cast_for_storage(&cast, Value::from_json(&literal), &ctx)?;
    let read = cast_from_storage(&cast, stored.clone(), &ctx)?;

    println!("cast:    {}", cast);
    println!("stored:  {} ({})", stored, stored.type_name());
    println!("read:    {} ({})", read, read.type_name());
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent directory '{}'", parent.display()))?;
    }
    Ok(())
}
