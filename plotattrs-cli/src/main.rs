#![doc = include_str!("../../docs/cli_usage.md")]

use std::fmt::Write as FmtWrite;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::{Report, Result, WrapErr, eyre};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use plotattrs::{
    AttrEngine, DocumentFormat, EditFlags, EngineOptions, OutputDestination, OutputOptions,
    RedrawRegistry, Schema, UpdateOutcome, emit, parse_document_any,
};

const LOG_ENV: &str = "PLOTATTRS_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "plotattrs",
    version,
    about = "Resolve, edit and template plot configuration trees against a plot schema"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    shared: SharedArgs,
}

#[derive(Debug, Args)]
struct SharedArgs {
    /// Plot schema spec: file path, inline payload, or "-" for stdin
    #[arg(short = 's', long = "schema", value_name = "SPEC", global = true)]
    schema: Option<String>,

    /// Engine options spec (markers, inclusion attribute, info-array patterns)
    #[arg(long = "options", value_name = "SPEC", global = true)]
    options: Option<String>,

    /// Output destinations ("-" writes to stdout). Accepts multiple values per flag use.
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DEST",
        num_args = 1..,
        action = ArgAction::Append,
        global = true
    )]
    outputs: Vec<String>,

    /// Emit compact JSON/TOML rather than pretty formatting
    #[arg(long = "no-pretty", global = true)]
    no_pretty: bool,

    /// Overwrite output files even if they already exist
    #[arg(short = 'f', long = "force", short_alias = 'y', alias = "yes", global = true)]
    force: bool,

    /// Log more (-v debug, -vv trace); PLOTATTRS_LOG overrides the default
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the fully resolved figure
    Resolve {
        /// Figure spec: {"data": [...], "layout": {...}}
        #[arg(long = "figure", value_name = "SPEC")]
        figure: String,
    },
    /// Apply flat attribute updates to the figure's layout
    Edit {
        #[arg(long = "figure", value_name = "SPEC")]
        figure: String,
        /// Updates spec: {"annotations[2].text": "new", "title.text": "plot"}
        #[arg(long = "updates", value_name = "SPEC")]
        updates: String,
    },
    /// Extract a style template from the figure
    Template {
        #[arg(long = "figure", value_name = "SPEC")]
        figure: String,
    },
    /// Report template parts that do not match the figure
    Validate {
        #[arg(long = "figure", value_name = "SPEC")]
        figure: String,
        /// Template spec; defaults to the figure's layout.template
        #[arg(long = "template", value_name = "SPEC")]
        template: Option<String>,
    },
    /// Split an attribute string into container array, index and property
    Locate {
        #[arg(value_name = "ATTR")]
        attr: String,
    },
}

impl Command {
    /// Document specs the command reads besides the schema and options.
    fn specs(&self) -> Vec<(&'static str, &str)> {
        match self {
            Command::Resolve { figure } | Command::Template { figure } => {
                vec![("figure", figure.as_str())]
            }
            Command::Edit { figure, updates } => {
                vec![("figure", figure.as_str()), ("updates", updates.as_str())]
            }
            Command::Validate { figure, template } => {
                let mut specs = vec![("figure", figure.as_str())];
                if let Some(template) = template {
                    specs.push(("template", template.as_str()));
                }
                specs
            }
            Command::Locate { .. } => Vec::new(),
        }
    }
}

#[derive(Debug)]
enum InputSource {
    File(PathBuf),
    Stdin,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.shared.verbose);

    let mut diagnostics = DiagnosticCollector::default();

    let mut specs: Vec<(&str, &str)> = Vec::new();
    match cli.shared.schema.as_deref() {
        Some(schema) => specs.push(("schema", schema)),
        None => diagnostics.push_input("schema", "provide the plot schema with --schema"),
    }
    if let Some(options) = cli.shared.options.as_deref() {
        specs.push(("options", options));
    }
    specs.extend(cli.command.specs());

    let stdin_specs: Vec<&str> = specs
        .iter()
        .filter(|(_, spec)| *spec == "-")
        .map(|(label, _)| *label)
        .collect();
    let stdin_blocked = stdin_specs.len() > 1;
    if stdin_blocked {
        diagnostics.push_input(
            &stdin_specs.join("/"),
            "only one input can be read from stdin; provide inline content or files",
        );
    }

    let mut documents: Map<String, Value> = Map::new();
    let mut input_hint: Option<DocumentFormat> = None;
    for (label, spec) in &specs {
        let resolution = resolve_format_hint(spec, label, &mut diagnostics);
        if *label == "figure" {
            input_hint = resolution.hint.extension_value();
        }
        if resolution.blocked || (stdin_blocked && *spec == "-") {
            continue;
        }
        match load_value(spec, resolution.hint.format, label) {
            Ok(value) => {
                documents.insert(label.to_string(), value);
            }
            Err(err) => diagnostics.push_input(label, format!("{err:#}")),
        }
    }

    let output = build_output_options(&cli.shared, input_hint, &mut diagnostics);
    ensure_output_paths_available(&output, cli.shared.force, &mut diagnostics);

    diagnostics.into_result()?;

    let engine = build_engine(&mut documents)?;
    tracing::debug!(
        trace_types = engine.schema().traces.len(),
        "schema loaded"
    );
    let result = run(&cli.command, &engine, &mut documents)?;
    emit(&result, &output).map_err(|err| eyre!("{err:#}"))
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn build_engine(documents: &mut Map<String, Value>) -> Result<AttrEngine> {
    let schema_doc = documents
        .remove("schema")
        .ok_or_else(|| eyre!("provide the plot schema with --schema"))?;
    let schema = Schema::from_value(&schema_doc).map_err(|err| eyre!("invalid schema: {err:#}"))?;

    let options = match documents.remove("options") {
        Some(doc) => serde_json::from_value::<EngineOptions>(doc)
            .wrap_err("invalid engine options")?,
        None => EngineOptions::default(),
    };
    AttrEngine::new(schema)
        .with_options(options)
        .wrap_err("invalid info-array patterns in engine options")
}

fn take(documents: &mut Map<String, Value>, label: &str) -> Result<Value> {
    documents
        .remove(label)
        .ok_or_else(|| eyre!("missing {label} document"))
}

fn run(
    command: &Command,
    engine: &AttrEngine,
    documents: &mut Map<String, Value>,
) -> Result<Value> {
    match command {
        Command::Resolve { .. } => Ok(engine.resolve_figure(&take(documents, "figure")?)),
        Command::Edit { .. } => {
            let mut figure = take(documents, "figure")?;
            let updates = take(documents, "updates")?;
            let updates = updates
                .as_object()
                .ok_or_else(|| eyre!("updates must be an object of attribute strings"))?;
            let outcome = edit_figure(engine, &mut figure, updates)?;
            eprint!("{}", summarize(&outcome));
            Ok(figure)
        }
        Command::Template { .. } => {
            let figure = take(documents, "figure")?;
            engine
                .make_template(&figure)
                .wrap_err("failed to extract template")
        }
        Command::Validate { .. } => {
            let figure = take(documents, "figure")?;
            let template = documents.remove("template");
            let issues = engine.validate_template(&figure, template.as_ref());
            serde_json::to_value(issues).wrap_err("failed to serialize template issues")
        }
        Command::Locate { attr } => Ok(engine
            .locate(attr)
            .map(serde_json::to_value)
            .transpose()
            .wrap_err("failed to serialize locator result")?
            .unwrap_or(Value::Bool(false))),
    }
}

fn edit_figure(
    engine: &AttrEngine,
    figure: &mut Value,
    updates: &Map<String, Value>,
) -> Result<UpdateOutcome> {
    let root = figure
        .as_object_mut()
        .ok_or_else(|| eyre!("figure must be an object"))?;
    let layout = root
        .entry("layout")
        .or_insert_with(|| Value::Object(Map::new()));
    let mut hooks = RedrawRegistry::new();
    engine
        .apply_updates(layout, updates, &mut hooks, EditFlags::default())
        .wrap_err("failed to apply updates")
}

fn summarize(outcome: &UpdateOutcome) -> String {
    let mut summary = String::new();
    for (array, report) in &outcome.arrays {
        let indices: Vec<String> = report
            .redraw_indices
            .iter()
            .map(ToString::to_string)
            .collect();
        let _ = writeln!(
            summary,
            "{array}: {} (redraw [{}])",
            if report.applied_in_place {
                "applied in place"
            } else {
                "needs full redraw"
            },
            indices.join(", ")
        );
    }
    if !outcome.attributes.is_empty() {
        let _ = writeln!(summary, "attributes: {}", outcome.attributes.join(", "));
    }
    summary
}

#[derive(Debug, Clone, Copy, Default)]
struct FormatHint {
    format: DocumentFormat,
    from_extension: bool,
}

impl FormatHint {
    fn extension_value(&self) -> Option<DocumentFormat> {
        self.from_extension.then_some(self.format)
    }
}

#[derive(Debug, Clone, Copy)]
struct FormatResolution {
    hint: FormatHint,
    blocked: bool,
}

fn resolve_format_hint(
    spec: &str,
    label: &str,
    diagnostics: &mut DiagnosticCollector,
) -> FormatResolution {
    let unblocked = FormatResolution {
        hint: FormatHint::default(),
        blocked: false,
    };
    if spec == "-" || looks_inline(spec) {
        return unblocked;
    }
    match probe_format_from_extension(Path::new(spec)) {
        ExtensionFormat::Known(format) => FormatResolution {
            hint: FormatHint {
                format,
                from_extension: true,
            },
            blocked: false,
        },
        ExtensionFormat::UnsupportedFeature {
            format_name,
            feature_flag,
        } => {
            diagnostics.push_input(
                label,
                format!(
                    "{label} '{spec}' requires {format_name} support, but this build lacks the '{feature_flag}' feature"
                ),
            );
            FormatResolution {
                hint: FormatHint::default(),
                blocked: true,
            }
        }
        ExtensionFormat::Unknown => unblocked,
    }
}

/// Inline JSON payloads are never looked up as files.
fn looks_inline(spec: &str) -> bool {
    let trimmed = spec.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}

fn load_value(spec: &str, format: DocumentFormat, label: &str) -> Result<Value> {
    if spec == "-" {
        let contents = read_from_source(&InputSource::Stdin)?;
        return parse_contents(&contents, format, label);
    }
    if looks_inline(spec) {
        return parse_contents(spec, format, &format!("inline {label}"));
    }

    let path = PathBuf::from(spec);
    match read_from_source(&InputSource::File(path.clone())) {
        Ok(contents) => parse_contents(&contents, format, label),
        Err(err) => {
            if is_not_found(&err) {
                let inline_label = format!("inline {label}");
                return parse_contents(spec, format, &inline_label);
            }
            Err(err.wrap_err(format!("failed to load {label} from {}", path.display())))
        }
    }
}

fn read_from_source(source: &InputSource) -> Result<String> {
    match source {
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .wrap_err("failed to read from stdin")?;
            Ok(buffer)
        }
        InputSource::File(path) => fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read file {}", path.display())),
    }
}

fn is_not_found(err: &Report) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|io_err| io_err.kind() == io::ErrorKind::NotFound)
}

fn parse_contents(contents: &str, format: DocumentFormat, label: &str) -> Result<Value> {
    parse_document_any(contents, format)
        .map(|(value, _)| value)
        .map_err(|err| eyre!("failed to parse {label}: {err:#}"))
}

#[derive(Default)]
struct DiagnosticCollector {
    messages: Vec<String>,
}

impl DiagnosticCollector {
    fn push_input(&mut self, label: &str, message: impl Into<String>) {
        self.messages
            .push(format!("input ({label}): {}", message.into()));
    }

    fn push_output(&mut self, message: impl Into<String>) {
        self.messages.push(format!("output: {}", message.into()));
    }

    fn into_result(self) -> Result<()> {
        if self.messages.is_empty() {
            return Ok(());
        }
        let mut body = String::from("encountered input/output issues:\n");
        for (idx, msg) in self.messages.iter().enumerate() {
            let _ = writeln!(body, "  {}. {}", idx + 1, msg);
        }
        Err(eyre!(body))
    }
}

fn build_output_options(
    shared: &SharedArgs,
    input_hint: Option<DocumentFormat>,
    diagnostics: &mut DiagnosticCollector,
) -> OutputOptions {
    let mut destinations = Vec::new();
    for raw in &shared.outputs {
        if raw.trim().is_empty() {
            diagnostics.push_output("output destination cannot be empty");
            continue;
        }
        destinations.push(OutputDestination::parse(raw));
    }
    if destinations.is_empty() {
        destinations.push(OutputDestination::Stdout);
    }

    let file_paths: Vec<&Path> = destinations
        .iter()
        .filter_map(|dest| match dest {
            OutputDestination::File(path) => Some(path.as_path()),
            OutputDestination::Stdout => None,
        })
        .collect();
    let format = if file_paths.is_empty() {
        input_hint.unwrap_or_default()
    } else {
        infer_format_from_files(&file_paths, diagnostics).unwrap_or_default()
    };

    OutputOptions::new(format)
        .with_pretty(!shared.no_pretty)
        .with_destinations(destinations)
}

fn infer_format_from_files(
    file_paths: &[&Path],
    diagnostics: &mut DiagnosticCollector,
) -> Option<DocumentFormat> {
    let mut detected: Option<DocumentFormat> = None;
    for path in file_paths {
        match probe_format_from_extension(path) {
            ExtensionFormat::Known(format) => match detected {
                Some(existing) if existing != format => diagnostics.push_output(format!(
                    "output file {} uses {format} but other destinations use {existing}; align extensions",
                    path.display()
                )),
                Some(_) => {}
                None => detected = Some(format),
            },
            ExtensionFormat::UnsupportedFeature {
                format_name,
                feature_flag,
            } => diagnostics.push_output(format!(
                "output file {} requires {format_name} support, but this build was compiled without the '{feature_flag}' feature",
                path.display()
            )),
            ExtensionFormat::Unknown => diagnostics.push_output(format!(
                "cannot infer format from output file {}; use .json/.yaml/.toml",
                path.display()
            )),
        }
    }
    detected
}

fn probe_format_from_extension(path: &Path) -> ExtensionFormat {
    if let Some(format) = DocumentFormat::from_extension(path) {
        return ExtensionFormat::Known(format);
    }
    let Some(ext) = path.extension() else {
        return ExtensionFormat::Unknown;
    };
    match ext.to_string_lossy().to_ascii_lowercase().as_str() {
        "yaml" | "yml" => ExtensionFormat::UnsupportedFeature {
            format_name: "yaml",
            feature_flag: "yaml",
        },
        "toml" => ExtensionFormat::UnsupportedFeature {
            format_name: "toml",
            feature_flag: "toml",
        },
        _ => ExtensionFormat::Unknown,
    }
}

#[derive(Debug)]
enum ExtensionFormat {
    Known(DocumentFormat),
    UnsupportedFeature {
        format_name: &'static str,
        feature_flag: &'static str,
    },
    Unknown,
}

fn ensure_output_paths_available(
    output: &OutputOptions,
    force: bool,
    diagnostics: &mut DiagnosticCollector,
) {
    if force {
        return;
    }
    for destination in &output.destinations {
        if let OutputDestination::File(path) = destination
            && path.exists()
        {
            diagnostics.push_output(format!(
                "file {} already exists (pass --force to overwrite)",
                path.display()
            ));
        }
    }
}
