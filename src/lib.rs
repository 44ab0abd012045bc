//! Boxlabel: an annotation engine for YOLO object-detection datasets.
//!
//! Boxlabel keeps bounding-box labels for a directory of images in the
//! Ultralytics text format, converts between the normalized on-disk form and
//! canvas pixel space, bootstraps labels from detector output and renders
//! boxes onto images for review.
//!
//! # Modules
//!
//! - [`ir`]: Box types, coordinate transforms and the label file codec
//! - [`registry`]: The project's ordered class list
//! - [`store`]: Per-image annotation cache with explicit saves
//! - [`reconcile`]: Mapping detector predictions onto project classes
//! - [`detector`]: The detector seam and a directory-backed implementation
//! - [`autolabel`]: Single and batch auto-labeling
//! - [`overlay`]: Drawing boxes and class tags onto a raster
//! - [`session`]: Navigation and editing over one workspace
//! - [`workspace`]: On-disk layout and configuration
//! - [`error`]: Error types for boxlabel operations

pub mod autolabel;
pub mod detector;
pub mod error;
pub mod ir;
pub mod overlay;
pub mod reconcile;
pub mod registry;
pub mod session;
pub mod store;
pub mod workspace;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;

pub use error::BoxlabelError;

use detector::PredictionDirDetector;
use ir::{BoundingBox, ImageDescriptor, ImageKey, PixelRect};
use overlay::OverlayStyle;
use registry::ClassRegistry;
use session::Session;
use workspace::Workspace;

/// The boxlabel CLI application.
#[derive(Parser)]
#[command(name = "boxlabel")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Workspace root directory.
    #[arg(long, global = true, env = "BOXLABEL_ROOT", default_value = ".")]
    root: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Create the workspace directories, config and default class list.
    Init,
    /// Copy images into the workspace.
    Import(ImportArgs),
    /// Show or replace the class list.
    #[command(subcommand)]
    Classes(ClassesCommand),
    /// List images with their box counts.
    List(OutputArgs),
    /// Show the boxes of one image.
    Show(ShowArgs),
    /// Add a box to an image.
    Add(AddArgs),
    /// Replace the geometry (and optionally the class) of a box.
    Update(UpdateArgs),
    /// Delete a box by index.
    Delete(BoxRefArgs),
    /// Change the class of a box.
    Relabel(RelabelArgs),
    /// Delete an image and its label file.
    RemoveImage(ImageArg),
    /// Label images from precomputed detector output.
    Autolabel(AutolabelArgs),
    /// Draw an image's boxes into a new image file.
    Render(RenderArgs),
    /// Write an Ultralytics data.yaml for the workspace.
    ExportYaml(ExportYamlArgs),
    /// Copy images and labels into an images/ + labels/ training layout.
    ExportDataset(ExportDatasetArgs),
}

#[derive(Subcommand)]
enum ClassesCommand {
    /// Print the class list with ids.
    Show,
    /// Replace the class list.
    Set(ClassesSetArgs),
}

#[derive(clap::Args)]
struct ClassesSetArgs {
    /// Class names in id order.
    #[arg(required_unless_present = "from_file")]
    names: Vec<String>,

    /// Read names from a classes.txt or data.yaml instead.
    #[arg(long, conflicts_with = "names")]
    from_file: Option<PathBuf>,

    /// Rewrite existing labels so every box keeps its class name.
    #[arg(long)]
    migrate: bool,
}

#[derive(clap::Args)]
struct ImportArgs {
    /// Image files to copy into the uploads directory.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Output format ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

#[derive(clap::Args)]
struct ImageArg {
    /// Image file name or stem inside the uploads directory.
    image: String,
}

#[derive(clap::Args)]
struct ShowArgs {
    /// Image file name or stem inside the uploads directory.
    image: String,

    #[command(flatten)]
    output: OutputArgs,
}

/// Four box values, normalized by default.
#[derive(clap::Args)]
struct GeometryArgs {
    /// Center x (or left edge with --pixel).
    #[arg(allow_negative_numbers = true)]
    x: f64,
    /// Center y (or top edge with --pixel).
    #[arg(allow_negative_numbers = true)]
    y: f64,
    #[arg(allow_negative_numbers = true)]
    width: f64,
    #[arg(allow_negative_numbers = true)]
    height: f64,

    /// Interpret values as pixel left/top/width/height.
    #[arg(long)]
    pixel: bool,
}

#[derive(clap::Args)]
struct AddArgs {
    /// Image file name or stem inside the uploads directory.
    image: String,

    /// Class name or numeric id.
    class: String,

    #[command(flatten)]
    geometry: GeometryArgs,
}

#[derive(clap::Args)]
struct UpdateArgs {
    /// Image file name or stem inside the uploads directory.
    image: String,

    /// Position of the box in the label file.
    index: usize,

    #[command(flatten)]
    geometry: GeometryArgs,

    /// New class name or numeric id (keeps the current class when omitted).
    #[arg(long)]
    class: Option<String>,
}

#[derive(clap::Args)]
struct BoxRefArgs {
    /// Image file name or stem inside the uploads directory.
    image: String,

    /// Position of the box in the label file.
    index: usize,
}

#[derive(clap::Args)]
struct RelabelArgs {
    /// Image file name or stem inside the uploads directory.
    image: String,

    /// Position of the box in the label file.
    index: usize,

    /// New class name or numeric id.
    class: String,
}

#[derive(clap::Args)]
struct AutolabelArgs {
    /// Detector output: a directory name under models/ or a path.
    #[arg(long)]
    model: String,

    /// Names file for the detector (defaults to data.yaml or classes.txt in the model dir).
    #[arg(long)]
    names: Option<PathBuf>,

    /// Minimum confidence (defaults to the workspace config).
    #[arg(long)]
    conf: Option<f64>,

    /// Label only this image.
    #[arg(long)]
    image: Option<String>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Image file name or stem inside the uploads directory.
    image: String,

    /// Output file; the format follows the extension (default: <root>/<stem>_overlay.png).
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ExportYamlArgs {
    /// Output file (default: <root>/data.yaml).
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ExportDatasetArgs {
    /// Output directory (created if missing).
    out: PathBuf,

    #[command(flatten)]
    output: OutputArgs,
}

/// Run the boxlabel CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), BoxlabelError> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let root = cli.root;
    match cli.command {
        Some(Commands::Init) => run_init(&root),
        Some(Commands::Import(args)) => run_import(&root, args),
        Some(Commands::Classes(ClassesCommand::Show)) => run_classes_show(&root),
        Some(Commands::Classes(ClassesCommand::Set(args))) => run_classes_set(&root, args),
        Some(Commands::List(args)) => run_list(&root, args),
        Some(Commands::Show(args)) => run_show(&root, args),
        Some(Commands::Add(args)) => run_add(&root, args),
        Some(Commands::Update(args)) => run_update(&root, args),
        Some(Commands::Delete(args)) => run_delete(&root, args),
        Some(Commands::Relabel(args)) => run_relabel(&root, args),
        Some(Commands::RemoveImage(args)) => run_remove_image(&root, args),
        Some(Commands::Autolabel(args)) => run_autolabel(&root, args),
        Some(Commands::Render(args)) => run_render(&root, args),
        Some(Commands::ExportYaml(args)) => run_export_yaml(&root, args),
        Some(Commands::ExportDataset(args)) => run_export_dataset(&root, args),
        None => {
            println!("boxlabel {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Annotation engine for YOLO object-detection datasets.");
            println!();
            println!("Run 'boxlabel --help' for usage information.");
            Ok(())
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        log::LevelFilter::Error
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    // RUST_LOG wins over the flags; a second init (tests) is harmless.
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .try_init();
}

fn wants_json(output: &OutputArgs) -> Result<bool, BoxlabelError> {
    match output.output.as_str() {
        "json" => Ok(true),
        "text" => Ok(false),
        other => Err(BoxlabelError::InvalidArgument(format!(
            "unknown output format '{}' (supported: text, json)",
            other
        ))),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), BoxlabelError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| BoxlabelError::InvalidArgument(err.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn run_init(root: &Path) -> Result<(), BoxlabelError> {
    let ws = Workspace::init(root)?;
    let registry = ws.read_registry()?;
    println!(
        "Initialized workspace at {} with {} class(es)",
        ws.root().display(),
        registry.len()
    );
    Ok(())
}

fn run_import(root: &Path, args: ImportArgs) -> Result<(), BoxlabelError> {
    let ws = Workspace::open(root)?;
    let saved = ws.import_images(&args.files)?;
    for path in &saved {
        println!("{}", path.display());
    }
    println!("Imported {} image(s)", saved.len());
    Ok(())
}

fn run_classes_show(root: &Path) -> Result<(), BoxlabelError> {
    let ws = Workspace::open(root)?;
    let registry = ws.read_registry()?;
    for (id, name) in registry.names().iter().enumerate() {
        println!("{}\t{}", id, name);
    }
    Ok(())
}

fn run_classes_set(root: &Path, args: ClassesSetArgs) -> Result<(), BoxlabelError> {
    let names = match &args.from_file {
        Some(path) => registry::read_names_file(path)?,
        None => args.names,
    };
    if names.iter().all(|name| name.trim().is_empty()) {
        return Err(BoxlabelError::InvalidArgument(
            "class list must contain at least one name".to_string(),
        ));
    }
    let registry = ClassRegistry::from_lines(&names.join("\n"));

    let mut session = Session::open(Workspace::open(root)?)?;
    let report = session.set_registry(registry, args.migrate)?;
    println!("Saved {} class(es)", session.registry().len());
    if let Some(report) = report {
        print!("{}", report);
    }
    Ok(())
}

#[derive(Serialize)]
struct ListEntry {
    image: String,
    boxes: usize,
}

fn run_list(root: &Path, args: OutputArgs) -> Result<(), BoxlabelError> {
    let json = wants_json(&args)?;
    let ws = Workspace::open(root)?;
    let mut store = ws.store();

    let mut entries = Vec::new();
    for path in ws.image_paths()? {
        let key = ImageKey::from_path(&path);
        let boxes = store.load(&key)?.len();
        let image = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| key.to_string());
        entries.push(ListEntry { image, boxes });
    }

    if json {
        return print_json(&entries);
    }
    for entry in &entries {
        println!("{}\t{} box(es)", entry.image, entry.boxes);
    }
    println!("{} image(s)", entries.len());
    Ok(())
}

#[derive(Serialize)]
struct ShowEntry<'a> {
    index: usize,
    class_name: Option<&'a str>,
    #[serde(flatten)]
    bbox: BoundingBox,
    pixel: Option<PixelRect>,
}

fn run_show(root: &Path, args: ShowArgs) -> Result<(), BoxlabelError> {
    let json = wants_json(&args.output)?;
    let ws = Workspace::open(root)?;
    let registry = ws.read_registry()?;
    let mut image = ImageDescriptor::new(ws.find_image(&args.image)?);
    let size = match image.size() {
        Ok(size) => Some(size),
        Err(err) => {
            log::warn!("{}; showing normalized values only", err);
            None
        }
    };

    let mut store = ws.store();
    let set = store.load(image.key())?;
    let entries: Vec<ShowEntry<'_>> = set
        .iter()
        .enumerate()
        .map(|(index, bbox)| ShowEntry {
            index,
            class_name: registry.name(bbox.class_id),
            bbox: *bbox,
            pixel: size.map(|size| bbox.to_pixel(size)),
        })
        .collect();

    if json {
        return print_json(&entries);
    }

    match size {
        Some(size) => println!(
            "{} ({}x{}): {} box(es)",
            image.path().display(),
            size.width,
            size.height,
            entries.len()
        ),
        None => println!("{}: {} box(es)", image.path().display(), entries.len()),
    }
    for entry in &entries {
        let b = &entry.bbox;
        let class = overlay::label_text(b.class_id, &registry);
        print!(
            "  [{}] {} {:.6} {:.6} {:.6} {:.6}",
            entry.index, class, b.x_center, b.y_center, b.width, b.height
        );
        match entry.pixel {
            Some(px) => println!(
                "  (px {:.1},{:.1} {:.1}x{:.1})",
                px.left, px.top, px.width, px.height
            ),
            None => println!(),
        }
    }
    Ok(())
}

/// Converts CLI geometry to a normalized box, reading the image size only for pixel input.
fn box_from_geometry(
    geometry: &GeometryArgs,
    class_id: usize,
    image: &mut ImageDescriptor,
) -> Result<BoundingBox, BoxlabelError> {
    if geometry.pixel {
        let size = image.size()?;
        let rect = PixelRect::new(geometry.x, geometry.y, geometry.width, geometry.height);
        Ok(rect.to_normalized(class_id, size))
    } else {
        Ok(BoundingBox::new(
            class_id,
            geometry.x,
            geometry.y,
            geometry.width,
            geometry.height,
        ))
    }
}

fn run_add(root: &Path, args: AddArgs) -> Result<(), BoxlabelError> {
    let ws = Workspace::open(root)?;
    let registry = ws.read_registry()?;
    let class_id = registry.resolve(&args.class)?;
    let mut image = ImageDescriptor::new(ws.find_image(&args.image)?);
    let bbox = box_from_geometry(&args.geometry, class_id, &mut image)?;

    let mut store = ws.store();
    let index = store.add(image.key(), bbox)?;
    store.save(image.key())?;
    println!("Added box {} to {}", index, image.key());
    Ok(())
}

fn run_update(root: &Path, args: UpdateArgs) -> Result<(), BoxlabelError> {
    let ws = Workspace::open(root)?;
    let registry = ws.read_registry()?;
    let mut image = ImageDescriptor::new(ws.find_image(&args.image)?);
    let mut store = ws.store();

    let current = store
        .load(image.key())?
        .get(args.index)
        .map(|bbox| bbox.class_id);
    let class_id = match (&args.class, current) {
        (Some(reference), _) => registry.resolve(reference)?,
        (None, Some(class_id)) => class_id,
        (None, None) => {
            return Err(BoxlabelError::IndexOutOfRange {
                index: args.index,
                len: store.load(image.key())?.len(),
            })
        }
    };

    let bbox = box_from_geometry(&args.geometry, class_id, &mut image)?;
    store.update(image.key(), args.index, bbox)?;
    store.save(image.key())?;
    println!("Updated box {} of {}", args.index, image.key());
    Ok(())
}

fn run_delete(root: &Path, args: BoxRefArgs) -> Result<(), BoxlabelError> {
    let ws = Workspace::open(root)?;
    let key = ImageKey::from_path(&ws.find_image(&args.image)?);
    let mut store = ws.store();

    let removed = store.delete(&key, args.index)?;
    store.save(&key)?;
    println!(
        "Deleted box {} (class {}) from {}",
        args.index, removed.class_id, key
    );
    Ok(())
}

fn run_relabel(root: &Path, args: RelabelArgs) -> Result<(), BoxlabelError> {
    let ws = Workspace::open(root)?;
    let registry = ws.read_registry()?;
    let class_id = registry.resolve(&args.class)?;
    let key = ImageKey::from_path(&ws.find_image(&args.image)?);
    let mut store = ws.store();

    store.replace_class(&key, args.index, class_id, &registry)?;
    store.save(&key)?;
    println!(
        "Box {} of {} is now '{}'",
        args.index,
        key,
        overlay::label_text(class_id, &registry)
    );
    Ok(())
}

fn run_remove_image(root: &Path, args: ImageArg) -> Result<(), BoxlabelError> {
    let ws = Workspace::open(root)?;
    let path = ws.find_image(&args.image)?;
    ws.delete_image(&path)?;
    println!("Removed {}", path.display());
    Ok(())
}

/// Resolves `--model` to a directory: a name under `models/` first, then a path.
fn resolve_model_dir(ws: &Workspace, model: &str) -> Result<PathBuf, BoxlabelError> {
    let named = ws.model_dir(model);
    if named.is_dir() {
        return Ok(named);
    }
    let path = PathBuf::from(model);
    if path.is_dir() {
        return Ok(path);
    }

    let available = ws.available_models()?;
    Err(BoxlabelError::InvalidArgument(format!(
        "model '{}' not found (available: {})",
        model,
        if available.is_empty() {
            "none".to_string()
        } else {
            available.join(", ")
        }
    )))
}

fn run_autolabel(root: &Path, args: AutolabelArgs) -> Result<(), BoxlabelError> {
    let json = wants_json(&args.output)?;
    let ws = Workspace::open(root)?;
    let conf = args.conf.unwrap_or(ws.config().confidence_threshold);
    if !(0.0..=1.0).contains(&conf) {
        return Err(BoxlabelError::InvalidArgument(format!(
            "confidence threshold {} is outside 0..=1",
            conf
        )));
    }

    let model_dir = resolve_model_dir(&ws, &args.model)?;
    let detector = PredictionDirDetector::open(&model_dir, args.names.as_deref())?;

    let mut session = Session::open(ws)?;
    session.load_detector(Box::new(detector));

    let report = match &args.image {
        Some(reference) => {
            let path = session.workspace().find_image(reference)?;
            session.go_to_key(&ImageKey::from_path(&path))?;
            let stats = session.autolabel_current(conf)?;
            let mut report = autolabel::AutolabelReport::new();
            report.add(autolabel::ImageOutcome {
                image: path.display().to_string(),
                status: autolabel::OutcomeStatus::Labeled { stats },
            });
            report
        }
        None => session.autolabel_all(conf)?,
    };

    if json {
        print_json(&report)
    } else {
        print!("{}", report);
        Ok(())
    }
}

fn run_render(root: &Path, args: RenderArgs) -> Result<(), BoxlabelError> {
    let ws = Workspace::open(root)?;
    let registry = ws.read_registry()?;
    let path = ws.find_image(&args.image)?;
    let key = ImageKey::from_path(&path);

    let raster = image::open(&path)
        .map_err(|source| BoxlabelError::ImageDecode {
            path: path.clone(),
            source,
        })?
        .to_rgba8();

    let mut store = ws.store();
    let set = store.load(&key)?;
    let style = OverlayStyle::from_config(ws.config())?;
    let rendered = overlay::render_overlay(&raster, set.boxes(), &registry, &style);

    let out = args
        .out
        .unwrap_or_else(|| ws.root().join(format!("{}_overlay.png", key.as_str())));
    rendered
        .save(&out)
        .map_err(|source| BoxlabelError::ImageEncode {
            path: out.clone(),
            source,
        })?;
    println!("Rendered {} box(es) to {}", set.len(), out.display());
    Ok(())
}

fn run_export_yaml(root: &Path, args: ExportYamlArgs) -> Result<(), BoxlabelError> {
    let ws = Workspace::open(root)?;
    let registry = ws.read_registry()?;
    let out = args.out.unwrap_or_else(|| ws.data_yaml_path());
    let dataset_root = ws.root().canonicalize().map_err(BoxlabelError::Io)?;

    let header = if ws.labels_follow_images() {
        None
    } else {
        log::warn!(
            "labels in '{}' are not next to images in '{}'; training tools will not find them",
            ws.config().annotations_dir,
            ws.config().uploads_dir
        );
        Some(format!(
            "Labels are stored in '{}', not in a 'labels' directory next to '{}'.\n\
             Ultralytics will not find them; run `boxlabel export-dataset <dir>` for a trainable copy.",
            ws.config().annotations_dir,
            ws.config().uploads_dir
        ))
    };

    registry::write_data_yaml(
        &out,
        &registry,
        &dataset_root,
        &ws.config().uploads_dir,
        header.as_deref(),
    )?;
    println!("Wrote {}", out.display());
    Ok(())
}

fn run_export_dataset(root: &Path, args: ExportDatasetArgs) -> Result<(), BoxlabelError> {
    let json = wants_json(&args.output)?;
    let ws = Workspace::open(root)?;
    let summary = ws.export_dataset(&args.out)?;

    if json {
        print_json(&summary)
    } else {
        println!("{}", summary);
        Ok(())
    }
}
