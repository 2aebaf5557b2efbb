use clap::{Parser, Subcommand};
use code_inspect::detector::RegionRectifier;
use code_inspect::models::{BoundingBox, Polygon};
use code_inspect::tools::{
    bench_limit_from_env, binary_stats, dataset_iter, dataset_root_from_env, grayscale_stats,
    load_frame, parse_points,
};
use code_inspect::{ConfigStore, ParamUpdate, ParameterStore, PreprocessingPipeline};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Instant;

type CmdResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "inspect_tool", version, about = "code_inspect CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the enhanced, binary and sharpened variants of an image
    Preprocess {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Rectify a manually given quadrilateral
    Rectify {
        #[arg(long)]
        image: PathBuf,
        /// x0,y0,x1,y1,x2,y2,x3,y3 (top-left, top-right, bottom-right, bottom-left)
        #[arg(long)]
        points: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Save a configuration snapshot to the next free slot
    ConfigSave {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// key=value overrides applied to the defaults
        #[arg(long = "set")]
        set: Vec<String>,
    },
    /// Print the latest configuration snapshot
    ConfigShow {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Time the preprocessing variants over a dataset
    DatasetBench {
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Preprocess { image, out_dir } => preprocess_cmd(&image, &out_dir),
        Command::Rectify { image, points, out } => rectify_cmd(&image, &points, &out),
        Command::ConfigSave { dir, set } => config_save_cmd(&dir, &set),
        Command::ConfigShow { dir } => config_show_cmd(&dir),
        Command::DatasetBench { root, limit } => dataset_bench_cmd(root, limit),
    };

    if let Err(err) = result {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn preprocess_cmd(image: &Path, out_dir: &Path) -> CmdResult {
    let frame = load_frame(image)?;
    println!("Image: {} ({}x{})", image.display(), frame.width(), frame.height());

    let variants = PreprocessingPipeline::default().run(&frame);
    let gray = grayscale_stats(&variants.gray);
    println!("Grayscale range: {}-{}, average: {}", gray.min, gray.max, gray.avg);
    let enhanced = grayscale_stats(&variants.enhanced);
    println!(
        "Enhanced range: {}-{}, average: {}",
        enhanced.min, enhanced.max, enhanced.avg
    );
    let stats = binary_stats(&variants.binary);
    println!(
        "Binary: black_pixels={} total={} black_ratio={:.2}%",
        stats.black_pixels,
        stats.total_pixels,
        stats.black_ratio * 100.0
    );

    std::fs::create_dir_all(out_dir)?;
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    for (name, img) in [
        ("enhanced", &variants.enhanced),
        ("binary", &variants.binary),
        ("sharpened", &variants.sharpened),
    ] {
        let path = out_dir.join(format!("{stem}_{name}.png"));
        img.save(&path)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn rectify_cmd(image: &Path, points: &str, out: &Path) -> CmdResult {
    let corners = parse_points(points).ok_or("expected 8 comma-separated numbers")?;
    let frame = load_frame(image)?;
    let (width, height) = frame.dimensions();

    let xs = corners.iter().map(|p| p.x);
    let ys = corners.iter().map(|p| p.y);
    let min_x = xs.clone().fold(f32::INFINITY, f32::min);
    let max_x = xs.fold(f32::NEG_INFINITY, f32::max);
    let min_y = ys.clone().fold(f32::INFINITY, f32::min);
    let max_y = ys.fold(f32::NEG_INFINITY, f32::max);
    let bbox = BoundingBox::clamped(
        min_x.floor() as i32,
        min_y.floor() as i32,
        (max_x - min_x).ceil() as i32,
        (max_y - min_y).ceil() as i32,
        width,
        height,
    );

    let region = RegionRectifier::default()
        .rectify(&frame, &bbox, &Polygon::new(corners))
        .ok_or("quadrilateral lies outside the image")?;
    println!(
        "Crop {:?} -> {}x{} ({})",
        region.crop,
        region.image.width(),
        region.image.height(),
        if region.warped { "warped" } else { "plain crop" }
    );
    region.image.to_rgb().save(out)?;
    println!("Wrote {}", out.display());
    Ok(())
}

fn config_save_cmd(dir: &Path, assignments: &[String]) -> CmdResult {
    let store = ParameterStore::default();
    let updates = assignments
        .iter()
        .map(|a| ParamUpdate::parse_assignment(a))
        .collect::<Result<Vec<_>, _>>()?;
    store.set_all(&updates)?;

    let path = ConfigStore::new(dir).save(&store.snapshot())?;
    println!("Saved {}", path.display());
    Ok(())
}

fn config_show_cmd(dir: &Path) -> CmdResult {
    let store = ParameterStore::default();
    let path = ConfigStore::new(dir).load_into(&store)?;
    println!("Loaded {}", path.display());
    for (key, value) in store.snapshot().to_map() {
        println!("  {key} = {value}");
    }
    Ok(())
}

fn dataset_bench_cmd(root: Option<PathBuf>, limit: Option<usize>) -> CmdResult {
    let root = root.unwrap_or_else(dataset_root_from_env);
    let limit = limit.or_else(bench_limit_from_env);
    let pipeline = PreprocessingPipeline::default();

    let mut count = 0usize;
    let mut total_ms = 0.0f64;
    for path in dataset_iter(&root, limit) {
        let frame = match load_frame(&path) {
            Ok(frame) => frame,
            Err(err) => {
                eprintln!("Failed to load image {}: {}", path.display(), err);
                continue;
            }
        };
        let start = Instant::now();
        let _ = pipeline.run(&frame);
        let ms = start.elapsed().as_secs_f64() * 1000.0;
        total_ms += ms;
        count += 1;
        println!("{} ({}x{}): {:.2} ms", path.display(), frame.width(), frame.height(), ms);
    }

    if count == 0 {
        return Err(format!("no images under {}", root.display()).into());
    }
    println!("Images: {}  average: {:.2} ms", count, total_ms / count as f64);
    Ok(())
}
