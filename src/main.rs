use braidnet::boundary::Boundary;
use braidnet::error::Error;
use braidnet::heightmap::Heightmap;
use braidnet::io::boundary_file;
use braidnet::io::esri_grid;
use braidnet::io::network_file;
use braidnet::io::text_grid;
use braidnet::pipeline::extract_network;
use braidnet::units::Units;
use clap::Parser;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Extracts the channel network of a braided river or tidal estuary from a
/// digital elevation model.
#[derive(Parser, Debug)]
#[command(name = "braidnet", version)]
struct Args {
    /// The x-resolution of the grid in meters per cell, overriding the
    /// value from the input file.
    #[arg(long = "xRes", value_name = "RESOLUTION")]
    x_res: Option<f64>,

    /// The y-resolution of the grid in meters per cell, overriding the
    /// value from the input file.
    #[arg(long = "yRes", value_name = "RESOLUTION")]
    y_res: Option<f64>,

    /// Output a link sequence instead of the network graph.
    #[arg(long)]
    links: bool,

    /// A boundary file restricting the region of interest. Without it, the
    /// full extent of the input is used.
    #[arg(long, value_name = "FILE")]
    boundary: Option<PathBuf>,

    /// The input river dataset (.txt or .asc/.ascii).
    input: PathBuf,

    /// The output network file; `.txt` is appended automatically.
    output: PathBuf,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(error) = run(&args) {
        eprintln!("{error}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let (heightmap, mut units) = read_heightmap(&args.input)?;

    if let Some(x_res) = args.x_res {
        if x_res <= 0. {
            return Err(Error::InvalidInput(format!(
                "x-resolution (--xRes) should be positive (was [{x_res}])"
            )));
        }
        units.x_resolution = x_res;
    }
    if let Some(y_res) = args.y_res {
        if y_res <= 0. {
            return Err(Error::InvalidInput(format!(
                "y-resolution (--yRes) should be positive (was [{y_res}])"
            )));
        }
        units.y_resolution = y_res;
    }

    let boundary = match &args.boundary {
        Some(path) => {
            boundary_file::read_boundary_from_path(path, heightmap.width(), heightmap.height())?
        }
        None => Boundary::for_heightmap(&heightmap),
    };

    let bar = ProgressBar::new(100).with_style(
        ProgressStyle::with_template("{msg:32} [{bar:40}] {pos:>3}%")
            .expect("valid progress template")
            .progress_chars("=> "),
    );
    let network = extract_network(&heightmap, &boundary, units, 0., &mut |step, percent| {
        bar.set_message(step.to_string());
        bar.set_position(u64::from(percent));
    })?;
    bar.finish_and_clear();

    let output = PathBuf::from(format!("{}.txt", args.output.display()));
    let mut writer = BufWriter::new(File::create(&output)?);
    if args.links {
        network_file::write_link_sequence(&network, &units, &mut writer)?;
    } else {
        network_file::write_network(&network, &units, &mut writer)?;
    }
    log::info!("wrote {}", output.display());

    Ok(())
}

fn read_heightmap(input: &PathBuf) -> Result<(Heightmap, Units), Error> {
    match input.extension().and_then(|e| e.to_str()) {
        Some("txt") => text_grid::read_text_heightmap_from_path(input),
        Some("asc" | "ascii") => esri_grid::read_esri_grid_from_path(input),
        _ => Err(Error::InvalidInput(format!(
            "Unsupported input format for \"{}\" (expected .txt, .asc or .ascii)",
            input.display()
        ))),
    }
}
