use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use terrain_pick::config::Config;
use terrain_pick::pipeline;
use terrain_pick::renderer::{render_artifact, save_png};
use terrain_pick::service::{QueryService, format_outcome};
use terrain_pick::store::TableStore;

#[derive(Parser, Debug)]
#[command(name = "terrain-pick", version, about = "Resolve screen pixels to terrain coordinates")]
struct Cli {
    /// JSON config file; flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the persisted tables
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    width: Option<u32>,

    #[arg(long, global = true)]
    height: Option<u32>,

    /// Hide the sampling progress bar
    #[arg(long, global = true, default_value_t = false)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sample the lattice, build and normalize the mesh, write the tables
    Build {
        /// Use a lattice preset instead of the configured bounds
        #[arg(long)]
        preset: Option<String>,
        /// Sample spacing in degrees instead of fixed row and column counts
        #[arg(long)]
        resolution: Option<f64>,
        /// Rebuild from samples.json instead of querying the source
        #[arg(long, default_value_t = false)]
        replay: bool,
    },
    /// Render the stored mesh to a PNG
    Render {
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        shade: bool,
    },
    /// Resolve a single pixel and print the result line
    Pick {
        #[arg(long)]
        x: i64,
        #[arg(long)]
        y: i64,
    },
    /// Print the pixel a geographic point is drawn at
    Locate {
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lng: f64,
        /// Meters; defaults to the lowest terrain point
        #[arg(long)]
        elevation: Option<f64>,
    },
    /// Answer pixel queries over TCP
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
}

impl Cli {
    fn config(&self) -> terrain_pick::Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(w) = self.width {
            config.render.width = w;
        }
        if let Some(h) = self.height {
            config.render.height = h;
        }
        if self.quiet {
            config.progress = false;
        }

        match &self.command {
            Command::Build {
                preset, resolution, ..
            } => {
                if preset.is_some() {
                    config.lattice.preset = preset.clone();
                }
                if resolution.is_some() {
                    config.lattice.resolution = *resolution;
                }
            }
            Command::Render { output, shade } => {
                if let Some(out) = output {
                    config.render.output = out.clone();
                }
                config.render.shade |= *shade;
            }
            Command::Serve { bind } => {
                if let Some(addr) = bind {
                    config.service.bind = addr.clone();
                }
            }
            Command::Pick { .. } | Command::Locate { .. } => {}
        }

        config.validate()?;
        Ok(config)
    }
}

fn run(cli: Cli) -> terrain_pick::Result<()> {
    let config = cli.config()?;
    let store = TableStore::new(&config.data_dir);

    match cli.command {
        Command::Build { replay, .. } => {
            pipeline::build_and_store(&config, &store, replay)?;
        }
        Command::Render { .. } => {
            let (mesh, constants) = pipeline::load_or_build(&config, &store)?;
            let frame = pipeline::render_frame(&config, mesh, &constants)?;
            let palette = config.render.palette()?;
            let img = render_artifact(
                frame.buffer(),
                frame.mesh(),
                &palette,
                config.render.supersample,
            );
            save_png(&img, &config.render.output)?;
        }
        Command::Pick { x, y } => {
            let resolver = pipeline::resolver(&config, &store)?;
            println!("{}", format_outcome(&resolver.pick(x, y)));
        }
        Command::Locate {
            lat,
            lng,
            elevation,
        } => match pipeline::locate(&config, &store, lat, lng, elevation)? {
            Some((x, y)) => {
                println!("GCS: Latitude: {lat}  Longitude: {lng} <===> Raster: X: {x}  Y: {y}");
            }
            None => println!("({lat}, {lng}) is outside the view"),
        },
        Command::Serve { .. } => {
            let resolver = pipeline::resolver(&config, &store)?;
            let service = QueryService::bind(
                config.service.bind.as_str(),
                resolver,
                config.service.options(),
            )?;
            service.run()?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
