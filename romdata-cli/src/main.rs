use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use romdata_core::container::{garc, lz11};
use romdata_core::{
    checksum, fsutil, open_rom, Feature, LoadOptions, RomDataError, RomDataSource,
};

#[derive(Debug, Parser)]
#[command(name = "romdata", version, about = "Inspect and round-trip catalogued ROMs")]
struct Args {
    /// Catalog file to use instead of the embedded one.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// JSON load options; `--catalog` overrides its catalog path.
    #[arg(long, global = true)]
    options: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Identify a ROM and summarise what it holds.
    Info { rom: PathBuf },

    /// Print the decoded model as JSON.
    Dump {
        rom: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Load and save without edits; the output should match the input.
    Roundtrip {
        rom: PathBuf,
        output: PathBuf,
        #[arg(long, default_value_t = false)]
        no_atomic: bool,
    },

    /// List the entries of a GARC archive.
    Garc {
        archive: PathBuf,
        /// Write every sub-file to this directory.
        #[arg(long)]
        extract: Option<PathBuf>,
    },
}

const FEATURES: [Feature; 7] = [
    Feature::MoveTutors,
    Feature::TimeOfDayEncounters,
    Feature::SosEncounters,
    Feature::Abilities,
    Feature::HeldItemSlotThree,
    Feature::TrainerPokemonDetails,
    Feature::PokemonIcons,
];

fn load_options(args: &Args) -> Result<LoadOptions, RomDataError> {
    let mut options = match &args.options {
        Some(path) => LoadOptions::from_json_file(path)?,
        None => LoadOptions::default(),
    };
    if args.catalog.is_some() {
        options.catalog_path = args.catalog.clone();
    }
    Ok(options)
}

fn open(path: &Path, options: &LoadOptions) -> Result<Box<dyn RomDataSource>, RomDataError> {
    open_rom(path, options)?.ok_or_else(|| {
        RomDataError::Config(format!("{} does not match any catalog entry", path.display()))
    })
}

fn info(rom: &dyn RomDataSource) {
    println!("title:      {}", rom.entry().name);
    println!("generation: {:?}", rom.generation());
    println!("valid base: {}", rom.is_rom_valid());
    println!("species:    {}", rom.species().len());
    println!("moves:      {}", rom.moves().len());
    println!("trainers:   {}", rom.trainers().len());
    println!("encounters: {} areas", rom.encounters().len());
    println!("shops:      {}", rom.shops().len());
    println!("trades:     {}", rom.trades().len());
    println!("TMs:        {}", rom.tm_moves().len());
    println!("tutors:     {}", rom.tutor_moves().len());
    let supported: Vec<String> = FEATURES
        .iter()
        .filter(|&&f| rom.supports(f))
        .map(|f| format!("{:?}", f))
        .collect();
    println!("features:   {}", supported.join(", "));
}

fn list_archive(path: &Path, extract: Option<&Path>) -> Result<(), RomDataError> {
    let archive = garc::read_archive(path)?;
    println!("{}: {:?}, {} entries", path.display(), archive.version, archive.len());
    for (index, subs) in archive.entries() {
        for (sub, bytes) in subs {
            let lz = if lz11::is_compressed(bytes) { " lz11" } else { "" };
            println!(
                "  {:5}.{:<2} {:8} bytes  crc {:08X}{}",
                index,
                sub,
                bytes.len(),
                checksum::crc32(bytes),
                lz
            );
            if let Some(dir) = extract {
                fsutil::write_atomic(&dir.join(format!("{}_{}.bin", index, sub)), bytes)?;
            }
        }
    }
    Ok(())
}

fn run(args: Args) -> Result<(), RomDataError> {
    let options = load_options(&args)?;
    log::debug!("load options: {:?}", options);
    match args.command {
        Command::Info { rom } => {
            let rom = open(&rom, &options)?;
            info(rom.as_ref());
        }
        Command::Dump { rom, out } => {
            let rom = open(&rom, &options)?;
            let json = serde_json::to_string_pretty(rom.data())
                .map_err(|e| RomDataError::Config(format!("JSON encoding failed: {}", e)))?;
            match out {
                Some(path) => fsutil::write_atomic(&path, json.as_bytes())?,
                None => println!("{}", json),
            }
        }
        Command::Roundtrip {
            rom,
            output,
            no_atomic,
        } => {
            let options = LoadOptions {
                atomic_save: !no_atomic,
                ..options
            };
            let mut loaded = open(&rom, &options)?;
            loaded.save(&output)?;
            println!("saved {} to {}", loaded.entry().name, output.display());
        }
        Command::Garc { archive, extract } => list_archive(&archive, extract.as_deref())?,
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(err) = run(args) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
