//! jpegls CLI - JPEG-LS encoder and decoder.
//!
//! Encodes raw sample files, decodes JPEG-LS streams to raw samples or
//! PGM/PPM images, and prints stream headers.

use clap::{Args, Parser, Subcommand, ValueEnum};
use jpegls_rs::{ByteSource, ColorTransformation, CustomThresholds, ImageParameters, InterleaveMode, JpeglsEncoder};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// JPEG-LS (ISO/IEC 14495-1) lossless and near-lossless codec
#[derive(Parser)]
#[command(name = "jpegls")]
#[command(version)]
#[command(about = "Encode and decode JPEG-LS images", long_about = None)]
#[command(after_help = "EXAMPLES:
    jpegls encode -i ct.raw -o ct.jls -w 512 -H 512 -b 12
    jpegls encode -i photo.rgb -o photo.jls -w 640 -H 480 -n 3 --interleave sample --transform hp1
    jpegls decode -i photo.jls -o photo.ppm -f pnm
    jpegls info -i ct.jls

Samples wider than 8 bits are read and written as 2 byte little endian values.
Set RUST_LOG=trace for per segment details.")]
struct Cli {
    /// Log decoding and encoding details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode raw samples to a JPEG-LS stream
    #[command(visible_alias = "e")]
    Encode(EncodeArgs),

    /// Decode a JPEG-LS stream to raw samples or a PGM/PPM image
    #[command(visible_alias = "d")]
    Decode {
        /// Input JPEG-LS file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path for decoded pixels
        #[arg(short, long)]
        output: PathBuf,

        /// Output format: raw samples or PGM/PPM
        #[arg(short, long, default_value = "raw", value_enum)]
        format: OutputFormat,
    },

    /// Display the frame, scan and preset parameters of a stream
    #[command(visible_alias = "i")]
    Info {
        /// Input JPEG-LS file
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Args)]
struct EncodeArgs {
    /// Input raw sample file
    #[arg(short, long)]
    input: PathBuf,

    /// Output JPEG-LS file
    #[arg(short, long)]
    output: PathBuf,

    /// Image width in pixels
    #[arg(short, long)]
    width: u32,

    /// Image height in pixels
    #[arg(short = 'H', long)]
    height: u32,

    /// Number of components
    #[arg(short = 'n', long, default_value = "1")]
    components: i32,

    /// Bits per sample (2-16)
    #[arg(short, long, default_value = "8")]
    bits: i32,

    /// Layout of multi-component input and of the coded scans
    #[arg(long, default_value = "none", value_enum)]
    interleave: Interleave,

    /// Maximum error per sample; 0 is lossless
    #[arg(long, default_value = "0")]
    near: i32,

    /// Reversible HP color transform for 3 component images
    #[arg(long, default_value = "none", value_enum)]
    transform: Transform,

    /// Preset thresholds as MAXVAL,T1,T2,T3,RESET (0 keeps the default)
    #[arg(long, value_parser = parse_thresholds)]
    thresholds: Option<CustomThresholds>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Raw sample data
    Raw,
    /// Portable GrayMap / PixMap (1 or 3 components)
    Pnm,
}

#[derive(Clone, Copy, ValueEnum)]
enum Interleave {
    None,
    Line,
    Sample,
}

impl From<Interleave> for InterleaveMode {
    fn from(value: Interleave) -> Self {
        match value {
            Interleave::None => InterleaveMode::None,
            Interleave::Line => InterleaveMode::Line,
            Interleave::Sample => InterleaveMode::Sample,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Transform {
    None,
    Hp1,
    Hp2,
    Hp3,
}

impl From<Transform> for ColorTransformation {
    fn from(value: Transform) -> Self {
        match value {
            Transform::None => ColorTransformation::None,
            Transform::Hp1 => ColorTransformation::Hp1,
            Transform::Hp2 => ColorTransformation::Hp2,
            Transform::Hp3 => ColorTransformation::Hp3,
        }
    }
}

fn parse_thresholds(value: &str) -> Result<CustomThresholds, String> {
    let values = value
        .split(',')
        .map(|part| part.trim().parse::<i32>().map_err(|e| format!("{part:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match values[..] {
        [maximum_sample_value, threshold1, threshold2, threshold3, reset_value] => Ok(CustomThresholds {
            maximum_sample_value,
            threshold1,
            threshold2,
            threshold3,
            reset_value,
        }),
        _ => Err(format!("expected 5 comma separated values, got {}", values.len())),
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    let result = match cli.command {
        Commands::Encode(args) => encode_image(&args),
        Commands::Decode {
            input,
            output,
            format,
        } => decode_image(&input, &output, &format),
        Commands::Info { input } => show_info(&input),
    };

    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn encode_image(args: &EncodeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let pixels = fs::read(&args.input)?;

    let mut encoder = JpeglsEncoder::new(ImageParameters::new(args.width, args.height, args.bits, args.components));
    encoder.set_interleave_mode(args.interleave.into())?;
    encoder.set_near_lossless(args.near)?;
    encoder.set_color_transformation(args.transform.into())?;
    if let Some(thresholds) = args.thresholds {
        encoder.set_custom_thresholds(thresholds)?;
    }

    let encoded = encoder.encode(&pixels)?;
    fs::write(&args.output, &encoded)?;
    log::info!(
        "encoded {}x{} image to {:?}: {} -> {} bytes",
        args.width,
        args.height,
        args.output,
        pixels.len(),
        encoded.len()
    );
    Ok(())
}

fn decode_image(input: &Path, output: &Path, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let (pixels, parameters) = jpegls_rs::decode_to_vec(&data)?;

    match format {
        OutputFormat::Raw => fs::write(output, &pixels)?,
        OutputFormat::Pnm => write_pnm(output, &pixels, &parameters)?,
    }

    log::info!(
        "decoded {}x{} image ({} components, {} bits) to {:?}",
        parameters.width,
        parameters.height,
        parameters.component_count,
        parameters.bits_per_sample,
        output
    );
    Ok(())
}

fn show_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let parameters = jpegls_rs::read_header(ByteSource::from_slice(&data))?;

    println!("File: {input:?}");
    println!("Size: {} bytes", data.len());
    println!();
    println!("  Dimensions:  {}x{}", parameters.width, parameters.height);
    println!("  Bit depth:   {} bits", parameters.bits_per_sample);
    println!("  Components:  {}", parameters.component_count);
    println!("  Interleave:  {:?}", parameters.interleave_mode);
    if parameters.allowed_lossy_error == 0 {
        println!("  Mode:        Lossless");
    } else {
        println!("  Mode:        Near-lossless (NEAR={})", parameters.allowed_lossy_error);
    }
    if parameters.color_transformation != ColorTransformation::None {
        println!("  Transform:   {:?}", parameters.color_transformation);
    }
    if !parameters.custom.is_default() {
        let t = parameters.custom;
        println!(
            "  Thresholds:  MAXVAL={} T1={} T2={} T3={} RESET={}",
            t.maximum_sample_value, t.threshold1, t.threshold2, t.threshold3, t.reset_value
        );
    }
    if parameters.jfif.is_present() {
        let jfif = &parameters.jfif;
        println!(
            "  JFIF:        version {}.{:02}, density {}x{} (units {})",
            jfif.version >> 8,
            jfif.version & 0xFF,
            jfif.x_density,
            jfif.y_density,
            jfif.units
        );
    }
    Ok(())
}

/// Writes P5/P6 with big endian samples for depths above 8 bits.
fn write_pnm(path: &Path, pixels: &[u8], parameters: &ImageParameters) -> Result<(), Box<dyn std::error::Error>> {
    let components = parameters.component_count as usize;
    if components != 1 && components != 3 {
        return Err(format!("PNM output needs 1 or 3 components, image has {components}").into());
    }

    let bytes_per_sample = parameters.bytes_per_sample();
    let mut samples = if components == 3 && parameters.interleave_mode == InterleaveMode::None {
        let plane_size = pixels.len() / 3;
        let mut interleaved = Vec::with_capacity(pixels.len());
        for offset in (0..plane_size).step_by(bytes_per_sample) {
            for plane in 0..3 {
                let start = plane * plane_size + offset;
                interleaved.extend_from_slice(&pixels[start..start + bytes_per_sample]);
            }
        }
        interleaved
    } else {
        pixels.to_vec()
    };
    if bytes_per_sample == 2 {
        for sample in samples.chunks_exact_mut(2) {
            sample.swap(0, 1);
        }
    }

    let mut file = fs::File::create(path)?;
    writeln!(file, "{}", if components == 1 { "P5" } else { "P6" })?;
    writeln!(file, "{} {}", parameters.width, parameters.height)?;
    writeln!(file, "{}", parameters.maximum_sample_value())?;
    file.write_all(&samples)?;
    Ok(())
}
