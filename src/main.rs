use std::fs::File;
use std::io::{BufWriter, Read, Write, stdin, stdout};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use bitpack::codec::{BitReader, BitWriter, range_width};
use bitpack::stream::{
    BufferedStream, FileAccess, FileMode, FileStream, MemoryStream, SeekOrigin, Stream,
};

#[derive(Parser, Debug)]
#[command(name = "bitpack", about = "Pack integers into the fewest bits their range needs")]
struct Cli {
    /// Report bit widths and positions on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pack whitespace separated integers into a bit stream
    Pack {
        /// Smallest value that may occur
        #[arg(long, allow_hyphen_values = true)]
        min: i64,

        /// Largest value that may occur
        #[arg(long, allow_hyphen_values = true)]
        max: i64,

        /// If specified reads the file otherwise use stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// If specified writes to the file otherwise use stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the packed bytes as hex text instead of raw bytes
        #[arg(long)]
        hex: bool,
    },

    /// Unpack a bit stream into one integer per line
    Unpack {
        /// Smallest value that may occur, must match the packing range
        #[arg(long, allow_hyphen_values = true)]
        min: i64,

        /// Largest value that may occur, must match the packing range
        #[arg(long, allow_hyphen_values = true)]
        max: i64,

        /// If specified reads the file otherwise use stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// If specified writes to the file otherwise use stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of values to read. Without it, reading stops when the data
        /// runs out, which may decode padding bits as extra values.
        #[arg(short, long)]
        count: Option<usize>,

        /// Start this many bits into the input
        #[arg(long, default_value_t = 0)]
        skip_bits: u64,
    },

    /// Print the number of bits a range needs per value
    Width {
        #[arg(long, allow_hyphen_values = true)]
        min: i64,

        #[arg(long, allow_hyphen_values = true)]
        max: i64,
    },

    /// Hex dump of the bytes found at an arbitrary bit offset
    Dump {
        /// If specified reads the file otherwise use stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Start this many bits into the input
        #[arg(long, default_value_t = 0)]
        skip_bits: u64,

        /// Maximum number of bytes to dump
        #[arg(short, long)]
        len: Option<usize>,
    },
}

/// A command line range resolved to the integer type the codec packs it as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueRange {
    Unsigned(u32, u32),
    Signed(i32, i32),
}

impl ValueRange {
    fn new(min: i64, max: i64) -> Result<Self> {
        if max <= min {
            bail!("max ({max}) must be greater than min ({min})");
        }
        if let (Ok(min), Ok(max)) = (u32::try_from(min), u32::try_from(max)) {
            return Ok(ValueRange::Unsigned(min, max));
        }
        if let (Ok(min), Ok(max)) = (i32::try_from(min), i32::try_from(max)) {
            return Ok(ValueRange::Signed(min, max));
        }
        bail!("range [{min}, {max}] does not fit in 32 bits");
    }

    fn width(self) -> Result<u32> {
        let width = match self {
            ValueRange::Unsigned(min, max) => range_width(min, max)?,
            ValueRange::Signed(min, max) => range_width(min, max)?,
        };
        Ok(width)
    }

    fn write<S: Stream>(self, bw: &mut BitWriter<S>, value: i64) -> Result<()> {
        match self {
            ValueRange::Unsigned(min, max) => {
                let value = u32::try_from(value)
                    .with_context(|| format!("{value} is outside [{min}, {max}]"))?;
                bw.write_in_range(value, min, max)?;
            }
            ValueRange::Signed(min, max) => {
                let value = i32::try_from(value)
                    .with_context(|| format!("{value} is outside [{min}, {max}]"))?;
                bw.write_in_range(value, min, max)?;
            }
        }
        Ok(())
    }

    fn read<S: Stream>(self, br: &mut BitReader<S>) -> Result<Option<i64>> {
        let value = match self {
            ValueRange::Unsigned(min, max) => br.read_in_range(min, max)?.map(i64::from),
            ValueRange::Signed(min, max) => br.read_in_range(min, max)?.map(i64::from),
        };
        Ok(value)
    }
}

fn read_input(input: Option<&Path>) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match input {
        Some(path) => {
            File::open(path)
                .with_context(|| format!("open {}", path.display()))?
                .read_to_end(&mut bytes)?;
        }
        None => {
            stdin().read_to_end(&mut bytes).context("read stdin")?;
        }
    }
    Ok(bytes)
}

fn open_output(output: Option<&Path>) -> Result<BufWriter<Box<dyn Write>>> {
    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("create {}", path.display()))?,
        ),
        None => Box::new(stdout()),
    };
    Ok(BufWriter::new(sink))
}

/// Opens the input as a seekable stream: files directly, stdin through memory.
fn open_stream(input: Option<&Path>) -> Result<Box<dyn Stream>> {
    let stream: Box<dyn Stream> = match input {
        Some(path) => {
            let file = FileStream::with_access(path, FileMode::Open, FileAccess::Read)
                .with_context(|| format!("open {}", path.display()))?;
            Box::new(BufferedStream::new(file))
        }
        None => Box::new(MemoryStream::read_only(read_input(None)?)),
    };
    Ok(stream)
}

fn parse_values(text: &str) -> Result<Vec<i64>> {
    text.split_whitespace()
        .enumerate()
        .map(|(i, token)| {
            token
                .parse::<i64>()
                .with_context(|| format!("value #{} ({token:?}) is not an integer", i + 1))
        })
        .collect()
}

fn pack_into<S: Stream>(stream: S, range: ValueRange, values: &[i64]) -> Result<(S, u64)> {
    let mut bw = BitWriter::new(stream);
    for &value in values {
        range.write(&mut bw, value)?;
    }
    let bits = bw.bit_position()?;
    bw.flush()?;
    Ok((bw.into_inner()?, bits))
}

fn pack(
    range: ValueRange,
    input: Option<&Path>,
    output: Option<&Path>,
    hex: bool,
    verbose: bool,
) -> Result<()> {
    let text = String::from_utf8(read_input(input)?).context("input is not utf-8 text")?;
    let values = parse_values(&text)?;

    if verbose {
        eprintln!(
            "packing {} values at {} bits each",
            values.len(),
            range.width()?
        );
    }

    let bits = match output {
        Some(path) if !hex => {
            let file = FileStream::open(path, FileMode::Create)
                .with_context(|| format!("create {}", path.display()))?;
            let (mut file, bits) = pack_into(file, range, &values)?;
            file.close()?;
            bits
        }
        _ => {
            let (ms, bits) = pack_into(MemoryStream::new(), range, &values)?;
            let mut out = open_output(output)?;
            if hex {
                writeln!(out, "{}", hex::encode(ms.as_slice()))?;
            } else {
                out.write_all(ms.as_slice())?;
            }
            out.flush()?;
            bits
        }
    };

    if verbose {
        eprintln!("wrote {bits} bits in {} bytes", bitpack::codec::bits_to_bytes(bits));
    }
    Ok(())
}

fn unpack(
    range: ValueRange,
    input: Option<&Path>,
    output: Option<&Path>,
    count: Option<usize>,
    skip_bits: u64,
    verbose: bool,
) -> Result<()> {
    let mut br = BitReader::new(open_stream(input)?);
    if skip_bits > 0 {
        br.seek_bits(skip_bits as i64, SeekOrigin::Begin)?;
    }

    let mut out = open_output(output)?;
    let mut decoded = 0usize;
    while count.is_none_or(|n| decoded < n) {
        match range.read(&mut br)? {
            Some(value) => writeln!(out, "{value}")?,
            None => break,
        }
        decoded += 1;
    }
    out.flush()?;

    if let Some(n) = count {
        if decoded < n {
            bail!("data ended after {decoded} of {n} values");
        }
    }
    if verbose {
        eprintln!(
            "read {decoded} values, stopped at bit {}",
            br.bit_position()?
        );
    }
    Ok(())
}

fn dump(input: Option<&Path>, skip_bits: u64, len: Option<usize>) -> Result<()> {
    let mut br = BitReader::new(open_stream(input)?);
    if skip_bits > 0 {
        br.seek_bits(skip_bits as i64, SeekOrigin::Begin)?;
    }

    let mut out = open_output(None)?;
    let mut row = [0u8; 16];
    let mut offset = 0usize;
    loop {
        let want = match len {
            Some(len) => row.len().min(len - offset),
            None => row.len(),
        };
        if want == 0 {
            break;
        }
        let nread = br.read_bytes(&mut row[..want])?;
        if nread == 0 {
            break;
        }
        writeln!(out, "{:08x}  {}", offset, hex::encode(&row[..nread]))?;
        offset += nread;
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Pack {
            min,
            max,
            input,
            output,
            hex,
        } => pack(
            ValueRange::new(min, max)?,
            input.as_deref(),
            output.as_deref(),
            hex,
            cli.verbose,
        ),
        Command::Unpack {
            min,
            max,
            input,
            output,
            count,
            skip_bits,
        } => unpack(
            ValueRange::new(min, max)?,
            input.as_deref(),
            output.as_deref(),
            count,
            skip_bits,
            cli.verbose,
        ),
        Command::Width { min, max } => {
            println!("{}", ValueRange::new(min, max)?.width()?);
            Ok(())
        }
        Command::Dump {
            input,
            skip_bits,
            len,
        } => dump(input.as_deref(), skip_bits, len),
    }
}
