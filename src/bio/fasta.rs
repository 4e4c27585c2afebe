use crate::bio::sequence::Sequence;
use crate::SteamboatError;
use flate2::read::GzDecoder;
use indexmap::IndexMap;
use memmap2::Mmap;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{line_ending, not_line_ending},
    combinator::{eof, map, opt},
    sequence::preceded,
    IResult,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Parse a FASTA header line
fn parse_header(input: &[u8]) -> IResult<&[u8], (&str, Option<&str>)> {
    let (input, _) = tag(b">")(input)?;
    let (input, id) = map(
        take_till(|c: u8| c == b' ' || c == b'\t' || c == b'\n' || c == b'\r'),
        |s| std::str::from_utf8(s).unwrap_or(""),
    )(input)?;
    let (input, description) = opt(preceded(
        take_while1(|c: u8| c == b' ' || c == b'\t'),
        map(not_line_ending, |s| std::str::from_utf8(s).unwrap_or("")),
    ))(input)?;
    let (input, _) = alt((line_ending, eof))(input)?;
    Ok((input, (id, description.filter(|d| !d.is_empty()))))
}

/// Parse sequence lines until next header or EOF
fn parse_sequence(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let mut sequence = Vec::new();
    let mut remaining = input;

    while !remaining.is_empty() && remaining[0] != b'>' {
        let (rest, line) =
            take_till::<_, _, nom::error::Error<_>>(|c: u8| c == b'\n' || c == b'\r')(remaining)?;
        let (rest, _) = opt(line_ending)(rest)?;
        // A lone '\r' is not a line ending to nom
        let rest = rest.strip_prefix(b"\r").unwrap_or(rest);

        sequence.extend(line.iter().filter(|c| !c.is_ascii_whitespace()));
        remaining = rest;
    }

    Ok((remaining, sequence))
}

/// Split off one line, without its line ending
fn skip_line(input: &[u8]) -> Result<(&[u8], &[u8]), SteamboatError> {
    let (rest, line) = take_till::<_, _, nom::error::Error<_>>(|c: u8| c == b'\n' || c == b'\r')(input)
        .map_err(|e| SteamboatError::Parse(format!("Failed to parse FASTA: {:?}", e)))?;
    let rest = rest.strip_prefix(b"\r").unwrap_or(rest);
    let rest = rest.strip_prefix(b"\n").unwrap_or(rest);
    Ok((rest, line))
}

/// Parse a single FASTA record
fn parse_record(input: &[u8]) -> IResult<&[u8], Sequence> {
    let (input, (id, description)) = parse_header(input)?;
    let (input, sequence) = parse_sequence(input)?;

    let mut seq = Sequence::new(id.to_string(), sequence);
    if let Some(desc) = description {
        seq = seq.with_description(desc.to_string());
    }

    Ok((input, seq))
}

/// Parse FASTA from bytes
///
/// Records with an empty sequence are kept so callers can tell an empty
/// record apart from a missing one.
pub fn parse_fasta_from_bytes(data: &[u8]) -> Result<Vec<Sequence>, SteamboatError> {
    let mut input = data;
    let mut sequences = Vec::new();

    while !input.is_empty() {
        while !input.is_empty() && input[0].is_ascii_whitespace() {
            input = &input[1..];
        }

        if input.is_empty() {
            break;
        }

        // Only reachable before the first header
        if input[0] != b'>' {
            let (rest, line) = skip_line(input)?;
            warn!(
                "Skipping text before the first FASTA header: {}",
                String::from_utf8_lossy(line)
            );
            input = rest;
            continue;
        }

        let (remaining, seq) = parse_record(input)
            .map_err(|e| SteamboatError::Parse(format!("Failed to parse FASTA: {:?}", e)))?;
        sequences.push(seq);
        input = remaining;
    }

    Ok(sequences)
}

/// Parse a FASTA file into sequences (supports .gz compression)
pub fn parse_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>, SteamboatError> {
    let path = path.as_ref();

    if is_gzipped(path) {
        parse_fasta_gzip(path)
    } else {
        parse_fasta_uncompressed(path)
    }
}

fn is_gzipped(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("gz")
}

fn parse_fasta_uncompressed(path: &Path) -> Result<Vec<Sequence>, SteamboatError> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(Vec::new());
    }
    let mmap = unsafe { Mmap::map(&file)? };

    parse_fasta_from_bytes(&mmap[..])
}

fn parse_fasta_gzip(path: &Path) -> Result<Vec<Sequence>, SteamboatError> {
    let file = File::open(path)?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let mut buffer = Vec::new();
    decoder.read_to_end(&mut buffer)?;

    parse_fasta_from_bytes(&buffer)
}

/// Read a FASTA file keyed by record id
///
/// A repeated id keeps its first position and takes the later sequence.
pub fn read_fasta_map<P: AsRef<Path>>(path: P) -> Result<IndexMap<String, String>, SteamboatError> {
    let path = path.as_ref();
    debug!("Reading FASTA from {} as map", path.display());
    Ok(parse_fasta(path)?
        .into_iter()
        .map(|seq| {
            let residues = seq.as_string();
            (seq.id, residues)
        })
        .collect())
}

/// Read a FASTA file as a list of sequences, dropping the headers
pub fn read_fasta_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>, SteamboatError> {
    let path = path.as_ref();
    debug!("Reading FASTA from {} as list", path.display());
    Ok(parse_fasta(path)?.iter().map(Sequence::as_string).collect())
}

/// Write sequences to a FASTA file (supports .gz compression)
///
/// With `line_width` set, sequences are wrapped at that many residues;
/// otherwise each sequence is written on a single line.
pub fn write_fasta<P: AsRef<Path>>(
    path: P,
    sequences: &[Sequence],
    line_width: Option<usize>,
) -> Result<(), SteamboatError> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let path = path.as_ref();
    debug!("Writing {} sequences to {}", sequences.len(), path.display());
    let file = File::create(path)?;

    if is_gzipped(path) {
        let encoder = GzEncoder::new(file, Compression::default());
        let mut writer = BufWriter::new(encoder);
        write_fasta_to_writer(&mut writer, sequences, line_width)?;
        writer
            .into_inner()
            .map_err(|e| SteamboatError::Io(e.into_error()))?
            .finish()?;
    } else {
        let mut writer = BufWriter::new(file);
        write_fasta_to_writer(&mut writer, sequences, line_width)?;
        writer.flush()?;
    }

    Ok(())
}

/// Write sequences to any writer
pub fn write_fasta_to_writer<W: Write>(
    writer: &mut W,
    sequences: &[Sequence],
    line_width: Option<usize>,
) -> Result<(), SteamboatError> {
    for seq in sequences {
        writeln!(writer, "{}", seq.header())?;

        match line_width {
            Some(width) if width > 0 && !seq.is_empty() => {
                for chunk in seq.sequence.chunks(width) {
                    writeln!(writer, "{}", String::from_utf8_lossy(chunk))?;
                }
            }
            _ => writeln!(writer, "{}", seq.as_string())?,
        }
    }
    Ok(())
}
