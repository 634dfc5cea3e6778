//! SoundFont 2 bank reader.
//!
//! Walks the RIFF `sfbk` form, decodes the instrument level of the `pdta`
//! list (`inst`, `ibag`, `igen`, `shdr`) and exports every referenced sample
//! from the `smpl` chunk as a mono 16-bit WAV. Presets are not read: each
//! instrument of the bank becomes one [`BankInstrument`].

use crate::bank::{BankSample, BankZone, GeneratorData, SampleHeader};
use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

const INST_RECORD: usize = 22;
const BAG_RECORD: usize = 4;
const GEN_RECORD: usize = 4;
const SHDR_RECORD: usize = 46;

/// `sampleID` generator operator.
const SAMPLE_ID: u16 = 53;

/// An instrument of the bank with its zones in file order.
#[derive(Clone, Debug, PartialEq)]
pub struct BankInstrument {
    pub name: String,
    pub zones: Vec<BankZone>,
}

/// The instruments of a SoundFont 2 bank.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SoundFont {
    pub instruments: Vec<BankInstrument>,
}

struct InstrumentHeader {
    name: String,
    bag_index: usize,
}

struct Bag {
    gen_index: usize,
}

struct SampleRecord {
    header: SampleHeader,
    sample_type: u16,
}

impl SoundFont {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(&fs::read(path)?)
    }

    /// Parse a bank held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let size = match read_form(&mut Cursor::new(data)) {
            Ok((id, size, form)) if &id == b"RIFF" && &form == b"sfbk" => size as usize,
            _ => return Err(Error::Format("not a SoundFont 2 bank".to_string())),
        };

        let end = data.len().min(8 + size).max(12);
        let mut chunks = HashMap::new();
        collect_chunks(&data[12..end], &mut chunks)?;

        let chunk = |id: &[u8; 4]| {
            chunks
                .get(id)
                .copied()
                .ok_or_else(|| Error::Format(format!("missing '{}' chunk", fourcc(id))))
        };
        let smpl = chunk(b"smpl")?;
        let headers = read_instruments(chunk(b"inst")?)?;
        let bags = read_bags(chunk(b"ibag")?)?;
        let generators = read_generators(chunk(b"igen")?)?;
        let samples = read_samples(chunk(b"shdr")?)?;

        let mut exported: HashMap<usize, BankSample> = HashMap::new();
        let mut instruments = Vec::new();
        // The last record of each list only terminates the one before it.
        for pair in headers.windows(2) {
            let (header, next) = (&pair[0], &pair[1]);
            let mut zones = Vec::new();
            for bag in header.bag_index..next.bag_index {
                let gen_range = match (bags.get(bag), bags.get(bag + 1)) {
                    (Some(first), Some(last)) if first.gen_index <= last.gen_index => {
                        first.gen_index..last.gen_index
                    }
                    _ => {
                        return Err(Error::Format(format!(
                            "instrument '{}' references missing zone {}",
                            header.name, bag
                        )))
                    }
                };
                let zone_generators = generators.get(gen_range).ok_or_else(|| {
                    Error::Format(format!("zone {} references missing generators", bag))
                })?;

                let sample = match zone_generators.iter().find(|g| g.oper == SAMPLE_ID) {
                    Some(g) => {
                        let index = usize::from(u16::from_le_bytes(g.amount));
                        Some(sample_for(index, &samples, smpl, &mut exported)?)
                    }
                    None => None,
                };
                zones.push(BankZone {
                    generators: zone_generators.to_vec(),
                    sample,
                });
            }
            log::debug!("Instrument '{}': {} zones", header.name, zones.len());
            instruments.push(BankInstrument {
                name: header.name.clone(),
                zones,
            });
        }

        Ok(SoundFont { instruments })
    }
}

fn read_form(reader: &mut Cursor<&[u8]>) -> std::io::Result<([u8; 4], u32, [u8; 4])> {
    let mut id = [0u8; 4];
    reader.read_exact(&mut id)?;
    let size = reader.read_u32::<LittleEndian>()?;
    let mut form = [0u8; 4];
    reader.read_exact(&mut form)?;
    Ok((id, size, form))
}

/// Record every leaf chunk, descending into `LIST` chunks.
fn collect_chunks<'a>(data: &'a [u8], chunks: &mut HashMap<[u8; 4], &'a [u8]>) -> Result<()> {
    let mut cursor = Cursor::new(data);
    while cursor.position() as usize + 8 <= data.len() {
        let mut id = [0u8; 4];
        cursor.read_exact(&mut id)?;
        let size = cursor.read_u32::<LittleEndian>()? as usize;
        let start = cursor.position() as usize;
        let end = start
            .checked_add(size)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| Error::Format(format!("truncated '{}' chunk", fourcc(&id))))?;

        let body = &data[start..end];
        if &id == b"LIST" {
            if body.len() >= 4 {
                collect_chunks(&body[4..], chunks)?;
            }
        } else {
            chunks.insert(id, body);
        }
        // Chunks are word aligned.
        cursor.set_position((end + (size & 1)) as u64);
    }
    Ok(())
}

fn fourcc(id: &[u8; 4]) -> String {
    String::from_utf8_lossy(id).into_owned()
}

/// Fixed 20-byte name, cut at the first NUL.
fn read_name(reader: &mut Cursor<&[u8]>) -> Result<String> {
    let mut raw = [0u8; 20];
    reader.read_exact(&mut raw)?;
    let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    Ok(String::from_utf8_lossy(&raw[..len]).trim().to_string())
}

fn records(body: &[u8], size: usize, kind: &str) -> Result<usize> {
    if body.len() % size != 0 {
        return Err(Error::Format(format!(
            "'{}' chunk size {} is not a multiple of {}",
            kind,
            body.len(),
            size
        )));
    }
    Ok(body.len() / size)
}

fn read_instruments(body: &[u8]) -> Result<Vec<InstrumentHeader>> {
    let mut reader = Cursor::new(body);
    (0..records(body, INST_RECORD, "inst")?)
        .map(|_| -> Result<InstrumentHeader> {
            Ok(InstrumentHeader {
                name: read_name(&mut reader)?,
                bag_index: usize::from(reader.read_u16::<LittleEndian>()?),
            })
        })
        .collect()
}

fn read_bags(body: &[u8]) -> Result<Vec<Bag>> {
    let mut reader = Cursor::new(body);
    (0..records(body, BAG_RECORD, "ibag")?)
        .map(|_| -> Result<Bag> {
            let gen_index = usize::from(reader.read_u16::<LittleEndian>()?);
            // Modulators are not converted.
            reader.read_u16::<LittleEndian>()?;
            Ok(Bag { gen_index })
        })
        .collect()
}

fn read_generators(body: &[u8]) -> Result<Vec<GeneratorData>> {
    let mut reader = Cursor::new(body);
    (0..records(body, GEN_RECORD, "igen")?)
        .map(|_| -> Result<GeneratorData> {
            let oper = reader.read_u16::<LittleEndian>()?;
            let mut amount = [0u8; 2];
            reader.read_exact(&mut amount)?;
            Ok(GeneratorData::new(oper, amount))
        })
        .collect()
}

fn read_samples(body: &[u8]) -> Result<Vec<SampleRecord>> {
    let mut reader = Cursor::new(body);
    (0..records(body, SHDR_RECORD, "shdr")?)
        .map(|_| -> Result<SampleRecord> {
            let name = read_name(&mut reader)?;
            let start = reader.read_u32::<LittleEndian>()?;
            let end = reader.read_u32::<LittleEndian>()?;
            let start_loop = reader.read_u32::<LittleEndian>()?;
            let end_loop = reader.read_u32::<LittleEndian>()?;
            let sample_rate = reader.read_u32::<LittleEndian>()?;
            let original_pitch = reader.read_u8()?;
            let correction = reader.read_i8()?;
            let _link = reader.read_u16::<LittleEndian>()?;
            let sample_type = reader.read_u16::<LittleEndian>()?;
            Ok(SampleRecord {
                header: SampleHeader {
                    name,
                    start,
                    end,
                    start_loop,
                    end_loop,
                    sample_rate,
                    original_pitch,
                    correction,
                },
                sample_type,
            })
        })
        .collect()
}

fn sample_for(
    index: usize,
    samples: &[SampleRecord],
    smpl: &[u8],
    exported: &mut HashMap<usize, BankSample>,
) -> Result<BankSample> {
    if let Some(sample) = exported.get(&index) {
        return Ok(sample.clone());
    }
    let record = samples
        .get(index)
        .ok_or_else(|| Error::Format(format!("zone references missing sample {}", index)))?;
    if record.sample_type & 0x8000 != 0 {
        log::warn!(
            "Sample '{}' lives in ROM, exporting it as silence",
            record.header.name
        );
    }

    let sample = BankSample {
        header: record.header.clone(),
        wav: export_wav(&record.header, record.sample_type, smpl)?,
    };
    exported.insert(index, sample.clone());
    Ok(sample)
}

/// Mono 16-bit WAV holding frames `start..end` of the sample data.
fn export_wav(header: &SampleHeader, sample_type: u16, smpl: &[u8]) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: header.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let (start, end) = (header.start as usize, header.end as usize);

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    if sample_type & 0x8000 != 0 {
        for _ in start..end.max(start) {
            writer.write_sample(0i16)?;
        }
    } else {
        let frames = smpl.get(start * 2..end * 2).ok_or_else(|| {
            Error::Format(format!(
                "sample '{}' lies outside the sample data",
                header.name
            ))
        })?;
        for frame in frames.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([frame[0], frame[1]]))?;
        }
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}
