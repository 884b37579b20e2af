//! Segment and layer record tables following the audio header

use std::io::{self, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    AudioHeader, CodecId, DSP_INFO_SIZE, IDENTITY_SIZE, LAYER_CONFIG_SIZE,
    LAYER_CONFIG_TRAILER_SIZE, LAYER_INFO_SIZE, SEGMENT_RECORD_SIZE, USABLE_SIZE_ENTRY_SIZE,
};
use crate::error::{Error, Result};
use crate::utils::encoding::base64_array;
use crate::utils::padded_string_len;

/// One segment table record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRecord {
    pub opaque: [u8; 0x18],
    /// Padded size of all layers in the segment
    pub layers_size: u32,
    /// Start of the segment relative to the header's data offset
    pub data_offset: u32,
}

impl SegmentRecord {
    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut opaque = [0u8; 0x18];
        reader.read_exact(&mut opaque)?;
        Ok(Self {
            opaque,
            layers_size: reader.read_u32::<LittleEndian>()?,
            data_offset: reader.read_u32::<LittleEndian>()?,
        })
    }

    fn write<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.opaque)?;
        writer.write_u32::<LittleEndian>(self.layers_size)?;
        writer.write_u32::<LittleEndian>(self.data_offset)
    }
}

/// One layer-info table record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub opaque_00: [u8; 0x10],
    pub block_size_pad: u32,
    pub opaque_14: [u8; 4],
    pub interleave: u16,
    pub frame_size: u16,
    pub opaque_1c: [u8; 4],
    /// Unpadded payload size
    pub block_size: u32,
    /// Offset of the layer within its segment
    pub layer_start: u32,
}

impl LayerInfo {
    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut opaque_00 = [0u8; 0x10];
        reader.read_exact(&mut opaque_00)?;
        let block_size_pad = reader.read_u32::<LittleEndian>()?;
        let mut opaque_14 = [0u8; 4];
        reader.read_exact(&mut opaque_14)?;
        let interleave = reader.read_u16::<LittleEndian>()?;
        let frame_size = reader.read_u16::<LittleEndian>()?;
        let mut opaque_1c = [0u8; 4];
        reader.read_exact(&mut opaque_1c)?;
        Ok(Self {
            opaque_00,
            block_size_pad,
            opaque_14,
            interleave,
            frame_size,
            opaque_1c,
            block_size: reader.read_u32::<LittleEndian>()?,
            layer_start: reader.read_u32::<LittleEndian>()?,
        })
    }

    fn write<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.opaque_00)?;
        writer.write_u32::<LittleEndian>(self.block_size_pad)?;
        writer.write_all(&self.opaque_14)?;
        writer.write_u16::<LittleEndian>(self.interleave)?;
        writer.write_u16::<LittleEndian>(self.frame_size)?;
        writer.write_all(&self.opaque_1c)?;
        writer.write_u32::<LittleEndian>(self.block_size)?;
        writer.write_u32::<LittleEndian>(self.layer_start)
    }
}

/// Per-layer codec metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub sample_rate: u32,
    #[serde(with = "base64_array")]
    pub opaque_04: [u8; 4],
    /// Approximate decoded size
    pub approx_size: u32,
    pub bits_per_sample: u16,
    pub channels: u8,
    pub opaque_0f: u8,
    #[serde(with = "base64_array")]
    pub opaque_10: [u8; 12],
    pub codec: CodecId,
}

impl LayerConfig {
    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let sample_rate = reader.read_u32::<LittleEndian>()?;
        let mut opaque_04 = [0u8; 4];
        reader.read_exact(&mut opaque_04)?;
        let approx_size = reader.read_u32::<LittleEndian>()?;
        let bits_per_sample = reader.read_u16::<LittleEndian>()?;
        let channels = reader.read_u8()?;
        let opaque_0f = reader.read_u8()?;
        let mut opaque_10 = [0u8; 12];
        reader.read_exact(&mut opaque_10)?;
        let mut codec = [0u8; 16];
        reader.read_exact(&mut codec)?;
        Ok(Self {
            sample_rate,
            opaque_04,
            approx_size,
            bits_per_sample,
            channels,
            opaque_0f,
            opaque_10,
            codec: CodecId::from_bytes(codec),
        })
    }

    fn write<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.sample_rate)?;
        writer.write_all(&self.opaque_04)?;
        writer.write_u32::<LittleEndian>(self.approx_size)?;
        writer.write_u16::<LittleEndian>(self.bits_per_sample)?;
        writer.write_u8(self.channels)?;
        writer.write_u8(self.opaque_0f)?;
        writer.write_all(&self.opaque_10)?;
        writer.write_all(self.codec.as_bytes())
    }
}

/// DSP ADPCM decoder state, carried through uninterpreted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DspInfo {
    pub approx_samples: u32,
    #[serde(with = "base64_array")]
    pub opaque_04: [u8; 4],
    #[serde(with = "base64_array")]
    pub reserved: [u8; 20],
    pub coefs: [i16; 16],
    #[serde(with = "base64_array")]
    pub opaque_3c: [u8; 4],
    pub history: [i16; 16],
}

impl DspInfo {
    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let approx_samples = reader.read_u32::<LittleEndian>()?;
        let mut opaque_04 = [0u8; 4];
        reader.read_exact(&mut opaque_04)?;
        let mut reserved = [0u8; 20];
        reader.read_exact(&mut reserved)?;
        let mut coefs = [0i16; 16];
        reader.read_i16_into::<LittleEndian>(&mut coefs)?;
        let mut opaque_3c = [0u8; 4];
        reader.read_exact(&mut opaque_3c)?;
        let mut history = [0i16; 16];
        reader.read_i16_into::<LittleEndian>(&mut history)?;
        Ok(Self {
            approx_samples,
            opaque_04,
            reserved,
            coefs,
            opaque_3c,
            history,
        })
    }

    fn write<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.approx_samples)?;
        writer.write_all(&self.opaque_04)?;
        writer.write_all(&self.reserved)?;
        for coef in self.coefs {
            writer.write_i16::<LittleEndian>(coef)?;
        }
        writer.write_all(&self.opaque_3c)?;
        for hist in self.history {
            writer.write_i16::<LittleEndian>(hist)?;
        }
        Ok(())
    }
}

/// A layer config record with its optional DSP record and trailing word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerConfigEntry {
    pub config: LayerConfig,
    /// Present exactly when the codec is DSP ADPCM
    pub dsp: Option<DspInfo>,
    pub trailer: [u8; LAYER_CONFIG_TRAILER_SIZE],
}

impl LayerConfigEntry {
    /// Encoded size of this entry
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        LAYER_CONFIG_SIZE
            + if self.dsp.is_some() { DSP_INFO_SIZE } else { 0 }
            + LAYER_CONFIG_TRAILER_SIZE
    }

    fn write<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        self.config.write(writer)?;
        if let Some(dsp) = &self.dsp {
            dsp.write(writer)?;
        }
        writer.write_all(&self.trailer)
    }
}

/// Bounds-checked sequential decoder over the header chunk payload
pub struct TableDecoder<'a> {
    data: &'a [u8],
    position: usize,
    /// Absolute offset of `data[0]`, for error reporting
    base_offset: u64,
}

impl<'a> TableDecoder<'a> {
    #[must_use]
    pub fn new(data: &'a [u8], position: usize, base_offset: u64) -> Self {
        Self {
            data,
            position: position.min(data.len()),
            base_offset,
        }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    fn absolute(&self) -> u64 {
        self.base_offset + self.position as u64
    }

    /// Fail with `CountOverflow` unless `count × record_size` bytes remain
    fn ensure(&self, table: &'static str, count: u64, record_size: usize) -> Result<u64> {
        let needed = count.saturating_mul(record_size as u64);
        if needed > self.remaining() as u64 {
            return Err(Error::CountOverflow {
                table,
                offset: self.absolute(),
                count,
                record_size: record_size as u64,
                available: self.remaining() as u64,
            });
        }
        Ok(needed)
    }

    /// Reserve `count × record_size` bytes, failing before any record is decoded
    fn claim(&mut self, table: &'static str, count: u64, record_size: usize) -> Result<&'a [u8]> {
        let needed = self.ensure(table, count, record_size)?;
        let start = self.position;
        self.position += needed as usize;
        Ok(&self.data[start..self.position])
    }

    /// Decode `count` fixed-width records
    pub fn decode_records<T, F>(
        &mut self,
        table: &'static str,
        count: u64,
        record_size: usize,
        decode: F,
    ) -> Result<Vec<T>>
    where
        F: Fn(&mut Cursor<&'a [u8]>) -> io::Result<T>,
    {
        let offset = self.absolute();
        let bytes = self.claim(table, count, record_size)?;
        let mut cursor = Cursor::new(bytes);
        let records = (0..count)
            .map(|_| decode(&mut cursor))
            .collect::<io::Result<Vec<T>>>()
            .map_err(|_| Error::truncated(offset, bytes.len() as u64, cursor.position()))?;
        tracing::debug!("Decoded {} {} records at {:#x}", records.len(), table, offset);
        Ok(records)
    }

    /// Decode `count` NUL-terminated strings padded to 16 bytes, keeping the raw bytes
    pub fn decode_padded_strings(&mut self, table: &'static str, count: u64) -> Result<Vec<Vec<u8>>> {
        // Each string needs at least one 16-byte block.
        self.ensure(table, count, 0x10)?;

        let mut strings = Vec::with_capacity(count as usize);
        for index in 0..count {
            let rest = &self.data[self.position..];
            let len = padded_string_len(rest).ok_or_else(|| {
                Error::malformed(
                    self.absolute(),
                    format!("{table} entry {index} is not NUL-terminated"),
                )
            })?;
            if len > rest.len() {
                return Err(Error::truncated(self.absolute(), len as u64, rest.len() as u64));
            }
            strings.push(rest[..len].to_vec());
            self.position += len;
        }
        Ok(strings)
    }

    /// Decode `count` layer config entries, each followed by a DSP record when its codec is DSP
    pub fn decode_layer_configs(&mut self, count: u64) -> Result<Vec<LayerConfigEntry>> {
        self.ensure(
            "layer-config",
            count,
            LAYER_CONFIG_SIZE + LAYER_CONFIG_TRAILER_SIZE,
        )?;

        let mut entries = Vec::with_capacity(count as usize);
        for index in 0..count {
            let config_bytes = self.claim("layer-config", 1, LAYER_CONFIG_SIZE)?;
            let config = LayerConfig::read(&mut Cursor::new(config_bytes))?;

            let dsp = if config.codec.is_dsp() {
                let dsp_bytes = self.claim("dsp-info", 1, DSP_INFO_SIZE)?;
                tracing::debug!("Layer {} uses DSP ADPCM", index);
                Some(DspInfo::read(&mut Cursor::new(dsp_bytes))?)
            } else {
                None
            };

            let trailer_bytes = self.claim("layer-config", 1, LAYER_CONFIG_TRAILER_SIZE)?;
            let mut trailer = [0u8; LAYER_CONFIG_TRAILER_SIZE];
            trailer.copy_from_slice(trailer_bytes);

            entries.push(LayerConfigEntry {
                config,
                dsp,
                trailer,
            });
        }
        Ok(entries)
    }

    /// Consume everything left in the chunk
    pub fn take_rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.position..];
        self.position = self.data.len();
        rest
    }
}

/// Every table following the base header, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTables {
    pub segments: Vec<SegmentRecord>,
    /// Usable bytes of each block, segment by segment (`S × L` words)
    pub usable_sizes: Vec<u32>,
    pub segment_ids: Vec<Uuid>,
    /// Raw padded segment names
    pub segment_names: Vec<Vec<u8>>,
    pub layer_infos: Vec<LayerInfo>,
    pub layer_configs: Vec<LayerConfigEntry>,
    /// Bytes after the last layer config entry
    pub tail: Vec<u8>,
}

impl HeaderTables {
    /// Decode all tables using the counts declared in `header`
    pub fn decode(decoder: &mut TableDecoder<'_>, header: &AudioHeader) -> Result<Self> {
        let segment_count = u64::from(header.total_segments);
        let layer_count = u64::from(header.total_layers);

        let segments =
            decoder.decode_records("segment", segment_count, SEGMENT_RECORD_SIZE, |c| {
                SegmentRecord::read(c)
            })?;
        let usable_sizes = decoder.decode_records(
            "usable-size",
            segment_count * layer_count,
            USABLE_SIZE_ENTRY_SIZE,
            |c| c.read_u32::<LittleEndian>(),
        )?;
        let segment_ids =
            decoder.decode_records("segment-identity", segment_count, IDENTITY_SIZE, |c| {
                let mut id = [0u8; IDENTITY_SIZE];
                c.read_exact(&mut id)?;
                Ok(Uuid::from_bytes(id))
            })?;
        let segment_names = decoder.decode_padded_strings("segment-name", segment_count)?;
        let layer_infos =
            decoder.decode_records("layer-info", layer_count, LAYER_INFO_SIZE, |c| {
                LayerInfo::read(c)
            })?;
        let layer_configs = decoder.decode_layer_configs(layer_count)?;
        let tail = decoder.take_rest().to_vec();

        Ok(Self {
            segments,
            usable_sizes,
            segment_ids,
            segment_names,
            layer_infos,
            layer_configs,
            tail,
        })
    }

    /// Encoded size of the tables
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.segments.len() * SEGMENT_RECORD_SIZE
            + self.usable_sizes.len() * USABLE_SIZE_ENTRY_SIZE
            + self.segment_ids.len() * IDENTITY_SIZE
            + self.segment_names.iter().map(Vec::len).sum::<usize>()
            + self.layer_infos.len() * LAYER_INFO_SIZE
            + self
                .layer_configs
                .iter()
                .map(LayerConfigEntry::encoded_len)
                .sum::<usize>()
            + self.tail.len()
    }

    /// Write the tables in file order
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        for segment in &self.segments {
            segment.write(writer)?;
        }
        for size in &self.usable_sizes {
            writer.write_u32::<LittleEndian>(*size)?;
        }
        for id in &self.segment_ids {
            writer.write_all(id.as_bytes())?;
        }
        for name in &self.segment_names {
            writer.write_all(name)?;
        }
        for info in &self.layer_infos {
            info.write(writer)?;
        }
        for entry in &self.layer_configs {
            entry.write(writer)?;
        }
        writer.write_all(&self.tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(tag: u32) -> LayerConfig {
        let mut codec = [0x5A; 16];
        codec[..4].copy_from_slice(&tag.to_le_bytes());
        LayerConfig {
            sample_rate: 32000,
            opaque_04: [1; 4],
            approx_size: 0x1234,
            bits_per_sample: 16,
            channels: 2,
            opaque_0f: 0,
            opaque_10: [3; 12],
            codec: CodecId::from_bytes(codec),
        }
    }

    fn dsp() -> DspInfo {
        DspInfo {
            approx_samples: 999,
            opaque_04: [4; 4],
            reserved: [0; 20],
            coefs: [-7; 16],
            opaque_3c: [9; 4],
            history: [12; 16],
        }
    }

    #[test]
    fn test_layer_config_record_offsets() {
        let mut bytes = Vec::new();
        config(0xF86215B0).write(&mut bytes).unwrap();
        assert_eq!(bytes.len(), LAYER_CONFIG_SIZE);
        assert_eq!(&bytes[0..4], &32000u32.to_le_bytes());
        assert_eq!(&bytes[0x0C..0x0E], &16u16.to_le_bytes());
        assert_eq!(bytes[0x0E], 2);
        assert_eq!(&bytes[0x1C..0x20], &0xF86215B0u32.to_le_bytes());
    }

    #[test]
    fn test_dsp_record_offsets() {
        let mut bytes = Vec::new();
        dsp().write(&mut bytes).unwrap();
        assert_eq!(bytes.len(), DSP_INFO_SIZE);
        assert_eq!(&bytes[0x1C..0x1E], &(-7i16).to_le_bytes());
        assert_eq!(&bytes[0x3C..0x40], &[9; 4]);
        assert_eq!(&bytes[0x40..0x42], &12i16.to_le_bytes());
    }

    #[test]
    fn test_dsp_presence_follows_codec() {
        let entries = [
            LayerConfigEntry {
                config: config(0xF86215B0),
                dsp: Some(dsp()),
                trailer: [0xEE; 4],
            },
            LayerConfigEntry {
                config: config(0xD01BD217),
                dsp: None,
                trailer: [0xDD; 4],
            },
        ];
        let mut bytes = Vec::new();
        for entry in &entries {
            entry.write(&mut bytes).unwrap();
        }
        assert_eq!(bytes.len(), 0x2C + 0x60 + 4 + 0x2C + 4);

        let mut decoder = TableDecoder::new(&bytes, 0, 0);
        let decoded = decoder.decode_layer_configs(2).unwrap();
        assert_eq!(decoded, entries);
        assert_eq!(decoder.remaining(), 0);
    }

    #[test]
    fn test_count_overflow_before_decoding() {
        let bytes = [0u8; 0x40];
        let mut decoder = TableDecoder::new(&bytes, 0, 0x100);
        let err = decoder
            .decode_records("segment", 3, SEGMENT_RECORD_SIZE, |c| SegmentRecord::read(c))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::CountOverflow {
                table: "segment",
                offset: 0x100,
                count: 3,
                available: 0x40,
                ..
            }
        ));
        assert_eq!(decoder.position(), 0);
    }

    #[test]
    fn test_missing_dsp_record_is_count_overflow() {
        let mut bytes = Vec::new();
        config(0xF86215B0).write(&mut bytes).unwrap();
        bytes.extend_from_slice(&[0; 8]);
        let mut decoder = TableDecoder::new(&bytes, 0, 0);
        let err = decoder.decode_layer_configs(1).unwrap_err();
        assert!(matches!(err, Error::CountOverflow { table: "dsp-info", .. }));
    }

    #[test]
    fn test_padded_strings_keep_raw_bytes() {
        let mut bytes = b"Intro\0".to_vec();
        bytes.resize(16, 0xCC);
        bytes.extend_from_slice(b"0123456789abcdef\0");
        bytes.resize(48, 0);
        let mut decoder = TableDecoder::new(&bytes, 0, 0);
        let names = decoder.decode_padded_strings("segment-name", 2).unwrap();
        assert_eq!(names[0].len(), 16);
        assert_eq!(names[0][15], 0xCC);
        assert_eq!(names[1].len(), 32);
        assert_eq!(decoder.remaining(), 0);
    }
}
