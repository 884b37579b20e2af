//! Synthetic containers and bundles built byte by byte, independent of the library writers
#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};

pub const VERSION: u32 = 0x1C02_0037;
pub const PCM_TAG: u32 = 0xD01B_D217;
pub const DSP_TAG: u32 = 0xF862_15B0;

/// Codec of one shared layer record
#[derive(Debug, Clone, Copy)]
pub struct LayerFixture {
    pub dsp: bool,
}

impl LayerFixture {
    pub fn pcm() -> Self {
        Self { dsp: false }
    }

    pub fn dsp() -> Self {
        Self { dsp: true }
    }
}

/// Description of a container to build
///
/// Every segment holds one payload per layer. A layer's block size is the
/// longest of its payloads; shorter payloads are followed by fill bytes.
#[derive(Debug, Clone)]
pub struct ContainerFixture {
    pub name: String,
    pub layer_alignment: u32,
    pub segment_alignment: u32,
    pub layers: Vec<LayerFixture>,
    /// Payloads per segment, one per layer
    pub segments: Vec<Vec<Vec<u8>>>,
    pub prefix: Vec<u8>,
    pub tail: Vec<u8>,
    pub header_tail: Vec<u8>,
    /// Byte used for unused block bytes, layer padding and segment padding
    pub padding_fill: u8,
}

fn round_up(value: usize, alignment: u32) -> usize {
    let a = alignment.max(1) as usize;
    value.div_ceil(a) * a
}

fn padded(name: &str) -> Vec<u8> {
    let mut bytes = name.as_bytes().to_vec();
    let len = bytes.len() + (16 - bytes.len() % 16);
    bytes.resize(len, 0);
    bytes
}

fn codec(tag: u32) -> [u8; 16] {
    let mut bytes = [0x5A; 16];
    bytes[..4].copy_from_slice(&tag.to_le_bytes());
    bytes
}

impl ContainerFixture {
    pub fn new(name: &str, layer_alignment: u32, segment_alignment: u32) -> Self {
        Self {
            name: name.to_string(),
            layer_alignment,
            segment_alignment,
            layers: Vec::new(),
            segments: Vec::new(),
            prefix: Vec::new(),
            tail: Vec::new(),
            header_tail: Vec::new(),
            padding_fill: 0,
        }
    }

    pub fn layer(mut self, layer: LayerFixture) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn segment(mut self, payloads: Vec<Vec<u8>>) -> Self {
        self.segments.push(payloads);
        self
    }

    /// Shared block size of layer `l`
    pub fn block_size(&self, l: usize) -> usize {
        self.segments.iter().map(|p| p[l].len()).max().unwrap_or(0)
    }

    /// Bytes of the block for segment `s`, layer `l`, as unpack extracts them
    pub fn block(&self, s: usize, l: usize) -> Vec<u8> {
        let mut bytes = self.segments[s][l].clone();
        bytes.resize(self.block_size(l), self.padding_fill);
        bytes
    }

    /// Per layer: (block_size, block_size_pad, layer_start)
    fn layer_plan(&self) -> Vec<(usize, usize, usize)> {
        let mut start = 0;
        (0..self.layers.len())
            .map(|l| {
                let size = self.block_size(l);
                let pad = round_up(size, self.layer_alignment);
                let placement = (size, pad, start);
                start += pad;
                placement
            })
            .collect()
    }

    fn block_layers_size(&self) -> usize {
        self.layer_plan().iter().map(|(_, pad, _)| pad).sum()
    }

    /// Per segment: (data_offset, layers_size)
    fn segment_plan(&self) -> Vec<(usize, usize)> {
        let layers_size = round_up(self.block_layers_size(), self.segment_alignment);
        let mut cursor = 0;
        self.segments
            .iter()
            .map(|_| {
                let data_offset = round_up(cursor, self.segment_alignment);
                cursor = data_offset + layers_size;
                (data_offset, layers_size)
            })
            .collect()
    }

    fn header_payload(&self) -> Vec<u8> {
        for payloads in &self.segments {
            assert_eq!(payloads.len(), self.layers.len(), "one payload per layer");
        }
        let segment_count = self.segments.len();

        let mut out = Vec::new();
        out.extend((0..0x20u8).map(|b| b.wrapping_mul(3)));
        out.write_u32::<LittleEndian>(segment_count as u32).unwrap();
        out.extend_from_slice(&[1, 2, 3, 4]);
        out.write_u32::<LittleEndian>(self.layers.len() as u32).unwrap();
        out.extend_from_slice(&[5; 8]);
        out.write_u32::<LittleEndian>(self.block_layers_size() as u32).unwrap();
        out.write_u32::<LittleEndian>(self.prefix.len() as u32).unwrap();
        out.extend_from_slice(&[9; 4]);
        out.extend_from_slice(&[0x42; 16]);
        out.extend(padded(&self.name));

        for (s, (data_offset, layers_size)) in self.segment_plan().iter().enumerate() {
            out.extend_from_slice(&[s as u8 + 0x60; 0x18]);
            out.write_u32::<LittleEndian>(*layers_size as u32).unwrap();
            out.write_u32::<LittleEndian>(*data_offset as u32).unwrap();
        }
        for payloads in &self.segments {
            for payload in payloads {
                out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
            }
        }
        for s in 0..segment_count {
            out.extend_from_slice(&[0x50 + s as u8; 16]);
        }
        for s in 0..segment_count {
            out.extend(padded(&format!("seg{s}")));
        }
        for (size, pad, start) in self.layer_plan() {
            out.extend_from_slice(&[0x10; 16]);
            out.write_u32::<LittleEndian>(pad as u32).unwrap();
            out.extend_from_slice(&[0x14; 4]);
            out.write_u16::<LittleEndian>(0x10).unwrap();
            out.write_u16::<LittleEndian>(0x40).unwrap();
            out.extend_from_slice(&[0x1C; 4]);
            out.write_u32::<LittleEndian>(size as u32).unwrap();
            out.write_u32::<LittleEndian>(start as u32).unwrap();
        }
        for (layer, (size, _, _)) in self.layers.iter().zip(self.layer_plan()) {
            out.write_u32::<LittleEndian>(22050).unwrap();
            out.extend_from_slice(&[0; 4]);
            out.write_u32::<LittleEndian>(size as u32).unwrap();
            out.write_u16::<LittleEndian>(if layer.dsp { 4 } else { 16 }).unwrap();
            out.push(1);
            out.push(0);
            out.extend_from_slice(&[0; 12]);
            out.extend_from_slice(&codec(if layer.dsp { DSP_TAG } else { PCM_TAG }));
            if layer.dsp {
                out.extend((0..0x60u8).map(|b| b ^ 0xA5));
            }
            out.extend_from_slice(&[0xEE; 4]);
        }
        out.extend_from_slice(&self.header_tail);
        out
    }

    fn data_payload(&self) -> Vec<u8> {
        let mut out = self.prefix.clone();
        let base = out.len();
        let layers = self.layer_plan();
        for (s, (data_offset, layers_size)) in self.segment_plan().into_iter().enumerate() {
            out.resize(base + data_offset, 0);
            let segment_start = out.len();
            for (l, (_, pad, start)) in layers.iter().enumerate() {
                out.resize(segment_start + start, self.padding_fill);
                out.extend(self.block(s, l));
                out.resize(segment_start + start + pad, self.padding_fill);
            }
            out.resize(segment_start + layers_size, self.padding_fill);
        }
        out.extend_from_slice(&self.tail);
        out
    }

    /// Complete container bytes
    pub fn build(&self) -> Vec<u8> {
        let header = self.header_payload();
        let data = self.data_payload();
        let mut out = Vec::new();
        chunk_header(&mut out, 0x80D, (24 + header.len() + data.len()) as u32);
        chunk_header(&mut out, 0x80E, header.len() as u32);
        out.extend(header);
        chunk_header(&mut out, 0x80F, data.len() as u32);
        out.extend(data);
        out
    }

    /// Absolute file offset of the `index`-th layer-info record
    pub fn layer_info_offset(&self, index: usize) -> usize {
        let s = self.segments.len();
        24 + 0x50
            + padded(&self.name).len()
            + s * 0x20
            + s * self.layers.len() * 4
            + s * 16
            + (0..s).map(|i| padded(&format!("seg{i}")).len()).sum::<usize>()
            + index * 0x28
    }
}

fn chunk_header(out: &mut Vec<u8>, id: u32, size: u32) {
    out.write_u32::<LittleEndian>(id).unwrap();
    out.write_u32::<LittleEndian>(size).unwrap();
    out.write_u32::<LittleEndian>(VERSION).unwrap();
}

/// A section of a stream bundle
#[derive(Debug, Clone)]
pub enum SectionFixture {
    Raw { id: u32, payload: Vec<u8> },
    Asset {
        name: String,
        kind: String,
        file: Vec<u8>,
        rest: Vec<u8>,
        trailing: Vec<u8>,
    },
}

fn sized(out: &mut Vec<u8>, bytes: &[u8]) {
    out.write_u32::<LittleEndian>(bytes.len() as u32).unwrap();
    out.extend_from_slice(bytes);
}

/// Complete bundle bytes
pub fn build_stream(sections: &[SectionFixture]) -> Vec<u8> {
    let mut out = Vec::new();
    for section in sections {
        match section {
            SectionFixture::Raw { id, payload } => {
                chunk_header(&mut out, *id, payload.len() as u32);
                out.extend_from_slice(payload);
            }
            SectionFixture::Asset {
                name,
                kind,
                file,
                rest,
                trailing,
            } => {
                let mut header = Vec::new();
                sized(&mut header, format!("{name}\0").as_bytes());
                header.extend_from_slice(&[0x33; 16]);
                sized(&mut header, format!("{kind}\0").as_bytes());
                header.extend_from_slice(rest);

                let mut body = Vec::new();
                sized(&mut body, &header);
                sized(&mut body, file);
                body.extend_from_slice(trailing);

                chunk_header(&mut out, 0x716, body.len() as u32);
                out.extend(body);
            }
        }
    }
    out
}

/// Deterministic payload of `len` bytes
pub fn payload(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add((i % 251) as u8)).collect()
}
