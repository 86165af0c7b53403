// src/image/dng.rs

//! Minimal TIFF reader for the DNG colour calibration tags in IFD0.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use tracing::debug;

use crate::colour::metadata_solver::Calibration;

const TAG_DNG_VERSION: u16 = 50706;
const TAG_COLOR_MATRIX_1: u16 = 50721;
const TAG_COLOR_MATRIX_2: u16 = 50722;
const TAG_CAMERA_CALIBRATION_1: u16 = 50723;
const TAG_CAMERA_CALIBRATION_2: u16 = 50724;
const TAG_AS_SHOT_NEUTRAL: u16 = 50728;
const TAG_BASELINE_EXPOSURE: u16 = 50730;
const TAG_CALIBRATION_ILLUMINANT_1: u16 = 50778;
const TAG_CALIBRATION_ILLUMINANT_2: u16 = 50779;

/// DNG tags relevant to colour.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DngMetadata {
    /// DNGVersion packed as `0xAABBCCDD`; zero for non-DNG files.
    pub version: u32,
    pub baseline_exposure: f64,
    pub as_shot_neutral: Option<[f64; 3]>,
    pub calibrations: [Calibration; 2],
}

#[derive(Debug, Clone, Copy)]
enum Endian {
    Little,
    Big,
}

struct TiffReader<'a> {
    bytes: &'a [u8],
    endian: Endian,
}

impl<'a> TiffReader<'a> {
    fn new(bytes: &'a [u8]) -> Option<Self> {
        let endian = match bytes.get(0..2)? {
            b"II" => Endian::Little,
            b"MM" => Endian::Big,
            _ => return None,
        };
        let reader = Self { bytes, endian };
        (reader.u16_at(2)? == 42).then_some(reader)
    }

    fn slice(&self, offset: usize, len: usize) -> Option<&'a [u8]> {
        self.bytes.get(offset..offset.checked_add(len)?)
    }

    fn u16_at(&self, offset: usize) -> Option<u16> {
        let b = self.slice(offset, 2)?;
        Some(match self.endian {
            Endian::Little => LittleEndian::read_u16(b),
            Endian::Big => BigEndian::read_u16(b),
        })
    }

    fn u32_at(&self, offset: usize) -> Option<u32> {
        let b = self.slice(offset, 4)?;
        Some(match self.endian {
            Endian::Little => LittleEndian::read_u32(b),
            Endian::Big => BigEndian::read_u32(b),
        })
    }

    fn i32_at(&self, offset: usize) -> Option<i32> {
        let b = self.slice(offset, 4)?;
        Some(match self.endian {
            Endian::Little => LittleEndian::read_i32(b),
            Endian::Big => BigEndian::read_i32(b),
        })
    }

    fn f32_at(&self, offset: usize) -> Option<f32> {
        let b = self.slice(offset, 4)?;
        Some(match self.endian {
            Endian::Little => LittleEndian::read_f32(b),
            Endian::Big => BigEndian::read_f32(b),
        })
    }

    fn f64_at(&self, offset: usize) -> Option<f64> {
        let b = self.slice(offset, 8)?;
        Some(match self.endian {
            Endian::Little => LittleEndian::read_f64(b),
            Endian::Big => BigEndian::read_f64(b),
        })
    }

    /// Entries of IFD0 as `(tag, values)`.
    fn ifd0(&self) -> Vec<(u16, Vec<f64>)> {
        let mut entries = Vec::new();
        let Some(offset) = self.u32_at(4) else {
            return entries;
        };
        let offset = offset as usize;
        let Some(count) = self.u16_at(offset) else {
            return entries;
        };
        for i in 0..usize::from(count) {
            let entry = offset + 2 + i * 12;
            if let Some(parsed) = self.entry(entry) {
                entries.push(parsed);
            }
        }
        entries
    }

    fn entry(&self, at: usize) -> Option<(u16, Vec<f64>)> {
        let tag = self.u16_at(at)?;
        let field_type = self.u16_at(at + 2)?;
        let count = self.u32_at(at + 4)? as usize;
        let size = match field_type {
            1 | 2 | 6 | 7 => 1,
            3 | 8 => 2,
            4 | 9 | 11 => 4,
            5 | 10 | 12 => 8,
            _ => return None,
        };
        let total = size * count;
        let data = if total <= 4 {
            at + 8
        } else {
            self.u32_at(at + 8)? as usize
        };
        self.slice(data, total)?;

        let values = (0..count)
            .map(|k| {
                let p = data + k * size;
                match field_type {
                    1 | 2 | 7 => self.slice(p, 1).map(|b| f64::from(b[0])),
                    6 => self.slice(p, 1).map(|b| f64::from(b[0] as i8)),
                    3 => self.u16_at(p).map(f64::from),
                    8 => self.u16_at(p).map(|v| f64::from(v as i16)),
                    4 => self.u32_at(p).map(f64::from),
                    9 => self.i32_at(p).map(f64::from),
                    5 => Some(rational(
                        f64::from(self.u32_at(p)?),
                        f64::from(self.u32_at(p + 4)?),
                    )),
                    10 => Some(rational(
                        f64::from(self.i32_at(p)?),
                        f64::from(self.i32_at(p + 4)?),
                    )),
                    11 => self.f32_at(p).map(f64::from),
                    _ => self.f64_at(p),
                }
            })
            .collect::<Option<Vec<f64>>>()?;
        Some((tag, values))
    }
}

fn rational(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn matrix9(values: &[f64]) -> Option<[f64; 9]> {
    values.get(..9)?.try_into().ok()
}

/// Parse the DNG colour tags of a TIFF-based file. Returns `None` for files
/// that are not TIFF or carry no DNGVersion tag.
pub fn read_dng_metadata(bytes: &[u8]) -> Option<DngMetadata> {
    let reader = TiffReader::new(bytes)?;
    let mut metadata = DngMetadata::default();

    for (tag, values) in reader.ifd0() {
        match tag {
            TAG_DNG_VERSION => {
                metadata.version = values
                    .iter()
                    .take(4)
                    .fold(0u32, |acc, v| (acc << 8) | (*v as u32 & 0xff));
            }
            TAG_COLOR_MATRIX_1 | TAG_COLOR_MATRIX_2 => {
                let index = usize::from(tag != TAG_COLOR_MATRIX_1);
                if let Some(m) = matrix9(&values) {
                    metadata.calibrations[index].xyz_to_rgb = m;
                }
            }
            TAG_CAMERA_CALIBRATION_1 | TAG_CAMERA_CALIBRATION_2 => {
                let index = usize::from(tag != TAG_CAMERA_CALIBRATION_1);
                if let Some(m) = matrix9(&values) {
                    metadata.calibrations[index].camera_calibration = m;
                }
            }
            TAG_AS_SHOT_NEUTRAL => {
                if let [r, g, b, ..] = values[..] {
                    metadata.as_shot_neutral = Some([r, g, b]);
                }
            }
            TAG_BASELINE_EXPOSURE => {
                metadata.baseline_exposure = values.first().copied().unwrap_or(0.0);
            }
            TAG_CALIBRATION_ILLUMINANT_1 | TAG_CALIBRATION_ILLUMINANT_2 => {
                let index = usize::from(tag != TAG_CALIBRATION_ILLUMINANT_1);
                metadata.calibrations[index].illuminant =
                    values.first().map_or(0, |v| *v as u16);
            }
            _ => {}
        }
    }

    if metadata.version == 0 {
        return None;
    }
    debug!(version = format!("{:#010x}", metadata.version), "found DNG colour tags");
    Some(metadata)
}
