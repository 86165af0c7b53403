// src/image/develop.rs

//! Raw development: sensor samples to a float RGB image.
//!
//! Steps, in order: black subtraction and normalisation, white balance,
//! highlight handling, demosaicing (or half-size binning), chromatic
//! aberration correction, optional conversion to XYZ, auto-brightness and
//! orientation.

use tracing::{debug, warn};

use crate::colour::math::camera_to_xyz_from_colour_matrix;
use crate::errors::{RawToAcesError, Result};
use crate::image::buffer::ImageBuf;
use crate::image::raw::{CfaPattern, RawImage, RawMetadata, SensorData};
use crate::types::{DemosaicAlgorithm, HighlightMode, Matrix3, PixelBox};

/// Colour space of the developed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputColour {
    /// White-balanced camera RGB.
    #[default]
    Raw,
    /// CIE XYZ relative to D65.
    Xyz,
}

/// Decoding hints computed by the converter before the image is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOptions {
    pub output_colour: OutputColour,
    /// 0: built-in matrix only, 1: prefer the DNG colour matrix, 3: always
    /// use the file's matrix.
    pub use_camera_matrix: i32,
    pub use_camera_wb: bool,
    pub use_auto_wb: bool,
    pub user_mul: Option<[f64; 4]>,
    pub grey_box: Option<PixelBox>,
    pub user_black: Option<f64>,
    pub user_sat: Option<f64>,
    pub adjust_maximum_threshold: f64,
    pub auto_bright: bool,
    pub half_size: bool,
    /// Overrides the file orientation when set.
    pub user_flip: Option<i32>,
    pub highlight_mode: HighlightMode,
    pub demosaic: DemosaicAlgorithm,
    pub crop_box: Option<PixelBox>,
    /// Red and blue scale factors.
    pub chromatic_aberration: Option<[f64; 2]>,
    pub denoise_threshold: f64,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            output_colour: OutputColour::Raw,
            use_camera_matrix: 0,
            use_camera_wb: false,
            use_auto_wb: false,
            user_mul: None,
            grey_box: None,
            user_black: None,
            user_sat: None,
            adjust_maximum_threshold: 0.0,
            auto_bright: false,
            half_size: false,
            user_flip: None,
            highlight_mode: HighlightMode::Clip,
            demosaic: DemosaicAlgorithm::Linear,
            crop_box: None,
            chromatic_aberration: None,
            denoise_threshold: 0.0,
        }
    }
}

/// Sensor samples after normalisation, before demosaicing.
struct Mosaic<'a> {
    width: usize,
    height: usize,
    samples: Vec<f32>,
    /// `None` for three interleaved samples per pixel.
    pattern: Option<&'a CfaPattern>,
}

impl Mosaic<'_> {
    fn channels(&self) -> usize {
        if self.pattern.is_some() { 1 } else { 3 }
    }

    /// CFA colour of sample `k`, 0..4.
    fn colour_of(&self, k: usize) -> usize {
        match self.pattern {
            Some(pattern) => pattern.color_at(k / self.width, k % self.width),
            None => k % 3,
        }
    }
}

pub fn develop(raw: &RawImage, options: &DecodeOptions) -> Result<ImageBuf> {
    let meta = &raw.metadata;
    let (samples, pattern) = match &raw.sensor {
        SensorData::Cfa { pattern, values } => (values, Some(pattern)),
        SensorData::Rgb { values } => (values, None),
    };
    let per_pixel = if pattern.is_some() { 1 } else { 3 };
    if meta.width == 0 || meta.height == 0 || samples.len() != meta.width * meta.height * per_pixel
    {
        return Err(RawToAcesError::Image(format!(
            "sensor data does not match the {}x{} image size",
            meta.width, meta.height
        )));
    }

    if options.denoise_threshold > 0.0 {
        warn!(
            threshold = options.denoise_threshold,
            "Wavelet denoising is not supported, the threshold is ignored."
        );
    }

    let mut mosaic = Mosaic {
        width: meta.width,
        height: meta.height,
        samples: samples.clone(),
        pattern,
    };

    normalise_levels(&mut mosaic, meta, options)?;
    let multipliers = wb_multipliers(&mosaic, meta, options);
    debug!(?multipliers, "white balance multipliers");
    apply_white_balance(&mut mosaic, &multipliers, options.highlight_mode);

    let mut image = if options.half_size {
        half_size(&mosaic)?
    } else {
        demosaic(&mosaic, options.demosaic)?
    };

    if let Some([red, blue]) = options.chromatic_aberration {
        correct_aberration(&mut image, 0, red);
        correct_aberration(&mut image, 2, blue);
    }

    if options.output_colour == OutputColour::Xyz {
        image.apply_matrix(&camera_to_xyz(meta, options.use_camera_matrix)?);
    }

    if options.auto_bright {
        auto_bright(&mut image);
    }

    let mut display = options
        .crop_box
        .filter(|b| !b.is_empty())
        .unwrap_or(meta.default_crop);
    if options.half_size {
        display = PixelBox::new(display.x / 2, display.y / 2, display.width / 2, display.height / 2);
    }
    image.display_window = intersect(&display, &image.data_window).unwrap_or(image.data_window);

    let flip = options.user_flip.unwrap_or(meta.orientation);
    Ok(orient(image, flip))
}

fn normalise_levels(mosaic: &mut Mosaic<'_>, meta: &RawMetadata, options: &DecodeOptions) -> Result<()> {
    let mut white = options.user_sat.unwrap_or(meta.white_level);

    if options.adjust_maximum_threshold > 0.0 {
        let data_max = mosaic.samples.iter().fold(0.0f32, |a, &b| a.max(b)) as f64;
        if data_max > 0.0
            && data_max < white
            && data_max > white * options.adjust_maximum_threshold
        {
            debug!(from = white, to = data_max, "adjusted maximum");
            white = data_max;
        }
    }

    let black: [f64; 4] =
        std::array::from_fn(|c| options.user_black.unwrap_or(meta.black_levels[c]));
    for c in 0..4 {
        if white <= black[c] {
            return Err(RawToAcesError::Image(format!(
                "the saturation level {white} is not above the black level {}",
                black[c]
            )));
        }
    }

    for k in 0..mosaic.samples.len() {
        let c = mosaic.colour_of(k);
        let v = (f64::from(mosaic.samples[k]) - black[c]) / (white - black[c]);
        mosaic.samples[k] = v.max(0.0) as f32;
    }
    Ok(())
}

/// Multipliers for CFA colours R, G, B, G2.
fn wb_multipliers(mosaic: &Mosaic<'_>, meta: &RawMetadata, options: &DecodeOptions) -> [f64; 4] {
    let valid = |m: &[f64; 4]| m[0] > 0.0 && m[1] > 0.0 && m[2] > 0.0;

    let mut mul = match options.user_mul {
        Some(m) if valid(&m) => m,
        _ if options.use_auto_wb || options.grey_box.is_some() => {
            let full = PixelBox::new(0, 0, mosaic.width as i32, mosaic.height as i32);
            let region = options
                .grey_box
                .and_then(|b| intersect(&b, &full))
                .unwrap_or(full);
            grey_world(mosaic, &region)
        }
        _ if options.use_camera_wb && valid(&meta.cam_mul) => meta.cam_mul,
        _ => meta.pre_mul,
    };

    if mul[3] <= 0.0 {
        mul[3] = mul[1];
    }
    if !valid(&mul) {
        warn!(?mul, "invalid white balance multipliers, using 1.0");
        return [1.0; 4];
    }

    let norm = match options.highlight_mode {
        HighlightMode::Clip => mul.iter().copied().fold(f64::INFINITY, f64::min),
        HighlightMode::Unclip => mul.iter().copied().fold(0.0, f64::max),
    };
    mul.map(|m| m / norm)
}

/// Inverse average of each colour inside `region`, ignoring clipped samples.
fn grey_world(mosaic: &Mosaic<'_>, region: &PixelBox) -> [f64; 4] {
    let mut sum = [0.0f64; 4];
    let mut count = [0usize; 4];
    let channels = mosaic.channels();

    for y in region.y..region.y + region.height {
        for x in region.x..region.x + region.width {
            let base = (y as usize * mosaic.width + x as usize) * channels;
            for k in base..base + channels {
                let v = mosaic.samples[k];
                if v >= 0.99 {
                    continue;
                }
                let c = mosaic.colour_of(k);
                sum[c] += f64::from(v);
                count[c] += 1;
            }
        }
    }

    std::array::from_fn(|c| {
        if sum[c] > 0.0 {
            count[c] as f64 / sum[c]
        } else {
            0.0
        }
    })
}

fn apply_white_balance(mosaic: &mut Mosaic<'_>, mul: &[f64; 4], highlight: HighlightMode) {
    let mul = mul.map(|m| m as f32);
    for k in 0..mosaic.samples.len() {
        let c = mosaic.colour_of(k);
        let mut v = mosaic.samples[k] * mul[c];
        if highlight == HighlightMode::Clip {
            v = v.min(1.0);
        }
        mosaic.samples[k] = v;
    }
}

/// Output channel of a CFA colour; both greens map to 1.
fn channel_of(colour: usize) -> usize {
    if colour == 3 { 1 } else { colour }
}

fn demosaic(mosaic: &Mosaic<'_>, algorithm: DemosaicAlgorithm) -> Result<ImageBuf> {
    let (w, h) = (mosaic.width, mosaic.height);
    let Some(pattern) = mosaic.pattern else {
        let pixels = mosaic
            .samples
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();
        return ImageBuf::from_pixels(w, h, pixels);
    };

    let sample = |x: usize, y: usize| mosaic.samples[y * w + x];
    let channel = |x: usize, y: usize| channel_of(pattern.color_at(y, x));

    // Average of same-channel samples within `radius`.
    let neighbourhood = |x: usize, y: usize, ch: usize, radius: usize| -> Option<f32> {
        let mut total = 0.0;
        let mut n = 0;
        for ny in y.saturating_sub(radius)..=(y + radius).min(h - 1) {
            for nx in x.saturating_sub(radius)..=(x + radius).min(w - 1) {
                if channel(nx, ny) == ch {
                    total += sample(nx, ny);
                    n += 1;
                }
            }
        }
        (n > 0).then(|| total / n as f32)
    };

    let mut pixels = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            let own = channel(x, y);
            let mut rgb = [0.0f32; 3];
            for (ch, out) in rgb.iter_mut().enumerate() {
                if ch == own {
                    *out = sample(x, y);
                    continue;
                }
                let nearest = match algorithm {
                    DemosaicAlgorithm::Nearest => {
                        let (bx, by) = (x & !1, y & !1);
                        [(0, 0), (1, 0), (0, 1), (1, 1)]
                            .into_iter()
                            .map(|(dx, dy)| (bx + dx, by + dy))
                            .find(|&(sx, sy)| sx < w && sy < h && channel(sx, sy) == ch)
                            .map(|(sx, sy)| sample(sx, sy))
                    }
                    DemosaicAlgorithm::Linear => None,
                };
                *out = nearest
                    .or_else(|| neighbourhood(x, y, ch, 1))
                    .or_else(|| neighbourhood(x, y, ch, 2))
                    .unwrap_or(0.0);
            }
            pixels.push(rgb);
        }
    }
    ImageBuf::from_pixels(w, h, pixels)
}

/// Average each 2x2 block into one pixel.
fn half_size(mosaic: &Mosaic<'_>) -> Result<ImageBuf> {
    let (w, h) = (mosaic.width / 2, mosaic.height / 2);
    let channels = mosaic.channels();
    let mut pixels = Vec::with_capacity(w * h);

    for y in 0..h {
        for x in 0..w {
            let mut sum = [0.0f32; 3];
            let mut count = [0u32; 3];
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let base = ((2 * y + dy) * mosaic.width + 2 * x + dx) * channels;
                for k in base..base + channels {
                    let ch = channel_of(mosaic.colour_of(k));
                    sum[ch] += mosaic.samples[k];
                    count[ch] += 1;
                }
            }
            pixels.push(std::array::from_fn(|ch| {
                if count[ch] > 0 {
                    sum[ch] / count[ch] as f32
                } else {
                    0.0
                }
            }));
        }
    }
    ImageBuf::from_pixels(w, h, pixels)
}

/// Enlarge one channel by `factor` about the image centre.
fn correct_aberration(image: &mut ImageBuf, ch: usize, factor: f64) {
    if factor <= 0.0 || (factor - 1.0).abs() < f64::EPSILON {
        return;
    }
    let (w, h) = (image.width(), image.height());
    if w < 2 || h < 2 {
        return;
    }
    let source: Vec<f32> = image.pixels().iter().map(|p| p[ch]).collect();
    let (cx, cy) = ((w as f64 - 1.0) / 2.0, (h as f64 - 1.0) / 2.0);

    let at = |x: usize, y: usize| source[y * w + x];
    for y in 0..h {
        for x in 0..w {
            let sx = (cx + (x as f64 - cx) / factor).clamp(0.0, (w - 1) as f64);
            let sy = (cy + (y as f64 - cy) / factor).clamp(0.0, (h - 1) as f64);
            let (x0, y0) = (sx.floor() as usize, sy.floor() as usize);
            let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
            let (fx, fy) = ((sx - x0 as f64) as f32, (sy - y0 as f64) as f32);
            let top = at(x0, y0) * (1.0 - fx) + at(x1, y0) * fx;
            let bottom = at(x0, y1) * (1.0 - fx) + at(x1, y1) * fx;
            let mut p = image.pixel(x, y);
            p[ch] = top * (1.0 - fy) + bottom * fy;
            image.set_pixel(x, y, p);
        }
    }
}

/// Camera RGB to XYZ (D65), from the DNG colour matrix when allowed and
/// present, otherwise from the decoder's matrix.
fn camera_to_xyz(meta: &RawMetadata, use_camera_matrix: i32) -> Result<Matrix3> {
    let dng_matrix = meta
        .dng
        .as_ref()
        .filter(|_| use_camera_matrix > 0)
        .and_then(|dng| {
            let calibrations = &dng.calibrations;
            let chosen = calibrations
                .iter()
                .find(|c| c.illuminant == 21)
                .or_else(|| calibrations.iter().rev().find(|c| c.illuminant != 0))?;
            Some(std::array::from_fn(|r| {
                std::array::from_fn(|c| chosen.xyz_to_rgb[r * 3 + c])
            }))
        });

    let xyz_to_cam = dng_matrix.unwrap_or(meta.xyz_to_cam);
    camera_to_xyz_from_colour_matrix(&xyz_to_cam)
        .map(|(m, _)| m)
        .ok_or_else(|| RawToAcesError::Image("the camera colour matrix is not invertible".to_string()))
}

/// Scale so that the brightest 1% of pixels reach 1.0.
fn auto_bright(image: &mut ImageBuf) {
    let mut peaks: Vec<f32> = image
        .pixels()
        .iter()
        .map(|p| p[0].max(p[1]).max(p[2]))
        .collect();
    if peaks.is_empty() {
        return;
    }
    let index = ((peaks.len() as f64) * 0.99) as usize;
    let index = index.min(peaks.len() - 1);
    let (_, white, _) = peaks.select_nth_unstable_by(index, |a, b| a.total_cmp(b));
    let white = *white;
    if white > 0.0 {
        debug!(white, "auto-bright");
        image.scale(1.0 / white);
    }
}

fn intersect(a: &PixelBox, b: &PixelBox) -> Option<PixelBox> {
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = (a.x + a.width).min(b.x + b.width);
    let y1 = (a.y + a.height).min(b.y + b.height);
    (x1 > x0 && y1 > y0).then(|| PixelBox::new(x0, y0, x1 - x0, y1 - y0))
}

/// Rotate by flip code (3: 180, 5: 90 counter-clockwise, 6: 90 clockwise).
fn orient(image: ImageBuf, flip: i32) -> ImageBuf {
    let (w, h) = (image.width(), image.height());
    let d = image.display_window;
    let (wi, hi) = (w as i32, h as i32);

    let (new_w, new_h, display): (usize, usize, PixelBox) = match flip {
        3 => (w, h, PixelBox::new(wi - d.x - d.width, hi - d.y - d.height, d.width, d.height)),
        5 => (h, w, PixelBox::new(d.y, wi - d.x - d.width, d.height, d.width)),
        6 => (h, w, PixelBox::new(hi - d.y - d.height, d.x, d.height, d.width)),
        _ => return image,
    };

    let mut out = ImageBuf::new(new_w, new_h);
    for ny in 0..new_h {
        for nx in 0..new_w {
            let (ox, oy) = match flip {
                3 => (w - 1 - nx, h - 1 - ny),
                5 => (w - 1 - ny, nx),
                _ => (ny, h - 1 - nx),
            };
            out.set_pixel(nx, ny, image.pixel(ox, oy));
        }
    }
    out.display_window = display;
    out
}
