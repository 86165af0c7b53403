// src/convert/converter.rs

//! Per-file conversion: configure the colour transform from the file's
//! metadata, develop the raw data, transform to ACES, scale, crop and write.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::colour::math::{cat_d65_to_aces, xyz_to_aces};
use crate::colour::metadata_solver::{Metadata, MetadataSolver};
use crate::colour::spectral_data::SpectralData;
use crate::colour::spectral_solver::SpectralSolver;
use crate::config::model::Settings;
use crate::convert::timer::UsageTimer;
use crate::errors::{RawToAcesError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::image::buffer::ImageBuf;
use crate::image::develop::{DecodeOptions, OutputColour, develop};
use crate::image::exr_writer::{ExrMetadata, write_aces_exr};
use crate::image::raw::{RawDecoder, RawImage, RawMetadata, RawloaderDecoder, fix_metadata};
use crate::types::{CropMode, HighlightMode, Matrix3, MatrixMethod, WbMethod};

pub const TRAINING_DATA_PATH: &str = "training/training_spectral.json";
pub const OBSERVER_PATH: &str = "cmf/cmf_1931.json";
pub const OUTPUT_SUFFIX: &str = "_aces";

#[derive(Debug)]
pub struct ImageConverter {
    pub settings: Settings,
    fs: Arc<dyn FileSystem>,
    decoder: Arc<dyn RawDecoder>,
    wb_multipliers: Vec<f64>,
    idt_matrix: Option<Matrix3>,
    cat_matrix: Option<Matrix3>,
}

/// Log `message` as an error when `result` failed, passing the result on.
fn step<T>(result: Result<T>, message: impl FnOnce() -> String) -> Result<T> {
    if let Err(e) = &result {
        error!("{}: {e}", message());
    }
    result
}

/// Multipliers the illuminant search starts from, min-normalised.
///
/// Four user multipliers contribute only R, G and B. The file's `pre_mul`
/// has its two greens averaged when the second one is set.
pub fn illuminant_search_multipliers(user: &[f64], pre_mul: [f64; 4]) -> [f64; 3] {
    let mut wb = match user {
        [r, g, b, _] => [*r, *g, *b],
        _ => {
            let [r, g, b, g2] = pre_mul;
            if g2 != 0.0 { [r, (g + g2) / 2.0, b] } else { [r, g, b] }
        }
    };
    let min = wb.iter().copied().fold(f64::INFINITY, f64::min);
    if min > 0.0 && min != 1.0 {
        for v in wb.iter_mut() {
            *v /= min;
        }
    }
    wb
}

impl ImageConverter {
    pub fn new(settings: Settings) -> Self {
        Self::with_backends(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(RawloaderDecoder),
        )
    }

    pub fn with_backends(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        decoder: Arc<dyn RawDecoder>,
    ) -> Self {
        Self {
            settings,
            fs,
            decoder,
            wb_multipliers: Vec::new(),
            idt_matrix: None,
            cat_matrix: None,
        }
    }

    fn solver(&self) -> SpectralSolver {
        SpectralSolver::with_fs(
            self.settings.database_directories.iter().cloned(),
            Arc::clone(&self.fs),
        )
    }

    /// Illuminant names accepted by `--illuminant`.
    pub fn supported_illuminants(&self) -> Vec<String> {
        let mut result = vec![
            "Day-light (e.g., D60, D6025)".to_string(),
            "Blackbody (e.g., 3200K)".to_string(),
        ];
        for file in self.solver().collect_data_files("illuminant") {
            if let Ok(data) = SpectralData::from_fs(self.fs.as_ref(), &file, false) {
                result.push(data.r#type);
            }
        }
        result
    }

    /// `manufacturer / model` of every camera with spectral data.
    pub fn supported_cameras(&self) -> Vec<String> {
        self.solver()
            .collect_data_files("camera")
            .into_iter()
            .filter_map(|file| SpectralData::from_fs(self.fs.as_ref(), &file, false).ok())
            .map(|data| format!("{} / {}", data.manufacturer, data.model))
            .collect()
    }

    /// Fail early when the requested illuminant cannot be resolved.
    pub fn check_illuminant(&self) -> Result<()> {
        if self.settings.wb_method != WbMethod::Illuminant {
            return Ok(());
        }
        match self.solver().find_illuminant(&self.settings.illuminant) {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(RawToAcesError::ConfigError(
                "No matching light source. Please find available options by \"rawtoaces --list-illuminants\"."
                    .to_string(),
            )),
        }
    }

    /// White balance multipliers chosen by the last `configure`.
    pub fn wb_multipliers(&self) -> &[f64] {
        &self.wb_multipliers
    }

    pub fn idt_matrix(&self) -> Option<&Matrix3> {
        self.idt_matrix.as_ref()
    }

    pub fn cat_matrix(&self) -> Option<&Matrix3> {
        self.cat_matrix.as_ref()
    }

    /// Work out the decoding options and the colour transform for a file.
    pub fn configure(&mut self, metadata: &RawMetadata) -> Result<DecodeOptions> {
        self.wb_multipliers.clear();
        self.idt_matrix = None;
        self.cat_matrix = None;

        let settings = &self.settings;
        if settings.highlight_mode >= 2 {
            warn!(
                "Highlight mode {} is not supported, highlights will be left unclipped.",
                settings.highlight_mode
            );
        }

        let [red_scale, blue_scale] = settings.chromatic_aberration;
        let mut options = DecodeOptions {
            auto_bright: settings.auto_bright,
            adjust_maximum_threshold: settings.adjust_maximum_threshold,
            user_black: (settings.black_level >= 0).then(|| f64::from(settings.black_level)),
            user_sat: (settings.saturation_level > 0).then(|| f64::from(settings.saturation_level)),
            half_size: settings.half_size,
            user_flip: (settings.flip != 0).then_some(settings.flip),
            highlight_mode: HighlightMode::from_code(settings.highlight_mode),
            demosaic: settings.demosaic,
            denoise_threshold: settings.denoise_threshold,
            crop_box: (!settings.crop_box.is_empty()).then_some(settings.crop_box),
            chromatic_aberration: (red_scale != 1.0 && blue_scale != 1.0)
                .then_some(settings.chromatic_aberration),
            ..DecodeOptions::default()
        };

        match settings.wb_method {
            WbMethod::Metadata => {
                options.user_mul = Some(metadata.cam_mul);
                self.wb_multipliers = metadata.cam_mul.to_vec();
            }
            WbMethod::Illuminant => {}
            WbMethod::Box => {
                if settings.wb_box.is_empty() {
                    options.use_auto_wb = true;
                } else {
                    options.grey_box = Some(settings.wb_box);
                }
            }
            WbMethod::Custom => {
                options.user_mul = Some(settings.custom_wb);
                self.wb_multipliers = settings.custom_wb.to_vec();
            }
        }

        let matrix_method = self.resolve_matrix_method(metadata);
        match matrix_method {
            MatrixMethod::Spectral => {
                options.output_colour = OutputColour::Raw;
                options.use_camera_matrix = 0;
            }
            MatrixMethod::Metadata => {
                options.output_colour = OutputColour::Xyz;
                options.use_camera_matrix = if metadata.is_dng() { 1 } else { 3 };
            }
            MatrixMethod::Adobe => {
                options.output_colour = OutputColour::Xyz;
                options.use_camera_matrix = 1;
            }
            MatrixMethod::Custom | MatrixMethod::Auto => {
                options.output_colour = OutputColour::Raw;
                options.use_camera_matrix = 0;
                self.idt_matrix = Some(self.settings.custom_matrix);
            }
        }

        let spectral_wb = self.settings.wb_method == WbMethod::Illuminant;
        if spectral_wb || matrix_method == MatrixMethod::Spectral {
            self.prepare_transform_spectral(metadata).map_err(|e| {
                error!(
                    "ERROR: the colour space transform has not been configured properly (spectral mode)."
                );
                e
            })?;

            if spectral_wb {
                let wb = &self.wb_multipliers;
                let green = wb.get(1).copied().unwrap_or(1.0);
                let mut user_mul = [green; 4];
                for (dst, src) in user_mul.iter_mut().zip(wb.iter()) {
                    *dst = *src;
                }
                if wb.len() == 3 {
                    user_mul[3] = green;
                }
                options.user_mul = Some(user_mul);
            }
        }

        match matrix_method {
            MatrixMethod::Metadata if metadata.is_dng() => {
                options.use_camera_wb = true;
                self.prepare_transform_dng(metadata)?;
            }
            MatrixMethod::Metadata | MatrixMethod::Adobe => self.prepare_transform_non_dng(),
            _ => {}
        }

        debug!("Configuration:");
        debug!("  white balance method: {}", self.settings.wb_method);
        debug!("  matrix method: {matrix_method}");
        debug!("  white balance multipliers: {:?}", self.wb_multipliers);
        debug!("  IDT matrix: {:?}", self.idt_matrix);
        debug!("  CAT matrix: {:?}", self.cat_matrix);
        debug!("  decode options: {options:?}");

        Ok(options)
    }

    fn resolve_matrix_method(&self, metadata: &RawMetadata) -> MatrixMethod {
        if self.settings.matrix_method != MatrixMethod::Auto {
            return self.settings.matrix_method;
        }
        let identified = !metadata.make.is_empty() && !metadata.model.is_empty();
        if identified && self.solver().find_camera(&metadata.make, &metadata.model) {
            return MatrixMethod::Spectral;
        }
        info!(
            "Falling back to metadata matrix method because no spectral data was found for camera make: '{}', model: '{}'",
            metadata.make, metadata.model
        );
        MatrixMethod::Metadata
    }

    fn prepare_transform_spectral(&mut self, metadata: &RawMetadata) -> Result<()> {
        let (make, model) = (&metadata.make, &metadata.model);
        if make.is_empty() || model.is_empty() {
            return Err(RawToAcesError::Solver(
                "the spectral method needs the camera make and model".to_string(),
            ));
        }

        let mut solver = self.solver();
        if !solver.find_camera(make, model) {
            return Err(RawToAcesError::DataNotFound(format!(
                "spectral data for camera make: '{make}', model: '{model}'"
            )));
        }

        solver.training_data = solver
            .load_spectral_data(TRAINING_DATA_PATH)
            .map_err(|_| RawToAcesError::DataNotFound(format!("training data '{TRAINING_DATA_PATH}'")))?;
        solver.observer = solver
            .load_spectral_data(OBSERVER_PATH)
            .map_err(|_| RawToAcesError::DataNotFound(format!("observer '{OBSERVER_PATH}'")))?;

        let illuminant = self.settings.illuminant.to_lowercase();
        if illuminant.is_empty() {
            let wb = illuminant_search_multipliers(&self.wb_multipliers, metadata.pre_mul);
            solver.find_illuminant_from_wb(&wb)?;
            info!("Found illuminant: '{}'.", solver.illuminant.r#type);
        } else {
            match solver.find_illuminant(&illuminant) {
                Ok(true) => {}
                Ok(false) => {
                    return Err(RawToAcesError::DataNotFound(format!(
                        "illuminant type = '{illuminant}'"
                    )));
                }
                Err(e) => return Err(e),
            }
            solver.calculate_wb()?;
            self.wb_multipliers = solver.wb_multipliers().to_vec();
        }

        solver.calculate_idt_matrix()?;
        self.idt_matrix = Some(*solver.idt_matrix());
        self.cat_matrix = None;
        Ok(())
    }

    fn prepare_transform_dng(&mut self, metadata: &RawMetadata) -> Result<()> {
        let dng = metadata.dng.as_ref().ok_or_else(|| {
            RawToAcesError::Solver("the file carries no DNG colour metadata".to_string())
        })?;

        let from_cam_mul = {
            let m = &metadata.cam_mul;
            (m[0] > 0.0 && m[1] > 0.0 && m[2] > 0.0).then(|| [1.0 / m[0], 1.0 / m[1], 1.0 / m[2]])
        };
        let solver = MetadataSolver::new(Metadata {
            calibration: dng.calibrations.clone(),
            neutral_rgb: dng.as_shot_neutral.or(from_cam_mul),
            baseline_exposure: dng.baseline_exposure,
        });

        self.idt_matrix = Some(solver.calculate_idt_matrix()?);
        self.cat_matrix = None;
        Ok(())
    }

    fn prepare_transform_non_dng(&mut self) {
        self.idt_matrix = None;
        self.cat_matrix = Some(cat_d65_to_aces());
    }

    /// IDT when present; otherwise the CAT followed by XYZ to ACES.
    pub fn apply_matrix(&self, image: &mut ImageBuf) {
        if let Some(idt) = &self.idt_matrix {
            image.apply_matrix(idt);
        }
        if let Some(cat) = &self.cat_matrix {
            image.apply_matrix(cat);
            image.apply_matrix(&xyz_to_aces());
        }
    }

    pub fn apply_scale(&self, image: &mut ImageBuf) {
        image.scale((self.settings.headroom * self.settings.scale) as f32);
    }

    pub fn apply_crop(&self, mut image: ImageBuf) -> Result<ImageBuf> {
        match self.settings.crop_mode {
            CropMode::Off => {
                image.display_window = image.data_window;
                Ok(image)
            }
            CropMode::Soft => Ok(image),
            CropMode::Hard => {
                let region = image.display_window;
                image.crop(&region)
            }
        }
    }

    /// `<dir>/<stem>_aces.exr` for `input`, where `<dir>` is the input's
    /// directory or `output_dir` relative to it.
    pub fn make_output_path(&self, input: &Path) -> Result<PathBuf> {
        if input.as_os_str().is_empty() {
            return Err(RawToAcesError::OutputPath("Empty input path provided.".to_string()));
        }
        let stem = input.file_stem().ok_or_else(|| {
            RawToAcesError::OutputPath(format!("Invalid path format '{}'", input.display()))
        })?;
        let mut file_name = OsString::from(stem);
        file_name.push(format!("{OUTPUT_SUFFIX}.exr"));

        let directory = input.parent().unwrap_or_else(|| Path::new(""));
        let mut output = directory.join(&file_name);

        if !self.settings.output_dir.is_empty() {
            let new_directory = directory.join(&self.settings.output_dir);
            if !self.fs.exists(&new_directory) {
                if self.settings.create_dirs {
                    self.fs.create_dir_all(&new_directory).map_err(|e| {
                        RawToAcesError::OutputPath(format!(
                            "Failed to create directory {:?}: {e:#}",
                            new_directory
                        ))
                    })?;
                } else {
                    return Err(RawToAcesError::OutputPath(format!(
                        "The output directory {:?} does not exist.",
                        new_directory
                    )));
                }
            }
            output = self.fs.absolute(&new_directory.join(&file_name))?;
        }

        if !self.settings.overwrite && self.fs.exists(&output) {
            return Err(RawToAcesError::OutputPath(format!(
                "file {:?} already exists. Use --overwrite to allow overwriting existing files. Skipping this file.",
                output
            )));
        }
        Ok(output)
    }

    pub fn save_image(&self, path: &Path, image: &ImageBuf, metadata: &ExrMetadata) -> Result<()> {
        write_aces_exr(path, image, metadata)
    }

    fn open_and_configure(&mut self, input: &Path) -> Result<(RawImage, DecodeOptions)> {
        let mut raw = self.decoder.decode(input)?;
        fix_metadata(
            &mut raw.metadata,
            &self.settings.custom_camera_make,
            &self.settings.custom_camera_model,
        );
        let options = self.configure(&raw.metadata)?;
        Ok((raw, options))
    }

    /// Convert one file, writing `<stem>_aces.exr`.
    pub fn process_image(&mut self, input: &Path) -> Result<PathBuf> {
        if input.as_os_str().is_empty() {
            return Err(RawToAcesError::Image("Empty input filename provided.".to_string()));
        }
        if !self.fs.exists(input) {
            return Err(RawToAcesError::Image(format!(
                "Input file does not exist: {}",
                input.display()
            )));
        }

        let output = self.make_output_path(input)?;
        let label = input.display().to_string();
        let mut timer = UsageTimer::new(self.settings.use_timing);

        info!("Configuring transform for: {label}");
        timer.reset();
        let (raw, options) = step(self.open_and_configure(input), || {
            format!("Failed to configure the reader for the file: {label}")
        })?;
        timer.print(&label, "configuring reader");

        info!("Loading image: {label}");
        timer.reset();
        let mut image = step(develop(&raw, &options), || {
            format!("Failed to read the file: {label}")
        })?;
        let exr_metadata = ExrMetadata::from_raw(&raw.metadata);
        drop(raw);
        timer.print(&label, "reading image");

        info!("Applying transform matrix");
        timer.reset();
        self.apply_matrix(&mut image);
        timer.print(&label, "applying transform matrix");

        info!("Applying scale");
        timer.reset();
        self.apply_scale(&mut image);
        timer.print(&label, "applying scale");

        info!("Applying crop");
        timer.reset();
        let image = step(self.apply_crop(image), || {
            format!("Failed to apply crop to the file: {label}")
        })?;
        timer.print(&label, "applying crop");

        info!("Saving output: {}", output.display());
        timer.reset();
        step(self.save_image(&output, &image, &exr_metadata), || {
            format!("Failed to save the file: {}", output.display())
        })?;
        timer.print(&label, "writing image");

        Ok(output)
    }
}
