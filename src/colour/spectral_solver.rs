// src/colour/spectral_solver.rs

//! IDT solving from camera spectral sensitivities.
//!
//! Given the camera's RGB sensitivities, a scene illuminant, the CIE 1931
//! observer and a set of training reflectances, the solver:
//!
//! 1. computes white-balance multipliers for the illuminant;
//! 2. predicts what the camera records for every training patch;
//! 3. computes the patches' XYZ, adapted to the ACES white point;
//! 4. fits a 3×3 matrix (rows summing to one) from camera RGB to ACES that
//!    minimises the CIE Lab difference between both.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::colour::constants::ACES_WHITE_XYZ;
use crate::colour::illuminant::{IlluminantName, generate_illuminant};
use crate::colour::math::{aces_to_xyz, chromatic_adaptation, mat_mul, mat_vec, xyz_to_lab};
use crate::colour::optimize::{LmOptions, levenberg_marquardt};
use crate::colour::spectral_data::SpectralData;
use crate::colour::spectrum::Spectrum;
use crate::errors::{RawToAcesError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::{IDENTITY3, Matrix3};

#[derive(Debug, Clone)]
pub struct SpectralSolver {
    /// Camera sensitivities; `main` set with channels `R`, `G`, `B`.
    pub camera: SpectralData,
    /// Scene illuminant; `main` set with a single `power` channel.
    pub illuminant: SpectralData,
    /// Colour matching functions; `main` set with `X`, `Y`, `Z`.
    pub observer: SpectralData,
    /// Training reflectances; `main` set with one channel per patch.
    pub training_data: SpectralData,

    search_directories: Vec<PathBuf>,
    fs: Arc<dyn FileSystem>,
    all_illuminants: Vec<SpectralData>,
    idt_matrix: Matrix3,
    wb_multipliers: [f64; 3],
}

impl SpectralSolver {
    pub fn new<I, P>(search_directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::with_fs(search_directories, Arc::new(RealFileSystem))
    }

    /// Solver reading its data base through `fs`.
    pub fn with_fs<I, P>(search_directories: I, fs: Arc<dyn FileSystem>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            camera: SpectralData::default(),
            illuminant: SpectralData::default(),
            observer: SpectralData::default(),
            training_data: SpectralData::default(),
            search_directories: search_directories.into_iter().map(Into::into).collect(),
            fs,
            all_illuminants: Vec::new(),
            idt_matrix: IDENTITY3,
            wb_multipliers: [1.0; 3],
        }
    }

    pub fn search_directories(&self) -> &[PathBuf] {
        &self.search_directories
    }

    /// All `*.json` files under `<dir>/<kind>` for every search directory,
    /// in search-directory order.
    pub fn collect_data_files(&self, kind: &str) -> Vec<PathBuf> {
        let mut result = Vec::new();
        for directory in &self.search_directories {
            if !self.fs.is_dir(directory) {
                debug!(path = %directory.display(), "database location is not a directory");
                continue;
            }
            let type_path = directory.join(kind);
            let entries = match self.fs.read_dir(&type_path) {
                Ok(entries) => entries,
                Err(_) => {
                    debug!(path = %type_path.display(), "directory does not exist");
                    continue;
                }
            };
            let mut files: Vec<PathBuf> = entries
                .into_iter()
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            files.sort();
            result.extend(files);
        }
        result
    }

    /// Load a spectral data file. Relative paths are resolved against the
    /// first search directory containing them.
    pub fn load_spectral_data(&self, file_path: impl AsRef<Path>) -> Result<SpectralData> {
        let file_path = file_path.as_ref();
        if file_path.is_absolute() {
            return self.read_data(file_path);
        }
        for directory in &self.search_directories {
            let candidate = directory.join(file_path);
            if self.fs.exists(&candidate) {
                return self.read_data(&candidate);
            }
        }
        Err(RawToAcesError::DataNotFound(file_path.display().to_string()))
    }

    /// Read one reshaped data file through the solver's filesystem.
    pub fn read_data(&self, path: &Path) -> Result<SpectralData> {
        SpectralData::from_fs(self.fs.as_ref(), path, true)
    }

    /// Load the first camera whose manufacturer and model match
    /// (case-insensitive) into [`Self::camera`].
    pub fn find_camera(&mut self, make: &str, model: &str) -> bool {
        for file in self.collect_data_files("camera") {
            let camera = match self.read_data(&file) {
                Ok(camera) => camera,
                Err(e) => {
                    warn!("{e}");
                    continue;
                }
            };
            if camera.manufacturer.eq_ignore_ascii_case(make)
                && camera.model.eq_ignore_ascii_case(model)
            {
                debug!(path = %file.display(), "found camera data");
                self.camera = camera;
                return true;
            }
        }
        false
    }

    /// Resolve an illuminant by name into [`Self::illuminant`].
    ///
    /// Returns `Ok(false)` when a named illuminant is not in the data base;
    /// out-of-range temperatures are errors.
    pub fn find_illuminant(&mut self, name: &str) -> Result<bool> {
        let parsed = IlluminantName::parse(name);
        match &parsed {
            IlluminantName::Daylight(cct) => {
                self.illuminant = generate_illuminant(*cct, &parsed.type_name(), true)?;
                Ok(true)
            }
            IlluminantName::Blackbody(cct) => {
                self.illuminant = generate_illuminant(*cct, &parsed.type_name(), false)?;
                Ok(true)
            }
            IlluminantName::Named(wanted) => {
                for file in self.collect_data_files("illuminant") {
                    let Ok(illuminant) = self.read_data(&file) else {
                        continue;
                    };
                    if illuminant.r#type.eq_ignore_ascii_case(wanted) {
                        self.illuminant = illuminant;
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn ensure_camera(&self, caller: &str) -> Result<()> {
        if self.camera.main_channel_count() != 3 {
            return Err(RawToAcesError::Solver(format!(
                "camera needs to be initialised prior to calling SpectralSolver::{caller}()"
            )));
        }
        Ok(())
    }

    fn ensure_illuminant(&self, caller: &str) -> Result<()> {
        if self.illuminant.main_channel_count() != 1 {
            return Err(RawToAcesError::Solver(format!(
                "illuminant needs to be initialised prior to calling SpectralSolver::{caller}()"
            )));
        }
        Ok(())
    }

    fn candidate_illuminants(&self) -> Result<Vec<SpectralData>> {
        let mut all = Vec::new();
        for cct in (4000..=25000).step_by(500) {
            all.push(generate_illuminant(cct, &format!("d{}", cct / 100), true)?);
        }
        for cct in (1500..4000).step_by(500) {
            all.push(generate_illuminant(cct, &format!("{cct}k"), false)?);
        }
        for file in self.collect_data_files("illuminant") {
            if let Ok(illuminant) = self.read_data(&file) {
                all.push(illuminant);
            }
        }
        Ok(all)
    }

    /// Pick the illuminant whose white balance best matches `wb`, storing it
    /// in [`Self::illuminant`] and its multipliers as the solver's WB.
    pub fn find_illuminant_from_wb(&mut self, wb: &[f64; 3]) -> Result<()> {
        self.ensure_camera("find_illuminant")?;

        if self.all_illuminants.is_empty() {
            self.all_illuminants = self.candidate_illuminants()?;
        }

        let mut best: Option<(f64, usize, [f64; 3])> = None;
        for (index, candidate) in self.all_illuminants.iter_mut().enumerate() {
            let Ok(candidate_wb) = white_balance(&self.camera, candidate) else {
                continue;
            };
            let sse = calculate_sse(&candidate_wb, wb);
            if best.is_none_or(|(best_sse, _, _)| sse < best_sse) {
                best = Some((sse, index, candidate_wb));
            }
        }

        let (_, index, best_wb) = best.ok_or_else(|| {
            RawToAcesError::Solver("no illuminant candidates were available".to_string())
        })?;
        self.illuminant = self.all_illuminants[index].clone();
        self.wb_multipliers = best_wb;

        info!(
            "The illuminant calculated to be the best match to the camera metadata is '{}'.",
            self.illuminant.r#type
        );
        Ok(())
    }

    /// White-balance multipliers of the camera under the current illuminant.
    /// The illuminant is scaled in place.
    pub fn calculate_wb(&mut self) -> Result<()> {
        self.ensure_camera("calculate_WB")?;
        self.ensure_illuminant("calculate_WB")?;
        self.wb_multipliers = white_balance(&self.camera, &mut self.illuminant)?;
        Ok(())
    }

    /// Fit the IDT matrix for the current camera, illuminant, observer and
    /// training data using the current WB multipliers.
    pub fn calculate_idt_matrix(&mut self) -> Result<()> {
        self.ensure_camera("calculate_IDT_matrix")?;
        self.ensure_illuminant("calculate_IDT_matrix")?;
        if self.observer.main_channel_count() != 3 {
            return Err(RawToAcesError::Solver(
                "observer needs to be initialised prior to calling SpectralSolver::calculate_IDT_matrix()"
                    .to_string(),
            ));
        }
        if self.training_data.main_channel_count() == 0 {
            return Err(RawToAcesError::Solver(
                "training data needs to be initialised prior to calling SpectralSolver::calculate_IDT_matrix()"
                    .to_string(),
            ));
        }

        let patches = training_illuminants(&self.illuminant, &self.training_data)?;
        let rgb = camera_rgb(&self.camera, &self.wb_multipliers, &patches)?;
        let xyz = training_xyz(&self.observer, &self.illuminant, &patches)?;

        self.idt_matrix = fit_idt(&rgb, &xyz)?;

        debug!("The IDT matrix is ...");
        for row in &self.idt_matrix {
            debug!("   {:.6} {:.6} {:.6}", row[0], row[1], row[2]);
        }
        Ok(())
    }

    pub fn idt_matrix(&self) -> &Matrix3 {
        &self.idt_matrix
    }

    pub fn wb_multipliers(&self) -> &[f64; 3] {
        &self.wb_multipliers
    }
}

/// Sum of squared relative errors of `src` against `tcp`.
pub fn calculate_sse(tcp: &[f64; 3], src: &[f64; 3]) -> f64 {
    tcp.iter()
        .zip(src)
        .map(|(t, s)| (s / t - 1.0).powi(2))
        .sum()
}

/// Scale the illuminant so the camera's strongest channel integrates to one.
pub fn scale_illuminant(camera: &SpectralData, illuminant: &mut SpectralData) -> Result<()> {
    let max_r = camera.channel("R")?.max();
    let max_g = camera.channel("G")?.max();
    let max_b = camera.channel("B")?.max();

    let strongest = if max_r >= max_g && max_r >= max_b {
        "R"
    } else if max_g >= max_r && max_g >= max_b {
        "G"
    } else {
        "B"
    };

    let response = (camera.channel(strongest)? * illuminant.channel("power")?).integrate();
    *illuminant.channel_mut("power")? *= 1.0 / response;
    Ok(())
}

/// `[G/R, 1, G/B]` of the camera's integrated response to `illuminant`,
/// after scaling the illuminant.
pub fn white_balance(camera: &SpectralData, illuminant: &mut SpectralData) -> Result<[f64; 3]> {
    scale_illuminant(camera, illuminant)?;
    let power = illuminant.channel("power")?;
    let r = (camera.channel("R")? * power).integrate();
    let g = (camera.channel("G")? * power).integrate();
    let b = (camera.channel("B")? * power).integrate();
    Ok([g / r, 1.0, g / b])
}

/// Training reflectances lit by the illuminant.
pub fn training_illuminants(
    illuminant: &SpectralData,
    training_data: &SpectralData,
) -> Result<Vec<Spectrum>> {
    let power = illuminant.channel("power")?;
    let patches = training_data
        .data
        .get("main")
        .map(|set| set.iter().map(|(_, s)| s * power).collect())
        .unwrap_or_default();
    Ok(patches)
}

/// White-balanced camera RGB of each lit training patch.
pub fn camera_rgb(
    camera: &SpectralData,
    wb: &[f64; 3],
    patches: &[Spectrum],
) -> Result<Vec<[f64; 3]>> {
    let r = camera.channel("R")?;
    let g = camera.channel("G")?;
    let b = camera.channel("B")?;
    Ok(patches
        .iter()
        .map(|p| {
            [
                (p * r).integrate() * wb[0],
                (p * g).integrate() * wb[1],
                (p * b).integrate() * wb[2],
            ]
        })
        .collect())
}

/// XYZ of each lit training patch, normalised to the illuminant's Y and
/// adapted from the illuminant's white to the ACES white point.
pub fn training_xyz(
    observer: &SpectralData,
    illuminant: &SpectralData,
    patches: &[Spectrum],
) -> Result<Vec<[f64; 3]>> {
    let x = observer.channel("X")?;
    let y = observer.channel("Y")?;
    let z = observer.channel("Z")?;
    let power = illuminant.channel("power")?;

    let white_y = (y * power).integrate();
    let scale = 1.0 / white_y;
    let source_white = [(x * power).integrate() / white_y, 1.0, (z * power).integrate() / white_y];
    let cat = chromatic_adaptation(&source_white, &ACES_WHITE_XYZ);

    Ok(patches
        .iter()
        .map(|p| {
            let xyz = [
                (p * x).integrate() * scale,
                (p * y).integrate() * scale,
                (p * z).integrate() * scale,
            ];
            mat_vec(&cat, &xyz)
        })
        .collect())
}

/// 3×3 matrix with rows summing to one from six free parameters.
pub fn matrix_from_params(b: &[f64]) -> Matrix3 {
    [
        [b[0], b[1], 1.0 - b[0] - b[1]],
        [b[2], b[3], 1.0 - b[2] - b[3]],
        [b[4], b[5], 1.0 - b[4] - b[5]],
    ]
}

/// Least-squares fit in Lab of camera RGB to XYZ through ACES.
pub fn fit_idt(rgb: &[[f64; 3]], xyz: &[[f64; 3]]) -> Result<Matrix3> {
    if rgb.is_empty() || rgb.len() != xyz.len() {
        return Err(RawToAcesError::Solver(
            "training RGB and XYZ sets must be non-empty and of equal size".to_string(),
        ));
    }

    let target_lab: Vec<[f64; 3]> = xyz.iter().map(xyz_to_lab).collect();
    let aces_xyz = aces_to_xyz();

    let residuals = |params: &[f64], out: &mut [f64]| {
        let to_xyz = mat_mul(&aces_xyz, &matrix_from_params(params));
        for (i, (sample, target)) in rgb.iter().zip(&target_lab).enumerate() {
            let lab = xyz_to_lab(&mat_vec(&to_xyz, sample));
            for j in 0..3 {
                out[i * 3 + j] = target[j] - lab[j];
            }
        }
    };

    let mut params = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
    let summary = levenberg_marquardt(residuals, rgb.len() * 3, &mut params, &LmOptions::default());

    debug!(
        iterations = summary.iterations,
        successful_steps = summary.successful_steps,
        initial_cost = summary.initial_cost,
        final_cost = summary.final_cost,
        "IDT fit finished"
    );

    if summary.successful_steps == 0 && !summary.converged {
        return Err(RawToAcesError::Solver("IDT matrix optimisation failed".to_string()));
    }
    Ok(matrix_from_params(&params))
}
