// src/colour/constants.rs

//! Tabulated colour-science data.

/// Planck constant (J·s).
pub const PLANCK: f64 = 6.626_070_15e-34;
/// Speed of light in vacuum (m/s).
pub const LIGHT_SPEED: f64 = 299_792_458.0;
/// Boltzmann constant (J/K).
pub const BOLTZMANN: f64 = 1.380_649e-23;

/// ACES AP0 primaries and white point as xy chromaticities: R, G, B, W.
pub const ACES_CHROMATICITIES: [[f64; 2]; 4] = [
    [0.7347, 0.2653],
    [0.0, 1.0],
    [0.0001, -0.077],
    [0.32168, 0.33767],
];

/// ACES white point in XYZ (Y = 1).
pub const ACES_WHITE_XYZ: [f64; 3] = [0.952_646_074_569_846, 1.0, 1.008_825_184_351_59];

/// CIE D65 white point as xy chromaticity.
pub const D65_WHITE_XY: [f64; 2] = [0.3127, 0.3290];

/// CAT02 cone response matrix.
pub const CAT02: [[f64; 3]; 3] = [
    [0.7328, 0.4296, -0.1624],
    [-0.7036, 1.6975, 0.0061],
    [0.0030, 0.0136, 0.9834],
];

/// Linear sRGB (D65) to XYZ, as used for normalising camera matrices.
pub const SRGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.412_453, 0.357_580, 0.180_423],
    [0.212_671, 0.715_160, 0.072_169],
    [0.019_334, 0.119_193, 0.950_227],
];

/// One row of the CIE daylight basis table.
#[derive(Debug, Clone, Copy)]
pub struct DaylightComponents {
    pub wavelength: i32,
    pub s0: f64,
    pub s1: f64,
    pub s2: f64,
}

const fn dc(wavelength: i32, s0: f64, s1: f64, s2: f64) -> DaylightComponents {
    DaylightComponents {
        wavelength,
        s0,
        s1,
        s2,
    }
}

/// CIE daylight components S0, S1, S2, 300–830 nm at 10 nm.
pub const DAYLIGHT_COMPONENTS: [DaylightComponents; 54] = [
    dc(300, 0.04, 0.02, 0.0),
    dc(310, 6.0, 4.5, 2.0),
    dc(320, 29.6, 22.4, 4.0),
    dc(330, 55.3, 42.0, 8.5),
    dc(340, 57.3, 40.6, 7.8),
    dc(350, 61.8, 41.6, 6.7),
    dc(360, 61.5, 38.0, 5.3),
    dc(370, 68.8, 42.4, 6.1),
    dc(380, 63.4, 38.5, 3.0),
    dc(390, 65.8, 35.0, 1.2),
    dc(400, 94.8, 43.4, -1.1),
    dc(410, 104.8, 46.3, -0.5),
    dc(420, 105.9, 43.9, -0.7),
    dc(430, 96.8, 37.1, -1.2),
    dc(440, 113.9, 36.7, -2.6),
    dc(450, 125.6, 35.9, -2.9),
    dc(460, 125.5, 32.6, -2.8),
    dc(470, 121.3, 27.9, -2.6),
    dc(480, 121.3, 24.3, -2.6),
    dc(490, 113.5, 20.1, -1.8),
    dc(500, 113.1, 16.2, -1.5),
    dc(510, 110.8, 13.2, -1.3),
    dc(520, 106.5, 8.6, -1.2),
    dc(530, 108.8, 6.1, -1.0),
    dc(540, 105.3, 4.2, -0.5),
    dc(550, 104.4, 1.9, -0.3),
    dc(560, 100.0, 0.0, 0.0),
    dc(570, 96.0, -1.6, 0.2),
    dc(580, 95.1, -3.5, 0.5),
    dc(590, 89.1, -3.5, 2.1),
    dc(600, 90.5, -5.8, 3.2),
    dc(610, 90.3, -7.2, 4.1),
    dc(620, 88.4, -8.6, 4.7),
    dc(630, 84.0, -9.5, 5.1),
    dc(640, 85.1, -10.9, 6.7),
    dc(650, 81.9, -10.7, 7.3),
    dc(660, 82.6, -12.0, 8.6),
    dc(670, 84.9, -14.0, 9.8),
    dc(680, 81.3, -13.6, 10.2),
    dc(690, 71.9, -12.0, 8.3),
    dc(700, 74.3, -13.3, 9.6),
    dc(710, 76.4, -12.9, 8.5),
    dc(720, 63.3, -10.6, 7.0),
    dc(730, 71.7, -11.6, 7.6),
    dc(740, 77.0, -12.2, 8.0),
    dc(750, 65.2, -10.2, 6.7),
    dc(760, 47.7, -7.8, 5.2),
    dc(770, 68.6, -11.2, 7.4),
    dc(780, 65.0, -10.4, 6.8),
    dc(790, 66.0, -10.6, 7.0),
    dc(800, 61.0, -9.7, 6.4),
    dc(810, 53.3, -8.3, 5.5),
    dc(820, 58.9, -9.3, 6.1),
    dc(830, 61.9, -9.8, 6.5),
];

/// Mired values of the Robertson isotemperature lines.
pub const ROBERTSON_MIRED: [f64; 31] = [
    1.0e-10, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0, 125.0, 150.0, 175.0,
    200.0, 225.0, 250.0, 275.0, 300.0, 325.0, 350.0, 375.0, 400.0, 425.0, 450.0, 475.0, 500.0,
    525.0, 550.0, 575.0, 600.0,
];

/// Robertson isotemperature lines: CIE 1960 u, v and slope t.
pub const ROBERTSON_UVT: [[f64; 3]; 31] = [
    [0.18006, 0.26352, -0.24341],
    [0.18066, 0.26589, -0.25479],
    [0.18133, 0.26846, -0.26876],
    [0.18208, 0.27119, -0.28539],
    [0.18293, 0.27407, -0.30470],
    [0.18388, 0.27709, -0.32675],
    [0.18494, 0.28021, -0.35156],
    [0.18611, 0.28342, -0.37915],
    [0.18740, 0.28668, -0.40955],
    [0.18880, 0.28997, -0.44278],
    [0.19032, 0.29326, -0.47888],
    [0.19462, 0.30141, -0.58204],
    [0.19962, 0.30921, -0.70471],
    [0.20525, 0.31647, -0.84901],
    [0.21142, 0.32312, -1.0182],
    [0.21807, 0.32909, -1.2168],
    [0.22511, 0.33439, -1.4512],
    [0.23247, 0.33904, -1.7298],
    [0.24010, 0.34308, -2.0637],
    [0.24792, 0.34655, -2.4681],
    [0.25591, 0.34951, -2.9641],
    [0.26400, 0.35200, -3.5814],
    [0.27218, 0.35407, -4.3633],
    [0.28039, 0.35577, -5.3762],
    [0.28863, 0.35714, -6.7262],
    [0.29685, 0.35823, -8.5955],
    [0.30505, 0.35907, -11.324],
    [0.31320, 0.35968, -15.628],
    [0.32129, 0.36011, -23.325],
    [0.32931, 0.36038, -40.770],
    [0.33724, 0.36051, -116.45],
];

/// EXIF LightSource tag to correlated colour temperature.
pub const EXIF_LIGHT_SOURCE_CCT: [(u16, f64); 11] = [
    (0, 5500.0),
    (1, 5500.0),
    (2, 3500.0),
    (3, 3400.0),
    (10, 5550.0),
    (17, 2856.0),
    (18, 4874.0),
    (19, 6774.0),
    (20, 5500.0),
    (21, 6500.0),
    (22, 7500.0),
];
