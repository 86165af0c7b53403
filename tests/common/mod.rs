#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use rawtoaces::convert::ImageConverter;
use rawtoaces::fs::RealFileSystem;
use rawtoaces::types::Matrix3;
use rawtoaces_test_utils::{SyntheticDecoder, TestDatabase};
use rawtoaces_test_utils::builders::SettingsBuilder;

pub const MAKE: &str = "Canon";
pub const MODEL: &str = "EOS_R6";

/// Converter over the real filesystem with a synthetic decoder.
pub fn converter(builder: SettingsBuilder, decoder: SyntheticDecoder) -> ImageConverter {
    ImageConverter::with_backends(builder.build(), Arc::new(RealFileSystem), Arc::new(decoder))
}

/// Settings builder pointing at `db`.
pub fn settings_for(db: &TestDatabase) -> SettingsBuilder {
    SettingsBuilder::new().data_dir(&db.path_string())
}

/// Write a placeholder input file; the synthetic decoder never reads it.
pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, b"raw").expect("write input");
}

pub fn assert_matrix_close(actual: &Matrix3, expected: &Matrix3, tolerance: f64) {
    for r in 0..3 {
        for c in 0..3 {
            assert!(
                (actual[r][c] - expected[r][c]).abs() <= tolerance,
                "element [{r}][{c}]: {} vs {}",
                actual[r][c],
                expected[r][c]
            );
        }
    }
}

pub fn row_sums(m: &Matrix3) -> [f64; 3] {
    [m[0].iter().sum(), m[1].iter().sum(), m[2].iter().sum()]
}
