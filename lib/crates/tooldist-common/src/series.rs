//! Series name to platform version mapping used to build product ids.

use crate::version::VersionError;

/// Known series and their platform versions.
pub const SERIES_VERSIONS: &[(&str, &str)] = &[
    ("precise", "12.04"),
    ("quantal", "12.10"),
    ("raring", "13.04"),
    ("saucy", "13.10"),
    ("trusty", "14.04"),
    ("xenial", "16.04"),
    ("bionic", "18.04"),
    ("focal", "20.04"),
    ("jammy", "22.04"),
    ("noble", "24.04"),
];

/// Return the platform version for a series name.
///
/// # Errors
///
/// Returns [`VersionError::UnknownSeries`] if the series is not in the table.
pub fn series_version(series: &str) -> Result<&'static str, VersionError> {
    SERIES_VERSIONS
        .iter()
        .find(|(name, _)| *name == series)
        .map(|(_, version)| *version)
        .ok_or_else(|| VersionError::UnknownSeries(series.to_string()))
}
