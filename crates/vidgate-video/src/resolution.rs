//! Resolution tokens understood by each vendor.

/// Resolutions declared by every supported vendor.
pub const SUPPORTED_RESOLUTIONS: [&str; 4] = ["704x480", "720x480", "1024x768", "1920x1080"];

/// Map a pixel resolution to the Axis named format.
///
/// Unrecognized values pass through unchanged.
#[must_use]
pub fn axis_resolution(resolution: &str) -> &str {
    match resolution {
        "704x480" | "704x576" => "4CIF",
        "720x480" | "720x576" => "D1",
        "704x240" | "704x288" => "2CIF",
        "352x240" | "352x288" => "CIF",
        "176x120" | "176x144" => "QCIF",
        other => other,
    }
}

/// Map a named format to the Hanwha pixel resolution.
///
/// Hanwha takes pixel sizes; only `4CIF` is translated, anything else passes
/// through unchanged.
#[must_use]
pub fn hanwha_resolution(resolution: &str) -> &str {
    match resolution {
        "4CIF" => "704x480",
        other => other,
    }
}
