//! Subdataset classification.
//!
//! A subdataset's category is decided by a fixed chain of case-insensitive predicates over its
//! display name. The first predicate that matches wins, in this order:
//!
//! 1. [`Classification::ImageBand`]: name starts with `img_`
//! 2. [`Classification::Geolocation`]: name starts with `geo`, or contains `latitude`/`longitude`
//! 3. [`Classification::QualityFlag`]: contains `quality` or `flag`
//! 4. [`Classification::TimeData`]: contains `time`
//! 5. [`Classification::Auxiliary`]: contains `sun_`, `sat_` or `angle`
//! 6. [`Classification::Unknown`]: anything else
//!
//! # Examples
//!
//! ```
//! use geosplit_core::classification::Classification;
//!
//! assert_eq!(Classification::classify("IMG_VIS", ""), Classification::ImageBand);
//! assert_eq!(Classification::classify("Latitude", ""), Classification::Geolocation);
//! assert_eq!(Classification::classify("Quality_Flag", ""), Classification::QualityFlag);
//! ```

use serde::Serialize;

/// Category of a subdataset, used for selection and output grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Classification {
    /// Calibrated image band (`IMG_*`)
    #[serde(rename = "Image_Band")]
    ImageBand,
    /// Latitude/longitude and other geolocation arrays
    Geolocation,
    /// Quality and flag layers
    #[serde(rename = "Quality_Flag")]
    QualityFlag,
    /// Scan times and other temporal arrays
    #[serde(rename = "Time")]
    TimeData,
    /// Sun/satellite geometry and angles
    Auxiliary,
    /// Everything else
    Unknown,
}

impl Classification {
    /// All variants in precedence order.
    pub const ALL: [Self; 6] = [
        Self::ImageBand,
        Self::Geolocation,
        Self::QualityFlag,
        Self::TimeData,
        Self::Auxiliary,
        Self::Unknown,
    ];

    /// Classifies a subdataset from its display name.
    ///
    /// The description is accepted for interface stability; the observed rules look at the
    /// name only. Pure and deterministic.
    #[must_use]
    pub fn classify(name: &str, _description: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if is_image_band(&name) {
            Self::ImageBand
        } else if is_geolocation(&name) {
            Self::Geolocation
        } else if is_quality_flag(&name) {
            Self::QualityFlag
        } else if is_time_data(&name) {
            Self::TimeData
        } else if is_auxiliary(&name) {
            Self::Auxiliary
        } else {
            Self::Unknown
        }
    }

    /// Label used in manifests, listings and group folder names.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImageBand => "Image_Band",
            Self::Geolocation => "Geolocation",
            Self::QualityFlag => "Quality_Flag",
            Self::TimeData => "Time",
            Self::Auxiliary => "Auxiliary",
            Self::Unknown => "Unknown",
        }
    }

    /// Output sub-folder when grouping is enabled. `Unknown` is never grouped.
    #[must_use]
    pub fn folder_name(&self) -> Option<&'static str> {
        match self {
            Self::Unknown => None,
            Self::ImageBand
            | Self::Geolocation
            | Self::QualityFlag
            | Self::TimeData
            | Self::Auxiliary => Some(self.as_str()),
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Predicates take the lower-cased display name.

fn is_image_band(name: &str) -> bool {
    name.starts_with("img_")
}

fn is_geolocation(name: &str) -> bool {
    name.starts_with("geo") || name.contains("latitude") || name.contains("longitude")
}

fn is_quality_flag(name: &str) -> bool {
    name.contains("quality") || name.contains("flag")
}

fn is_time_data(name: &str) -> bool {
    name.contains("time")
}

fn is_auxiliary(name: &str) -> bool {
    name.contains("sun_") || name.contains("sat_") || name.contains("angle")
}
