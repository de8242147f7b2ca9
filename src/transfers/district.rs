use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fourteen revenue districts, declared in the canonical south-to-north
/// order used by every roster and transfer listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum District {
    Thiruvananthapuram,
    Kollam,
    Pathanamthitta,
    Alappuzha,
    Kottayam,
    Idukki,
    Ernakulam,
    Thrissur,
    Palakkad,
    Malappuram,
    Kozhikode,
    Wayanad,
    Kannur,
    Kasaragod,
}

impl District {
    pub const ALL: [District; 14] = [
        District::Thiruvananthapuram,
        District::Kollam,
        District::Pathanamthitta,
        District::Alappuzha,
        District::Kottayam,
        District::Idukki,
        District::Ernakulam,
        District::Thrissur,
        District::Palakkad,
        District::Malappuram,
        District::Kozhikode,
        District::Wayanad,
        District::Kannur,
        District::Kasaragod,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            District::Thiruvananthapuram => "Thiruvananthapuram",
            District::Kollam => "Kollam",
            District::Pathanamthitta => "Pathanamthitta",
            District::Alappuzha => "Alappuzha",
            District::Kottayam => "Kottayam",
            District::Idukki => "Idukki",
            District::Ernakulam => "Ernakulam",
            District::Thrissur => "Thrissur",
            District::Palakkad => "Palakkad",
            District::Malappuram => "Malappuram",
            District::Kozhikode => "Kozhikode",
            District::Wayanad => "Wayanad",
            District::Kannur => "Kannur",
            District::Kasaragod => "Kasaragod",
        }
    }

    /// In-state neighbours considered when an against transfer has to move a
    /// displaced employee somewhere close by. Listed nearest first.
    pub const fn neighbours(self) -> &'static [District] {
        match self {
            District::Thiruvananthapuram => &[District::Kollam, District::Pathanamthitta],
            District::Kollam => &[
                District::Thiruvananthapuram,
                District::Pathanamthitta,
                District::Alappuzha,
            ],
            District::Pathanamthitta => &[
                District::Kollam,
                District::Alappuzha,
                District::Kottayam,
                District::Idukki,
            ],
            District::Alappuzha => &[
                District::Kollam,
                District::Pathanamthitta,
                District::Kottayam,
                District::Ernakulam,
            ],
            District::Kottayam => &[
                District::Pathanamthitta,
                District::Alappuzha,
                District::Idukki,
                District::Ernakulam,
            ],
            District::Idukki => &[
                District::Pathanamthitta,
                District::Kottayam,
                District::Ernakulam,
                District::Thrissur,
            ],
            District::Ernakulam => &[
                District::Alappuzha,
                District::Kottayam,
                District::Idukki,
                District::Thrissur,
            ],
            District::Thrissur => &[
                District::Ernakulam,
                District::Idukki,
                District::Palakkad,
                District::Malappuram,
            ],
            District::Palakkad => &[District::Thrissur, District::Malappuram],
            District::Malappuram => &[
                District::Thrissur,
                District::Palakkad,
                District::Kozhikode,
                District::Wayanad,
            ],
            District::Kozhikode => &[District::Malappuram, District::Wayanad, District::Kannur],
            District::Wayanad => &[District::Malappuram, District::Kozhikode, District::Kannur],
            District::Kannur => &[District::Kozhikode, District::Wayanad, District::Kasaragod],
            District::Kasaragod => &[District::Kannur],
        }
    }
}

impl fmt::Display for District {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDistrict(pub String);

impl fmt::Display for UnknownDistrict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown district '{}'", self.0)
    }
}

impl std::error::Error for UnknownDistrict {}

impl FromStr for District {
    type Err = UnknownDistrict;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        District::ALL
            .into_iter()
            .find(|district| district.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownDistrict(trimmed.to_string()))
    }
}
