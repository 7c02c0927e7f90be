//! Reference model atmospheres.
//!
//! The tables follow the AFGL model atmospheres on a reduced set of levels.
//! Pressure is in hPa, temperature in K, water vapor and ozone in ppmv. The
//! well-mixed gases use fixed volume mixing ratios.

use std::collections::BTreeMap;

use super::profile::{ProfileLevel, Species};
use crate::error::ProfileError;

const NLEVELS: usize = 33;

/// Level altitudes in km, shared by every model.
const ALTITUDE: [f32; NLEVELS] = [
    0., 1., 2., 3., 4., 5., 6., 7., 8., 9., 10., 11., 12., 13., 14., 15., 16., 17., 18., 19., 20.,
    21., 22., 23., 24., 25., 30., 35., 40., 45., 50., 70., 100.,
];

/// Uniformly mixed gases, in ppmv.
const FIXED_GASES: [(Species, f64); 5] = [
    (Species::CO2, 330.0),
    (Species::N2O, 0.32),
    (Species::CO, 0.15),
    (Species::CH4, 1.7),
    (Species::O2, 2.09e5),
];

/// Built-in model atmosphere, numbered as in LOWTRAN's `model` card entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelAtmosphere {
    /// 1: tropical (15° N)
    Tropical,
    /// 2: mid-latitude summer (45° N, July)
    MidLatitudeSummer,
    /// 3: mid-latitude winter (45° N, January)
    MidLatitudeWinter,
    /// 4: sub-arctic summer (60° N, July)
    SubarcticSummer,
    /// 5: sub-arctic winter (60° N, January)
    SubarcticWinter,
    /// 6: 1976 US standard
    UsStandard,
}

/// Every built-in model, in model-number order.
pub const MODEL_ATMOSPHERES: [ModelAtmosphere; 6] = [
    ModelAtmosphere::Tropical,
    ModelAtmosphere::MidLatitudeSummer,
    ModelAtmosphere::MidLatitudeWinter,
    ModelAtmosphere::SubarcticSummer,
    ModelAtmosphere::SubarcticWinter,
    ModelAtmosphere::UsStandard,
];

struct ModelTable {
    pressure: [f32; NLEVELS],
    temperature: [f32; NLEVELS],
    h2o: [f64; NLEVELS],
    o3: [f64; NLEVELS],
}

impl ModelAtmosphere {
    /// Look up a model by its number (1 through 6). Model 0, "user supplied",
    /// is not a built-in.
    pub fn from_index(index: i32) -> Result<Self, ProfileError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| MODEL_ATMOSPHERES.get(i).copied())
            .ok_or(ProfileError::UnknownModel(index))
    }

    /// The model number (1 through 6).
    pub fn index(self) -> usize {
        match self {
            ModelAtmosphere::Tropical => 1,
            ModelAtmosphere::MidLatitudeSummer => 2,
            ModelAtmosphere::MidLatitudeWinter => 3,
            ModelAtmosphere::SubarcticSummer => 4,
            ModelAtmosphere::SubarcticWinter => 5,
            ModelAtmosphere::UsStandard => 6,
        }
    }

    /// Human-readable model name.
    pub fn name(self) -> &'static str {
        match self {
            ModelAtmosphere::Tropical => "tropical",
            ModelAtmosphere::MidLatitudeSummer => "mid-latitude summer",
            ModelAtmosphere::MidLatitudeWinter => "mid-latitude winter",
            ModelAtmosphere::SubarcticSummer => "sub-arctic summer",
            ModelAtmosphere::SubarcticWinter => "sub-arctic winter",
            ModelAtmosphere::UsStandard => "US standard 1976",
        }
    }

    /// The model's level data, surface first.
    pub fn levels(self) -> Vec<ProfileLevel> {
        let table = self.table();
        (0..NLEVELS)
            .map(|i| {
                let mut mixing_ratios = BTreeMap::from(FIXED_GASES);
                mixing_ratios.insert(Species::H2O, table.h2o[i]);
                mixing_ratios.insert(Species::O3, table.o3[i]);
                ProfileLevel {
                    altitude: ALTITUDE[i],
                    pressure: table.pressure[i],
                    temperature: table.temperature[i],
                    mixing_ratios,
                }
            })
            .collect()
    }

    #[allow(clippy::excessive_precision)]
    fn table(self) -> ModelTable {
        match self {
            ModelAtmosphere::Tropical => ModelTable {
                pressure: [
                    1013.0, 904.0, 805.0, 715.0, 633.0, 559.0, 492.0, 432.0, 378.0, 329.0, 286.0,
                    247.0, 213.0, 182.0, 156.0, 132.0, 111.0, 93.7, 78.9, 66.6, 56.5, 48.0, 40.9,
                    35.0, 30.0, 25.7, 12.2, 6.00, 3.05, 1.59, 0.854, 0.0579, 3.0e-4,
                ],
                temperature: [
                    299.7, 293.7, 288.0, 283.7, 277.0, 270.3, 263.6, 257.0, 250.3, 243.6, 237.0,
                    230.1, 223.6, 217.0, 210.3, 203.7, 197.0, 194.8, 198.8, 202.7, 206.7, 210.7,
                    214.6, 217.0, 219.2, 221.4, 232.3, 243.1, 254.0, 264.8, 270.2, 219.1, 190.7,
                ],
                h2o: [
                    2.593e4, 1.949e4, 1.534e4, 8.600e3, 4.441e3, 3.346e3, 2.101e3, 1.289e3,
                    7.637e2, 4.098e2, 1.912e2, 7.306e1, 2.905e1, 9.900, 6.220, 4.000, 3.000,
                    2.900, 2.750, 2.600, 2.600, 2.650, 2.800, 2.900, 3.200, 3.250, 3.600, 4.200,
                    4.800, 5.300, 5.700, 5.100, 1.000,
                ],
                o3: [
                    0.02869, 0.03150, 0.03342, 0.03504, 0.03561, 0.03767, 0.03989, 0.04223,
                    0.04471, 0.05000, 0.05595, 0.06613, 0.07815, 0.09289, 0.1050, 0.1256, 0.1444,
                    0.2500, 0.5000, 0.9500, 1.400, 1.800, 2.400, 3.400, 4.300, 5.400, 7.800,
                    8.500, 6.400, 4.600, 3.000, 0.3500, 0.0010,
                ],
            },
            ModelAtmosphere::MidLatitudeSummer => ModelTable {
                pressure: [
                    1013.0, 902.0, 802.0, 710.0, 628.0, 554.0, 487.0, 426.0, 372.0, 324.0, 281.0,
                    243.0, 209.0, 179.0, 153.0, 130.0, 111.0, 95.0, 81.2, 69.5, 59.5, 51.0, 43.7,
                    37.6, 32.2, 27.7, 13.2, 6.52, 3.33, 1.76, 0.951, 0.0671, 3.0e-4,
                ],
                temperature: [
                    294.2, 289.7, 285.2, 279.2, 273.2, 267.2, 261.2, 254.7, 248.2, 241.7, 235.3,
                    228.8, 222.3, 215.8, 215.7, 215.7, 215.7, 215.7, 216.8, 217.9, 219.2, 220.4,
                    221.6, 222.8, 223.9, 225.1, 233.7, 245.2, 257.5, 269.9, 275.7, 218.1, 190.5,
                ],
                h2o: [
                    1.876e4, 1.378e4, 9.680e3, 5.984e3, 3.813e3, 2.225e3, 1.169e3, 6.090e2,
                    2.767e2, 1.353e2, 7.400e1, 4.266e1, 2.480e1, 1.464e1, 8.880, 5.478, 3.608,
                    3.000, 3.000, 3.000, 3.000, 3.000, 3.000, 3.000, 3.000, 3.000, 3.600, 4.500,
                    5.000, 5.500, 5.700, 5.000, 1.000,
                ],
                o3: [
                    0.03017, 0.03337, 0.03694, 0.04222, 0.04821, 0.05409, 0.06087, 0.06987,
                    0.08096, 0.09513, 0.1100, 0.1400, 0.1700, 0.2100, 0.2500, 0.5000, 0.6000,
                    0.8000, 1.000, 1.300, 1.600, 1.900, 2.300, 2.700, 3.100, 3.600, 6.200, 7.800,
                    6.900, 4.900, 3.000, 0.4000, 0.0010,
                ],
            },
            ModelAtmosphere::MidLatitudeWinter => ModelTable {
                pressure: [
                    1018.0, 897.3, 789.7, 693.8, 608.1, 531.3, 462.7, 401.6, 347.3, 299.2, 256.8,
                    219.9, 188.2, 161.0, 137.8, 117.9, 100.9, 86.28, 73.77, 63.09, 53.94, 46.09,
                    39.40, 33.68, 28.80, 24.62, 11.20, 5.180, 2.530, 1.290, 0.6820, 0.0467,
                    2.9e-4,
                ],
                temperature: [
                    272.2, 268.7, 265.2, 261.7, 255.7, 249.7, 243.7, 237.7, 231.7, 225.7, 219.7,
                    219.2, 218.7, 218.2, 217.7, 217.2, 216.7, 216.2, 215.7, 215.2, 215.2, 215.2,
                    215.2, 215.2, 215.2, 215.2, 217.4, 227.8, 243.2, 258.5, 265.7, 230.7, 199.0,
                ],
                h2o: [
                    4.316e3, 3.454e3, 2.788e3, 2.088e3, 1.280e3, 8.241e2, 5.103e2, 2.321e2,
                    1.077e2, 5.566e1, 2.960e1, 1.000e1, 6.000, 5.000, 4.800, 4.700, 4.600, 4.500,
                    4.500, 4.500, 4.500, 4.500, 4.500, 4.500, 4.500, 4.510, 4.600, 4.900, 5.200,
                    5.500, 5.800, 5.100, 1.000,
                ],
                o3: [
                    0.02778, 0.02800, 0.02849, 0.03200, 0.03567, 0.04720, 0.05024, 0.05812,
                    0.06264, 0.07000, 0.09000, 0.1200, 0.1600, 0.2400, 0.3300, 0.4600, 0.6000,
                    0.8000, 1.000, 1.300, 1.600, 1.900, 2.300, 2.700, 3.100, 3.500, 5.400, 6.500,
                    6.000, 4.400, 2.800, 0.3500, 0.0010,
                ],
            },
            ModelAtmosphere::SubarcticSummer => ModelTable {
                pressure: [
                    1010.0, 896.0, 792.9, 700.0, 616.0, 541.0, 473.0, 413.0, 359.0, 310.8, 267.7,
                    230.0, 197.7, 170.0, 146.0, 125.5, 108.0, 92.8, 79.8, 68.6, 58.9, 50.7, 43.6,
                    37.5, 32.27, 27.8, 13.4, 6.61, 3.40, 1.81, 0.987, 0.0707, 3.0e-4,
                ],
                temperature: [
                    287.2, 281.7, 276.3, 270.9, 265.5, 260.1, 253.1, 246.1, 239.2, 232.2, 225.2,
                    225.2, 225.2, 225.2, 225.2, 225.2, 225.2, 225.2, 225.2, 225.2, 225.2, 225.2,
                    225.2, 225.2, 226.6, 228.1, 235.1, 247.2, 262.1, 274.0, 277.2, 216.6, 190.4,
                ],
                h2o: [
                    1.194e4, 8.701e3, 6.750e3, 4.820e3, 3.380e3, 2.218e3, 1.330e3, 7.971e2,
                    3.996e2, 1.300e2, 4.240e1, 1.330e1, 6.000, 4.450, 4.000, 4.000, 4.000, 4.000,
                    4.000, 4.000, 4.000, 4.000, 4.000, 4.000, 4.000, 4.000, 4.100, 4.400, 4.800,
                    5.200, 5.600, 5.100, 1.000,
                ],
                o3: [
                    0.02412, 0.02940, 0.03379, 0.03887, 0.04478, 0.05328, 0.06564, 0.07738,
                    0.09114, 0.1420, 0.1890, 0.3050, 0.4100, 0.5000, 0.6000, 0.7000, 0.8500,
                    1.000, 1.300, 1.700, 2.100, 2.500, 2.900, 3.300, 3.700, 4.100, 5.500, 6.500,
                    5.800, 4.100, 2.600, 0.3500, 0.0010,
                ],
            },
            ModelAtmosphere::SubarcticWinter => ModelTable {
                pressure: [
                    1013.0, 887.8, 777.5, 679.8, 593.2, 515.8, 446.7, 385.3, 330.8, 282.9, 241.8,
                    206.7, 176.6, 151.0, 129.1, 110.3, 94.31, 80.58, 68.82, 58.75, 50.14, 42.77,
                    36.47, 31.09, 26.49, 22.56, 10.20, 4.701, 2.243, 1.113, 0.5719, 0.0402,
                    2.5e-4,
                ],
                temperature: [
                    257.2, 259.1, 255.9, 252.7, 247.7, 240.9, 234.1, 227.3, 220.6, 217.2, 217.2,
                    217.2, 217.2, 217.2, 217.2, 217.2, 216.6, 216.0, 215.4, 214.8, 214.1, 213.6,
                    213.0, 212.4, 211.8, 211.2, 216.0, 222.2, 234.7, 247.0, 259.3, 245.5, 210.0,
                ],
                h2o: [
                    1.405e3, 1.615e3, 1.427e3, 1.166e3, 7.898e2, 4.309e2, 2.369e2, 1.470e2,
                    3.384e1, 2.107e1, 1.130e1, 6.000, 4.500, 4.500, 4.500, 4.500, 4.500, 4.500,
                    4.500, 4.500, 4.500, 4.500, 4.500, 4.500, 4.500, 4.500, 4.600, 4.900, 5.200,
                    5.500, 5.800, 5.100, 1.000,
                ],
                o3: [
                    0.01802, 0.02072, 0.02336, 0.02767, 0.03253, 0.03801, 0.04446, 0.07060,
                    0.1000, 0.1500, 0.2500, 0.3400, 0.4500, 0.5800, 0.7300, 0.9000, 1.100, 1.350,
                    1.650, 2.000, 2.400, 2.800, 3.200, 3.600, 3.900, 4.200, 5.200, 5.900, 5.300,
                    3.900, 2.500, 0.3500, 0.0010,
                ],
            },
            ModelAtmosphere::UsStandard => ModelTable {
                pressure: [
                    1013.25, 898.76, 795.01, 701.21, 616.60, 540.48, 472.17, 411.05, 356.51,
                    308.00, 264.99, 226.99, 193.99, 165.79, 141.70, 121.11, 103.52, 88.497,
                    75.652, 64.674, 55.293, 47.289, 40.475, 34.668, 29.717, 25.492, 11.970,
                    5.746, 2.871, 1.491, 0.7978, 0.0522, 3.2e-4,
                ],
                temperature: [
                    288.15, 281.65, 275.15, 268.66, 262.17, 255.68, 249.19, 242.70, 236.21,
                    229.73, 223.25, 216.77, 216.65, 216.65, 216.65, 216.65, 216.65, 216.65,
                    216.65, 216.65, 216.65, 217.58, 218.57, 219.57, 220.56, 221.55, 226.51,
                    236.51, 250.35, 264.16, 270.65, 219.59, 195.08,
                ],
                h2o: [
                    7.745e3, 6.071e3, 4.631e3, 3.182e3, 2.040e3, 1.180e3, 6.906e2, 4.066e2,
                    2.313e2, 1.277e2, 6.871e1, 3.789e1, 2.043e1, 1.082e1, 5.645, 4.011, 3.892,
                    3.730, 3.609, 3.534, 3.510, 3.455, 3.440, 3.420, 3.406, 3.401, 3.650, 4.200,
                    4.850, 5.720, 6.000, 5.100, 1.000,
                ],
                o3: [
                    0.02660, 0.02931, 0.03237, 0.03318, 0.03387, 0.03768, 0.04112, 0.05009,
                    0.05966, 0.09168, 0.1313, 0.2149, 0.3095, 0.3846, 0.5030, 0.6505, 0.8701,
                    1.187, 1.587, 2.030, 2.579, 3.028, 3.647, 4.168, 4.692, 5.275, 7.173, 7.866,
                    7.187, 5.127, 3.148, 0.3000, 0.0010,
                ],
            },
        }
    }
}

impl std::fmt::Display for ModelAtmosphere {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (model {})", self.name(), self.index())
    }
}
