use std::sync::OnceLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Display name of the bed size assumed when a recorded value is not in the
/// catalog.
pub const DEFAULT_BED_SIZE: &str = "Doble";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BedSize {
    pub name: &'static str,
    pub dimensions_cm: &'static str,
    pub area_m2: Decimal,
    pub aliases: &'static [&'static str],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AmenitySpace {
    pub name: &'static str,
    pub area_m2: Decimal,
    pub aliases: &'static [&'static str],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectType {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishTier {
    Estandar,
    Medio,
    Premium,
}

impl FinishTier {
    pub const ALL: [FinishTier; 3] = [FinishTier::Estandar, FinishTier::Medio, FinishTier::Premium];

    pub fn label(self) -> &'static str {
        match self {
            Self::Estandar => "Estándar",
            Self::Medio => "Medio",
            Self::Premium => "Premium",
        }
    }

    /// Published construction rate per square meter, in COP.
    pub fn price_per_m2(self) -> Decimal {
        match self {
            Self::Estandar => Decimal::from(1_900_000_u32),
            Self::Medio => Decimal::from(2_850_000_u32),
            Self::Premium => Decimal::from(4_560_000_u32),
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Estandar => &["estandar", "standard", "basico", "economico"],
            Self::Medio => &["medio", "media", "intermedio"],
            Self::Premium => &["premium", "lujo", "de lujo", "alta gama"],
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        Self::ALL.into_iter().find(|tier| {
            tier.label() == trimmed || tier.label().eq_ignore_ascii_case(trimmed)
        })
    }
}

/// Floor area reserved per private bathroom, in square meters.
pub fn bathroom_area_m2() -> Decimal {
    Decimal::new(35, 1)
}

pub struct Catalog {
    bed_sizes: Vec<BedSize>,
    amenities: Vec<AmenitySpace>,
    project_types: Vec<ProjectType>,
    durations: Vec<&'static str>,
}

impl Catalog {
    pub fn global() -> &'static Catalog {
        static CATALOG: OnceLock<Catalog> = OnceLock::new();
        CATALOG.get_or_init(Catalog::standard)
    }

    pub fn standard() -> Self {
        Self {
            bed_sizes: standard_bed_sizes(),
            amenities: standard_amenities(),
            project_types: standard_project_types(),
            durations: vec!["3 meses", "6 meses", "9 meses", "12 meses", "18 meses", "24 meses"],
        }
    }

    pub fn bed_sizes(&self) -> &[BedSize] {
        &self.bed_sizes
    }

    pub fn find_bed_size(&self, name: &str) -> Option<&BedSize> {
        let trimmed = name.trim();
        self.bed_sizes.iter().find(|bed| bed.name.eq_ignore_ascii_case(trimmed))
    }

    pub fn default_bed_size(&self) -> &BedSize {
        self.find_bed_size(DEFAULT_BED_SIZE).unwrap_or(&self.bed_sizes[0])
    }

    /// Area assigned to a room for the recorded bed size. Values outside the
    /// catalog fall back to the default bed size rather than failing.
    pub fn bed_area_m2(&self, name: &str) -> Decimal {
        self.find_bed_size(name).unwrap_or_else(|| self.default_bed_size()).area_m2
    }

    pub fn amenities(&self) -> &[AmenitySpace] {
        &self.amenities
    }

    pub fn find_amenity(&self, name: &str) -> Option<&AmenitySpace> {
        let trimmed = name.trim();
        self.amenities.iter().find(|amenity| amenity.name.eq_ignore_ascii_case(trimmed))
    }

    /// Area contributed by a recorded amenity. Names outside the catalog
    /// contribute zero area.
    pub fn amenity_area_m2(&self, name: &str) -> Decimal {
        self.find_amenity(name).map(|amenity| amenity.area_m2).unwrap_or(Decimal::ZERO)
    }

    pub fn project_types(&self) -> &[ProjectType] {
        &self.project_types
    }

    pub fn durations(&self) -> &[&'static str] {
        &self.durations
    }
}

fn standard_bed_sizes() -> Vec<BedSize> {
    vec![
        BedSize {
            name: "Sencilla",
            dimensions_cm: "99x191",
            area_m2: Decimal::from(14_u32),
            aliases: &["sencilla", "individual", "simple"],
        },
        BedSize {
            name: "Doble",
            dimensions_cm: "137x191",
            area_m2: Decimal::from(16_u32),
            aliases: &["doble", "matrimonial", "full"],
        },
        BedSize {
            name: "Queen",
            dimensions_cm: "152x203",
            area_m2: Decimal::from(18_u32),
            aliases: &["queen"],
        },
        BedSize {
            name: "King",
            dimensions_cm: "193x203",
            area_m2: Decimal::from(25_u32),
            aliases: &["king"],
        },
        BedSize {
            name: "California King",
            dimensions_cm: "183x213",
            area_m2: Decimal::from(30_u32),
            aliases: &["california king", "california"],
        },
    ]
}

fn standard_amenities() -> Vec<AmenitySpace> {
    vec![
        AmenitySpace {
            name: "Estudio",
            area_m2: Decimal::from(18_u32),
            aliases: &["estudio", "oficina"],
        },
        AmenitySpace {
            name: "Sala de TV",
            area_m2: Decimal::from(14_u32),
            aliases: &["sala de tv", "sala tv", "cuarto de tv"],
        },
        AmenitySpace {
            name: "Habitación servicio con baño",
            area_m2: Decimal::from(14_u32),
            aliases: &[
                "habitacion servicio con bano",
                "habitacion de servicio",
                "cuarto de servicio",
            ],
        },
        AmenitySpace {
            name: "Cocina",
            area_m2: Decimal::new(115, 1),
            aliases: &["cocina"],
        },
        AmenitySpace {
            name: "Sala",
            area_m2: Decimal::new(135, 1),
            aliases: &["sala"],
        },
        AmenitySpace {
            name: "Comedor",
            area_m2: Decimal::from(18_u32),
            aliases: &["comedor"],
        },
        AmenitySpace {
            name: "Ropas",
            area_m2: Decimal::from(8_u32),
            aliases: &["ropas", "zona de ropas", "lavanderia"],
        },
        AmenitySpace {
            name: "Baño Social",
            area_m2: Decimal::new(25, 1),
            aliases: &["bano social"],
        },
        AmenitySpace {
            name: "Depósito pequeño",
            area_m2: Decimal::from(4_u32),
            aliases: &["deposito pequeno", "deposito chico"],
        },
        AmenitySpace {
            name: "Depósito mediano",
            area_m2: Decimal::from(6_u32),
            aliases: &["deposito mediano"],
        },
        AmenitySpace {
            name: "Depósito grande",
            area_m2: Decimal::from(9_u32),
            aliases: &["deposito grande"],
        },
        AmenitySpace {
            name: "Sauna",
            area_m2: Decimal::from(9_u32),
            aliases: &["sauna"],
        },
        AmenitySpace {
            name: "Turco",
            area_m2: Decimal::from(9_u32),
            aliases: &["turco", "bano turco"],
        },
        AmenitySpace {
            name: "Piscina pequeña",
            area_m2: Decimal::from(16_u32),
            aliases: &["piscina pequena", "piscina chica"],
        },
        AmenitySpace {
            name: "Piscina mediana",
            area_m2: Decimal::from(24_u32),
            aliases: &["piscina mediana"],
        },
        AmenitySpace {
            name: "Piscina grande",
            area_m2: Decimal::from(32_u32),
            aliases: &["piscina grande"],
        },
        AmenitySpace {
            name: "Baño social exterior",
            area_m2: Decimal::from(4_u32),
            aliases: &["bano social exterior", "bano exterior"],
        },
    ]
}

fn standard_project_types() -> Vec<ProjectType> {
    vec![
        ProjectType {
            name: "Construcción nueva",
            aliases: &["construccion nueva", "obra nueva", "casa nueva", "construccion"],
        },
        ProjectType {
            name: "Remodelación",
            aliases: &["remodelacion", "remodelar", "renovacion", "renovar"],
        },
        ProjectType {
            name: "Ampliación",
            aliases: &["ampliacion", "ampliar"],
        },
        ProjectType {
            name: "Otro",
            aliases: &["otro", "otra cosa", "diferente"],
        },
    ]
}
