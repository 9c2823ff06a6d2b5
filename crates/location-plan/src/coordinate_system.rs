//! Regional coordinate systems (`МСК-NN`) used for plan coordinates.
//!
//! The registry is built once at start-up and shared read-only (`&` or `Arc`);
//! nothing mutates it after construction.

use std::collections::BTreeMap;

use serde::Serialize;

use techpassport_core::{DomainError, DomainResult};

/// One regional coordinate system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinateSystem {
    /// Short code, e.g. `МСК-50`.
    pub code: String,
    /// Human-readable region name.
    pub region_name: String,
}

/// Immutable lookup from region code (two digits, e.g. `"50"`) to its
/// coordinate system.
#[derive(Debug, Clone, Default)]
pub struct CoordinateSystemRegistry {
    by_region: BTreeMap<String, CoordinateSystem>,
}

const BUILTIN: &[(&str, &str, &str)] = &[
    ("02", "МСК-02", "Республика Башкортостан"),
    ("16", "МСК-16", "Республика Татарстан"),
    ("23", "МСК-23", "Краснодарский край"),
    ("47", "МСК-47", "Ленинградская область"),
    ("50", "МСК-50", "Московская область"),
    ("52", "МСК-52", "Нижегородская область"),
    ("54", "МСК-54", "Новосибирская область"),
    ("66", "МСК-66", "Свердловская область"),
    ("77", "МСК-77", "г. Москва"),
    ("78", "МСК-78", "г. Санкт-Петербург"),
];

impl CoordinateSystemRegistry {
    /// Build a registry from `(region_code, system)` pairs.
    ///
    /// Region codes are normalized like lookups are; blank or duplicate codes fail.
    pub fn new(
        entries: impl IntoIterator<Item = (String, CoordinateSystem)>,
    ) -> DomainResult<Self> {
        let mut by_region = BTreeMap::new();
        for (region, system) in entries {
            let key = normalize_region(&region)
                .ok_or_else(|| DomainError::validation("region code cannot be blank"))?;
            if system.code.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "coordinate system code for region {key} cannot be blank"
                )));
            }
            if by_region.insert(key.clone(), system).is_some() {
                return Err(DomainError::conflict(format!(
                    "region {key} registered twice"
                )));
            }
        }
        Ok(Self { by_region })
    }

    /// The regional systems shipped with the application.
    pub fn builtin() -> Self {
        let by_region = BUILTIN
            .iter()
            .map(|(region, code, name)| {
                (
                    (*region).to_string(),
                    CoordinateSystem {
                        code: (*code).to_string(),
                        region_name: (*name).to_string(),
                    },
                )
            })
            .collect();
        Self { by_region }
    }

    /// Look up a region. `"2"` and `" 02 "` both find region `02`.
    pub fn lookup(&self, region_code: &str) -> Option<&CoordinateSystem> {
        self.by_region.get(&normalize_region(region_code)?)
    }

    /// All regions in code order.
    pub fn regions(&self) -> impl Iterator<Item = (&str, &CoordinateSystem)> {
        self.by_region.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.by_region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_region.is_empty()
    }
}

fn normalize_region(raw: &str) -> Option<String> {
    let code = raw.trim();
    match code.len() {
        0 => None,
        1 => Some(format!("0{code}")),
        _ => Some(code.to_string()),
    }
}
