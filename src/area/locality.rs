/// Locality an address belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locality {
    pub municipality: String,
    pub district: String,
    /// Everything above street level, used for regional premium matching.
    pub region: String,
}

impl Locality {
    fn unknown() -> Self {
        Self {
            municipality: "Unknown".to_string(),
            district: "Unknown".to_string(),
            region: String::new(),
        }
    }

    /// Cache key and display name: `"municipality, district"`, or just the
    /// municipality when both are the same place.
    pub fn area_name(&self) -> String {
        if self.municipality.eq_ignore_ascii_case(&self.district) {
            self.municipality.clone()
        } else {
            format!("{}, {}", self.municipality, self.district)
        }
    }
}

/// Maps a free-text address to a locality. Must be deterministic: identical
/// input always yields the same locality, and therefore the same cache key.
pub trait LocalityResolver: Send + Sync {
    fn resolve(&self, address: &str) -> Locality;
}

/// Comma-separated address parser.
///
/// `"Rua Augusta 10, 1100-048 Lisboa, Portugal"` → municipality `Lisboa`.
/// Postal codes and the country name are dropped, and a leading street-level
/// segment (one with a house number or a street prefix) is skipped.
#[derive(Debug, Default, Clone)]
pub struct AddressLocalityResolver;

const COUNTRY_NAMES: &[&str] = &["portugal", "pt"];
const STREET_PREFIXES: &[&str] = &[
    "rua ", "r. ", "avenida ", "av. ", "travessa ", "tv. ", "largo ", "praça ", "praca ",
    "estrada ", "calçada ", "calcada ", "beco ", "alameda ", "rotunda ",
];

impl LocalityResolver for AddressLocalityResolver {
    fn resolve(&self, address: &str) -> Locality {
        let mut segments: Vec<String> = address
            .split(',')
            .map(strip_postal_codes)
            .filter(|s| !s.is_empty())
            .filter(|s| !COUNTRY_NAMES.contains(&s.to_lowercase().as_str()))
            .collect();

        if segments.len() > 1 && is_street_level(&segments[0]) {
            segments.remove(0);
        }

        let Some(municipality) = segments.first().cloned() else {
            return Locality::unknown();
        };
        let district = segments.get(1).cloned().unwrap_or_else(|| municipality.clone());

        Locality {
            municipality,
            district,
            region: segments.join(", "),
        }
    }
}

/// Drop whitespace-separated tokens made only of digits and dashes, e.g. `1100-048`.
fn strip_postal_codes(segment: &str) -> String {
    segment
        .split_whitespace()
        .filter(|t| !is_postal_code(t))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_postal_code(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit()) && token.chars().all(|c| c.is_ascii_digit() || c == '-')
}

fn is_street_level(segment: &str) -> bool {
    let lower = segment.to_lowercase();
    segment.chars().any(|c| c.is_ascii_digit()) || STREET_PREFIXES.iter().any(|p| lower.starts_with(p))
}
