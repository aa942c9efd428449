//! Region scope lookups for `inside(..)` / `outside(..)` conditions

/// Answers whether the feature being checked lies in a set of countries.
///
/// `countries` is a comma-separated list of codes such as `"FR,BE"`.
pub trait RegionScope: Send + Sync {
    fn is_inside(&self, countries: &str) -> bool;

    fn is_outside(&self, countries: &str) -> bool {
        !self.is_inside(countries)
    }
}

/// Region scope backed by the configured country of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryScope {
    country: Option<String>,
}

impl CountryScope {
    pub fn new(country: Option<&str>) -> Self {
        Self {
            country: country.map(str::trim).filter(|c| !c.is_empty()).map(str::to_string),
        }
    }

    /// Scope with no configured country
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }
}

impl RegionScope for CountryScope {
    /// A configured country such as `FR-67` is inside `FR`.
    fn is_inside(&self, countries: &str) -> bool {
        let Some(country) = &self.country else {
            return false;
        };
        countries
            .split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .any(|code| country.starts_with(code))
    }
}
