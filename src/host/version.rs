//! Host Versions
//!
//! A host build number such as `IU-146.1234` or `146.*`: an optional product
//! code followed by numeric components. A wildcard component (`*` or
//! `SNAPSHOT`) stands for any build within its prefix and compares greater
//! than every concrete number.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use super::error::{HostError, HostResult};

const WILDCARD: u32 = u32::MAX;

/// Totally ordered host build identifier
///
/// Equality, ordering and hashing look only at the numeric components; the
/// product code is carried for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostVersion {
    product: Option<String>,
    components: Vec<u32>,
}

impl HostVersion {
    pub fn parse(text: &str) -> HostResult<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(HostError::invalid_version(text, "empty version"));
        }

        let (product, numbers) = match trimmed.split_once('-') {
            Some((product, rest)) if product.chars().all(|c| c.is_ascii_alphabetic()) && !product.is_empty() => {
                (Some(product.to_string()), rest)
            }
            Some(_) => return Err(HostError::invalid_version(text, "malformed product code")),
            None => (None, trimmed),
        };

        let mut components = Vec::new();
        let parts: Vec<&str> = numbers.split('.').collect();
        for (position, part) in parts.iter().enumerate() {
            if *part == "*" || *part == "SNAPSHOT" {
                if position + 1 != parts.len() {
                    return Err(HostError::invalid_version(text, "wildcard must be the last component"));
                }
                components.push(WILDCARD);
                continue;
            }
            let value = part
                .parse::<u32>()
                .map_err(|_| HostError::invalid_version(text, format!("'{}' is not a number", part)))?;
            if value == WILDCARD {
                return Err(HostError::invalid_version(text, "component out of range"));
            }
            components.push(value);
        }

        Ok(Self { product, components })
    }

    pub fn from_components<I: IntoIterator<Item = u32>>(components: I) -> Self {
        Self {
            product: None,
            components: components.into_iter().collect(),
        }
    }

    pub fn with_product<S: Into<String>>(mut self, product: S) -> Self {
        self.product = Some(product.into());
        self
    }

    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }

    pub fn components(&self) -> &[u32] {
        &self.components
    }

    /// Leading component, the branch number
    pub fn baseline(&self) -> u32 {
        self.components.first().copied().unwrap_or(0)
    }

    pub fn is_wildcard(&self) -> bool {
        self.components.last() == Some(&WILDCARD)
    }

    /// `since <= self && (until is absent || self <= until)`
    pub fn is_within(&self, since: Option<&HostVersion>, until: Option<&HostVersion>) -> bool {
        since.map_or(true, |since| since <= self) && until.map_or(true, |until| self <= until)
    }
}

impl PartialEq for HostVersion {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for HostVersion {}

impl Hash for HostVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
    }
}

impl PartialOrd for HostVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HostVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lexicographic on components; a strict prefix sorts first
        self.components.cmp(&other.components)
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(product) = &self.product {
            write!(f, "{}-", product)?;
        }
        let parts: Vec<String> = self
            .components
            .iter()
            .map(|c| if *c == WILDCARD { "*".to_string() } else { c.to_string() })
            .collect();
        write!(f, "{}", parts.join("."))
    }
}

impl FromStr for HostVersion {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HostVersion {
    type Error = HostError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HostVersion> for String {
    fn from(version: HostVersion) -> Self {
        version.to_string()
    }
}
