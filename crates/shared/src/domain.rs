use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stable identity for one registration record.
///
/// The upstream service exposes no primary key, so identity is derived from
/// the fields that do not change across refreshes. Two fetches of the same
/// registrant therefore produce the same id even when the record moves to a
/// different position in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl RecordId {
    pub fn derive(name: &str, email: &str, created_at: DateTime<Utc>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(email.as_bytes());
        hasher.update([0u8]);
        hasher.update(created_at.to_rfc3339().as_bytes());
        let digest = hasher.finalize();
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        Self(u64::from_be_bytes(prefix))
    }
}

/// Registration tier as reported by the service. Matching against the known
/// tiers is exact and case-sensitive; anything else is carried through
/// verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RegistrationType {
    Student,
    Professional,
    Other(String),
}

impl RegistrationType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Student => "student",
            Self::Professional => "professional",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for RegistrationType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "student" => Self::Student,
            "professional" => Self::Professional,
            _ => Self::Other(raw),
        }
    }
}

impl From<RegistrationType> for String {
    fn from(value: RegistrationType) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    /// Value of the `sort` query parameter understood by the service.
    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            _ => Err(format!("unknown sort order '{raw}', expected asc or desc")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TypeFilter {
    #[default]
    All,
    Student,
    Professional,
}

impl TypeFilter {
    pub fn admits(self, registration_type: &RegistrationType) -> bool {
        match self {
            Self::All => true,
            Self::Student => matches!(registration_type, RegistrationType::Student),
            Self::Professional => matches!(registration_type, RegistrationType::Professional),
        }
    }
}

impl std::str::FromStr for TypeFilter {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "all" => Ok(Self::All),
            "student" => Ok(Self::Student),
            "professional" => Ok(Self::Professional),
            _ => Err(format!(
                "unknown type filter '{raw}', expected all, student, or professional"
            )),
        }
    }
}

/// One registrant entry as held in the canonical record set.
///
/// `company` and `phone` distinguish absent from empty: a record the service
/// sent without the field carries `None`, one sent with `""` carries
/// `Some("")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub registration_type: RegistrationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User-controlled parameters governing derivation of the display sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ViewCriteria {
    pub type_filter: TypeFilter,
    pub search_text: String,
    pub sort_order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AggregateStats {
    pub total: u64,
    pub students: u64,
    pub professionals: u64,
}

impl AggregateStats {
    /// Count the known tiers by exact type match. Records outside the two
    /// known tiers contribute to `total` only.
    pub fn tally(records: &[RegistrationRecord]) -> Self {
        let students = records
            .iter()
            .filter(|record| record.registration_type == RegistrationType::Student)
            .count() as u64;
        let professionals = records
            .iter()
            .filter(|record| record.registration_type == RegistrationType::Professional)
            .count() as u64;
        Self {
            total: records.len() as u64,
            students,
            professionals,
        }
    }
}
