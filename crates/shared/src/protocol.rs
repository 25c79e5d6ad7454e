use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AggregateStats, RecordId, RegistrationRecord, RegistrationType};

/// Record shape on the wire. Every field tolerates absence: a registrant the
/// service sent with fields missing still yields a usable record rather than
/// failing the whole fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub registration_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl RegistrationPayload {
    /// Normalize into the canonical record shape, assigning the derived id.
    /// A missing `created_at` sorts as the Unix epoch.
    pub fn into_record(self) -> RegistrationRecord {
        let created_at = self.created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        RegistrationRecord {
            id: RecordId::derive(&self.name, &self.email, created_at),
            name: self.name,
            email: self.email,
            registration_type: RegistrationType::from(self.registration_type),
            company: self.company,
            phone: self.phone,
            created_at,
        }
    }
}

/// Top-level shape of `GET {base}/registrations`. The payload must be an
/// object; a missing `data` field means zero records, not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationListResponse {
    #[serde(default)]
    pub data: Vec<RegistrationPayload>,
}

/// Top-level shape of `GET {base}/counts`. The numbers are taken at face
/// value; the client never reconciles them against the record list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RegistrationCountsResponse {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub students: u64,
    #[serde(default)]
    pub professionals: u64,
}

impl From<RegistrationCountsResponse> for AggregateStats {
    fn from(counts: RegistrationCountsResponse) -> Self {
        Self {
            total: counts.total,
            students: counts.students,
            professionals: counts.professionals,
        }
    }
}
