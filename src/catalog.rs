use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const NAME_MAX_LENGTH: usize = 255;
pub const INSTITUTION_MAX_LENGTH: usize = 255;
pub const VISUALIZATION_TYPE_MAX_LENGTH: usize = 255;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const PERSON_NAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;

/// Timestamp for a record being written again after `previous`.
///
/// Always strictly later than `previous`, even when the clock has not
/// advanced past it. Microsecond steps match the resolution of `timestamptz`.
pub fn touch(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = truncate_to_micros(Utc::now());
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Current time at storage resolution.
pub fn now() -> DateTime<Utc> {
    truncate_to_micros(Utc::now())
}

fn truncate_to_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(ts.timestamp_micros()).unwrap_or(ts)
}

/// Login identity shared by every account kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credential {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub biography: String,
    pub institution: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub credential: Credential,
    pub profile: Profile,
}

impl Account {
    pub fn username(&self) -> &str {
        &self.credential.username
    }

    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.credential.first_name, self.credential.last_name
        )
        .trim()
        .to_string()
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.credential.username)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, description: impl Into<String>, owner_id: Uuid) -> Self {
        let now = now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Analysis {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub dataset_id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Analysis {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        dataset_id: Uuid,
        owner_id: Uuid,
    ) -> Self {
        let now = now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            dataset_id,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visualization {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub visualization_type: String,
    pub dataset_id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Visualization {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        visualization_type: impl Into<String>,
        dataset_id: Uuid,
        owner_id: Uuid,
    ) -> Self {
        let now = now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            visualization_type: visualization_type.into(),
            dataset_id,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }
}

macro_rules! display_name {
    ($($ty:ty),*) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.name)
                }
            }
        )*
    };
}

display_name!(Dataset, Analysis, Visualization);

/// Records removed by a cascading delete, including the target itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionSummary {
    pub accounts: usize,
    pub datasets: usize,
    pub analyses: usize,
    pub visualizations: usize,
}

impl DeletionSummary {
    pub fn total(&self) -> usize {
        self.accounts + self.datasets + self.analyses + self.visualizations
    }
}
