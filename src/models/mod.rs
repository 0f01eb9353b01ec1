pub mod appointment;
pub mod datetime;
pub mod pet;
pub mod principal;
pub mod reference;
pub mod treatment;
pub mod user;

pub use appointment::Appointment;
pub use pet::Pet;
pub use principal::Principal;
pub use treatment::Treatment;
pub use user::User;

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::collection::SortDirection;
use crate::types::Role;

/// Server-assigned record identifier
pub type EntityId = i64;

/// Value a record exposes for one sort key.
///
/// Variant order matters: absent values are `Text("")` and therefore sort
/// before every date or number in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Text(String),
    Number(i64),
    Instant(NaiveDateTime),
}

impl SortValue {
    pub fn empty() -> Self {
        SortValue::Text(String::new())
    }

    pub fn text(value: Option<&str>) -> Self {
        SortValue::Text(value.unwrap_or_default().to_string())
    }

    /// Parsed instant, falling back to the raw text when unparseable
    pub fn instant(raw: Option<&str>) -> Self {
        match raw {
            Some(s) => datetime::parse_instant(s)
                .map(SortValue::Instant)
                .unwrap_or_else(|| SortValue::Text(s.to_string())),
            None => SortValue::empty(),
        }
    }
}

/// A record type served by one collection endpoint family
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Path segment, e.g. `pets`
    const COLLECTION: &'static str;
    /// Singular display label, e.g. `Pet`
    const LABEL: &'static str;
    const DEFAULT_SORT_KEY: &'static str;
    const DEFAULT_SORT_DIRECTION: SortDirection;
    const SORT_KEYS: &'static [&'static str];

    fn id(&self) -> EntityId;

    /// Text fields matched by the search box; absent fields are skipped
    fn search_fields(&self) -> Vec<&str>;

    /// Unknown keys yield `SortValue::empty()`, leaving the order untouched
    fn sort_value(&self, key: &str) -> SortValue;

    /// Query parameters restricting what `role` may list; `None` means the role may not list at all
    fn scope_query(principal: &Principal) -> Option<Vec<(String, String)>>;

    fn permissions(role: Role) -> crate::collection::Permissions;
}

/// Person embedded in another record (owner, veterinarian)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonRef {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl PersonRef {
    /// First and last name concatenated, the composite sort key
    pub fn sort_name(&self) -> String {
        format!(
            "{}{}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
    }

    pub fn display_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn push_search_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.extend(self.first_name.as_deref());
        out.extend(self.last_name.as_deref());
    }
}

/// Pet embedded in another record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PetRef {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub name: Option<String>,
}

pub(crate) fn person_sort(person: Option<&PersonRef>) -> SortValue {
    SortValue::Text(person.map(PersonRef::sort_name).unwrap_or_default())
}
