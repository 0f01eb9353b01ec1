use serde::{Deserialize, Serialize};

use super::datetime::split_date_time;
use super::{person_sort, EntityId, PersonRef, PetRef, Principal, SortValue};
use crate::collection::{Permissions, SortDirection};
use crate::models::Entity;
use crate::types::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: EntityId,
    /// Combined date-time as sent by the backend
    #[serde(alias = "date_time", default)]
    pub date: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub pet_id: Option<EntityId>,
    #[serde(default)]
    pub veterinarian_id: Option<EntityId>,
    #[serde(default)]
    pub pet: Option<PetRef>,
    #[serde(default)]
    pub veterinarian: Option<PersonRef>,
}

impl Appointment {
    /// Date and time parts for an edit form
    pub fn date_parts(&self) -> Option<(String, String)> {
        split_date_time(&self.date)
    }
}

impl Entity for Appointment {
    const COLLECTION: &'static str = "appointments";
    const LABEL: &'static str = "Appointment";
    const DEFAULT_SORT_KEY: &'static str = "date";
    const DEFAULT_SORT_DIRECTION: SortDirection = SortDirection::Desc;
    const SORT_KEYS: &'static [&'static str] = &["id", "date", "pet", "veterinarian", "status", "reason"];

    fn id(&self) -> EntityId {
        self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        out.extend(self.pet.as_ref().and_then(|p| p.name.as_deref()));
        if let Some(vet) = &self.veterinarian {
            vet.push_search_fields(&mut out);
        }
        out.extend(self.reason.as_deref());
        out.extend(self.status.as_deref());
        out
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "id" => SortValue::Number(self.id),
            "date" => SortValue::instant(Some(&self.date)),
            "pet" => SortValue::text(self.pet.as_ref().and_then(|p| p.name.as_deref())),
            "veterinarian" => person_sort(self.veterinarian.as_ref()),
            "status" => SortValue::text(self.status.as_deref()),
            "reason" => SortValue::text(self.reason.as_deref()),
            _ => SortValue::empty(),
        }
    }

    fn scope_query(principal: &Principal) -> Option<Vec<(String, String)>> {
        let id = principal.id.to_string();
        match principal.role() {
            Role::Admin => Some(vec![]),
            Role::Veterinarian => Some(vec![("veterinarian_id".to_string(), id)]),
            Role::Client => Some(vec![("owner_id".to_string(), id)]),
        }
    }

    fn permissions(role: Role) -> Permissions {
        match role {
            Role::Admin => Permissions::full(),
            Role::Veterinarian => Permissions::read_only().with_update(),
            Role::Client => Permissions::read_only().with_create().with_delete(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_date_time_alias() {
        let appt: Appointment = serde_json::from_value(json!({
            "id": 3,
            "date_time": "2024-05-15T09:00:00",
            "status": "scheduled",
            "pet": { "id": 1, "name": "Luna" }
        }))
        .unwrap();
        assert_eq!(appt.date_parts(), Some(("2024-05-15".to_string(), "09:00".to_string())));
        assert_eq!(appt.search_fields(), vec!["Luna", "scheduled"]);
    }
}
