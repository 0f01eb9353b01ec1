use serde::{Deserialize, Serialize};

use super::{person_sort, EntityId, PersonRef, PetRef, Principal, SortValue};
use crate::collection::{Permissions, SortDirection};
use crate::models::Entity;
use crate::types::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    pub id: EntityId,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub medication: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub appointment_id: Option<EntityId>,
    #[serde(default)]
    pub pet_id: Option<EntityId>,
    #[serde(default)]
    pub veterinarian_id: Option<EntityId>,
    #[serde(default)]
    pub pet: Option<PetRef>,
    #[serde(default)]
    pub veterinarian: Option<PersonRef>,
}

impl Entity for Treatment {
    const COLLECTION: &'static str = "treatments";
    const LABEL: &'static str = "Treatment";
    const DEFAULT_SORT_KEY: &'static str = "date";
    const DEFAULT_SORT_DIRECTION: SortDirection = SortDirection::Desc;
    const SORT_KEYS: &'static [&'static str] = &["id", "date", "description", "medication", "pet", "veterinarian"];

    fn id(&self) -> EntityId {
        self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut out = vec![self.description.as_str()];
        out.extend(self.medication.as_deref());
        out.extend(self.pet.as_ref().and_then(|p| p.name.as_deref()));
        if let Some(vet) = &self.veterinarian {
            vet.push_search_fields(&mut out);
        }
        out
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "id" => SortValue::Number(self.id),
            "date" => SortValue::instant(self.date.as_deref()),
            "description" => SortValue::Text(self.description.clone()),
            "medication" => SortValue::text(self.medication.as_deref()),
            "pet" => SortValue::text(self.pet.as_ref().and_then(|p| p.name.as_deref())),
            "veterinarian" => person_sort(self.veterinarian.as_ref()),
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
            Role::Admin | Role::Veterinarian => Permissions::full(),
            Role::Client => Permissions::read_only(),
        }
    }
}
