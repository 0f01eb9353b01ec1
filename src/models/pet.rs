use serde::{Deserialize, Serialize};

use super::{person_sort, EntityId, PersonRef, Principal, SortValue};
use crate::collection::{Permissions, SortDirection};
use crate::models::Entity;
use crate::types::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub owner_id: Option<EntityId>,
    #[serde(default)]
    pub owner: Option<PersonRef>,
}

impl Entity for Pet {
    const COLLECTION: &'static str = "pets";
    const LABEL: &'static str = "Pet";
    const DEFAULT_SORT_KEY: &'static str = "name";
    const DEFAULT_SORT_DIRECTION: SortDirection = SortDirection::Asc;
    const SORT_KEYS: &'static [&'static str] = &["id", "name", "species", "breed", "birth_date", "owner"];

    fn id(&self) -> EntityId {
        self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut out = vec![self.name.as_str()];
        out.extend(self.species.as_deref());
        out.extend(self.breed.as_deref());
        if let Some(owner) = &self.owner {
            owner.push_search_fields(&mut out);
        }
        out
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "id" => SortValue::Number(self.id),
            "name" => SortValue::Text(self.name.clone()),
            "species" => SortValue::text(self.species.as_deref()),
            "breed" => SortValue::text(self.breed.as_deref()),
            "birth_date" => SortValue::instant(self.birth_date.as_deref()),
            "owner" => person_sort(self.owner.as_ref()),
            _ => SortValue::empty(),
        }
    }

    fn scope_query(principal: &Principal) -> Option<Vec<(String, String)>> {
        match principal.role() {
            Role::Admin | Role::Veterinarian => Some(vec![]),
            Role::Client => Some(vec![("owner_id".to_string(), principal.id.to_string())]),
        }
    }

    fn permissions(role: Role) -> Permissions {
        match role {
            Role::Admin => Permissions::full(),
            Role::Veterinarian => Permissions::read_only().with_update(),
            Role::Client => Permissions::read_only().with_create().with_update(),
        }
    }
}
