use serde::{Deserialize, Serialize};

use super::{EntityId, Principal, SortValue};
use crate::collection::{Permissions, SortDirection};
use crate::models::Entity;
use crate::types::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

impl Entity for User {
    const COLLECTION: &'static str = "users";
    const LABEL: &'static str = "User";
    const DEFAULT_SORT_KEY: &'static str = "name";
    const DEFAULT_SORT_DIRECTION: SortDirection = SortDirection::Asc;
    const SORT_KEYS: &'static [&'static str] = &["id", "name", "email", "role"];

    fn id(&self) -> EntityId {
        self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut out = vec![
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.email.as_str(),
            self.role.as_str(),
        ];
        out.extend(self.phone.as_deref());
        out
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "id" => SortValue::Number(self.id),
            "name" => SortValue::Text(format!("{}{}", self.first_name, self.last_name)),
            "email" => SortValue::Text(self.email.clone()),
            "role" => SortValue::Text(self.role.as_str().to_string()),
            _ => SortValue::empty(),
        }
    }

    fn scope_query(principal: &Principal) -> Option<Vec<(String, String)>> {
        match principal.role() {
            Role::Admin => Some(vec![]),
            // Veterinarians look up clients when booking and treating
            Role::Veterinarian => Some(vec![("role".to_string(), Role::Client.as_str().to_string())]),
            Role::Client => None,
        }
    }

    fn permissions(role: Role) -> Permissions {
        match role {
            Role::Admin => Permissions::full(),
            Role::Veterinarian => Permissions::read_only(),
            Role::Client => Permissions::none(),
        }
    }
}
