use crate::models::{Entity, Principal};
use crate::types::Operation;

/// Which operations a role may perform on one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Permissions {
    pub read: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl Permissions {
    pub const fn full() -> Self {
        Self { read: true, create: true, update: true, delete: true }
    }

    pub const fn read_only() -> Self {
        Self { read: true, create: false, update: false, delete: false }
    }

    pub const fn none() -> Self {
        Self { read: false, create: false, update: false, delete: false }
    }

    pub const fn with_create(mut self) -> Self {
        self.create = true;
        self
    }

    pub const fn with_update(mut self) -> Self {
        self.update = true;
        self
    }

    pub const fn with_delete(mut self) -> Self {
        self.delete = true;
        self
    }

    pub fn allows(&self, op: Operation) -> bool {
        match op {
            Operation::Select => self.read,
            Operation::Create => self.create,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}

/// Request-shaping rule: which records a controller may ask the server for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Filtered(Vec<(String, String)>),
}

impl Scope {
    pub fn query(&self) -> Vec<(String, String)> {
        match self {
            Scope::All => Vec::new(),
            Scope::Filtered(params) => params.clone(),
        }
    }
}

/// Per-role configuration of one collection screen: scope plus permitted mutations.
///
/// Fixed at construction; a role change means a new session and new controllers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionProfile {
    pub scope: Scope,
    pub permissions: Permissions,
}

impl CollectionProfile {
    pub fn for_principal<T: Entity>(principal: &Principal) -> Self {
        let role = principal.role();
        match T::scope_query(principal) {
            Some(params) if params.is_empty() => Self {
                scope: Scope::All,
                permissions: T::permissions(role),
            },
            Some(params) => Self {
                scope: Scope::Filtered(params),
                permissions: T::permissions(role),
            },
            None => Self {
                scope: Scope::Filtered(Vec::new()),
                permissions: Permissions::none(),
            },
        }
    }

    /// Everything permitted, full collection
    pub fn unrestricted() -> Self {
        Self {
            scope: Scope::All,
            permissions: Permissions::full(),
        }
    }
}
