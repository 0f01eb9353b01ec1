use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

use super::query::{arrange, page_count, page_items};
use super::scope::CollectionProfile;
use super::view_state::ViewState;
use crate::api::ApiClient;
use crate::config::CollectionConfig;
use crate::error::ApiError;
use crate::models::{Entity, EntityId, Principal};
use crate::notify::{Notification, Notifier};
use crate::types::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    Loading,
    Ready,
    Mutating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    pub page_size: usize,
    /// Restore an optimistically deleted item when the server rejects the delete
    pub rollback_failed_delete: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            page_size: ViewState::DEFAULT_PAGE_SIZE,
            rollback_failed_delete: true,
        }
    }
}

impl From<&CollectionConfig> for ControllerOptions {
    fn from(config: &CollectionConfig) -> Self {
        Self {
            page_size: config.default_page_size,
            rollback_failed_delete: config.rollback_failed_delete,
        }
    }
}

struct Inner<T> {
    items: Vec<T>,
    view: ViewState,
    initialized: bool,
    mounted: bool,
    loading: usize,
    mutating: usize,
}

impl<T> Inner<T> {
    fn state(&self) -> ControllerState {
        if !self.initialized {
            ControllerState::Uninitialized
        } else if self.mutating > 0 {
            ControllerState::Mutating
        } else if self.loading > 0 {
            ControllerState::Loading
        } else {
            ControllerState::Ready
        }
    }
}

/// Searchable, sortable, paginated view over one remote collection.
///
/// Clones share state. View-state changes are local and never wait on the
/// network. Mutations are applied to the in-memory list first, then reconciled
/// by a full refetch. Mutations on one controller run one at a time.
pub struct CollectionController<T: Entity> {
    inner: Arc<Mutex<Inner<T>>>,
    mutation_lane: Arc<tokio::sync::Mutex<()>>,
    client: ApiClient,
    profile: CollectionProfile,
    notifier: Arc<dyn Notifier>,
    options: ControllerOptions,
}

impl<T: Entity> Clone for CollectionController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            mutation_lane: Arc::clone(&self.mutation_lane),
            client: self.client.clone(),
            profile: self.profile.clone(),
            notifier: Arc::clone(&self.notifier),
            options: self.options,
        }
    }
}

impl<T: Entity> CollectionController<T> {
    pub fn new(
        client: ApiClient,
        profile: CollectionProfile,
        notifier: Arc<dyn Notifier>,
        options: ControllerOptions,
    ) -> Self {
        let view = ViewState::new(T::DEFAULT_SORT_KEY, T::DEFAULT_SORT_DIRECTION).with_page_size(options.page_size);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                items: Vec::new(),
                view,
                initialized: false,
                mounted: true,
                loading: 0,
                mutating: 0,
            })),
            mutation_lane: Arc::new(tokio::sync::Mutex::new(())),
            client,
            profile,
            notifier,
            options,
        }
    }

    /// Controller scoped and permissioned for `principal`'s role
    pub fn for_principal(
        client: ApiClient,
        principal: &Principal,
        notifier: Arc<dyn Notifier>,
        options: ControllerOptions,
    ) -> Self {
        Self::new(client, CollectionProfile::for_principal::<T>(principal), notifier, options)
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // A panic elsewhere must not take the view down with it
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // --- derived state -----------------------------------------------------

    pub fn state(&self) -> ControllerState {
        self.lock().state()
    }

    pub fn profile(&self) -> &CollectionProfile {
        &self.profile
    }

    pub fn view_state(&self) -> ViewState {
        self.lock().view.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.lock().mounted
    }

    /// Raw in-memory list, in server order
    pub fn items(&self) -> Vec<T> {
        self.lock().items.clone()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.lock().items.iter().any(|item| item.id() == id)
    }

    /// Current page after search, sort and pagination
    pub fn visible_items(&self) -> Vec<T> {
        let inner = self.lock();
        let arranged = arrange(&inner.items, &inner.view);
        page_items(&arranged, inner.view.page_index, inner.view.page_size())
            .iter()
            .map(|item| (*item).clone())
            .collect()
    }

    pub fn filtered_count(&self) -> usize {
        let inner = self.lock();
        arrange(&inner.items, &inner.view).len()
    }

    pub fn page_count(&self) -> usize {
        let inner = self.lock();
        page_count(arrange(&inner.items, &inner.view).len(), inner.view.page_size())
    }

    /// The explicit "no records" state: nothing on the current page
    pub fn is_empty_page(&self) -> bool {
        self.visible_items().is_empty()
    }

    // --- view state --------------------------------------------------------

    pub fn set_search_term(&self, term: impl Into<String>) {
        self.lock().view.set_search_term(term);
    }

    pub fn set_sort(&self, key: &str) {
        let mut inner = self.lock();
        inner.view.set_sort(key);
        tracing::debug!(
            "{} sorted by {} {:?}",
            T::COLLECTION,
            inner.view.sort_key,
            inner.view.sort_direction
        );
    }

    pub fn set_page(&self, index: usize) {
        self.lock().view.set_page(index);
    }

    pub fn set_page_size(&self, size: usize) {
        self.lock().view.set_page_size(size);
    }

    // --- network -----------------------------------------------------------

    /// Initial fetch. Leaves the controller Ready whether or not it succeeds.
    pub async fn mount(&self) -> Result<(), ApiError> {
        self.lock().initialized = true;
        self.refresh().await
    }

    /// Stop applying responses; anything arriving later is dropped
    pub fn unmount(&self) {
        let mut inner = self.lock();
        inner.mounted = false;
        tracing::debug!("{} controller unmounted", T::COLLECTION);
    }

    /// Replace the in-memory list with the server's. On failure the stale list stays.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        if let Err(err) = self.check_permitted(Operation::Select) {
            self.report_failure(Operation::Select, &err);
            return Err(err);
        }

        {
            let mut inner = self.lock();
            inner.initialized = true;
            inner.loading += 1;
        }
        let result = self.client.list::<T>(self.profile.scope.query()).await;

        let mut inner = self.lock();
        inner.loading -= 1;
        if !inner.mounted {
            tracing::debug!("{} list arrived after unmount, discarding", T::COLLECTION);
            return result.map(|_| ());
        }
        match result {
            Ok(items) => {
                tracing::debug!("{} refreshed: {} items", T::COLLECTION, items.len());
                inner.items = items;
                Ok(())
            }
            Err(err) => {
                drop(inner);
                tracing::warn!("{} refresh failed, keeping stale list: {}", T::COLLECTION, err);
                self.report_failure(Operation::Select, &err);
                Err(err)
            }
        }
    }

    /// Create on the server, show the returned record immediately, then reconcile.
    ///
    /// The caller validates required fields; no schema is enforced here.
    pub async fn create(&self, fields: Value) -> Result<T, ApiError> {
        self.check_permitted_or_report(Operation::Create)?;
        let _lane = self.mutation_lane.lock().await;

        self.begin_mutation();
        let result = self.client.create::<T>(fields).await;
        let applied = self.end_mutation(|inner| {
            if let Ok(item) = &result {
                upsert(&mut inner.items, item.clone());
            }
        });

        self.finish(Operation::Create, result, applied).await
    }

    /// Update on the server, replace the record in place, then reconcile
    pub async fn update(&self, id: EntityId, fields: Value) -> Result<T, ApiError> {
        self.check_permitted_or_report(Operation::Update)?;
        let _lane = self.mutation_lane.lock().await;

        self.begin_mutation();
        let result = self.client.update::<T>(id, fields).await;
        let applied = self.end_mutation(|inner| {
            if let Ok(item) = &result {
                upsert(&mut inner.items, item.clone());
            }
        });

        self.finish(Operation::Update, result, applied).await
    }

    /// Remove locally first, then ask the server.
    ///
    /// On failure the item is restored at its old position when
    /// `rollback_failed_delete` is set; otherwise the next refresh corrects the view.
    pub async fn delete(&self, id: EntityId) -> Result<(), ApiError> {
        self.check_permitted_or_report(Operation::Delete)?;
        let _lane = self.mutation_lane.lock().await;

        let removed = {
            let mut inner = self.lock();
            inner.mutating += 1;
            let position = inner.items.iter().position(|item| item.id() == id);
            position.map(|index| (index, inner.items.remove(index)))
        };

        let result = self.client.delete::<T>(id).await;

        let mounted = {
            let mut inner = self.lock();
            inner.mutating -= 1;
            if inner.mounted && result.is_err() && self.options.rollback_failed_delete {
                if let Some((index, item)) = removed {
                    if !inner.items.iter().any(|existing| existing.id() == id) {
                        let index = index.min(inner.items.len());
                        inner.items.insert(index, item);
                    }
                }
            }
            inner.mounted
        };

        match result {
            Ok(()) => {
                if mounted {
                    self.notifier.notify(Notification::success(format!(
                        "{} deleted successfully",
                        T::LABEL
                    )));
                }
                Ok(())
            }
            Err(err) => {
                if mounted {
                    self.report_failure(Operation::Delete, &err);
                }
                Err(err)
            }
        }
    }

    // --- helpers -----------------------------------------------------------

    fn begin_mutation(&self) {
        self.lock().mutating += 1;
    }

    /// Leave Mutating; `apply` runs only while still mounted. Returns whether it ran.
    fn end_mutation(&self, apply: impl FnOnce(&mut Inner<T>)) -> bool {
        let mut inner = self.lock();
        inner.mutating -= 1;
        if !inner.mounted {
            return false;
        }
        apply(&mut inner);
        true
    }

    async fn finish(&self, op: Operation, result: Result<T, ApiError>, mounted: bool) -> Result<T, ApiError> {
        if !mounted {
            tracing::debug!("{} {:?} response arrived after unmount, discarding", T::COLLECTION, op);
            return result;
        }
        match result {
            Ok(item) => {
                self.notifier.notify(Notification::success(format!(
                    "{} {} successfully",
                    T::LABEL,
                    op.verb()
                )));
                // Reconcile; a failure here is reported on its own and leaves the optimistic list
                let _ = self.refresh().await;
                Ok(item)
            }
            Err(err) => {
                self.report_failure(op, &err);
                Err(err)
            }
        }
    }

    fn check_permitted(&self, op: Operation) -> Result<(), ApiError> {
        if self.profile.permissions.allows(op) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "You are not allowed to {} {}",
                action(op),
                T::COLLECTION
            )))
        }
    }

    fn check_permitted_or_report(&self, op: Operation) -> Result<(), ApiError> {
        self.check_permitted(op).inspect_err(|err| self.report_failure(op, err))
    }

    fn report_failure(&self, op: Operation, err: &ApiError) {
        let message = match op {
            Operation::Select => format!("Could not load {}: {}", T::COLLECTION, err.message()),
            _ => format!("Could not {} {}: {}", action(op), T::LABEL.to_lowercase(), err.message()),
        };
        self.notifier.notify(Notification::error(message));
    }
}

fn action(op: Operation) -> &'static str {
    match op {
        Operation::Create => "create",
        Operation::Update => "update",
        Operation::Delete => "delete",
        Operation::Select => "view",
    }
}

/// Replace by identifier, or append when absent
fn upsert<T: Entity>(items: &mut Vec<T>, item: T) {
    match items.iter_mut().find(|existing| existing.id() == item.id()) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}
