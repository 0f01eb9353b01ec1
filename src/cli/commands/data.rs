use clap::{Subcommand, ValueEnum};
use serde_json::json;
use std::sync::Arc;

use crate::cli::config::open_session;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::collection::ControllerOptions;
use crate::config::config;
use crate::models::reference::{or_placeholder, resolve_reference};
use crate::models::{Appointment, Entity, EntityId, Pet, PetRef, Treatment, User};
use crate::notify::NotificationLog;
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Collection {
    Pets,
    Appointments,
    Treatments,
    Users,
}

#[derive(Subcommand)]
pub enum DataCommands {
    #[command(about = "List records with search, sort and paging")]
    List {
        #[arg(value_enum, help = "Collection name")]
        collection: Collection,
        #[arg(long, help = "Case-insensitive search across the collection's text fields")]
        search: Option<String>,
        #[arg(long, help = "Sort key; repeat the same key to flip direction")]
        sort: Vec<String>,
        #[arg(long, default_value_t = 0, help = "Zero-based page index")]
        page: usize,
        #[arg(long, help = "Records per page")]
        page_size: Option<usize>,
    },

    #[command(about = "Create record from stdin")]
    Create {
        #[arg(value_enum, help = "Collection name")]
        collection: Collection,
    },

    #[command(about = "Update record from stdin")]
    Update {
        #[arg(value_enum, help = "Collection name")]
        collection: Collection,
        #[arg(help = "Record ID to update")]
        id: EntityId,
    },

    #[command(about = "Delete record")]
    Delete {
        #[arg(value_enum, help = "Collection name")]
        collection: Collection,
        #[arg(help = "Record ID to delete")]
        id: EntityId,
    },
}

/// Records other rows point at by id
#[derive(Default)]
struct References {
    pets: Vec<Pet>,
}

impl References {
    /// Unreadable references degrade to placeholders rather than failing the listing
    async fn load(session: &SessionStore) -> Self {
        match session.controller::<Pet>(controller_options()) {
            Ok(pets) if pets.mount().await.is_ok() => Self { pets: pets.items() },
            _ => Self::default(),
        }
    }

    fn pet_name(&self, embedded: Option<&PetRef>, id: Option<EntityId>) -> String {
        match embedded.and_then(|p| p.name.as_deref()).filter(|n| !n.trim().is_empty()) {
            Some(name) => name.to_string(),
            None => resolve_reference(&self.pets, id.or(embedded.and_then(|p| p.id)), |p| p.name.clone()),
        }
    }
}

/// One-line text rendering for list output
trait Row {
    /// Whether rows show pet names that may need resolving by id
    const REFERENCES_PETS: bool = false;

    fn row(&self, refs: &References) -> String;
}

impl Row for Pet {
    fn row(&self, _refs: &References) -> String {
        let owner = self.owner.as_ref().map(|o| o.display_name());
        format!(
            "{:<6} {:<16} {:<10} {:<14} {}",
            self.id,
            self.name,
            or_placeholder(self.species.as_deref()),
            or_placeholder(self.breed.as_deref()),
            or_placeholder(owner.as_deref())
        )
    }
}

impl Row for Appointment {
    const REFERENCES_PETS: bool = true;

    fn row(&self, refs: &References) -> String {
        let (date, time) = self.date_parts().unwrap_or_else(|| (self.date.clone(), String::new()));
        let vet = self.veterinarian.as_ref().map(|v| v.display_name());
        format!(
            "{:<6} {} {:<5} {:<12} {:<18} {}",
            self.id,
            date,
            time,
            refs.pet_name(self.pet.as_ref(), self.pet_id),
            or_placeholder(vet.as_deref()),
            or_placeholder(self.status.as_deref())
        )
    }
}

impl Row for Treatment {
    const REFERENCES_PETS: bool = true;

    fn row(&self, refs: &References) -> String {
        format!(
            "{:<6} {:<10} {:<12} {:<24} {}",
            self.id,
            or_placeholder(self.date.as_deref()),
            refs.pet_name(self.pet.as_ref(), self.pet_id),
            self.description,
            or_placeholder(self.medication.as_deref())
        )
    }
}

impl Row for User {
    fn row(&self, _refs: &References) -> String {
        format!("{:<6} {:<24} {:<28} {}", self.id, self.full_name(), self.email, self.role)
    }
}

pub async fn handle(cmd: DataCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let log = NotificationLog::new();
    let session = open_session(Arc::new(log.clone())).await?;
    if !session.is_authenticated() {
        print_notifications(&log.drain());
        return Err(anyhow::anyhow!("Not logged in. Use 'vet auth login <email>' first"));
    }

    let result = match cmd {
        DataCommands::List { collection, search, sort, page, page_size } => {
            let opts = ListOptions { search, sort, page, page_size };
            match collection {
                Collection::Pets => list::<Pet>(&session, opts, &output_format).await,
                Collection::Appointments => list::<Appointment>(&session, opts, &output_format).await,
                Collection::Treatments => list::<Treatment>(&session, opts, &output_format).await,
                Collection::Users => list::<User>(&session, opts, &output_format).await,
            }
        }
        DataCommands::Create { collection } => {
            let fields = read_json_stdin()?;
            match collection {
                Collection::Pets => create::<Pet>(&session, fields, &output_format).await,
                Collection::Appointments => create::<Appointment>(&session, fields, &output_format).await,
                Collection::Treatments => create::<Treatment>(&session, fields, &output_format).await,
                Collection::Users => create::<User>(&session, fields, &output_format).await,
            }
        }
        DataCommands::Update { collection, id } => {
            let fields = read_json_stdin()?;
            match collection {
                Collection::Pets => update::<Pet>(&session, id, fields, &output_format).await,
                Collection::Appointments => update::<Appointment>(&session, id, fields, &output_format).await,
                Collection::Treatments => update::<Treatment>(&session, id, fields, &output_format).await,
                Collection::Users => update::<User>(&session, id, fields, &output_format).await,
            }
        }
        DataCommands::Delete { collection, id } => match collection {
            Collection::Pets => delete::<Pet>(&session, id, &output_format).await,
            Collection::Appointments => delete::<Appointment>(&session, id, &output_format).await,
            Collection::Treatments => delete::<Treatment>(&session, id, &output_format).await,
            Collection::Users => delete::<User>(&session, id, &output_format).await,
        },
    };

    // Secondary failures (a failed reconcile, for instance) only reach the notification log
    print_notifications(&log.errors());
    result
}

struct ListOptions {
    search: Option<String>,
    sort: Vec<String>,
    page: usize,
    page_size: Option<usize>,
}

fn controller_options() -> ControllerOptions {
    ControllerOptions::from(&config().collection)
}

async fn list<T: Entity + Row>(
    session: &SessionStore,
    opts: ListOptions,
    output_format: &OutputFormat,
) -> anyhow::Result<()> {
    let controller = session.controller::<T>(controller_options())?;
    controller.mount().await?;

    if let Some(term) = opts.search {
        controller.set_search_term(term);
    }
    for key in &opts.sort {
        if !T::SORT_KEYS.contains(&key.as_str()) {
            anyhow::bail!("Unknown sort key '{}' for {} (one of: {})", key, T::COLLECTION, T::SORT_KEYS.join(", "));
        }
        controller.set_sort(key);
    }
    if let Some(size) = opts.page_size {
        controller.set_page_size(size);
    }
    controller.set_page(opts.page);

    let records = controller.visible_items();
    if records.is_empty() {
        return output_empty_collection(output_format, T::COLLECTION, &format!("No {} found", T::COLLECTION));
    }
    let refs = match output_format {
        OutputFormat::Text if T::REFERENCES_PETS => References::load(session).await,
        _ => References::default(),
    };
    output_page(
        output_format,
        T::COLLECTION,
        &records,
        controller.view_state().page_index,
        controller.page_count(),
        controller.filtered_count(),
        |r| r.row(&refs),
    )
}

async fn create<T: Entity>(
    session: &SessionStore,
    fields: serde_json::Value,
    output_format: &OutputFormat,
) -> anyhow::Result<()> {
    let controller = session.controller::<T>(controller_options())?;
    let record = controller.create(fields).await?;
    output_success(
        output_format,
        &format!("{} {} created", T::LABEL, record.id()),
        Some(json!({ "record": record })),
    )
}

async fn update<T: Entity>(
    session: &SessionStore,
    id: EntityId,
    fields: serde_json::Value,
    output_format: &OutputFormat,
) -> anyhow::Result<()> {
    let controller = session.controller::<T>(controller_options())?;
    let record = controller.update(id, fields).await?;
    output_success(
        output_format,
        &format!("{} {} updated", T::LABEL, record.id()),
        Some(json!({ "record": record })),
    )
}

async fn delete<T: Entity>(session: &SessionStore, id: EntityId, output_format: &OutputFormat) -> anyhow::Result<()> {
    let controller = session.controller::<T>(controller_options())?;
    controller.delete(id).await?;
    output_success(
        output_format,
        &format!("{} {} deleted", T::LABEL, id),
        Some(json!({ "id": id })),
    )
}
