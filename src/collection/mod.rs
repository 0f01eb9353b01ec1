pub mod controller;
pub mod query;
pub mod scope;
pub mod view_state;

pub use controller::{CollectionController, ControllerOptions, ControllerState};
pub use scope::{CollectionProfile, Permissions, Scope};
pub use view_state::{SortDirection, ViewState};
