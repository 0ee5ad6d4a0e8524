//! Model builder: turns server documents into model values without doing any I/O

pub mod documents;
pub mod progress;
pub mod records;
pub mod requests;
pub mod vapp;
pub mod xml;

pub use documents::{MetadataValue, ScreenTicket, SessionUser};
pub use progress::RefreshProgress;
pub use records::TemplatePage;
pub use requests::InstantiateParams;
pub use vapp::{build_vapp, build_vm, BuiltVApp};
