pub mod config;
pub mod domain;
pub mod errors;
pub mod knowledge;
pub mod prompts;

pub use domain::contact::{contact_subject, ContactRequest, EmailBody};
pub use domain::turn::{Role, Turn};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use knowledge::{DocumentKind, KnowledgeContext, KnowledgeError};
