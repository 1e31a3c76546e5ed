//! Error types

use fos_dom::{CustomElementError, DomError};

/// Errors raised while defining or running component-backed elements
#[derive(Debug, thiserror::Error)]
pub enum ElementsError {
    #[error("Component {component} cannot back a custom element: {source}")]
    InvalidElementName {
        component: &'static str,
        #[source]
        source: CustomElementError,
    },

    #[error("No component factory is registered for {0}")]
    UnresolvedComponent(&'static str),

    #[error("Injector has no provider for {0}")]
    MissingProvider(&'static str),

    #[error("Failed to create component <{selector}>")]
    Creation {
        selector: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Component <{selector}> does not expose output `{output}`")]
    MissingOutput { selector: String, output: String },

    #[error(transparent)]
    Define(#[from] CustomElementError),

    #[error(transparent)]
    Dom(#[from] DomError),
}

pub type Result<T> = std::result::Result<T, ElementsError>;
