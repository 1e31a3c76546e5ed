//! Custom Elements
//!
//! Custom element registry, name validation and the reaction callback
//! interfaces implemented by element classes.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::{ElementRef, Value};

/// Error raised from inside a reaction callback
pub type CallbackError = Box<dyn std::error::Error + 'static>;

/// Custom element lifecycle callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCallback {
    Connected,
    Disconnected,
    AttributeChanged,
}

/// Reactions of one upgraded element instance.
///
/// Callbacks run synchronously and may re-enter the document.
pub trait CustomElementReactions {
    fn connected_callback(&self) -> Result<(), CallbackError>;

    fn disconnected_callback(&self) -> Result<(), CallbackError>;

    fn attribute_changed_callback(
        &self,
        name: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<(), CallbackError>;

    /// Accessor lookup. `None` means the class defines no accessor for `name`
    /// and the element's own properties are used instead.
    fn get_property(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Accessor write. Returns false when the class defines no accessor.
    fn set_property(&self, _name: &str, _value: Value) -> bool {
        false
    }

    /// Names of the class-defined accessors
    fn property_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

/// Element class registered with [`CustomElementRegistry::define`]
pub trait CustomElementConstructor {
    /// Read once, at definition time
    fn observed_attributes(&self) -> Vec<String>;

    /// Create the instance backing `host`
    fn construct(&self, host: ElementRef) -> Rc<dyn CustomElementReactions>;
}

/// Custom element definition
#[derive(Clone)]
pub struct CustomElementDefinition {
    pub name: String,
    pub observed_attributes: Vec<String>,
    pub constructor: Rc<dyn CustomElementConstructor>,
}

impl CustomElementDefinition {
    pub fn observes(&self, attr: &str) -> bool {
        self.observed_attributes.iter().any(|a| a == attr)
    }
}

impl fmt::Debug for CustomElementDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomElementDefinition")
            .field("name", &self.name)
            .field("observed_attributes", &self.observed_attributes)
            .finish_non_exhaustive()
    }
}

/// Custom elements registry
#[derive(Debug, Default)]
pub struct CustomElementRegistry {
    definitions: HashMap<String, CustomElementDefinition>,
}

impl CustomElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a custom element
    pub fn define(
        &mut self,
        name: &str,
        constructor: Rc<dyn CustomElementConstructor>,
    ) -> Result<&CustomElementDefinition, CustomElementError> {
        validate_name(name)?;

        // Check if already defined
        if self.definitions.contains_key(name) {
            return Err(CustomElementError::AlreadyDefined(name.to_string()));
        }

        let definition = CustomElementDefinition {
            name: name.to_string(),
            observed_attributes: constructor.observed_attributes(),
            constructor,
        };

        Ok(self.definitions.entry(name.to_string()).or_insert(definition))
    }

    /// Get element definition
    pub fn get(&self, name: &str) -> Option<&CustomElementDefinition> {
        self.definitions.get(name)
    }

    /// Check if element is defined
    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }
}

const RESERVED_NAMES: [&str; 8] = [
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

/// Validate a custom element name
pub fn validate_name(name: &str) -> Result<(), CustomElementError> {
    let invalid = |reason: &str| Err(CustomElementError::InvalidName(format!("'{}': {}", name, reason)));

    // Must start with lowercase ASCII
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return invalid("must start with a lowercase letter");
    }

    // Must contain a hyphen
    if !name.contains('-') {
        return invalid("must contain a hyphen");
    }

    let valid_char = |c: char| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_') || !c.is_ascii()
    };
    if !name.chars().all(valid_char) {
        return invalid("contains characters not allowed in element names");
    }

    if RESERVED_NAMES.contains(&name) {
        return invalid("reserved element name");
    }

    Ok(())
}

/// Custom element errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustomElementError {
    #[error("Invalid custom element name {0}")]
    InvalidName(String),

    #[error("Element already defined: {0}")]
    AlreadyDefined(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inert;

    impl CustomElementReactions for Inert {
        fn connected_callback(&self) -> Result<(), CallbackError> {
            Ok(())
        }

        fn disconnected_callback(&self) -> Result<(), CallbackError> {
            Ok(())
        }

        fn attribute_changed_callback(
            &self,
            _name: &str,
            _old: Option<&str>,
            _new: Option<&str>,
            _ns: Option<&str>,
        ) -> Result<(), CallbackError> {
            Ok(())
        }

        fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
            self
        }
    }

    impl CustomElementConstructor for Inert {
        fn observed_attributes(&self) -> Vec<String> {
            vec!["label".to_string()]
        }

        fn construct(&self, _host: ElementRef) -> Rc<dyn CustomElementReactions> {
            Rc::new(Inert)
        }
    }

    #[test]
    fn test_valid_names() {
        assert!(validate_name("my-element").is_ok());
        assert!(validate_name("app-header2").is_ok());
        assert!(validate_name("x-ünicode").is_ok());
        assert!(validate_name("myelement").is_err()); // no hyphen
        assert!(validate_name("My-Element").is_err()); // uppercase
        assert!(validate_name("my-Element").is_err());
        assert!(validate_name("1-element").is_err());
        assert!(validate_name("my element-x").is_err());
        assert!(validate_name("font-face").is_err());
    }

    #[test]
    fn test_define() {
        let mut registry = CustomElementRegistry::new();

        let def = registry.define("my-element", Rc::new(Inert)).unwrap();
        assert!(def.observes("label"));
        assert!(registry.is_defined("my-element"));

        // Duplicate
        assert_eq!(
            registry.define("my-element", Rc::new(Inert)).err(),
            Some(CustomElementError::AlreadyDefined("my-element".to_string()))
        );
        assert!(registry.define("nohyphen", Rc::new(Inert)).is_err());
    }
}
