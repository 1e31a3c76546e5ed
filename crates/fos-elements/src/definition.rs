//! Component definitions
//!
//! Static metadata of a component type: element selector, declared inputs
//! and outputs, and content projection selectors. Resolved once per type and
//! shared by every element instance of that type.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use fos_dom::Value;

/// Value coercion applied to an input before it reaches the component
pub type InputTransform = Rc<dyn Fn(Value) -> Value>;

/// Identity of a component type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
}

impl ComponentType {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Declared input
#[derive(Clone)]
pub struct InputDef {
    /// Property name on the component and on the element
    pub prop_name: String,
    /// Public (template) name, source of the attribute name
    pub template_name: String,
    /// Observed attribute, `template_name` in dash-case
    pub attr_name: String,
    pub transform: Option<InputTransform>,
}

impl InputDef {
    pub fn new(prop_name: &str) -> Self {
        Self {
            prop_name: prop_name.to_string(),
            template_name: prop_name.to_string(),
            attr_name: camel_to_dash_case(prop_name),
            transform: None,
        }
    }

    /// Expose the input under a different public name
    pub fn with_template_name(mut self, template_name: &str) -> Self {
        self.template_name = template_name.to_string();
        self.attr_name = camel_to_dash_case(template_name);
        self
    }

    pub fn with_transform(mut self, transform: impl Fn(Value) -> Value + 'static) -> Self {
        self.transform = Some(Rc::new(transform));
        self
    }
}

impl fmt::Debug for InputDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputDef")
            .field("prop_name", &self.prop_name)
            .field("attr_name", &self.attr_name)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Declared output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDef {
    /// Emitter property on the component
    pub prop_name: String,
    /// Name of the DOM event dispatched for each emission
    pub event_name: String,
}

impl OutputDef {
    pub fn new(prop_name: &str, event_name: &str) -> Self {
        Self {
            prop_name: prop_name.to_string(),
            event_name: event_name.to_string(),
        }
    }
}

/// Resolved metadata for one component type
#[derive(Debug, Clone, Default)]
pub struct ComponentDefinition {
    pub selector: String,
    pub inputs: Vec<InputDef>,
    pub outputs: Vec<OutputDef>,
    /// Content projection selectors; `*` marks the default slot
    pub content_selectors: Vec<String>,
}

impl ComponentDefinition {
    pub fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            ..Self::default()
        }
    }

    pub fn with_input(mut self, input: InputDef) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_output(mut self, prop_name: &str, event_name: &str) -> Self {
        self.outputs.push(OutputDef::new(prop_name, event_name));
        self
    }

    pub fn with_content_selectors(mut self, selectors: &[&str]) -> Self {
        self.content_selectors = selectors.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn input(&self, prop_name: &str) -> Option<&InputDef> {
        self.inputs.iter().find(|i| i.prop_name == prop_name)
    }

    /// Attribute name to input lookup. Colliding attribute names: last wins.
    pub fn attribute_inputs(&self) -> HashMap<String, InputDef> {
        self.inputs
            .iter()
            .map(|input| (input.attr_name.clone(), input.clone()))
            .collect()
    }

    /// Observed attribute names in declaration order, without duplicates
    pub fn observed_attributes(&self) -> Vec<String> {
        let mut attrs: Vec<String> = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            if !attrs.contains(&input.attr_name) {
                attrs.push(input.attr_name.clone());
            }
        }
        attrs
    }
}

/// `userName` -> `user-name`
pub fn camel_to_dash_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    for c in input.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_to_dash_case() {
        assert_eq!(camel_to_dash_case("userName"), "user-name");
        assert_eq!(camel_to_dash_case("fooBarBaz"), "foo-bar-baz");
        assert_eq!(camel_to_dash_case("plain"), "plain");
        assert_eq!(camel_to_dash_case("URL"), "-u-r-l");
    }

    #[test]
    fn test_input_attr_name() {
        let input = InputDef::new("userName");
        assert_eq!(input.attr_name, "user-name");

        let renamed = InputDef::new("value").with_template_name("initialValue");
        assert_eq!(renamed.prop_name, "value");
        assert_eq!(renamed.attr_name, "initial-value");
    }

    #[test]
    fn test_attribute_collision_last_wins() {
        let def = ComponentDefinition::new("x-el")
            .with_input(InputDef::new("first").with_template_name("shared"))
            .with_input(InputDef::new("second").with_template_name("shared"));

        let attrs = def.attribute_inputs();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs["shared"].prop_name, "second");
        assert_eq!(def.observed_attributes(), vec!["shared".to_string()]);
    }

    #[test]
    fn test_component_type_identity() {
        struct A;
        struct B;
        assert_eq!(ComponentType::of::<A>(), ComponentType::of::<A>());
        assert_ne!(ComponentType::of::<A>(), ComponentType::of::<B>());
        assert!(ComponentType::of::<A>().name().ends_with("A"));
    }
}
