//! Capability descriptors.

use crate::Identifier;

/// Topic/service name remapping applied to the granted capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remapping {
    pub from: String,
    pub to: String,
}

/// Key/value parameter passed to the granted capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub key: String,
    pub value: String,
}

/// A single capability being requested.
///
/// Owned by exactly one [`Request`](crate::Request); never shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    id: Identifier,
    capability_name: String,
    uri: Option<String>,
    remappings: Vec<Remapping>,
    parameters: Vec<Parameter>,
}

impl Resource {
    /// Create a resource with a fresh identifier.
    pub fn new(capability_name: impl Into<String>) -> Self {
        Self::with_id(Identifier::new(), capability_name)
    }

    /// Create a resource with a known identifier.
    pub fn with_id(id: Identifier, capability_name: impl Into<String>) -> Self {
        Self {
            id,
            capability_name: capability_name.into(),
            uri: None,
            remappings: Vec::new(),
            parameters: Vec::new(),
        }
    }

    /// Set the target namespace/endpoint.
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Append a remapping. Path syntax is not validated.
    pub fn add_remapping(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.remappings.push(Remapping {
            from: from.into(),
            to: to.into(),
        });
    }

    /// Append a parameter. Duplicate keys are kept in order.
    pub fn add_parameter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.parameters.push(Parameter {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn capability_name(&self) -> &str {
        &self.capability_name
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn remappings(&self) -> &[Remapping] {
        &self.remappings
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_resources_get_distinct_ids() {
        let a = Resource::new("concert_common_rapps/waiter");
        let b = Resource::new("concert_common_rapps/waiter");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.uri(), None);
    }

    #[test]
    fn test_parameters_keep_duplicates_in_order() {
        let mut resource = Resource::new("turtle_concert/turtle_stroll").with_uri("rocon:/turtle");
        resource.add_parameter("speed", "1");
        resource.add_parameter("speed", "2");
        resource.add_remapping("/send_order", "/orders");

        let values: Vec<&str> = resource
            .parameters()
            .iter()
            .map(|p| p.value.as_str())
            .collect();
        assert_eq!(values, vec!["1", "2"]);
        assert_eq!(resource.remappings()[0].to, "/orders");
        assert_eq!(resource.uri(), Some("rocon:/turtle"));
    }
}
