pub mod registry;
pub mod validator;
pub mod xml;

pub use registry::{SchemaError, SchemaRegistry, XmlSchema};
pub use validator::{validate_json, validate_xml, ValidationError, ValidationOutcome};
