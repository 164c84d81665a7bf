//! Extension traits over foreign types.

use error_stack::ResultExt;
use serde::de::DeserializeOwned;

use crate::errors::{CustomResult, ParsingError};

/// Extension trait for deserializing a type out of its JSON string representation.
pub trait StringExt<T> {
    /// Deserialize `self` as JSON into `T`, naming the target type in the error report.
    fn parse_struct(&self, type_name: &'static str) -> CustomResult<T, ParsingError>
    where
        T: DeserializeOwned;
}

impl<T> StringExt<T> for str {
    fn parse_struct(&self, type_name: &'static str) -> CustomResult<T, ParsingError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str::<T>(self)
            .change_context(ParsingError::StructParseFailure(type_name))
            .attach_printable_lazy(|| format!("Unable to parse {type_name} from string"))
    }
}

impl<T> StringExt<T> for String {
    fn parse_struct(&self, type_name: &'static str) -> CustomResult<T, ParsingError>
    where
        T: DeserializeOwned,
    {
        self.as_str().parse_struct(type_name)
    }
}

/// Serialize a value to its JSON string representation.
pub trait Encode {
    /// Serialize `self` to a JSON string.
    fn encode_to_string_of_json(&self) -> CustomResult<String, ParsingError>
    where
        Self: serde::Serialize;
}

impl<A> Encode for A {
    fn encode_to_string_of_json(&self) -> CustomResult<String, ParsingError>
    where
        Self: serde::Serialize,
    {
        serde_json::to_string(self).change_context(ParsingError::EncodeError("json"))
    }
}
