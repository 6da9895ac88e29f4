//! Yandex Cloud service clients.
//!
//! Each service adds methods to [`crate::YandexCloud`] and defines its own
//! request and response models.

pub mod apigateway;
pub mod compute;
pub mod containers;
pub mod functions;
pub mod iam;
pub mod storage;

/// Filter expression selecting a resource by exact name.
#[must_use]
pub fn name_filter(name: &str) -> String {
    format!("name = \"{name}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_filter() {
        assert_eq!(name_filter("my-func"), r#"name = "my-func""#);
    }
}
