use crate::error::ConfigurationError;
use convert_case::{Case, Casing};

/// Longest identifier accepted for keyspaces, tables, columns and types.
pub const MAX_IDENT_LEN: usize = 48;

/// Names the store reserves for its own native types.
pub const RESERVED_TYPE_NAMES: [&str; 10] = [
    "bitstring", "byte", "complex", "date", "enum", "interval", "macaddr", "smallint", "time",
    "tinyint",
];

/// Ensure an identifier is non-empty, unquoted-safe and within the maximum
/// length.
pub(crate) fn validate_ident(
    class: &'static str,
    what: &'static str,
    name: &str,
) -> Result<(), ConfigurationError> {
    let invalid = || ConfigurationError::InvalidName {
        class,
        what,
        name: name.to_string(),
    };

    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(invalid());
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(invalid());
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid());
    }
    if name.len() > MAX_IDENT_LEN {
        return Err(invalid());
    }

    Ok(())
}

/// Ensure a user-defined type name is a valid identifier and not reserved.
pub(crate) fn validate_type_name(
    class: &'static str,
    name: &str,
) -> Result<(), ConfigurationError> {
    validate_ident(class, "user-defined type", name)?;

    if RESERVED_TYPE_NAMES.contains(&name.to_ascii_lowercase().as_str()) {
        return Err(ConfigurationError::ReservedTypeName {
            class,
            name: name.to_string(),
        });
    }

    Ok(())
}

/// Getter names tried for a field, most specific first.
pub(crate) fn getter_names(field: &str, boolean: bool) -> Vec<String> {
    let snake = field.to_case(Case::Snake);
    let mut names = vec![format!("get_{snake}")];
    if boolean {
        names.push(format!("is_{snake}"));
    }

    names
}

pub(crate) fn setter_name(field: &str) -> String {
    format!("set_{}", field.to_case(Case::Snake))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASS: &str = "naming::tests::Entity";

    #[test]
    fn idents_accept_letters_digits_and_underscores() {
        assert!(validate_ident(CLASS, "table", "people_2024").is_ok());
        assert!(validate_ident(CLASS, "table", "_hidden").is_ok());
    }

    #[test]
    fn idents_reject_bad_shapes() {
        for bad in ["", "2people", "peo-ple", "people table", &"x".repeat(MAX_IDENT_LEN + 1)] {
            assert!(
                matches!(
                    validate_ident(CLASS, "table", bad),
                    Err(ConfigurationError::InvalidName { .. })
                ),
                "'{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn reserved_type_names_are_rejected_case_insensitively() {
        assert!(matches!(
            validate_type_name(CLASS, "Date"),
            Err(ConfigurationError::ReservedTypeName { .. })
        ));
        assert!(validate_type_name(CLASS, "address").is_ok());
    }

    #[test]
    fn accessor_names_follow_snake_case() {
        assert_eq!(getter_names("firstName", false), vec!["get_first_name"]);
        assert_eq!(getter_names("active", true), vec!["get_active", "is_active"]);
        assert_eq!(setter_name("zipCode"), "set_zip_code");
    }
}
