use serde::Serialize;

/// How resolved field and parameter names are derived from the names written
/// in the `.thrift` source. The raw name is always kept as `thrift_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FieldNamingPolicy {
    /// Names are used as written.
    #[default]
    Default,
    /// Lower-cases the first character, except for names that start with a
    /// run of capitals such as `SSLFlag` or `OAuthToken`.
    Java,
}

impl FieldNamingPolicy {
    /// Example usage:
    ///
    /// ```
    /// use brine_thrift_compiler::FieldNamingPolicy;
    ///
    /// assert_eq!(FieldNamingPolicy::Java.apply("MyField"), "myField");
    /// assert_eq!(FieldNamingPolicy::Java.apply("SSLFlag"), "SSLFlag");
    /// assert_eq!(FieldNamingPolicy::Default.apply("MyField"), "MyField");
    /// ```
    ///
    pub fn apply(&self, name: &str) -> String {
        match self {
            FieldNamingPolicy::Default => name.to_owned(),
            FieldNamingPolicy::Java => java_name(name),
        }
    }

    pub fn from_name(name: &str) -> Option<FieldNamingPolicy> {
        match name {
            "default" => Some(FieldNamingPolicy::Default),
            "java" => Some(FieldNamingPolicy::Java),
            _ => None,
        }
    }
}

fn java_name(name: &str) -> String {
    let mut chars = name.chars();
    let first = match chars.next() {
        Some(first) => first,
        None => return String::new(),
    };
    let second_is_upper = chars.clone().next().map_or(false, char::is_uppercase);
    if !first.is_uppercase() || second_is_upper {
        return name.to_owned();
    }

    let mut out: String = first.to_lowercase().collect();
    out.extend(chars);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: &[&str] = &[
        "", "X", "x", "MyField", "myField", "SSLFlag", "OAuthToken", "ID", "Id", "_Private",
        "snake_case", "Éclair", "A1",
    ];

    #[test]
    fn java_vectors() {
        let java = FieldNamingPolicy::Java;
        assert_eq!(java.apply("SSLFlag"), "SSLFlag");
        assert_eq!(java.apply("OAuthToken"), "OAuthToken");
        assert_eq!(java.apply("MyField"), "myField");
        assert_eq!(java.apply("X"), "x");
        assert_eq!(java.apply("ID"), "ID");
        assert_eq!(java.apply("A1"), "a1");
        assert_eq!(java.apply("Éclair"), "éclair");
        assert_eq!(java.apply(""), "");
    }

    #[test]
    fn policies_are_idempotent() {
        for policy in [FieldNamingPolicy::Default, FieldNamingPolicy::Java] {
            for name in NAMES {
                let once = policy.apply(name);
                assert_eq!(policy.apply(&once), once, "{:?} {}", policy, name);
            }
        }
    }

    #[test]
    fn default_is_identity() {
        for name in NAMES {
            assert_eq!(FieldNamingPolicy::Default.apply(name), *name);
        }
    }
}
