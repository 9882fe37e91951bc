use crate::error::ThriftError;
use crate::location::Location;

pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn error(msg: &str, location: &Location) -> ThriftError {
    ThriftError::ParseError {
        msg:      msg.to_owned(),
        location: location.clone(),
    }
}

#[test]
fn quote_escapes() {
    assert_eq!(quote("a\"b"), r#""a\"b""#);
    assert_eq!(quote("tab\t"), r#""tab\t""#);
}
