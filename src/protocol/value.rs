/// A decoded reply from a node, in the minimal RESP2 subset this engine
/// needs: simple strings, errors, integers, bulk strings and arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Option<Vec<u8>>),
    Array(Option<Vec<Value>>),
}

impl Value {
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// The response body as a UTF-8 string, ignoring the envelope type.
    pub fn str(&self) -> crate::Result<String> {
        match self {
            Value::SimpleString(s) => Ok(s.clone()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::BulkString(Some(b)) => Ok(String::from_utf8_lossy(b).into_owned()),
            Value::BulkString(None) => Ok(String::new()),
            Value::Error(e) => Ok(e.clone()),
            Value::Array(_) => Err(crate::Error::Protocol {
                addr: String::new(),
                cause: "expected a scalar reply, got an array".to_owned(),
            }),
        }
    }

    /// The response body as a list of strings (flattens a one-level array).
    pub fn list(&self) -> crate::Result<Vec<String>> {
        match self {
            Value::Array(Some(items)) => items.iter().map(Value::str).collect(),
            Value::Array(None) => Ok(Vec::new()),
            other => Ok(vec![other.str()?]),
        }
    }

    /// The response body as a map, synthesized from a flat array of
    /// alternating key/value bulk strings.
    pub fn map(&self) -> crate::Result<std::collections::HashMap<String, String>> {
        let items = match self {
            Value::Array(Some(items)) => items,
            Value::Array(None) => return Ok(Default::default()),
            _ => {
                return Err(crate::Error::Protocol {
                    addr: String::new(),
                    cause: "expected an array reply to decode as a map".to_owned(),
                });
            }
        };
        let mut map = std::collections::HashMap::with_capacity(items.len() / 2);
        let mut it = items.iter();
        while let (Some(k), Some(v)) = (it.next(), it.next()) {
            map.insert(k.str()?, v.str()?);
        }
        Ok(map)
    }

    pub fn err(&self) -> Option<&str> {
        match self {
            Value::Error(e) => Some(e.as_str()),
            _ => None,
        }
    }
}
