use std::collections::BTreeMap;
use serde::ser::{Serialize,Serializer,SerializeMap,SerializeSeq};
use yaml_rust::Yaml;
use crate::error::Result;

/** Mapping node. Keys are kept sorted so iteration order is canonical. */
pub type Mapping = BTreeMap<String,ConfigValue>;

/**
 * A loaded configuration document, independent of the format it was
 * read from.
 */
#[derive(PartialEq,Clone,Debug)]
pub enum ConfigValue {
    Null,
    Boolean(bool),
    Integer(i64),
    /** Integer outside the i64 range, kept digit for digit */
    BigInteger(serde_json::Number),
    Float(f64),
    String(String),
    Sequence(Vec<ConfigValue>),
    Mapping(Mapping)
}

impl ConfigValue {
    /** Short description for log messages */
    pub fn describe(&self) -> String {
        match self {
            ConfigValue::Mapping(m)  => format!("mapping with {} keys",m.len()),
            ConfigValue::Sequence(s) => format!("sequence of {} items",s.len()),
            ConfigValue::Null        => "null".to_string(),
            _                        => "scalar".to_string()
        }
    }

    /**
     * Convert a yaml-rust node. Only plain data is produced; application
     * tags are ignored by the YAML loader and never turn into anything but
     * strings.
     */
    pub fn from_yaml(yaml: &Yaml) -> Result<ConfigValue> {
        Ok(match yaml {
            Yaml::Null       => ConfigValue::Null,
            Yaml::Boolean(b) => ConfigValue::Boolean(*b),
            Yaml::Integer(i) => ConfigValue::Integer(*i),
            Yaml::Real(text) => match (big_integer(text),yaml.as_f64()) {
                (Some(n),_)    => ConfigValue::BigInteger(n),
                (None,Some(f)) => ConfigValue::Float(f),
                (None,None)    => bail!("invalid floating point value '{}'",text)
            },
            Yaml::String(s)  => ConfigValue::String(s.clone()),
            Yaml::Array(items) => {
                let mut seq = Vec::with_capacity(items.len());
                for item in items {
                    seq.push(ConfigValue::from_yaml(item)?);
                }
                ConfigValue::Sequence(seq)
            },
            Yaml::Hash(hash) => {
                let mut map = Mapping::new();
                for (key,value) in hash {
                    map.insert(yaml_key(key)?,ConfigValue::from_yaml(value)?);
                }
                ConfigValue::Mapping(map)
            },
            Yaml::BadValue  => bail!("YAML value does not match its declared tag"),
            // the loader replaces aliases with copies of their anchors
            other           => bail!("unsupported YAML node {:?}",other)
        })
    }

    /** Convert several YAML documents; more than one becomes a sequence */
    pub fn from_yaml_documents(docs: &[Yaml]) -> Result<ConfigValue> {
        match docs {
            []    => Ok(ConfigValue::Null),
            [doc] => ConfigValue::from_yaml(doc),
            docs  => {
                let mut seq = Vec::with_capacity(docs.len());
                for doc in docs {
                    seq.push(ConfigValue::from_yaml(doc)?);
                }
                Ok(ConfigValue::Sequence(seq))
            }
        }
    }

    pub fn from_json(json: &serde_json::Value) -> ConfigValue {
        use serde_json::Value;
        match json {
            Value::Null      => ConfigValue::Null,
            Value::Bool(b)   => ConfigValue::Boolean(*b),
            Value::Number(n) => match (n.as_i64(),big_integer(&n.to_string())) {
                (Some(i),_)    => ConfigValue::Integer(i),
                (None,Some(n)) => ConfigValue::BigInteger(n),
                (None,None)    => ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN))
            },
            Value::String(s) => ConfigValue::String(s.clone()),
            Value::Array(items) => ConfigValue::Sequence(items.iter().map(ConfigValue::from_json).collect()),
            Value::Object(obj) => ConfigValue::Mapping(
                obj.iter().map(|(k,v)| (k.clone(),ConfigValue::from_json(v))).collect()
            )
        }
    }
}

/**
 * Integer text too large for i64 (yaml-rust hands these over as reals),
 * normalized to plain decimal digits.
 */
fn big_integer(text: &str) -> Option<serde_json::Number> {
    let (sign,digits) = match text.strip_prefix('-') {
        Some(rest) => ("-",rest),
        None       => ("",text.strip_prefix('+').unwrap_or(text))
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None
    }
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return None
    }
    serde_json::from_str(&format!("{}{}",sign,digits)).ok()
}

/** Mapping keys are strings; scalar YAML keys are converted to their text */
fn yaml_key(key: &Yaml) -> Result<String> {
    match key {
        Yaml::String(s) | Yaml::Real(s) => Ok(s.clone()),
        Yaml::Integer(i) => Ok(i.to_string()),
        Yaml::Boolean(b) => Ok(b.to_string()),
        Yaml::Null       => Ok("null".to_string()),
        other            => bail!("unsupported mapping key {:?}",other)
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok,S::Error> {
        match self {
            ConfigValue::Null       => serializer.serialize_unit(),
            ConfigValue::Boolean(b) => serializer.serialize_bool(*b),
            ConfigValue::Integer(i) => serializer.serialize_i64(*i),
            ConfigValue::BigInteger(n) => n.serialize(serializer),
            ConfigValue::Float(f)   => serializer.serialize_f64(*f),
            ConfigValue::String(s)  => serializer.serialize_str(s),
            ConfigValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            },
            ConfigValue::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k,v) in entries {
                    map.serialize_entry(k,v)?;
                }
                map.end()
            }
        }
    }
}
