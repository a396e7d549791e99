use serde::Serialize;
use serde_json::ser::{PrettyFormatter,Serializer};
use crate::error::Result;
use crate::value::{ConfigValue,Mapping};

const INDENT: usize = 2;

/** Words some YAML readers treat as booleans or null */
const RESERVED: &[&str] = &["true","false","null","yes","no","on","off"];

/** Longer keys are written in explicit `? key` form; YAML caps implicit keys at 1024 characters */
const MAX_IMPLICIT_KEY: usize = 1000;

/**
 * Render a value as block-style YAML with sorted keys and one entry per
 * line. Output always ends in a newline and loads back to the same value.
 */
pub fn canonicalize(value: &ConfigValue) -> Result<String> {
    let mut out = String::new();
    match value {
        ConfigValue::Mapping(map) if !map.is_empty() => write_mapping(&mut out,map,0,false)?,
        ConfigValue::Sequence(seq) if !seq.is_empty() => write_sequence(&mut out,seq,0,false)?,
        scalar => {
            write_inline(&mut out,scalar)?;
            out.push('\n');
        }
    }
    Ok(out)
}

fn pad(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat(' ').take(indent));
}

fn write_mapping(out: &mut String, map: &Mapping, indent: usize, inline_first: bool) -> Result<()> {
    for (i,(key,value)) in map.iter().enumerate() {
        if i > 0 || !inline_first { pad(out,indent); }
        let mut key_text = String::new();
        write_string(&mut key_text,key)?;
        if key_text.len() > MAX_IMPLICIT_KEY {
            out.push_str("? ");
            out.push_str(&key_text);
            out.push('\n');
            pad(out,indent);
        } else {
            out.push_str(&key_text);
        }
        out.push(':');
        match value {
            ConfigValue::Mapping(m) if !m.is_empty() => {
                out.push('\n');
                write_mapping(out,m,indent+INDENT,false)?;
            },
            ConfigValue::Sequence(s) if !s.is_empty() => {
                out.push('\n');
                write_sequence(out,s,indent+INDENT,false)?;
            },
            scalar => {
                out.push(' ');
                write_inline(out,scalar)?;
                out.push('\n');
            }
        }
    }
    Ok(())
}

fn write_sequence(out: &mut String, seq: &[ConfigValue], indent: usize, inline_first: bool) -> Result<()> {
    for (i,item) in seq.iter().enumerate() {
        if i > 0 || !inline_first { pad(out,indent); }
        out.push_str("- ");
        match item {
            ConfigValue::Mapping(m) if !m.is_empty() => write_mapping(out,m,indent+INDENT,true)?,
            ConfigValue::Sequence(s) if !s.is_empty() => write_sequence(out,s,indent+INDENT,true)?,
            scalar => {
                write_inline(out,scalar)?;
                out.push('\n');
            }
        }
    }
    Ok(())
}

fn write_inline(out: &mut String, value: &ConfigValue) -> Result<()> {
    match value {
        ConfigValue::Null        => out.push_str("null"),
        ConfigValue::Boolean(b)  => out.push_str(if *b {"true"} else {"false"}),
        ConfigValue::Integer(i)  => out.push_str(&i.to_string()),
        ConfigValue::BigInteger(n) => out.push_str(&n.to_string()),
        ConfigValue::Float(f)    => out.push_str(&float_text(*f)),
        ConfigValue::String(s)   => write_string(out,s)?,
        ConfigValue::Mapping(_)  => out.push_str("{}"),
        ConfigValue::Sequence(_) => out.push_str("[]")
    }
    Ok(())
}

/** Shortest text that reads back as the same float, never as an integer */
fn float_text(f: f64) -> String {
    if f.is_nan() {
        ".nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 {".inf".to_string()} else {"-.inf".to_string()}
    } else {
        format!("{:?}",f)
    }
}

fn write_string(out: &mut String, s: &str) -> Result<()> {
    if is_plain(s) {
        out.push_str(s);
    } else {
        // a JSON string literal is also a valid YAML double-quoted scalar
        out.push_str(&serde_json::to_string(s)?);
    }
    Ok(())
}

/** True if the string can be written unquoted and still load as a string */
fn is_plain(s: &str) -> bool {
    match s.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '/' => (),
        _ => return false
    }
    if !s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c,'_' | '.' | '/' | '-' | ':')) {
        return false
    }
    // "key:" would read as a mapping
    if s.ends_with(':') {
        return false
    }
    if RESERVED.contains(&s.to_ascii_lowercase().as_str()) {
        return false
    }
    // "inf", "NaN", "infinity" and friends
    s.parse::<f64>().is_err()
}

#[derive(Serialize)]
struct Combined<'a> {
    baseline: &'a ConfigValue,
    current: &'a ConfigValue
}

/**
 * Both documents in one pretty-printed JSON object with keys sorted at
 * every level and a four space indent.
 */
pub fn dump(current: &ConfigValue, baseline: &ConfigValue) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf,PrettyFormatter::with_indent(b"    "));
    Combined{baseline,current}.serialize(&mut ser)?;
    Ok(String::from_utf8(buf).map_err(|e| e.to_string())?)
}
