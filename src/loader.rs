use std::fmt::{Formatter,Display};
use std::path::Path;
use std::{fmt,fs};
use tracing::debug;
use yaml_rust::YamlLoader;
use crate::error::{ErrorKind,Result,ResultExt};
use crate::value::ConfigValue;

/** Configuration file syntax, as implied by the file extension */
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum Format {
    Yaml,
    Json
}

impl Format {
    /** `.yaml`/`.yml` or `.json`, ignoring case. Anything else is unknown. */
    pub fn detect(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Format::Yaml),
            "json"         => Some(Format::Json),
            _              => None
        }
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Format::Yaml => write!(f,"YAML"),
            Format::Json => write!(f,"JSON")
        }
    }
}

/** Fail with NotFound unless the path names an existing regular file */
pub fn check_file(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Err(_)                   => Err(ErrorKind::NotFound(path.display().to_string(),"File not found").into()),
        Ok(md) if !md.is_file()  => Err(ErrorKind::NotFound(path.display().to_string(),"Not a file").into()),
        Ok(_)                    => Ok(())
    }
}

pub fn parse_yaml(text: &str) -> Result<ConfigValue> {
    let docs = YamlLoader::load_from_str(text).map_err(|e| e.to_string())?;
    ConfigValue::from_yaml_documents(&docs)
}

pub fn parse_json(text: &str) -> Result<ConfigValue> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    Ok(ConfigValue::from_json(&json))
}

/**
 * Load a configuration file. A recognised extension selects the parser
 * and a parse failure is final; otherwise YAML is tried, then JSON.
 */
pub fn load(path: &Path) -> Result<ConfigValue> {
    check_file(path)?;
    let fname = path.display().to_string();
    let text = fs::read_to_string(path).chain_err(|| format!("while reading {}",fname))?;
    if text.trim().is_empty() {
        debug!(file = %fname, "empty file loads as null");
        return Ok(ConfigValue::Null);
    }
    let value = match Format::detect(path) {
        Some(format) => {
            let parsed = match format {
                Format::Yaml => parse_yaml(&text),
                Format::Json => parse_json(&text)
            };
            parsed.map_err(|e| ErrorKind::Format(fname.clone(),format!("invalid {}: {}",format,e)))?
        },
        None => match parse_yaml(&text) {
            Ok(value) => value,
            Err(yaml_err) => {
                debug!(file = %fname, error = %yaml_err, "not YAML, trying JSON");
                parse_json(&text).map_err(|json_err| ErrorKind::Format(fname.clone(),
                    format!("could not determine file format, not valid YAML ({}) or JSON ({})",yaml_err,json_err)))?
            }
        }
    };
    debug!(file = %fname, "loaded {}",value.describe());
    Ok(value)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;
    use std::path::PathBuf;

    fn scratch(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path,content).unwrap();
        path
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(Some(Format::Yaml),Format::detect(Path::new("a/b.yaml")));
        assert_eq!(Some(Format::Yaml),Format::detect(Path::new("b.YML")));
        assert_eq!(Some(Format::Json),Format::detect(Path::new("b.Json")));
        assert_eq!(None,Format::detect(Path::new("b.conf")));
        assert_eq!(None,Format::detect(Path::new("json")));
    }

    #[test]
    fn test_missing_file() {
        match load(Path::new("test-fixtures/does-not-exist.yaml")) {
            Err(Error(ErrorKind::NotFound(path,_),_)) => assert!(path.ends_with("does-not-exist.yaml")),
            other => panic!("Unexpected result {:?}",other)
        }
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        match load(dir.path()) {
            Err(Error(ErrorKind::NotFound(_,reason),_)) => assert_eq!("Not a file",reason),
            other => panic!("Unexpected result {:?}",other)
        }
    }

    #[test]
    fn test_empty_files_are_null() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["empty.yaml","empty.json","empty.cfg"] {
            let path = scratch(&dir,name,"  \n");
            assert_eq!(ConfigValue::Null,load(&path).unwrap());
        }
    }

    #[test]
    fn test_invalid_yaml_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch(&dir,"bad.yaml","a: b: c\n");
        match load(&path) {
            Err(Error(ErrorKind::Format(_,detail),_)) => assert!(detail.starts_with("invalid YAML")),
            other => panic!("Unexpected result {:?}",other)
        }
    }

    #[test]
    fn test_recognised_extension_does_not_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch(&dir,"config.json","name: web\n");
        match load(&path) {
            Err(Error(ErrorKind::Format(_,detail),_)) => assert!(detail.starts_with("invalid JSON")),
            other => panic!("Unexpected result {:?}",other)
        }
    }

    #[test]
    fn test_unknown_extension_tries_yaml_then_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch(&dir,"config.cfg","name: web\nport: 80\n");
        assert!(matches!(load(&path).unwrap(),ConfigValue::Mapping(_)));
        let path = scratch(&dir,"broken.cfg","{\"a\": [1, 2\n");
        match load(&path) {
            Err(Error(ErrorKind::Format(_,detail),_)) => {
                assert!(detail.contains("YAML"));
                assert!(detail.contains("JSON"));
            },
            other => panic!("Unexpected result {:?}",other)
        }
    }

    #[test]
    fn test_fixture_formats_agree() {
        let yaml = load(Path::new("test-fixtures/service-reordered.yaml")).unwrap();
        let json = load(Path::new("test-fixtures/service.json")).unwrap();
        assert_eq!(json,yaml);
    }
}
