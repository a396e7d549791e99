use regex::Regex;
use tracing::debug;
use crate::error::Result;
use crate::keypath::{ItemKey,KeyPath};
use crate::value::ConfigValue;

/**
 * Drops document entries whose key path (e.g. `metadata.labels.[app.io/name]`
 * or `servers[0].port`) matches one of the exclusion regexes.
 */
#[derive(Debug,Default)]
pub struct PathFilter {
    excludes: Vec<Regex>
}

impl PathFilter {
    pub fn new(patterns: &[String]) -> Result<PathFilter> {
        let mut excludes = Vec::<Regex>::new();
        for excl in patterns {
            excludes.push(Regex::new(excl)?)
        }
        Ok(PathFilter{excludes})
    }

    pub fn is_empty(&self) -> bool {
        self.excludes.is_empty()
    }

    pub fn accept(&self,path: &KeyPath) -> bool {
        if self.excludes.is_empty() || path.0.is_empty() {
            return true
        }
        let pathstr = path.to_string();
        !self.excludes.iter().any(|re| re.is_match(&pathstr))
    }

    /** Apply the filter to a whole document in place */
    pub fn prune(&self, value: &mut ConfigValue) {
        if !self.is_empty() {
            self.prune_at(&KeyPath::new(),value)
        }
    }

    fn prune_at(&self, path: &KeyPath, value: &mut ConfigValue) {
        match value {
            ConfigValue::Mapping(map) => {
                map.retain(|key,_| {
                    let child = path.push(ItemKey::from(key.as_str()));
                    let keep = self.accept(&child);
                    if !keep { debug!(path = %child, "excluded"); }
                    keep
                });
                for (key,child) in map.iter_mut() {
                    self.prune_at(&path.push(ItemKey::from(key.as_str())),child);
                }
            },
            ConfigValue::Sequence(items) => {
                let mut index = 0;
                items.retain(|_| {
                    let child = path.push(ItemKey::Index(index));
                    index += 1;
                    let keep = self.accept(&child);
                    if !keep { debug!(path = %child, "excluded"); }
                    keep
                });
                // nested paths use the indexes of the retained items
                for (i,child) in items.iter_mut().enumerate() {
                    self.prune_at(&path.push(ItemKey::Index(i)),child);
                }
            },
            _ => ()
        }
    }
}
